//! Shared error type across telemux crates.

use thiserror::Error;

/// Stable error codes (used in logs, metrics labels and client-facing notices).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Unparseable or wrong-shape inbound message.
    MalformedMessage,
    /// Known frame kind with a payload shorter than its minimum.
    InvalidPayloadLength,
    /// Device-registration collaborator failed.
    RegistrationFailure,
    /// Persistence store rejected or failed a batch.
    PersistenceFailure,
    /// Outbound delivery to a connection failed.
    SendFailure,
    /// Invalid configuration.
    BadConfig,
    /// Unsupported config/protocol version.
    UnsupportedVersion,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in JSON notices and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MalformedMessage => "MALFORMED_MESSAGE",
            ErrorCode::InvalidPayloadLength => "INVALID_PAYLOAD_LENGTH",
            ErrorCode::RegistrationFailure => "REGISTRATION_FAILURE",
            ErrorCode::PersistenceFailure => "PERSISTENCE_FAILURE",
            ErrorCode::SendFailure => "SEND_FAILURE",
            ErrorCode::BadConfig => "BAD_CONFIG",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("malformed message: {0}")]
    MalformedMessage(String),
    #[error("invalid payload length for {kind}: need {expected} bytes, got {actual}")]
    InvalidPayloadLength {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("registration failed: {0}")]
    RegistrationFailure(String),
    #[error("persistence failed: {0}")]
    PersistenceFailure(String),
    #[error("send failed: {0}")]
    SendFailure(String),
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("unsupported version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Map to a stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            GatewayError::MalformedMessage(_) => ErrorCode::MalformedMessage,
            GatewayError::InvalidPayloadLength { .. } => ErrorCode::InvalidPayloadLength,
            GatewayError::RegistrationFailure(_) => ErrorCode::RegistrationFailure,
            GatewayError::PersistenceFailure(_) => ErrorCode::PersistenceFailure,
            GatewayError::SendFailure(_) => ErrorCode::SendFailure,
            GatewayError::BadConfig(_) => ErrorCode::BadConfig,
            GatewayError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            GatewayError::Internal(_) => ErrorCode::Internal,
        }
    }
}
