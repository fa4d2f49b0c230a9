use serde::Deserialize;
use telemux_core::error::{GatewayError, Result};
use telemux_core::protocol::inbound::DEFAULT_HANDSHAKE_SENTINEL;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub registration: RegistrationSection,

    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub buffer: BufferSection,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(GatewayError::UnsupportedVersion);
        }

        self.gateway.validate()?;
        self.registration.validate()?;
        self.store.validate()?;
        self.buffer.validate()?;

        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            version: 1,
            gateway: GatewaySection::default(),
            registration: RegistrationSection::default(),
            store: StoreSection::default(),
            buffer: BufferSection::default(),
        }
    }
}

// --------------------
// gateway
// --------------------
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// WebSocket upgrade path. Controllers connect to `/`; `/v1/ws` is always
    /// served as well.
    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Per-connection outbound queue depth.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,

    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,

    #[serde(default = "default_handshake_sentinel")]
    pub handshake_sentinel: String,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            ws_path: default_ws_path(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            outbound_queue: default_outbound_queue(),
            max_message_bytes: default_max_message_bytes(),
            handshake_sentinel: default_handshake_sentinel(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if !self.ws_path.starts_with('/') {
            return Err(GatewayError::BadConfig("gateway.ws_path must start with '/'".into()));
        }
        if RESERVED_PATHS.contains(&self.ws_path.as_str()) {
            return Err(GatewayError::BadConfig(format!(
                "gateway.ws_path {} collides with an ops endpoint",
                self.ws_path
            )));
        }
        if !(5000..=120000).contains(&self.ping_interval_ms) {
            return Err(GatewayError::BadConfig(
                "gateway.ping_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(GatewayError::BadConfig(
                "gateway.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(GatewayError::BadConfig(
                "gateway.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if self.outbound_queue == 0 {
            return Err(GatewayError::BadConfig("gateway.outbound_queue must be > 0".into()));
        }
        if self.max_message_bytes < 64 {
            return Err(GatewayError::BadConfig(
                "gateway.max_message_bytes must be at least 64".into(),
            ));
        }
        if self.handshake_sentinel.is_empty() {
            return Err(GatewayError::BadConfig(
                "gateway.handshake_sentinel must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Ops routes the WebSocket path may not shadow.
const RESERVED_PATHS: [&str; 3] = ["/healthz", "/readyz", "/metrics"];

fn default_listen() -> String {
    "0.0.0.0:3001".into()
}
fn default_ws_path() -> String {
    "/".into()
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}
fn default_outbound_queue() -> usize {
    1024
}
fn default_max_message_bytes() -> usize {
    4096
}
fn default_handshake_sentinel() -> String {
    DEFAULT_HANDSHAKE_SENTINEL.into()
}

// --------------------
// registration
// --------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationMode {
    /// Ids are minted in-process.
    #[default]
    Local,
    /// Ids come from the device API (`POST {api_url}/api`).
    Http,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrationSection {
    #[serde(default)]
    pub mode: RegistrationMode,

    #[serde(default)]
    pub api_url: Option<String>,

    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,
}

impl Default for RegistrationSection {
    fn default() -> Self {
        Self {
            mode: RegistrationMode::default(),
            api_url: None,
            timeout_ms: default_http_timeout_ms(),
            id_prefix: default_id_prefix(),
        }
    }
}

impl RegistrationSection {
    pub fn validate(&self) -> Result<()> {
        if self.mode == RegistrationMode::Http && self.api_url.as_deref().unwrap_or("").is_empty() {
            return Err(GatewayError::BadConfig(
                "registration.api_url is required when mode is http".into(),
            ));
        }
        if !(100..=60000).contains(&self.timeout_ms) {
            return Err(GatewayError::BadConfig(
                "registration.timeout_ms must be between 100 and 60000".into(),
            ));
        }
        if self.id_prefix.is_empty() {
            return Err(GatewayError::BadConfig("registration.id_prefix must not be empty".into()));
        }
        Ok(())
    }
}

fn default_http_timeout_ms() -> u64 {
    5000
}
fn default_id_prefix() -> String {
    "voltz".into()
}

// --------------------
// store
// --------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreMode {
    #[default]
    Memory,
    Http,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    #[serde(default)]
    pub mode: StoreMode,

    /// Batch endpoint; `POST` inserts, `GET ?deviceId=&limit=` queries.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            mode: StoreMode::default(),
            url: None,
            timeout_ms: default_http_timeout_ms(),
        }
    }
}

impl StoreSection {
    pub fn validate(&self) -> Result<()> {
        if self.mode == StoreMode::Http && self.url.as_deref().unwrap_or("").is_empty() {
            return Err(GatewayError::BadConfig("store.url is required when mode is http".into()));
        }
        if !(100..=60000).contains(&self.timeout_ms) {
            return Err(GatewayError::BadConfig(
                "store.timeout_ms must be between 100 and 60000".into(),
            ));
        }
        Ok(())
    }
}

// --------------------
// buffer
// --------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest pending entry to make room.
    #[default]
    DropOldest,
    /// Refuse the incoming frame.
    DropNewest,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BufferSection {
    #[serde(default = "default_flush_threshold")]
    pub flush_threshold: usize,

    /// 0 disables the periodic flush.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    #[serde(default)]
    pub overflow: OverflowPolicy,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for BufferSection {
    fn default() -> Self {
        Self {
            flush_threshold: default_flush_threshold(),
            flush_interval_ms: default_flush_interval_ms(),
            max_entries: default_max_entries(),
            overflow: OverflowPolicy::default(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl BufferSection {
    pub fn validate(&self) -> Result<()> {
        if self.flush_threshold == 0 {
            return Err(GatewayError::BadConfig("buffer.flush_threshold must be > 0".into()));
        }
        if self.max_entries < self.flush_threshold {
            return Err(GatewayError::BadConfig(
                "buffer.max_entries must be >= flush_threshold".into(),
            ));
        }
        if self.flush_interval_ms != 0 && self.flush_interval_ms < 100 {
            return Err(GatewayError::BadConfig(
                "buffer.flush_interval_ms must be 0 (disabled) or at least 100".into(),
            ));
        }
        Ok(())
    }
}

fn default_flush_threshold() -> usize {
    100
}
fn default_flush_interval_ms() -> u64 {
    5000
}
fn default_max_entries() -> usize {
    10_000
}
fn default_retry_backoff_ms() -> u64 {
    1000
}
