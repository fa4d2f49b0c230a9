//! Device-registration collaborator.
//!
//! Turns a handshake into a fresh device id. The gateway only depends on the
//! [`DeviceRegistrar`] trait; which implementation runs is a config choice.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use telemux_core::error::{GatewayError, Result};

/// GeoJSON point; coordinates are `[longitude, latitude]` when known.
#[derive(Debug, Clone, Serialize)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub coordinates: Option<[f64; 2]>,
}

/// Payload sent when allocating a device id.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationSeed {
    pub location: GeoPoint,
}

impl Default for RegistrationSeed {
    /// Placeholder location: the controller has no fix at handshake time.
    fn default() -> Self {
        Self {
            location: GeoPoint {
                kind: "Point",
                coordinates: None,
            },
        }
    }
}

#[async_trait]
pub trait DeviceRegistrar: Send + Sync {
    async fn register(&self, seed: RegistrationSeed) -> Result<String>;
}

/// Mints `<prefix>-YYYYMMDD-HHMMSS-<n>` ids in-process.
pub struct LocalRegistrar {
    prefix: String,
    seq: AtomicU64,
}

impl LocalRegistrar {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            seq: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl DeviceRegistrar for LocalRegistrar {
    async fn register(&self, _seed: RegistrationSeed) -> Result<String> {
        let n = self.seq.fetch_add(1, Ordering::Relaxed);
        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        Ok(format!("{}-{}-{}", self.prefix, stamp, n))
    }
}

/// Allocates ids through the device API (`POST {api_url}/api`).
pub struct HttpRegistrar {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRegistrar {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Internal(format!("registrar http client init failed: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/api", api_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl DeviceRegistrar for HttpRegistrar {
    async fn register(&self, seed: RegistrationSeed) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&seed)
            .send()
            .await
            .map_err(|e| GatewayError::RegistrationFailure(format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| GatewayError::RegistrationFailure(format!("api error: {e}")))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::RegistrationFailure(format!("invalid response body: {e}")))?;

        device_id_from_response(&body)
    }
}

/// The device API answers either `{deviceId}` or `{savedData: {deviceId}}`.
pub fn device_id_from_response(body: &Value) -> Result<String> {
    body.get("deviceId")
        .or_else(|| body.get("savedData").and_then(|s| s.get("deviceId")))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| GatewayError::RegistrationFailure("response has no deviceId".into()))
}
