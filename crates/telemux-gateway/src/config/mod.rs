//! Gateway config loader (strict parsing).

pub mod schema;

use std::fs;

use telemux_core::error::{GatewayError, Result};

pub use schema::{
    BufferSection, GatewayConfig, GatewaySection, OverflowPolicy, RegistrationMode,
    RegistrationSection, StoreMode, StoreSection,
};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "TELEMUX_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "telemux.yaml";

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| GatewayError::BadConfig(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| GatewayError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Resolve the config path from `TELEMUX_CONFIG`, falling back to `telemux.yaml`.
pub fn config_path() -> String {
    std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}
