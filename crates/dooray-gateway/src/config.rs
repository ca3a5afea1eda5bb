//! Gateway configuration.
//!
//! Loaded from `gateway.toml`. Resolution order for the file: explicit
//! `--config` argument, the `DOORAY_GATEWAY_CONFIG` environment variable,
//! `./gateway.toml` if present, then built-in defaults. The API token may
//! always be supplied or overridden via `DOORAY_API_TOKEN`.

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};

use dooray_transfer::TransferConfig;
use serde::Deserialize;
use tracing::debug;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "DOORAY_GATEWAY_CONFIG";
/// Environment variable overriding the Dooray API token.
pub const API_TOKEN_ENV: &str = "DOORAY_API_TOKEN";

const DEFAULT_CONFIG_FILE: &str = "gateway.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("no Dooray API token configured; set `dooray.api_token` or {API_TOKEN_ENV}")]
    MissingToken,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    pub dooray: DoorayConfig,
    pub transfer: TransferSettings,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            dooray: DoorayConfig::default(),
            transfer: TransferSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DoorayConfig {
    pub base_url: String,
    pub api_token: String,
}

impl Default for DoorayConfig {
    fn default() -> Self {
        Self {
            base_url: dooray_api::DEFAULT_BASE_URL.to_string(),
            api_token: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransferSettings {
    /// Spill directory for large downloads; the system temp dir when unset.
    pub spool_dir: Option<PathBuf>,
    /// Files at or below this declared size stay in memory.
    pub memory_threshold_bytes: u64,
    /// Hard ceiling on one chunk response's encoded payload.
    pub max_encoded_response_bytes: usize,
    /// Sessions idle longer than this are reaped.
    pub idle_timeout_secs: u64,
    /// Interval between idle sweeps.
    pub sweep_interval_secs: u64,
}

impl Default for TransferSettings {
    fn default() -> Self {
        let defaults = TransferConfig::default();
        Self {
            spool_dir: None,
            memory_threshold_bytes: defaults.memory_threshold_bytes,
            max_encoded_response_bytes: defaults.max_encoded_response_bytes,
            idle_timeout_secs: 15 * 60,
            sweep_interval_secs: 60,
        }
    }
}

impl GatewayConfig {
    /// Resolve and load the configuration, applying environment overrides.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match resolve_path(explicit_path) {
            Some(path) => {
                debug!(path = %path.display(), "loading gateway config");
                let raw = std::fs::read_to_string(&path)?;
                toml::from_str(&raw)?
            }
            None => Self::default(),
        };
        if let Ok(token) = std::env::var(API_TOKEN_ENV)
            && !token.trim().is_empty()
        {
            config.dooray.api_token = token;
        }
        if config.dooray.api_token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        Ok(config)
    }

    /// Transfer-core view of this configuration.
    pub fn transfer_config(&self) -> TransferConfig {
        TransferConfig {
            spool_dir: self
                .transfer
                .spool_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            memory_threshold_bytes: self.transfer.memory_threshold_bytes,
            max_encoded_response_bytes: self.transfer.max_encoded_response_bytes,
        }
    }
}

fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(path));
    }
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    local.exists().then_some(local)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parses_a_full_config_file() {
        let toml_text = r#"
            bind_addr = "127.0.0.1:9001"

            [dooray]
            base_url = "https://example.dooray.com"
            api_token = "tenant:secret"

            [transfer]
            memory_threshold_bytes = 2048
            max_encoded_response_bytes = 100000
            idle_timeout_secs = 120
            sweep_interval_secs = 10
        "#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(toml_text.as_bytes()).unwrap();

        let config = GatewayConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.bind_addr.port(), 9001);
        assert_eq!(config.dooray.base_url, "https://example.dooray.com");
        assert_eq!(config.transfer.memory_threshold_bytes, 2048);
        assert_eq!(config.transfer_config().max_encoded_response_bytes, 100_000);
    }

    #[test]
    fn missing_token_is_rejected() {
        let toml_text = r#"
            [dooray]
            base_url = "https://example.dooray.com"
        "#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(toml_text.as_bytes()).unwrap();

        // Only meaningful when the token env override is absent; skip
        // otherwise rather than mutating process-global state.
        if std::env::var(API_TOKEN_ENV).is_err() {
            let err = GatewayConfig::load(Some(file.path())).unwrap_err();
            assert!(matches!(err, ConfigError::MissingToken));
        }
    }
}
