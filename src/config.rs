//! Configuration management for the Wormchain client
//!
//! Loads configuration from TOML files with environment variable substitution.

use crate::tx::DEFAULT_GAS_LIMIT;

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

lazy_static! {
    static ref ENV_VAR_PATTERN: Regex =
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is valid");
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub client: ClientConfig,
    pub wallet: WalletConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub grpc_url: String,
    pub chain_id: String,
    pub bech32_prefix: String,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    #[serde(default)]
    pub memo: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub sign_mode: SignModeConfig,
    /// Accepted message type URLs; empty accepts any well-formed type URL
    #[serde(default)]
    pub allowed_message_types: Vec<String>,
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,
}

/// Sign mode used when installing signer info
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SignModeConfig {
    #[default]
    Direct,
    AminoJson,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// Name of the environment variable holding the hex encoded private key
    pub private_key_env: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 6060,
        }
    }
}

fn default_gas_limit() -> u64 {
    DEFAULT_GAS_LIMIT
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_health_check_interval_secs() -> u64 {
    60
}

impl Settings {
    /// Load settings from the file named by `WORMCHAIN_CONFIG`
    pub fn load() -> Result<Self> {
        let config_path = env::var("WORMCHAIN_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from a specific file
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::parse(&config_str)
    }

    /// Parse and validate settings from TOML text
    pub fn parse(config_str: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        let client = &self.client;

        if client.chain_id.trim().is_empty() {
            anyhow::bail!("client.chain_id must not be empty");
        }
        if client.bech32_prefix.trim().is_empty() {
            anyhow::bail!("client.bech32_prefix must not be empty");
        }
        if !(client.grpc_url.starts_with("http://") || client.grpc_url.starts_with("https://")) {
            anyhow::bail!(
                "client.grpc_url must use http:// or https://, got {}",
                client.grpc_url
            );
        }
        if client.gas_limit == 0 {
            anyhow::bail!("client.gas_limit must be greater than zero");
        }
        if client.request_timeout_secs == 0 {
            anyhow::bail!("client.request_timeout_secs must be greater than zero");
        }
        if self.wallet.private_key_env.trim().is_empty() {
            anyhow::bail!("wallet.private_key_env must name an environment variable");
        }
        if client.sign_mode != SignModeConfig::Direct {
            tracing::warn!(
                "Sign mode {:?} is not supported by the secp256k1 signer; submissions will fail",
                client.sign_mode
            );
        }

        Ok(())
    }
}

impl ClientConfig {
    /// Deadline applied to each remote call
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();

    for cap in ENV_VAR_PATTERN.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[client]
grpc_url = "http://localhost:9090"
chain_id = "wormchain"
bech32_prefix = "wormhole"

[wallet]
private_key_env = "WORMCHAIN_PRIVATE_KEY"
"#;

    #[test]
    fn test_env_var_substitution() {
        env::set_var("WORMCHAIN_TEST_VAR", "test_value");
        let input = "url = \"https://api.example.com/${WORMCHAIN_TEST_VAR}/endpoint\"";
        let result = substitute_env_vars(input);
        assert_eq!(result, "url = \"https://api.example.com/test_value/endpoint\"");
    }

    #[test]
    fn test_defaults_are_applied() {
        let settings = Settings::parse(SAMPLE).unwrap();
        assert_eq!(settings.client.gas_limit, DEFAULT_GAS_LIMIT);
        assert_eq!(settings.client.request_timeout(), Duration::from_secs(30));
        assert_eq!(settings.client.sign_mode, SignModeConfig::Direct);
        assert!(settings.client.allowed_message_types.is_empty());
        assert!(settings.client.memo.is_empty());
        assert!(settings.metrics.enabled);
        assert_eq!(settings.metrics.port, 6060);
    }

    #[test]
    fn test_sign_mode_parses_kebab_case() {
        let text = SAMPLE.replace(
            "bech32_prefix = \"wormhole\"",
            "bech32_prefix = \"wormhole\"\nsign_mode = \"amino-json\"",
        );
        let settings = Settings::parse(&text).unwrap();
        assert_eq!(settings.client.sign_mode, SignModeConfig::AminoJson);
    }

    #[test]
    fn test_rejects_invalid_grpc_url() {
        let text = SAMPLE.replace("http://localhost:9090", "localhost:9090");
        assert!(Settings::parse(&text).is_err());
    }

    #[test]
    fn test_rejects_zero_gas_limit() {
        let text = SAMPLE.replace(
            "bech32_prefix = \"wormhole\"",
            "bech32_prefix = \"wormhole\"\ngas_limit = 0",
        );
        assert!(Settings::parse(&text).is_err());
    }

    #[test]
    fn test_rejects_empty_chain_id() {
        let text = SAMPLE.replace("chain_id = \"wormchain\"", "chain_id = \"\"");
        assert!(Settings::parse(&text).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.client.chain_id, "wormchain");
        assert_eq!(settings.wallet.private_key_env, "WORMCHAIN_PRIVATE_KEY");
    }
}
