//! CLI configuration file support
//!
//! Loads configuration from ~/.config/ragsheet/config.toml

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use ragsheet_client::ClientConfig;
use ragsheet_client::health::DEFAULT_POLL_INTERVAL;
use serde::{Deserialize, Serialize};

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Server connection settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Health polling settings
    #[serde(default)]
    pub health: HealthConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the ragsheet server
    pub base_url: Option<String>,
    /// Model name sent with chat requests
    pub model: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Per-request timeout for non-streaming calls
    pub timeout_secs: Option<u64>,
    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthConfig {
    pub poll_interval_secs: Option<u64>,
}

impl CliConfig {
    /// Load configuration from default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring invalid config file");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Get the default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ragsheet").join("config.toml"))
    }

    /// Client settings with the command-line base URL taking precedence
    pub fn client_config(&self, base_url_override: Option<&str>) -> ClientConfig {
        let mut config = match base_url_override.or(self.server.base_url.as_deref()) {
            Some(base_url) => ClientConfig::new(base_url),
            None => ClientConfig::default(),
        };
        if let Some(model) = &self.server.model {
            config = config.with_model(model.clone());
        }
        if let Some(temperature) = self.server.temperature {
            config = config.with_temperature(temperature);
        }
        if let Some(secs) = self.server.timeout_secs {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }
        for (name, value) in &self.server.headers {
            config = config.with_header(name.clone(), value.clone());
        }
        config
    }

    pub fn poll_interval(&self) -> Duration {
        self.health
            .poll_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL)
    }
}
