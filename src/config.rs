//! Engine configuration
//!
//! Defaults are usable as-is; a TOML file can override any field.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the smart-subtitles engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of the fusion service.
    pub fusion_base_url: String,

    /// Endpoint path for the fuse call.
    pub fusion_endpoint: String,

    /// API key passed as a query parameter.
    pub fusion_api_key: String,

    /// Timeout for the fuse call, in seconds. Translation can be slow,
    /// so this is minutes-scale rather than the usual request timeout.
    pub fusion_timeout_secs: u64,

    /// Timeout for the health probe, in seconds.
    pub health_timeout_secs: u64,

    /// Retries for the settings round trip (not the fusion call).
    pub settings_retries: u32,

    /// Linear backoff base between settings retries, in milliseconds.
    pub settings_backoff_ms: u64,

    /// Delay before showing the loading placeholder, in milliseconds.
    /// Avoids flashing it during normal track-discovery churn.
    pub loading_delay_ms: u64,

    /// Origins accepted on the page messaging channel.
    pub allowed_origins: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fusion_base_url: "https://smartsub-api-production.up.railway.app".to_string(),
            fusion_endpoint: "/fuse-subtitles".to_string(),
            fusion_api_key: String::new(),
            fusion_timeout_secs: 240,
            health_timeout_secs: 5,
            settings_retries: 2,
            settings_backoff_ms: 250,
            loading_delay_ms: 400,
            allowed_origins: vec!["https://www.netflix.com".to_string()],
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn fusion_timeout(&self) -> Duration {
        Duration::from_secs(self.fusion_timeout_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    pub fn settings_backoff(&self) -> Duration {
        Duration::from_millis(self.settings_backoff_ms)
    }

    pub fn loading_delay(&self) -> Duration {
        Duration::from_millis(self.loading_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.fusion_endpoint, "/fuse-subtitles");
        assert_eq!(config.fusion_timeout(), Duration::from_secs(240));
        assert_eq!(config.settings_retries, 2);
        assert!(!config.allowed_origins.is_empty());
    }

    #[test]
    fn test_from_file_partial_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "fusion_api_key = \"test-key\"\nloading_delay_ms = 10"
        )
        .unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.fusion_api_key, "test-key");
        assert_eq!(config.loading_delay(), Duration::from_millis(10));
        // Untouched fields keep their defaults
        assert_eq!(config.fusion_endpoint, "/fuse-subtitles");
    }

    #[test]
    fn test_from_file_missing() {
        assert!(EngineConfig::from_file("/nonexistent/engine.toml").is_err());
    }
}
