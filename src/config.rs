// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Application configuration management.
//!
//! Settings are persisted as TOML through `confy`. Every field has a serde
//! default so older or hand-edited files keep loading.

use std::time::Duration;

use clap::ValueEnum;
use linkwatch_core::{MonitorConfig, DEFAULT_HEALTH_PATH};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "linkwatch";
const CONFIG_NAME: &str = "config";

/// Default backend for local development
pub const DEFAULT_DEVELOPMENT_URL: &str = "http://localhost:3000";

/// Default backend for production deployments
pub const DEFAULT_PRODUCTION_URL: &str = "https://api.example.com";

/// Which backend the monitor points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    #[default]
    Development,
    Production,
}

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Selects between `development_url` and `production_url`
    #[serde(default)]
    pub mode: DeploymentMode,

    #[serde(default = "default_development_url")]
    pub development_url: String,

    #[serde(default = "default_production_url")]
    pub production_url: String,

    /// Path probed on the pull channel
    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Push channel address in host:port format (none = no push channel)
    #[serde(default)]
    pub push_address: Option<String>,

    /// Time between checks in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Pull probe timeout in milliseconds
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_development_url() -> String {
    DEFAULT_DEVELOPMENT_URL.to_string()
}

fn default_production_url() -> String {
    DEFAULT_PRODUCTION_URL.to_string()
}

fn default_health_path() -> String {
    DEFAULT_HEALTH_PATH.to_string()
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_probe_timeout_ms() -> u64 {
    3000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            mode: DeploymentMode::default(),
            development_url: default_development_url(),
            production_url: default_production_url(),
            health_path: default_health_path(),
            push_address: None,
            poll_interval_ms: default_poll_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating it with defaults on first run
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Base URL for the configured deployment mode
    #[must_use]
    pub fn base_url(&self) -> &str {
        match self.mode {
            DeploymentMode::Production => &self.production_url,
            DeploymentMode::Development => &self.development_url,
        }
    }

    /// Settings handed to the health monitor
    #[must_use]
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            base_url: self.base_url().to_string(),
            health_path: self.health_path.clone(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_follows_mode() {
        let mut config = AppConfig::default();
        assert_eq!(config.base_url(), DEFAULT_DEVELOPMENT_URL);

        config.mode = DeploymentMode::Production;
        assert_eq!(config.base_url(), DEFAULT_PRODUCTION_URL);
    }

    #[test]
    fn test_monitor_config_defaults() {
        let monitor = AppConfig::default().monitor_config();
        assert_eq!(monitor.poll_interval, Duration::from_millis(5000));
        assert_eq!(monitor.probe_timeout, Duration::from_millis(3000));
        assert_eq!(monitor.health_path, "/health");
        assert_eq!(monitor.base_url, DEFAULT_DEVELOPMENT_URL);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"mode": "production", "poll_interval_ms": 1000}"#).unwrap();
        assert_eq!(config.mode, DeploymentMode::Production);
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.probe_timeout_ms, 3000);
        assert_eq!(config.production_url, DEFAULT_PRODUCTION_URL);
        assert!(config.push_address.is_none());
    }
}
