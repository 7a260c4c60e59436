//! Application configuration
//!
//! Configuration loaded from .gh-pr-batch.toml file.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application configuration loaded from .gh-pr-batch.toml
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Body of the approving review
    #[serde(default = "default_approval_message")]
    pub approval_message: String,

    /// Commit message used for squash merges
    #[serde(default = "default_merge_message")]
    pub merge_message: String,

    /// Pause between successive approve/merge calls, in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Skip PRs with a failed CI run when merging
    #[serde(default = "default_check_passing_checks")]
    pub check_passing_checks: bool,

    /// GitHub Enterprise host (None = github.com)
    #[serde(default)]
    pub host: Option<String>,
}

fn default_approval_message() -> String {
    ":rocket: thanks for your contribution".to_string()
}

fn default_merge_message() -> String {
    "Automatic merge".to_string()
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_check_passing_checks() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            approval_message: default_approval_message(),
            merge_message: default_merge_message(),
            delay_ms: default_delay_ms(),
            check_passing_checks: default_check_passing_checks(),
            host: None,
        }
    }
}

impl AppConfig {
    /// Load config from CWD first, then home directory, or use defaults
    pub fn load() -> Self {
        match crate::load_config_file() {
            Some(content) => Self::from_toml_or_default(&content),
            None => {
                log::debug!("Using default app config");
                Self::default()
            }
        }
    }

    /// Parse config content, falling back to defaults on invalid TOML
    pub fn from_toml_or_default(content: &str) -> Self {
        match toml::from_str(content) {
            Ok(config) => {
                log::info!("Loaded app config from file");
                config
            }
            Err(e) => {
                log::warn!("Failed to parse config file: {}", e);
                Self::default()
            }
        }
    }

    /// Inter-action delay as a duration
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(!config.approval_message.is_empty());
        assert!(!config.merge_message.is_empty());
        assert_eq!(config.delay(), Duration::from_secs(1));
        assert!(config.check_passing_checks);
        assert!(config.host.is_none());
    }

    #[test]
    fn test_config_deserialize() {
        let toml = r#"
            approval_message = "LGTM!"
            delay_ms = 250
            host = "ghe.example.com"
        "#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.approval_message, "LGTM!");
        assert_eq!(config.delay(), Duration::from_millis(250));
        assert_eq!(config.host.as_deref(), Some("ghe.example.com"));
        // merge_message should use default
        assert_eq!(config.merge_message, "Automatic merge");
    }

    #[test]
    fn test_config_deserialize_partial() {
        let toml = r#"
            check_passing_checks = false
        "#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert!(!config.check_passing_checks);
        assert_eq!(
            config.approval_message,
            ":rocket: thanks for your contribution"
        );
        assert_eq!(config.delay_ms, 1000);
    }

    #[test]
    fn test_invalid_toml_falls_back_to_defaults() {
        let config = AppConfig::from_toml_or_default("delay_ms = \"soon\"");
        assert_eq!(config, AppConfig::default());
    }
}
