//! Configuration file
//!
//! ```json
//! { "data_dir": "/var/lib/schemadelta", "apps": ["video"], "log_level": "info" }
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::apps::KNOWN_APPS;
use crate::observability::Severity;

use super::errors::{CliError, CliResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Data directory (required)
    pub data_dir: String,

    /// Enabled app labels (optional, default ["video"])
    #[serde(default = "default_apps")]
    pub apps: Vec<String>,

    /// Minimum log severity (optional, default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_apps() -> Vec<String> {
    vec!["video".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config_error(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> CliResult<Self> {
        let config: Config = serde_json::from_str(content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.data_dir.trim().is_empty() {
            return Err(CliError::config_error("data_dir must not be empty"));
        }

        if self.apps.is_empty() {
            return Err(CliError::config_error("apps must name at least one app"));
        }

        let mut seen = BTreeSet::new();
        for app in &self.apps {
            if !KNOWN_APPS.contains(&app.as_str()) {
                return Err(CliError::config_error(format!(
                    "Unknown app '{}'. Known apps: {}",
                    app,
                    KNOWN_APPS.join(", ")
                )));
            }
            if !seen.insert(app) {
                return Err(CliError::config_error(format!("App '{}' listed twice", app)));
            }
        }

        self.severity()?;
        Ok(())
    }

    pub fn data_path(&self) -> &Path {
        Path::new(&self.data_dir)
    }

    pub fn severity(&self) -> CliResult<Severity> {
        self.log_level
            .parse()
            .map_err(|e: String| CliError::config_error(format!("Invalid log_level: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::errors::CliErrorCode;

    #[test]
    fn test_defaults() {
        let config = Config::parse(r#"{"data_dir": "/tmp/delta"}"#).unwrap();
        assert_eq!(config.apps, ["video"]);
        assert_eq!(config.severity().unwrap(), Severity::Info);
        assert_eq!(config.data_path(), Path::new("/tmp/delta"));
    }

    #[test]
    fn test_missing_data_dir() {
        let err = Config::parse(r#"{"apps": ["video"]}"#).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
    }

    #[test]
    fn test_unknown_app_rejected() {
        let err = Config::parse(r#"{"data_dir": "/tmp/d", "apps": ["music"]}"#).unwrap_err();
        assert!(err.message().contains("music"));
    }

    #[test]
    fn test_duplicate_app_rejected() {
        assert!(Config::parse(r#"{"data_dir": "/tmp/d", "apps": ["video", "video"]}"#).is_err());
    }

    #[test]
    fn test_bad_log_level_rejected() {
        assert!(Config::parse(r#"{"data_dir": "/tmp/d", "log_level": "loud"}"#).is_err());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Config::parse(r#"{"data_dir": "/tmp/d", "wal_sync_mode": "fsync"}"#).is_err());
    }
}
