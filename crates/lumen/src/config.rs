//! Configuration management for the Lumen server.
//!
//! The application configuration covers the host process only. Module options
//! live in a separate file that is synchronized through
//! [`lumen_core::ConfigSynchronizer`].

use lumen_core::PlatformKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration settings
    pub server: ServerSettings,
    /// Logging configuration settings
    pub logging: LoggingSettings,
}

/// Host process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Platform kind modules are enabled for
    #[serde(default = "default_platform")]
    pub platform: PlatformKind,
    /// Path of the module configuration file
    #[serde(default = "default_modules_config")]
    pub modules_config: String,
    /// Whether module options are written back on shutdown
    #[serde(default = "default_save_on_shutdown")]
    pub save_on_shutdown: bool,
}

fn default_platform() -> PlatformKind {
    PlatformKind::Server
}

fn default_modules_config() -> String {
    "modules.toml".to_string()
}

fn default_save_on_shutdown() -> bool {
    true
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                platform: default_platform(),
                modules_config: default_modules_config(),
                save_on_shutdown: default_save_on_shutdown(),
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the
    /// specified path and returns the default configuration.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    pub async fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    pub fn modules_config_path(&self) -> PathBuf {
        PathBuf::from(&self.server.modules_config)
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.modules_config.trim().is_empty() {
            return Err("Module configuration path cannot be empty".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use tokio::fs;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.server.platform, PlatformKind::Server);
        assert_eq!(config.server.modules_config, "modules.toml");
        assert!(config.server.save_on_shutdown);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
    }

    #[test]
    fn test_validate_rejects_bad_level() {
        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_modules_path() {
        let mut config = AppConfig::default();
        config.server.modules_config = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_server_fields_use_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
[server]

[logging]
level = "debug"
json_format = true
"#,
        )
        .unwrap();
        assert_eq!(config.server.platform, PlatformKind::Server);
        assert_eq!(config.server.modules_config, "modules.toml");
        assert_eq!(config.logging.level, "debug");
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let temp_file = NamedTempFile::new().unwrap();
        let content = r#"
[server]
platform = "proxy"
modules_config = "custom-modules.toml"
save_on_shutdown = false

[logging]
level = "warn"
json_format = false
"#;
        fs::write(temp_file.path(), content).await.unwrap();

        let config = AppConfig::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.server.platform, PlatformKind::Proxy);
        assert_eq!(config.modules_config_path(), PathBuf::from("custom-modules.toml"));
        assert!(!config.server.save_on_shutdown);
        assert_eq!(config.logging.level, "warn");
    }

    #[tokio::test]
    async fn test_missing_file_creates_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(config.logging.level, "info");

        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.server.modules_config, config.server.modules_config);
    }
}
