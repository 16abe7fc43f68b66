use super::types::BridgeConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File};

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    config_file: Option<String>,
    load_env: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            config_file: None,
            load_env: false,
        }
    }

    /// Load configuration from file
    pub fn load_from_file(mut self, path: Option<&str>) -> Self {
        self.config_file = path.map(String::from);
        self
    }

    /// Load configuration from `MONGO_BRIDGE__SECTION__KEY` variables
    pub fn load_from_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Result<BridgeConfig> {
        let mut builder =
            Config::builder().add_source(Config::try_from(&BridgeConfig::default())?);

        if let Some(config_path) = &self.config_file {
            // An explicitly named file must exist
            builder = builder.add_source(File::with_name(config_path).required(true));
        } else {
            builder = builder
                .add_source(File::with_name("mongo-bridge").required(false))
                .add_source(File::with_name("config/mongo-bridge").required(false));
        }

        if self.load_env {
            builder = builder.add_source(
                Environment::with_prefix("MONGO_BRIDGE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config: BridgeConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ConfigLoader::new().build().unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.module.name, "k6/x/mongo");
        assert!(config.client.verify_connection);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[module]
name = "x/docs"

[client]
server_selection_timeout_ms = 2500
worker_threads = 2

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = ConfigLoader::new()
            .load_from_file(Some(&path))
            .build()
            .unwrap();

        assert_eq!(config.module.name, "x/docs");
        assert_eq!(config.client.worker_threads, 2);
        assert_eq!(
            config.client.server_selection_timeout(),
            Some(std::time::Duration::from_millis(2500))
        );
        assert!(config.client.verify_connection);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let result = ConfigLoader::new()
            .load_from_file(Some("/nonexistent/mongo-bridge.toml"))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rejects_zero_workers() {
        let mut config = BridgeConfig::default();
        config.client.worker_threads = 0;
        assert!(config.validate().is_err());
    }
}
