use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Module name the bridge registers under by default
pub const DEFAULT_MODULE_NAME: &str = "k6/x/mongo";

/// Main bridge configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Host registration settings
    pub module: ModuleConfig,

    /// Settings applied to every client created by the module
    pub client: ClientConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// Validate the merged configuration
    pub fn validate(&self) -> Result<()> {
        if self.module.name.trim().is_empty() {
            return Err(Error::Config("module name cannot be empty".to_string()));
        }
        if self.client.worker_threads == 0 {
            return Err(Error::Config(
                "client.worker_threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Host registration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Name scripts import the module by
    pub name: String,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_MODULE_NAME.to_string(),
        }
    }
}

/// Client session settings
///
/// Timeouts left unset fall back to whatever the connection string or the
/// driver defaults say.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Application name reported to the server
    pub app_name: Option<String>,

    /// Connect timeout override in milliseconds
    pub connect_timeout_ms: Option<u64>,

    /// Server selection timeout override in milliseconds
    pub server_selection_timeout_ms: Option<u64>,

    /// Ping the server before handing out a client
    pub verify_connection: bool,

    /// Worker threads of the runtime each client drives the driver with
    pub worker_threads: usize,
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn server_selection_timeout(&self) -> Option<Duration> {
        self.server_selection_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            app_name: Some("mongo-bridge".to_string()),
            connect_timeout_ms: None,
            server_selection_timeout_ms: None,
            verify_connection: true,
            worker_threads: 1,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,

    /// Log format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Human,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Human,
}
