//! Bridge configuration
//!
//! Defaults, an optional config file and `MONGO_BRIDGE__*` environment
//! variables are merged by [`ConfigLoader`].

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{BridgeConfig, ClientConfig, LogFormat, LoggingConfig, ModuleConfig};
