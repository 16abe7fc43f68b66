//! Connection factory
//!
//! Builds the runtime a client blocks on and opens one driver session from a
//! connection string.

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use mongodb::{bson::doc, options::ClientOptions};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

/// Runtime each client drives the async driver with
pub(crate) fn build_runtime(config: &ClientConfig) -> Result<Runtime> {
    Builder::new_multi_thread()
        .worker_threads(config.worker_threads.max(1))
        .thread_name("mongo-bridge")
        .enable_all()
        .build()
        .map_err(|e| Error::Connection(format!("failed to start client runtime: {}", e)))
}

/// Open a session for `uri`
///
/// The URI is handed to the driver unmodified. With `verify_connection` the
/// call only returns once the server answered a ping.
pub(crate) async fn open(uri: &str, config: &ClientConfig) -> Result<mongodb::Client> {
    let mut client_options = ClientOptions::parse(uri)
        .await
        .map_err(|e| Error::Connection(e.to_string()))?;

    if let Some(ref app_name) = config.app_name {
        client_options.app_name = Some(app_name.clone());
    }
    if let Some(timeout) = config.connect_timeout() {
        client_options.connect_timeout = Some(timeout);
    }
    if let Some(timeout) = config.server_selection_timeout() {
        client_options.server_selection_timeout = Some(timeout);
    }

    let hosts = client_options
        .hosts
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>()
        .join(",");

    let client =
        mongodb::Client::with_options(client_options).map_err(|e| Error::Connection(e.to_string()))?;

    if config.verify_connection {
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        debug!(hosts = %hosts, "Ping succeeded");
    }

    info!(hosts = %hosts, "Created new client");
    Ok(client)
}
