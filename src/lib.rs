//! # mongo-bridge
//!
//! Synchronous MongoDB client wrapper for load-test scripting hosts.
//!
//! Scripts import the [`Mongo`] module, create a [`Client`] with `newClient`
//! and issue blocking CRUD, query and aggregation calls against it. The
//! [`codec`] module converts UUIDs and ISO dates, which scripts cannot
//! express natively, to and from the store's binary and datetime types.

pub mod client;
pub mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod host;
pub mod logging;
pub mod module;

pub use client::{Client, UpsertModel};
pub use document::{Binary, Document, Value, UUID_SUBTYPE};
pub use error::{Error, Result, ScriptError};
pub use host::{Arguments, Exported, HostObject, ModuleRegistry};
pub use module::{register, Mongo};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::Format("invalid UUID format: x".to_string());
        assert!(err.to_string().contains("x"));
    }
}
