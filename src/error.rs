//! Error types for the bridge.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types surfaced by the codecs, the connection factory and the client
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed UUID or timestamp string
    #[error("{0}")]
    Format(String),

    /// Hex decoding of a UUID string failed
    #[error("error decoding UUID string: {0}")]
    Decode(String),

    /// Binary value is not tagged as a UUID
    #[error("unsupported binary subtype: {0}")]
    UnsupportedSubtype(u8),

    /// Binary UUID payload is not 16 bytes long
    #[error("invalid UUID binary length: expected 16 bytes, got {0}")]
    InvalidLength(usize),

    /// The OS entropy source could not be read
    #[error("random source unavailable: {0}")]
    RandomSource(String),

    /// The connection factory could not establish a session
    #[error("connection failed: {0}")]
    Connection(String),

    /// An operation that requires a match found none
    #[error("no document matched the filter")]
    NotFound,

    /// Any failure reported by the driver, message unchanged
    #[error(transparent)]
    Store(#[from] mongodb::error::Error),

    /// The client handle was used after `disconnect`
    #[error("client is disconnected")]
    Disconnected,

    /// A host argument had the wrong shape
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Name of the error kind as seen by scripts
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Format(_) => "FormatError",
            Error::Decode(_) => "DecodeError",
            Error::UnsupportedSubtype(_) => "UnsupportedSubtypeError",
            Error::InvalidLength(_) => "InvalidLengthError",
            Error::RandomSource(_) => "RandomSourceError",
            Error::Connection(_) => "ConnectionError",
            Error::NotFound => "NotFoundError",
            Error::Store(_) => "StoreError",
            Error::Disconnected => "DisconnectedError",
            Error::InvalidArgument(_) => "TypeError",
            Error::Config(_) => "ConfigError",
        }
    }
}

/// Error value handed back to the scripting host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{name}: {message}")]
pub struct ScriptError {
    /// Error kind, e.g. `FormatError`
    pub name: String,
    /// Human-readable message
    pub message: String,
}

impl From<Error> for ScriptError {
    fn from(err: Error) -> Self {
        Self {
            name: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}
