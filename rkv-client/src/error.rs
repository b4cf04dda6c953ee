//! Error types for the client, pool, transport and configuration layers.
//!
//! Every variant that originates in the platform keeps the original error
//! as its `source`.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use rkv_proto::DecodeError;

/// Result type for the client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Failure on a single connection.
#[derive(Debug, Error)]
pub enum TransportError {
    // -------------------------------------------------------------------------
    // Establishment
    // -------------------------------------------------------------------------
    #[error("failed to resolve {addr}: {source}")]
    Resolve {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("{addr} resolved to no addresses")]
    NoAddress { addr: String },

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("connecting to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    // -------------------------------------------------------------------------
    // Session
    // -------------------------------------------------------------------------
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Decode(DecodeError),
}

impl From<DecodeError> for TransportError {
    fn from(err: DecodeError) -> Self {
        match err {
            // Socket failures while reading are session I/O errors, not
            // protocol errors.
            DecodeError::Io(err) => TransportError::Io(err),
            other => TransportError::Decode(other),
        }
    }
}

/// Failure to obtain or build pooled connections.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("connection pool exhausted ({capacity} connections in use)")]
    Exhausted { capacity: usize },

    #[error("connection pool is closed")]
    Closed,

    #[error("failed to open pooled connection {index}: {source}")]
    Connect {
        index: usize,
        #[source]
        source: TransportError,
    },
}

/// Errors surfaced by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    /// The server answered with a well-formed error reply.
    #[error("server error: {message}")]
    Server { message: String },

    /// The reply was well-formed but not the kind the call requires.
    #[error("unexpected response: expected {expected}, found {found}")]
    UnexpectedResponse {
        expected: &'static str,
        found: &'static str,
    },
}
