//! Error types for sondebridge.
//!
//! This module defines all error types used throughout the sondebridge crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for sondebridge operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Identifier Cache Errors ===
    /// Failed to read the identifier state file.
    #[error("failed to read identifier state at {path}: {source}")]
    CacheRead {
        /// Path to the state file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the identifier state file.
    #[error("failed to write identifier state at {path}: {source}")]
    CacheWrite {
        /// Path to the state file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The identifier namespace has no free slot left.
    #[error("identifier namespace exhausted (capacity {capacity})")]
    IdentifierExhausted {
        /// Configured capacity.
        capacity: usize,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Network Errors ===
    /// Failed to bind the inbound UDP socket.
    #[error("failed to bind UDP listener on {addr}: {source}")]
    ListenerBind {
        /// Address we tried to bind.
        addr: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to connect to the BaseStation sink.
    #[error("failed to connect to sink at {addr}: {message}")]
    SinkConnect {
        /// Address of the sink.
        addr: String,
        /// Description of what went wrong.
        message: String,
    },

    /// Writing a line to the sink failed.
    #[error("failed to write to sink at {addr}: {source}")]
    SinkWrite {
        /// Address of the sink.
        addr: SocketAddr,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The sink has no open connection.
    #[error("sink is not connected")]
    SinkDisconnected,

    // === Formatting Errors ===
    /// A numeric field could not be rendered into a BaseStation message.
    #[error("cannot format field '{field}': {message}")]
    Format {
        /// Name of the offending field.
        field: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An operation timed out.
    #[error("operation timed out: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
    },

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for sondebridge operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a formatting error for the named field.
    #[must_use]
    pub fn format(field: &'static str, message: impl Into<String>) -> Self {
        Self::Format {
            field,
            message: message.into(),
        }
    }

    /// Create a sink connection error.
    #[must_use]
    pub fn sink_connect(addr: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkConnect {
            addr: addr.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error.
    #[must_use]
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Check if this error is a sink failure that a reconnect may cure.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::SinkWrite { .. } | Self::SinkDisconnected | Self::Timeout { .. }
        )
    }

    /// Check if this error is a formatting problem with a single record.
    #[must_use]
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::Format { .. })
    }
}
