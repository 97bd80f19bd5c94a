//! Error types for dev server operations.

use std::net::SocketAddr;
use thiserror::Error;

/// The main error type for dev server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind the listening socket.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address we attempted to bind.
        addr: SocketAddr,
        /// Underlying bind error.
        #[source]
        source: std::io::Error,
    },

    /// No port in the scanned range could be bound.
    #[error("ports {start}-{end} are all in use")]
    NoAvailablePort {
        /// First port tried.
        start: u16,
        /// Last port tried.
        end: u16,
    },

    /// The serve task failed or could not be joined.
    #[error("server task failed: {0}")]
    Serve(String),

    /// Generic I/O errors (file access, socket inspection, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for dev server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
