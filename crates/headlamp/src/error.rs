//! Error types for browser session operations.
//!
//! Launch failures are fatal and propagate to the caller; close failures are
//! absorbed per-resource during shutdown so the remaining resources still get
//! a close attempt.

use thiserror::Error;

/// The main error type for all session operations.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Failed to launch the browser process.
    ///
    /// Typically Chrome/Chromium is not installed, not executable, or the
    /// launch configuration is invalid.
    #[error("failed to launch browser: {reason}")]
    LaunchFailed {
        /// Human-readable reason for the launch failure.
        reason: String,
        /// Optional underlying error that caused the failure.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Failed to establish or use the Chrome DevTools Protocol connection.
    #[error("CDP connection failed: {0}")]
    ConnectionFailed(String),

    /// Navigation to a URL failed.
    #[error("navigation to '{url}' failed: {reason}")]
    NavigationFailed {
        /// The URL that failed to load.
        url: String,
        /// Reason for the navigation failure.
        reason: String,
    },

    /// JavaScript execution in the page context failed.
    #[error("JavaScript execution failed: {0}")]
    ScriptFailed(String),

    /// An operation was attempted on a closed browser instance.
    #[error("browser instance is already closed")]
    AlreadyClosed,

    /// The dev server failed to start or stop.
    #[error("dev server error: {0}")]
    Server(#[from] headlamp_server::ServerError),

    /// Wraps errors from the chromiumoxide library.
    #[error("chromiumoxide error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    /// Generic I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for session operations.
pub type Result<T> = std::result::Result<T, HarnessError>;
