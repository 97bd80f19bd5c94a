//! Dev server configuration.

use crate::error::{Result, ServerError};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default port requested by [`ServerOptions::default`].
pub const DEFAULT_PORT: u16 = 3000;

/// How many ports above the requested one are tried before giving up.
const PORT_SCAN_RANGE: u16 = 10;

/// Configuration for a [`StaticServer`](crate::StaticServer).
///
/// Defaults are tuned for development: caching is off so the browser always
/// sees the latest build output, and unknown paths fall back to `index.html`
/// so client-side routers keep working after a reload.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Requested port. `0` asks the OS for any free port; otherwise the next
    /// ten ports are scanned when the requested one is busy.
    pub port: u16,

    /// Directory served as the site root.
    pub root: PathBuf,

    /// Allow browser caching of served files. Off by default.
    pub cache: bool,

    /// Serve `index.html` for unknown extension-less paths.
    pub spa: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            root: PathBuf::from("."),
            cache: false,
            spa: true,
        }
    }
}

impl ServerOptions {
    /// Creates options serving the given directory with defaults.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Sets the requested port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Re-enables browser caching of served files.
    #[must_use]
    pub fn with_cache(mut self) -> Self {
        self.cache = true;
        self
    }

    /// Disables the SPA index fallback.
    #[must_use]
    pub fn without_spa_fallback(mut self) -> Self {
        self.spa = false;
        self
    }

    /// Finds a bindable loopback address for the requested port.
    ///
    /// Tries the requested port first, then incrementally searches the next
    /// ten ports. A requested port of `0` delegates the choice to the OS.
    ///
    /// # Errors
    ///
    /// Returns `NoAvailablePort` if the whole range is busy.
    pub fn resolve_addr(&self) -> Result<SocketAddr> {
        use std::net::TcpListener;

        if self.port == 0 {
            return Ok(SocketAddr::from(([127, 0, 0, 1], 0)));
        }

        let addr = SocketAddr::from(([127, 0, 0, 1], self.port));
        if TcpListener::bind(addr).is_ok() {
            return Ok(addr);
        }

        for offset in 1..=PORT_SCAN_RANGE {
            let port = self.port.saturating_add(offset);
            let addr = SocketAddr::from(([127, 0, 0, 1], port));
            if TcpListener::bind(addr).is_ok() {
                tracing::warn!("port {} is busy, using port {} instead", self.port, port);
                return Ok(addr);
            }
        }

        Err(ServerError::NoAvailablePort {
            start: self.port,
            end: self.port.saturating_add(PORT_SCAN_RANGE),
        })
    }
}
