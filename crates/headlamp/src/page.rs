//! Page wrapper with navigation helpers and console wiring.

use crate::console::ConsoleForwarder;
use crate::error::{HarnessError, Result};
use chromiumoxide::page::Page as ChromePage;
use headlamp_server::DevServer;
use tokio::task::JoinHandle;
use tracing::debug;

/// A browser page (tab) owned by a session.
///
/// Wraps `chromiumoxide::Page` and carries the console forwarder and error
/// listeners wired at acquisition time. Navigation waits for the load to
/// complete before returning.
pub struct Page {
    inner: ChromePage,
    forwarder: Option<ConsoleForwarder>,
    _error_listeners: Vec<JoinHandle<()>>,
}

impl Page {
    pub(crate) fn new(
        inner: ChromePage,
        forwarder: Option<ConsoleForwarder>,
        error_listeners: Vec<JoinHandle<()>>,
    ) -> Self {
        Self {
            inner,
            forwarder,
            _error_listeners: error_listeners,
        }
    }

    /// Navigates to an absolute URL and waits for the navigation to finish.
    ///
    /// # Errors
    ///
    /// Returns `NavigationFailed` if the page fails to load.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.inner
            .goto(url)
            .await
            .map_err(|e| HarnessError::NavigationFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        self.inner
            .wait_for_navigation()
            .await
            .map_err(|e| HarnessError::NavigationFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        debug!("navigated to {url}");
        Ok(())
    }

    /// Navigates to a server-relative path, health-checking the server
    /// first to fail fast when it is down.
    ///
    /// # Errors
    ///
    /// Returns an error if the health check or navigation fails.
    pub async fn navigate_to(&self, server: &dyn DevServer, path: &str) -> Result<()> {
        server.health_check().await.map_err(HarnessError::Server)?;
        self.navigate(&server.url(path)).await
    }

    /// Executes JavaScript in the page context and deserializes the result.
    ///
    /// # Errors
    ///
    /// Returns `ScriptFailed` if execution fails or the result cannot be
    /// deserialized.
    pub async fn evaluate<T>(&self, script: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let result = self
            .inner
            .evaluate(script)
            .await
            .map_err(|e| HarnessError::ScriptFailed(e.to_string()))?;

        result
            .into_value()
            .map_err(|e| HarnessError::ScriptFailed(e.to_string()))
    }

    /// Returns the current page URL.
    ///
    /// # Errors
    ///
    /// Returns `ScriptFailed` if the page cannot be queried.
    pub async fn url(&self) -> Result<String> {
        self.evaluate("window.location.href").await
    }

    /// Returns the page title.
    ///
    /// # Errors
    ///
    /// Returns `ScriptFailed` if the page cannot be queried.
    pub async fn title(&self) -> Result<String> {
        self.evaluate("document.title").await
    }

    /// Waits until every console message captured so far has been emitted.
    ///
    /// No-op when the session was launched `browser_quiet`.
    pub async fn flush(&self) {
        if let Some(forwarder) = &self.forwarder {
            forwarder.flush().await;
        }
    }

    /// Closes the page. The forwarder's listener tasks end with the page's
    /// event streams.
    ///
    /// # Errors
    ///
    /// Returns an error if the close command fails.
    pub async fn close(self) -> Result<()> {
        self.inner.close().await.map_err(HarnessError::Cdp)
    }

    /// Access to the underlying chromiumoxide page for operations this
    /// wrapper does not expose.
    #[must_use]
    pub fn chrome_page(&self) -> &ChromePage {
        &self.inner
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("forwarding", &self.forwarder.is_some())
            .finish_non_exhaustive()
    }
}
