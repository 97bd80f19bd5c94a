//! Browser process lifecycle.
//!
//! Wraps chromiumoxide's `Browser`, spawning the CDP handler task and
//! exposing the two page acquisition policies the session supports. Launch
//! failures propagate; there is no retry.

use crate::error::{HarnessError, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page as ChromePage;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// A managed browser instance.
///
/// Owned exclusively by its session. Prefer explicit `close()`; if the
/// browser is dropped unclosed, chromiumoxide's Drop kills the Chrome
/// process forcefully.
pub struct HeadlessBrowser {
    inner: Arc<Mutex<Option<Browser>>>,
}

impl HeadlessBrowser {
    /// Launches a browser process and starts driving its CDP handler.
    ///
    /// # Errors
    ///
    /// Returns `LaunchFailed` if Chrome is not installed, not executable,
    /// or fails to start.
    pub async fn launch(config: BrowserConfig) -> Result<Self> {
        let (browser, mut handler) =
            Browser::launch(config)
                .await
                .map_err(|e| HarnessError::LaunchFailed {
                    reason: "failed to launch Chrome process".to_string(),
                    source: Some(Box::new(e)),
                })?;

        // chromiumoxide requires the handler to be polled for any CDP
        // traffic to move
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("browser handler error: {e}");
                }
            }
        });

        debug!("browser launched");

        Ok(Self {
            inner: Arc::new(Mutex::new(Some(browser))),
        })
    }

    /// Creates a new blank page (tab).
    ///
    /// # Errors
    ///
    /// Returns `AlreadyClosed` if the browser has been closed.
    pub(crate) async fn new_chrome_page(&self) -> Result<ChromePage> {
        let guard = self.inner.lock().await;
        let browser = guard.as_ref().ok_or(HarnessError::AlreadyClosed)?;

        browser
            .new_page("about:blank")
            .await
            .map_err(|e| HarnessError::ConnectionFailed(e.to_string()))
    }

    /// Takes the first page the browser already has open, creating one only
    /// if the list is empty.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyClosed` if the browser has been closed.
    pub(crate) async fn first_chrome_page(&self) -> Result<ChromePage> {
        let guard = self.inner.lock().await;
        let browser = guard.as_ref().ok_or(HarnessError::AlreadyClosed)?;

        let mut pages = browser
            .pages()
            .await
            .map_err(|e| HarnessError::ConnectionFailed(e.to_string()))?;

        if pages.is_empty() {
            return browser
                .new_page("about:blank")
                .await
                .map_err(|e| HarnessError::ConnectionFailed(e.to_string()));
        }
        Ok(pages.remove(0))
    }

    /// Closes the browser and kills the Chrome process.
    ///
    /// # Errors
    ///
    /// Returns an error if the browser fails to close gracefully.
    pub async fn close(&self) -> Result<()> {
        let mut guard = self.inner.lock().await;

        if let Some(mut browser) = guard.take() {
            debug!("closing browser");
            browser
                .close()
                .await
                .map_err(|e| HarnessError::ConnectionFailed(e.to_string()))?;
        }

        Ok(())
    }

    /// Returns true if the browser has been closed.
    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.is_none()
    }
}

impl Drop for HeadlessBrowser {
    fn drop(&mut self) {
        // Close was skipped; chromiumoxide's Browser Drop will kill the
        // process, so nothing leaks, but the shutdown is not graceful.
        if let Ok(guard) = self.inner.try_lock() {
            if guard.is_some() {
                warn!("HeadlessBrowser dropped without close(), forcing shutdown");
            }
        }
    }
}

impl std::fmt::Debug for HeadlessBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessBrowser").finish_non_exhaustive()
    }
}
