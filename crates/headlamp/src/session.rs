//! The session orchestrator.
//!
//! `Session::launch` sequences server startup, browser launch, page
//! acquisition, and console wiring, then hands back a handle owning all
//! three resources. Shutdown is best-effort: every resource gets a close
//! attempt even when an earlier one fails.

use crate::browser::HeadlessBrowser;
use crate::console::{attach_error_listeners, ConsoleForwarder, ForwarderOptions};
use crate::error::Result;
use crate::options::{PageAcquisition, SessionOptions};
use crate::page::Page;
use crate::sink::{ConsoleSink, SessionSink, TermSink};
use chromiumoxide::page::Page as ChromePage;
use headlamp_server::{DevServer, StaticServer};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Settle delay between flushing console output and closing resources,
/// giving in-flight CDP events a chance to land.
const CLOSE_SETTLE_DELAY: Duration = Duration::from_millis(20);

/// Everything needed to wire a newly acquired page: the resolved sink, the
/// forwarding gates, and the callbacks. Reused by `new_page()` so secondary
/// pages behave like the primary one.
struct PageWiring {
    sink: Arc<dyn ConsoleSink>,
    browser_quiet: bool,
    silent: bool,
    print_page_errors: bool,
    forwarder_options: ForwarderOptions,
    origin: String,
}

impl PageWiring {
    /// Resolves the sink here, at the construction boundary. Deeper code
    /// only ever sees the injected `Arc<dyn ConsoleSink>`.
    fn from_options(options: &SessionOptions, origin: String) -> Self {
        let sink: Arc<dyn ConsoleSink> = options
            .sink
            .clone()
            .unwrap_or_else(|| Arc::new(TermSink::new()));

        Self {
            sink,
            browser_quiet: options.browser_quiet,
            silent: options.silent,
            print_page_errors: options.print_page_errors,
            forwarder_options: ForwarderOptions {
                transform_args: options.transform_args.clone(),
                failed_request_filter: options.failed_request_filter.clone(),
                console_filter: options.console_filter.clone(),
            },
            origin,
        }
    }

    async fn wire(&self, chrome_page: ChromePage) -> Result<Page> {
        let error_listeners = if self.print_page_errors {
            attach_error_listeners(&chrome_page, Arc::clone(&self.sink)).await?
        } else {
            Vec::new()
        };

        let forwarder = if self.browser_quiet {
            None
        } else {
            let sink = SessionSink::select(self.silent, Arc::clone(&self.sink));
            Some(
                ConsoleForwarder::attach(
                    &chrome_page,
                    self.forwarder_options.clone(),
                    sink,
                    self.origin.clone(),
                )
                .await?,
            )
        };

        Ok(Page::new(chrome_page, forwarder, error_listeners))
    }
}

/// A running browser session: dev server, browser process, and primary page.
///
/// The session exclusively owns all three for its lifetime; dropping it
/// without `close()` still reclaims the processes, but not gracefully.
pub struct Session {
    server: Box<dyn DevServer>,
    browser: HeadlessBrowser,
    page: Page,
    wiring: PageWiring,
}

impl Session {
    /// Launches a session with the built-in static dev server.
    ///
    /// Sequencing: server start, browser launch with the merged flag set,
    /// page acquisition per the configured policy, console wiring. Any
    /// launch failure propagates; nothing is retried.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot bind or the browser cannot
    /// start.
    pub async fn launch(options: SessionOptions) -> Result<Self> {
        let server = StaticServer::launch(options.server.clone()).await?;
        Self::launch_with_server(options, Box::new(server)).await
    }

    /// Launches a session against a caller-managed dev server.
    ///
    /// The session takes ownership and closes the server during shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the browser cannot start or wiring fails.
    pub async fn launch_with_server(
        options: SessionOptions,
        server: Box<dyn DevServer>,
    ) -> Result<Self> {
        let config = options.browser_config()?;
        let browser = HeadlessBrowser::launch(config).await?;

        let chrome_page = match options.page_acquisition {
            PageAcquisition::New => browser.new_chrome_page().await?,
            PageAcquisition::Existing => browser.first_chrome_page().await?,
        };

        let wiring = PageWiring::from_options(&options, server.base_url().to_string());
        let page = wiring.wire(chrome_page).await?;

        debug!("session ready at {}", server.base_url());

        Ok(Self {
            server,
            browser,
            page,
            wiring,
        })
    }

    /// The dev server serving the session's assets.
    #[must_use]
    pub fn server(&self) -> &dyn DevServer {
        self.server.as_ref()
    }

    /// The browser process handle.
    #[must_use]
    pub fn browser(&self) -> &HeadlessBrowser {
        &self.browser
    }

    /// The primary page.
    #[must_use]
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Creates another page wired exactly like the primary one.
    ///
    /// # Errors
    ///
    /// Returns an error if the browser is closed or wiring fails.
    pub async fn new_page(&self) -> Result<Page> {
        let chrome_page = self.browser.new_chrome_page().await?;
        self.wiring.wire(chrome_page).await
    }

    /// Waits until all console output captured so far has been emitted.
    pub async fn flush(&self) {
        self.page.flush().await;
    }

    /// Shuts the session down: flush, settle, then close page, browser, and
    /// server in that order. Each close attempt is isolated; a failure is
    /// logged and the sequence continues, so all three resources are always
    /// attempted.
    pub async fn close(self) {
        self.page.flush().await;
        tokio::time::sleep(CLOSE_SETTLE_DELAY).await;

        let Session {
            mut server,
            browser,
            page,
            wiring: _,
        } = self;

        run_close_sequence(page.close(), browser.close(), server.close()).await;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("server", &self.server.base_url())
            .field("page", &self.page)
            .finish_non_exhaustive()
    }
}

/// Awaits a close operation, absorbing its error so later resources still
/// get their close attempt.
async fn close_quietly<E: Display>(resource: &str, op: impl Future<Output = std::result::Result<(), E>>) {
    if let Err(err) = op.await {
        debug!("ignoring {resource} close failure: {err}");
    }
}

/// Closes page, browser, and server in order, isolating each attempt.
async fn run_close_sequence<E1, E2, E3>(
    page: impl Future<Output = std::result::Result<(), E1>>,
    browser: impl Future<Output = std::result::Result<(), E2>>,
    server: impl Future<Output = std::result::Result<(), E3>>,
) where
    E1: Display,
    E2: Display,
    E3: Display,
{
    close_quietly("page", page).await;
    close_quietly("browser", browser).await;
    close_quietly("server", server).await;
}
