//! Session configuration and browser launch option merging.
//!
//! Layering order: crate defaults, then the dev server defaults, then forced
//! dev overrides (caching off), then caller-supplied values — the caller
//! always wins. Launch flags are merged as an ordered de-duplicated set with
//! caller flags first.

use crate::console::{ConsoleFilterFn, FailedRequestFilterFn, TransformArgsFn};
use crate::error::{HarnessError, Result};
use crate::sink::ConsoleSink;
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::handler::viewport::Viewport;
use indexmap::IndexSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

pub use headlamp_server::ServerOptions;

/// Baseline Chrome flags for stable, quiet dev sessions.
///
/// Disables throttling and popups, ignores certificate errors on localhost,
/// fakes media devices, and turns off first-run chrome. Caller flags always
/// precede these in the merged sequence.
pub const DEFAULT_ARGS: &[&str] = &[
    "--js-flags=--expose-gc",
    "--enable-features=WebUIDarkMode",
    "--force-dark-mode",
    "--disable-default-apps",
    "--disable-device-discovery-notifications",
    "--disable-popup-blocking",
    "--disable-renderer-backgrounding",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-translate",
    "--no-default-browser-check",
    "--no-first-run",
    "--suppress-message-center-popups",
    "--ignore-certificate-errors",
    "--allow-insecure-localhost",
    "--use-fake-device-for-media-stream",
    "--use-fake-ui-for-media-stream",
    "--autoplay-policy=no-user-gesture-required",
];

/// Default viewport and window dimensions.
pub const DEFAULT_VIEWPORT: ViewportSize = ViewportSize {
    width: 1024,
    height: 600,
    device_scale_factor: 2.0,
};

/// Default window position (slightly off the top-left corner).
pub const DEFAULT_WINDOW_POSITION: (i32, i32) = (-50, 70);

/// Viewport dimensions applied to every page of the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSize {
    /// Viewport width in CSS pixels.
    pub width: u32,
    /// Viewport height in CSS pixels.
    pub height: u32,
    /// Device scale factor (2.0 for a hidpi rendering).
    pub device_scale_factor: f64,
}

/// How the session obtains its primary page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageAcquisition {
    /// Create a fresh page after launch.
    #[default]
    New,
    /// Take the first page the browser already opened.
    Existing,
}

/// Browser-launch overrides nested inside [`SessionOptions`].
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Explicit headless override. Wins over [`SessionOptions::headless`]
    /// when set.
    pub headless: Option<bool>,

    /// Caller-supplied Chrome flags, kept ahead of [`DEFAULT_ARGS`].
    pub args: Vec<String>,

    /// Viewport applied to pages; also drives the `--window-size` flag.
    pub viewport: ViewportSize,

    /// Window position flag value.
    pub window_position: (i32, i32),

    /// Chrome executable path (`None` = auto-detect).
    pub executable: Option<PathBuf>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: None,
            args: Vec::new(),
            viewport: DEFAULT_VIEWPORT,
            window_position: DEFAULT_WINDOW_POSITION,
            executable: None,
        }
    }
}

/// Configuration for a browser session.
///
/// All fields have working defaults; `SessionOptions::default()` launches a
/// headless browser against a static server rooted at the current directory.
#[derive(Clone)]
pub struct SessionOptions {
    /// Run the browser headless (default: true). See
    /// [`LaunchOptions::headless`] for the explicit override.
    pub headless: bool,

    /// Browser launch overrides.
    pub launch: LaunchOptions,

    /// Do not forward browser console output at all.
    pub browser_quiet: bool,

    /// Forward console output into a no-op sink (listeners still attach).
    pub silent: bool,

    /// Forward page crashes, uncaught exceptions, and failed requests to the
    /// sink's `error` method.
    pub print_page_errors: bool,

    /// Primary page acquisition policy.
    pub page_acquisition: PageAcquisition,

    /// Console sink override. `None` selects the terminal sink at session
    /// construction.
    pub sink: Option<Arc<dyn ConsoleSink>>,

    /// Transforms rendered console arguments before they are joined.
    pub transform_args: Option<TransformArgsFn>,

    /// Drops failed-request messages the callback rejects.
    pub failed_request_filter: Option<FailedRequestFilterFn>,

    /// Drops console messages the callback rejects.
    pub console_filter: Option<ConsoleFilterFn>,

    /// Dev server configuration. Caching is forced off by the server
    /// defaults; a caller-supplied value wins.
    pub server: ServerOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            headless: true,
            launch: LaunchOptions::default(),
            browser_quiet: false,
            silent: false,
            print_page_errors: false,
            page_acquisition: PageAcquisition::default(),
            sink: None,
            transform_args: None,
            failed_request_filter: None,
            console_filter: None,
            server: ServerOptions::default(),
        }
    }
}

impl SessionOptions {
    /// Creates options serving the given directory, otherwise defaults.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            server: ServerOptions::new(root),
            ..Self::default()
        }
    }

    /// Shows the browser window for debugging.
    #[must_use]
    pub fn visible(mut self) -> Self {
        self.headless = false;
        self
    }

    /// Silences browser console forwarding entirely.
    #[must_use]
    pub fn browser_quiet(mut self) -> Self {
        self.browser_quiet = true;
        self
    }

    /// Keeps the forwarding wiring but routes it into a no-op sink.
    #[must_use]
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Forwards page errors and failed requests to the sink.
    #[must_use]
    pub fn print_page_errors(mut self) -> Self {
        self.print_page_errors = true;
        self
    }

    /// Adds caller Chrome flags (kept ahead of the defaults).
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.launch.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the viewport (and window size) for the session.
    #[must_use]
    pub fn with_viewport(mut self, width: u32, height: u32, device_scale_factor: f64) -> Self {
        self.launch.viewport = ViewportSize {
            width,
            height,
            device_scale_factor,
        };
        self
    }

    /// Sets the page acquisition policy.
    #[must_use]
    pub fn with_page_acquisition(mut self, policy: PageAcquisition) -> Self {
        self.page_acquisition = policy;
        self
    }

    /// Injects a console sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ConsoleSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Installs a console-argument transform.
    #[must_use]
    pub fn with_transform_args(mut self, transform: TransformArgsFn) -> Self {
        self.transform_args = Some(transform);
        self
    }

    /// Installs a failed-request message filter.
    #[must_use]
    pub fn with_failed_request_filter(mut self, filter: FailedRequestFilterFn) -> Self {
        self.failed_request_filter = Some(filter);
        self
    }

    /// Installs a console message filter.
    #[must_use]
    pub fn with_console_filter(mut self, filter: ConsoleFilterFn) -> Self {
        self.console_filter = Some(filter);
        self
    }

    /// Replaces the dev server configuration wholesale.
    #[must_use]
    pub fn with_server(mut self, server: ServerOptions) -> Self {
        self.server = server;
        self
    }

    /// Sets the Chrome executable path.
    #[must_use]
    pub fn with_chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.launch.executable = Some(path.into());
        self
    }

    /// Resolves headless mode: the explicit launch override wins, else the
    /// top-level flag.
    #[must_use]
    pub fn resolved_headless(&self) -> bool {
        self.launch.headless.unwrap_or(self.headless)
    }

    /// Computes the final launch-flag sequence: caller flags, then window
    /// geometry, then [`DEFAULT_ARGS`], de-duplicated preserving first
    /// occurrence.
    #[must_use]
    pub fn resolved_args(&self) -> Vec<String> {
        let viewport = self.launch.viewport;
        let (x, y) = self.launch.window_position;

        let mut merged: IndexSet<String> = self.launch.args.iter().cloned().collect();
        merged.insert(format!("--window-size={},{}", viewport.width, viewport.height));
        merged.insert(format!("--window-position={x},{y}"));
        for flag in DEFAULT_ARGS {
            merged.insert((*flag).to_string());
        }
        merged.into_iter().collect()
    }

    /// Converts the resolved options into a chromiumoxide `BrowserConfig`.
    ///
    /// Each session gets a unique user data directory so parallel sessions
    /// do not trip over Chrome's ProcessSingleton lock.
    ///
    /// # Errors
    ///
    /// Returns `LaunchFailed` if the configuration is rejected by the
    /// builder.
    pub fn browser_config(&self) -> Result<BrowserConfig> {
        let mut config = BrowserConfig::builder();

        if !self.resolved_headless() {
            config = config.with_head();
        }

        let viewport = self.launch.viewport;
        config = config.viewport(Viewport {
            width: viewport.width,
            height: viewport.height,
            device_scale_factor: Some(viewport.device_scale_factor),
            ..Viewport::default()
        });

        let user_data_dir = std::env::temp_dir().join(format!("headlamp-{}", uuid::Uuid::new_v4()));
        config = config.arg(format!("--user-data-dir={}", user_data_dir.display()));

        for arg in self.resolved_args() {
            config = config.arg(arg);
        }

        if let Some(path) = &self.launch.executable {
            config = config.chrome_executable(path);
        }

        config.build().map_err(|e| HarnessError::LaunchFailed {
            reason: format!("invalid browser configuration: {e}"),
            source: None,
        })
    }
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("headless", &self.headless)
            .field("launch", &self.launch)
            .field("browser_quiet", &self.browser_quiet)
            .field("silent", &self.silent)
            .field("print_page_errors", &self.print_page_errors)
            .field("page_acquisition", &self.page_acquisition)
            .field("sink", &self.sink.as_ref().map(|_| "<custom>"))
            .field("server", &self.server)
            .finish_non_exhaustive()
    }
}
