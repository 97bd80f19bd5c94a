//! # headlamp
//!
//! Launches a headless Chrome instance wired to a local dev server, with a
//! baseline flag set, console-output forwarding, and lifecycle helpers.
//!
//! This is a thin orchestration layer over two collaborators: chromiumoxide
//! drives the browser over CDP, and [`headlamp-server`] serves the bundled
//! assets. The session ties the two together and forwards the page's console
//! output to a pluggable sink.
//!
//! ## Architecture
//!
//! - **SessionOptions**: layered configuration with dev-friendly defaults
//! - **Session**: the orchestrator owning server, browser, and primary page
//! - **Page**: a tab with navigation helpers and console wiring
//! - **ConsoleSink / SessionSink**: where forwarded output ends up
//! - **DevServer**: the seam for swapping in a caller-managed server
//!
//! ## Example
//!
//! ```ignore
//! use headlamp::{Session, SessionOptions};
//!
//! #[tokio::main]
//! async fn main() -> headlamp::Result<()> {
//!     let session = Session::launch(
//!         SessionOptions::new("dist").print_page_errors(),
//!     )
//!     .await?;
//!
//!     session.page().navigate_to(session.server(), "/").await?;
//!     let title: String = session.page().evaluate("document.title").await?;
//!     println!("loaded: {title}");
//!
//!     session.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Lifecycle guarantees
//!
//! Launch is strictly sequenced: server, then browser, then page, then
//! listeners. Launch failures propagate with no retry. `close()` flushes
//! console output, waits a short settle delay, then closes page, browser,
//! and server; each close attempt is isolated so one failure never blocks
//! the rest.
//!
//! ## Testing
//!
//! Unit tests run without a browser. Integration tests in
//! `tests/integration.rs` require Chrome and are `#[ignore]`d by default;
//! run them with `cargo test -- --ignored`.
//!
//! [`headlamp-server`]: headlamp_server

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod browser;
pub mod console;
pub mod error;
pub mod options;
pub mod page;
pub mod session;
pub mod sink;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use browser::HeadlessBrowser;
pub use console::{
    ConsoleFilterFn, ConsoleKind, ConsoleMessage, FailedRequestFilterFn, TransformArgsFn,
};
pub use error::{HarnessError, Result};
pub use options::{
    LaunchOptions, PageAcquisition, ServerOptions, SessionOptions, ViewportSize, DEFAULT_ARGS,
    DEFAULT_VIEWPORT,
};
pub use page::Page;
pub use session::Session;
pub use sink::{ConsoleSink, SessionSink, TermSink};

// Server types callers need when wiring their own server
pub use headlamp_server::{DevServer, StaticServer, StaticUrlServer};
