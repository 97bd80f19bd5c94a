//! # headlamp-server
//!
//! Local dev server primitives for headlamp browser sessions.
//!
//! This crate provides the [`DevServer`] trait the session orchestrator
//! consumes, plus [`StaticServer`], a small axum-based static file server
//! with dev-friendly defaults (no-cache headers, SPA index fallback,
//! permissive CORS). [`StaticUrlServer`] wraps an already-running URL when
//! the assets are served by some other process.
//!
//! ## Example
//!
//! ```ignore
//! use headlamp_server::{DevServer, ServerOptions, StaticServer};
//!
//! let mut server = StaticServer::launch(ServerOptions::new("dist")).await?;
//! println!("serving at {}", server.base_url());
//! server.close().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod options;
pub mod server;

pub use error::{Result, ServerError};
pub use options::{ServerOptions, DEFAULT_PORT};
pub use server::{DevServer, StaticServer, StaticUrlServer};
