//! Console sinks: where forwarded browser output ends up.
//!
//! The sink is an explicit injected dependency with a defined capability
//! surface mirroring the browser console API. The platform default
//! ([`TermSink`]) is chosen once at session construction; nothing deeper in
//! the call chain reaches for a global console.

use owo_colors::OwoColorize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// The capability surface a console sink must provide.
///
/// Mirrors the browser console methods the forwarder can emit. Implementors
/// must be cheap to call; the printer task invokes these inline.
pub trait ConsoleSink: Send + Sync {
    /// `console.log()` / `console.info()` output.
    fn log(&self, message: &str);
    /// `console.warn()` output.
    fn warn(&self, message: &str);
    /// `console.error()` output, page errors, and failed requests.
    fn error(&self, message: &str);
    /// `console.debug()` output.
    fn debug(&self, message: &str);
    /// `console.table()` output, rendered as text.
    fn table(&self, message: &str);
    /// `console.clear()`.
    fn clear(&self);
    /// `console.group()` with a label.
    fn group(&self, label: &str);
    /// `console.groupCollapsed()` with a label.
    fn group_collapsed(&self, label: &str);
    /// `console.groupEnd()`.
    fn group_end(&self);
}

/// Default sink printing styled output to stderr.
///
/// Tracks `group`/`group_end` nesting and indents accordingly, so grouped
/// browser output stays readable in the terminal.
#[derive(Debug, Default)]
pub struct TermSink {
    depth: AtomicUsize,
}

impl TermSink {
    /// Creates a new terminal sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn pad(&self) -> String {
        "  ".repeat(self.depth.load(Ordering::Relaxed))
    }
}

impl ConsoleSink for TermSink {
    fn log(&self, message: &str) {
        eprintln!("{}{message}", self.pad());
    }

    fn warn(&self, message: &str) {
        eprintln!("{}{} {}", self.pad(), "⚠".yellow().bold(), message.yellow());
    }

    fn error(&self, message: &str) {
        eprintln!("{}{} {}", self.pad(), "✗".red().bold(), message.red());
    }

    fn debug(&self, message: &str) {
        eprintln!("{}{} {}", self.pad(), "◆".dimmed(), message.dimmed());
    }

    fn table(&self, message: &str) {
        eprintln!("{}{message}", self.pad());
    }

    fn clear(&self) {
        let _ = console::Term::stderr().clear_screen();
    }

    fn group(&self, label: &str) {
        eprintln!("{}{}", self.pad(), label.bold());
        self.depth.fetch_add(1, Ordering::Relaxed);
    }

    fn group_collapsed(&self, label: &str) {
        self.group(label);
    }

    fn group_end(&self) {
        // Unbalanced groupEnd() calls from the page are tolerated
        let _ = self
            .depth
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |depth| {
                depth.checked_sub(1)
            });
    }
}

/// The sink a session forwards console output to.
///
/// Selected once at session construction: `silent` sessions get [`Noop`],
/// everything else wraps the injected (or default) [`ConsoleSink`]. The
/// variant is fixed for the session lifetime, so call sites never branch on
/// silence themselves.
///
/// [`Noop`]: SessionSink::Noop
#[derive(Clone)]
pub enum SessionSink {
    /// Forward to a real sink.
    Real(Arc<dyn ConsoleSink>),
    /// Swallow everything.
    Noop,
}

impl SessionSink {
    /// Selects the session sink once, at the construction boundary.
    #[must_use]
    pub fn select(silent: bool, sink: Arc<dyn ConsoleSink>) -> Self {
        if silent {
            SessionSink::Noop
        } else {
            SessionSink::Real(sink)
        }
    }

    /// Forwards `console.log()` output.
    pub fn log(&self, message: &str) {
        if let SessionSink::Real(sink) = self {
            sink.log(message);
        }
    }

    /// Forwards `console.warn()` output.
    pub fn warn(&self, message: &str) {
        if let SessionSink::Real(sink) = self {
            sink.warn(message);
        }
    }

    /// Forwards `console.error()` output.
    pub fn error(&self, message: &str) {
        if let SessionSink::Real(sink) = self {
            sink.error(message);
        }
    }

    /// Forwards `console.debug()` output.
    pub fn debug(&self, message: &str) {
        if let SessionSink::Real(sink) = self {
            sink.debug(message);
        }
    }

    /// Forwards `console.table()` output.
    pub fn table(&self, message: &str) {
        if let SessionSink::Real(sink) = self {
            sink.table(message);
        }
    }

    /// Forwards `console.clear()`.
    pub fn clear(&self) {
        if let SessionSink::Real(sink) = self {
            sink.clear();
        }
    }

    /// Forwards `console.group()`.
    pub fn group(&self, label: &str) {
        if let SessionSink::Real(sink) = self {
            sink.group(label);
        }
    }

    /// Forwards `console.groupCollapsed()`.
    pub fn group_collapsed(&self, label: &str) {
        if let SessionSink::Real(sink) = self {
            sink.group_collapsed(label);
        }
    }

    /// Forwards `console.groupEnd()`.
    pub fn group_end(&self) {
        if let SessionSink::Real(sink) = self {
            sink.group_end();
        }
    }
}

impl std::fmt::Debug for SessionSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionSink::Real(_) => f.write_str("SessionSink::Real"),
            SessionSink::Noop => f.write_str("SessionSink::Noop"),
        }
    }
}
