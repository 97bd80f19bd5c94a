//! Console forwarding from the page to a sink.
//!
//! The forwarder subscribes to the page's console events, renders them to
//! text, and pushes them through an internal queue drained by a printer
//! task. Failed network requests are correlated with their request URL and
//! rendered as errors. `flush()` enqueues a marker behind everything pending
//! and resolves once the printer has acknowledged it, so callers can
//! synchronize on "all output so far has been emitted".

use crate::error::Result;
use crate::sink::{ConsoleSink, SessionSink};
use chromiumoxide::cdp::browser_protocol::inspector;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, EventLoadingFailed, EventRequestWillBeSent, RequestId,
};
use chromiumoxide::cdp::js_protocol::runtime::{
    ConsoleApiCalledType, EventConsoleApiCalled, EventExceptionThrown, ExceptionDetails,
    RemoteObject,
};
use chromiumoxide::page::Page as ChromePage;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Transforms rendered console arguments before they are joined with spaces.
/// Receives the origin URL of the session's dev server.
pub type TransformArgsFn = Arc<dyn Fn(Vec<String>, &str) -> Vec<String> + Send + Sync>;

/// Returns false to drop a failed-request message.
pub type FailedRequestFilterFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Returns false to drop a console message.
pub type ConsoleFilterFn = Arc<dyn Fn(&ConsoleMessage) -> bool + Send + Sync>;

/// The kind of console output, mapped from the CDP console API type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsoleKind {
    /// `console.log()`
    Log,
    /// `console.info()`
    Info,
    /// `console.warn()`
    Warning,
    /// `console.error()`
    Error,
    /// `console.debug()`
    Debug,
    /// `console.table()`
    Table,
    /// `console.clear()`
    Clear,
    /// `console.group()`
    Group,
    /// `console.groupCollapsed()`
    GroupCollapsed,
    /// `console.groupEnd()`
    GroupEnd,
    /// Catch-all for other console APIs.
    Other,
}

impl From<&ConsoleApiCalledType> for ConsoleKind {
    fn from(kind: &ConsoleApiCalledType) -> Self {
        match kind {
            ConsoleApiCalledType::Log => ConsoleKind::Log,
            ConsoleApiCalledType::Info => ConsoleKind::Info,
            ConsoleApiCalledType::Warning => ConsoleKind::Warning,
            ConsoleApiCalledType::Error | ConsoleApiCalledType::Assert => ConsoleKind::Error,
            ConsoleApiCalledType::Debug => ConsoleKind::Debug,
            ConsoleApiCalledType::Table => ConsoleKind::Table,
            ConsoleApiCalledType::Clear => ConsoleKind::Clear,
            ConsoleApiCalledType::StartGroup => ConsoleKind::Group,
            ConsoleApiCalledType::StartGroupCollapsed => ConsoleKind::GroupCollapsed,
            ConsoleApiCalledType::EndGroup => ConsoleKind::GroupEnd,
            _ => ConsoleKind::Other,
        }
    }
}

/// A rendered console message with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleMessage {
    /// What console API produced the message.
    pub kind: ConsoleKind,

    /// The rendered message text. Multiple arguments are joined with spaces.
    pub text: String,

    /// When the message was captured (host time, not page time).
    pub timestamp: SystemTime,

    /// Source location if available (e.g. "app.js:42:10").
    pub source: Option<String>,
}

impl ConsoleMessage {
    /// Creates a new console message stamped with the current time.
    #[must_use]
    pub fn new(kind: ConsoleKind, text: String) -> Self {
        Self {
            kind,
            text,
            timestamp: SystemTime::now(),
            source: None,
        }
    }

    /// Attaches a source location.
    #[must_use]
    pub fn with_source(mut self, source: String) -> Self {
        self.source = Some(source);
        self
    }
}

/// Renders a CDP remote object for terminal output.
fn format_remote_object(arg: &RemoteObject) -> String {
    if let Some(value) = &arg.value {
        match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    } else if let Some(description) = &arg.description {
        description.clone()
    } else {
        "<object>".to_string()
    }
}

/// Applies the optional transform and joins arguments with spaces.
fn render_args(args: Vec<String>, transform: Option<&TransformArgsFn>, origin: &str) -> String {
    let args = match transform {
        Some(transform) => transform(args, origin),
        None => args,
    };
    args.join(" ")
}

/// Converts a console event into a [`ConsoleMessage`].
fn render_console_event(
    event: &EventConsoleApiCalled,
    transform: Option<&TransformArgsFn>,
    origin: &str,
) -> ConsoleMessage {
    let kind = ConsoleKind::from(&event.r#type);
    let args: Vec<String> = event.args.iter().map(format_remote_object).collect();
    let text = render_args(args, transform, origin);

    let mut message = ConsoleMessage::new(kind, text);
    if let Some(stack_trace) = &event.stack_trace {
        if let Some(frame) = stack_trace.call_frames.first() {
            message = message.with_source(format!(
                "{}:{}:{}",
                frame.url, frame.line_number, frame.column_number
            ));
        }
    }
    message
}

/// Renders an uncaught page exception for the error sink.
fn format_exception(details: &ExceptionDetails) -> String {
    let description = details
        .exception
        .as_ref()
        .and_then(|exception| exception.description.clone())
        .unwrap_or_else(|| details.text.clone());

    match &details.url {
        Some(url) => format!(
            "{description} ({url}:{}:{})",
            details.line_number, details.column_number
        ),
        None => description,
    }
}

enum QueueItem {
    Message(ConsoleMessage),
    Flush(oneshot::Sender<()>),
}

/// Routes a message to the matching sink method.
fn dispatch(sink: &SessionSink, message: &ConsoleMessage) {
    let text = match &message.source {
        Some(source) => format!("{} ({source})", message.text),
        None => message.text.clone(),
    };

    match message.kind {
        ConsoleKind::Log | ConsoleKind::Info | ConsoleKind::Other => sink.log(&text),
        ConsoleKind::Warning => sink.warn(&text),
        ConsoleKind::Error => sink.error(&text),
        ConsoleKind::Debug => sink.debug(&text),
        ConsoleKind::Table => sink.table(&text),
        ConsoleKind::Clear => sink.clear(),
        ConsoleKind::Group => sink.group(&message.text),
        ConsoleKind::GroupCollapsed => sink.group_collapsed(&message.text),
        ConsoleKind::GroupEnd => sink.group_end(),
    }
}

async fn printer_loop(
    mut queue: mpsc::UnboundedReceiver<QueueItem>,
    sink: SessionSink,
    filter: Option<ConsoleFilterFn>,
) {
    while let Some(item) = queue.recv().await {
        match item {
            QueueItem::Message(message) => {
                if filter.as_ref().map_or(true, |keep| keep(&message)) {
                    dispatch(&sink, &message);
                }
            }
            QueueItem::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

/// Callbacks wired into a forwarder.
#[derive(Clone, Default)]
pub(crate) struct ForwarderOptions {
    pub(crate) transform_args: Option<TransformArgsFn>,
    pub(crate) failed_request_filter: Option<FailedRequestFilterFn>,
    pub(crate) console_filter: Option<ConsoleFilterFn>,
}

/// Forwards a page's console output and failed requests to a sink.
///
/// Listener tasks end when their event streams do (the page closed); the
/// printer task ends once every queue sender is gone.
pub(crate) struct ConsoleForwarder {
    queue: mpsc::UnboundedSender<QueueItem>,
    _printer: JoinHandle<()>,
    _listeners: Vec<JoinHandle<()>>,
}

impl ConsoleForwarder {
    /// Subscribes to the page's console and network-failure events.
    pub(crate) async fn attach(
        page: &ChromePage,
        options: ForwarderOptions,
        sink: SessionSink,
        origin: String,
    ) -> Result<Self> {
        let (queue, receiver) = mpsc::unbounded_channel();
        let printer = tokio::spawn(printer_loop(receiver, sink, options.console_filter.clone()));

        let mut console_events = page.event_listener::<EventConsoleApiCalled>().await?;
        let console_queue = queue.clone();
        let transform = options.transform_args.clone();
        let console_task = tokio::spawn(async move {
            while let Some(event) = console_events.next().await {
                let message = render_console_event(&event, transform.as_ref(), &origin);
                if console_queue.send(QueueItem::Message(message)).is_err() {
                    break;
                }
            }
        });

        // Request URLs only appear on requestWillBeSent, so track them to
        // render loadingFailed events with something identifiable.
        page.execute(NetworkEnableParams::default()).await?;
        let mut sent_events = page.event_listener::<EventRequestWillBeSent>().await?;
        let mut failed_events = page.event_listener::<EventLoadingFailed>().await?;
        let request_queue = queue.clone();
        let request_filter = options.failed_request_filter.clone();
        let request_task = tokio::spawn(async move {
            let mut urls: HashMap<RequestId, String> = HashMap::new();
            loop {
                tokio::select! {
                    sent = sent_events.next() => match sent {
                        Some(event) => {
                            urls.insert(event.request_id.clone(), event.request.url.clone());
                        }
                        None => break,
                    },
                    failed = failed_events.next() => match failed {
                        Some(event) => {
                            let url = urls
                                .remove(&event.request_id)
                                .unwrap_or_else(|| "<unknown>".to_string());
                            let text = format!("failed to load {url}: {}", event.error_text);
                            if request_filter.as_ref().map_or(true, |keep| keep(&text)) {
                                let message = ConsoleMessage::new(ConsoleKind::Error, text);
                                if request_queue.send(QueueItem::Message(message)).is_err() {
                                    break;
                                }
                            }
                        }
                        None => break,
                    },
                }
            }
        });

        Ok(Self {
            queue,
            _printer: printer,
            _listeners: vec![console_task, request_task],
        })
    }

    /// Waits until every message enqueued before this call has been emitted.
    pub(crate) async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.queue.send(QueueItem::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }
}

/// Attaches the three page-error listeners: target crashes, uncaught
/// exceptions, and failed requests, each forwarding to the sink's `error`.
pub(crate) async fn attach_error_listeners(
    page: &ChromePage,
    sink: Arc<dyn ConsoleSink>,
) -> Result<Vec<JoinHandle<()>>> {
    page.execute(inspector::EnableParams::default()).await?;
    page.execute(NetworkEnableParams::default()).await?;

    let mut crash_events = page.event_listener::<inspector::EventTargetCrashed>().await?;
    let crash_sink = Arc::clone(&sink);
    let crash_task = tokio::spawn(async move {
        while crash_events.next().await.is_some() {
            crash_sink.error("page crashed");
        }
    });

    let mut exception_events = page.event_listener::<EventExceptionThrown>().await?;
    let exception_sink = Arc::clone(&sink);
    let exception_task = tokio::spawn(async move {
        while let Some(event) = exception_events.next().await {
            exception_sink.error(&format_exception(&event.exception_details));
        }
    });

    let mut failed_events = page.event_listener::<EventLoadingFailed>().await?;
    let failed_sink = sink;
    let failed_task = tokio::spawn(async move {
        while let Some(event) = failed_events.next().await {
            failed_sink.error(&format!(
                "request failed: {} ({:?})",
                event.error_text, event.r#type
            ));
        }
    });

    Ok(vec![crash_task, exception_task, failed_task])
}
