//! Shared fakes for unit tests.

use crate::sink::ConsoleSink;
use std::sync::Mutex;

/// A sink recording every call as `(method, payload)`.
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    calls: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    pub(crate) fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, method: &str, payload: &str) {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), payload.to_string()));
    }
}

impl ConsoleSink for RecordingSink {
    fn log(&self, message: &str) {
        self.record("log", message);
    }

    fn warn(&self, message: &str) {
        self.record("warn", message);
    }

    fn error(&self, message: &str) {
        self.record("error", message);
    }

    fn debug(&self, message: &str) {
        self.record("debug", message);
    }

    fn table(&self, message: &str) {
        self.record("table", message);
    }

    fn clear(&self) {
        self.record("clear", "");
    }

    fn group(&self, label: &str) {
        self.record("group", label);
    }

    fn group_collapsed(&self, label: &str) {
        self.record("group_collapsed", label);
    }

    fn group_end(&self) {
        self.record("group_end", "");
    }
}
