//! Integration tests for headlamp sessions.
//!
//! These require Chrome/Chromium to be installed and are marked #[ignore]
//! by default. Run with: cargo test --package headlamp -- --ignored

use headlamp::{ConsoleSink, Session, SessionOptions};
use std::io::Write;
use std::sync::{Arc, Mutex};

/// A sink recording every call as `(method, payload)`.
#[derive(Debug, Default)]
struct RecordingSink {
    calls: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    fn calls(&self) -> Vec<(String, String)> {
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

fn fixture_site(body_script: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let html = format!(
        "<!DOCTYPE html>\n<html>\n<head><title>Fixture</title></head>\n\
         <body><h1>fixture</h1><script>{body_script}</script></body>\n</html>"
    );
    let mut index = std::fs::File::create(dir.path().join("index.html")).unwrap();
    index.write_all(html.as_bytes()).unwrap();
    dir
}

fn session_options(root: &std::path::Path) -> SessionOptions {
    SessionOptions::new(root)
        .with_server(headlamp::ServerOptions::new(root).with_port(0))
        .with_args(["--no-sandbox", "--disable-dev-shm-usage"])
}

#[tokio::test]
#[ignore] // Requires Chrome to be installed
async fn session_launch_navigate_and_close() {
    let dir = fixture_site("console.log('hello from fixture');");

    let session = Session::launch(session_options(dir.path()))
        .await
        .expect("failed to launch session");

    assert!(!session.browser().is_closed().await);

    session
        .page()
        .navigate_to(session.server(), "/")
        .await
        .expect("failed to navigate");

    let title: String = session
        .page()
        .evaluate("document.title")
        .await
        .expect("failed to evaluate");
    assert_eq!(title, "Fixture");

    session.close().await;
}

#[tokio::test]
#[ignore]
async fn navigate_accepts_absolute_urls() {
    let dir = fixture_site("");

    let session = Session::launch(session_options(dir.path()))
        .await
        .expect("launch");

    let html = "<html><head><title>Inline</title></head><body></body></html>";
    let data_url = format!("data:text/html,{}", urlencoding::encode(html));
    session.page().navigate(&data_url).await.expect("navigate");

    let title = session.page().title().await.expect("title");
    assert_eq!(title, "Inline");

    session.close().await;
}

#[tokio::test]
#[ignore]
async fn console_output_reaches_the_sink() {
    let dir = fixture_site(
        "console.log('plain message'); console.warn('warned'); console.error('errored');",
    );

    let sink = Arc::new(RecordingSink::default());
    let options = session_options(dir.path()).with_sink(sink.clone());

    let session = Session::launch(options).await.expect("launch");
    session
        .page()
        .navigate_to(session.server(), "/")
        .await
        .expect("navigate");

    // flush waits for everything captured so far to hit the sink
    session.flush().await;
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    session.flush().await;

    let calls = sink.calls();
    assert!(
        calls.iter().any(|(m, p)| m == "log" && p.contains("plain message")),
        "missing log call in {calls:?}"
    );
    assert!(calls.iter().any(|(m, p)| m == "warn" && p.contains("warned")));
    assert!(calls.iter().any(|(m, p)| m == "error" && p.contains("errored")));

    session.close().await;
}

#[tokio::test]
#[ignore]
async fn silent_session_emits_nothing() {
    let dir = fixture_site("console.log('should vanish');");

    let sink = Arc::new(RecordingSink::default());
    let options = session_options(dir.path()).with_sink(sink.clone()).silent();

    let session = Session::launch(options).await.expect("launch");
    session
        .page()
        .navigate_to(session.server(), "/")
        .await
        .expect("navigate");

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    session.flush().await;

    assert!(
        sink.calls().is_empty(),
        "silent sessions must not touch the sink"
    );

    session.close().await;
}

#[tokio::test]
#[ignore]
async fn page_errors_forward_to_error_sink() {
    let dir = fixture_site(
        "fetch('/definitely-missing.png').catch(() => {}); \
         setTimeout(() => { throw new Error('uncaught fixture error'); }, 0);",
    );

    let sink = Arc::new(RecordingSink::default());
    let options = session_options(dir.path())
        .with_sink(sink.clone())
        .browser_quiet()
        .print_page_errors();

    let session = Session::launch(options).await.expect("launch");
    session
        .page()
        .navigate_to(session.server(), "/")
        .await
        .expect("navigate");

    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    let errors: Vec<String> = sink
        .calls()
        .into_iter()
        .filter(|(m, _)| m == "error")
        .map(|(_, p)| p)
        .collect();
    assert!(
        errors.iter().any(|p| p.contains("uncaught fixture error")),
        "missing exception forwarding in {errors:?}"
    );

    session.close().await;
}

#[tokio::test]
#[ignore]
async fn failed_request_filter_drops_messages() {
    let dir = fixture_site("fetch('/nope.js').catch(() => {});");

    let sink = Arc::new(RecordingSink::default());
    let options = session_options(dir.path())
        .with_sink(sink.clone())
        .with_failed_request_filter(Arc::new(|_message| false));

    let session = Session::launch(options).await.expect("launch");
    session
        .page()
        .navigate_to(session.server(), "/")
        .await
        .expect("navigate");

    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    session.flush().await;

    assert!(
        !sink
            .calls()
            .iter()
            .any(|(_, p)| p.contains("failed to load")),
        "filtered failed requests must not be forwarded"
    );

    session.close().await;
}

#[tokio::test]
#[ignore]
async fn secondary_pages_share_the_wiring() {
    let dir = fixture_site("console.log('primary');");

    let sink = Arc::new(RecordingSink::default());
    let options = session_options(dir.path()).with_sink(sink.clone());

    let session = Session::launch(options).await.expect("launch");

    let second = session.new_page().await.expect("new page");
    second
        .navigate_to(session.server(), "/")
        .await
        .expect("navigate second page");

    second.flush().await;
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    second.flush().await;

    assert!(
        sink.calls().iter().any(|(_, p)| p.contains("primary")),
        "second page console output should reach the shared sink"
    );

    second.close().await.expect("close second page");
    session.close().await;
}
