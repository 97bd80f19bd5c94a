//! Dev server trait and the built-in static file server.
//!
//! The [`DevServer`] trait is the seam the session orchestrator talks to: it
//! only needs a base URL, an optional health check, and a way to shut the
//! server down. [`StaticServer`] is the built-in implementation serving a
//! directory of bundled assets; [`StaticUrlServer`] wraps a URL that is
//! already being served by something else.

use crate::error::{Result, ServerError};
use crate::options::ServerOptions;
use async_trait::async_trait;
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, warn};

/// Represents a running development server.
///
/// The session orchestrator owns a boxed `DevServer` for its lifetime and
/// closes it during shutdown. The trait is object-safe so callers can swap in
/// their own server (a bundler dev server, a fixture server in tests) without
/// the orchestrator knowing.
#[async_trait]
pub trait DevServer: Send + Sync {
    /// Returns the base URL of the server (e.g. `http://127.0.0.1:3000`),
    /// without a trailing slash.
    fn base_url(&self) -> &str;

    /// Performs a health check to ensure the server is responsive.
    ///
    /// Called before navigation to fail fast if the server is down. The
    /// default implementation assumes the server is healthy.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    /// Returns a full URL by joining a path to the base URL.
    fn url(&self, path: &str) -> String {
        let base = self.base_url().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// Shuts the server down, releasing its port.
    async fn close(&mut self) -> Result<()>;
}

impl fmt::Debug for dyn DevServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DevServer")
            .field("base_url", &self.base_url())
            .finish()
    }
}

/// A "server" wrapping a URL that is already being served elsewhere.
///
/// Useful when the assets come from an external process the session should
/// not manage. `close()` is a no-op.
#[derive(Debug, Clone)]
pub struct StaticUrlServer {
    base_url: String,
}

impl StaticUrlServer {
    /// Creates a new static URL server.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl DevServer for StaticUrlServer {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Shared state for the request handlers.
struct ServeState {
    root: PathBuf,
    cache: bool,
    spa: bool,
}

/// The built-in static file server.
///
/// Serves a directory over loopback HTTP with dev-friendly behavior:
/// no-cache headers unless caching is re-enabled, `/` mapped to
/// `index.html`, an SPA fallback for extension-less paths, and permissive
/// CORS so pages can fetch across dev ports.
pub struct StaticServer {
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl StaticServer {
    /// Binds a listener and starts serving in a background task.
    ///
    /// # Errors
    ///
    /// Returns `Bind` or `NoAvailablePort` if no listening socket can be
    /// established.
    pub async fn launch(options: ServerOptions) -> Result<Self> {
        let addr = options.resolve_addr()?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        let state = Arc::new(ServeState {
            root: options.root.clone(),
            cache: options.cache,
            spa: options.spa,
        });
        let app = router(state);

        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(err) = serve.await {
                warn!("dev server error: {err}");
            }
        });

        debug!("dev server listening on {local_addr}");

        Ok(Self {
            base_url: format!("http://{local_addr}"),
            shutdown: Some(shutdown),
            task: Some(task),
        })
    }
}

#[async_trait]
impl DevServer for StaticServer {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|err| ServerError::Serve(err.to_string()))?;
        }
        Ok(())
    }
}

impl fmt::Debug for StaticServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticServer")
            .field("base_url", &self.base_url)
            .field("closed", &self.shutdown.is_none())
            .finish()
    }
}

/// Build the axum router with all routes.
fn router(state: Arc<ServeState>) -> Router {
    Router::new()
        // Favicon handler to prevent 404s
        .route("/favicon.ico", get(handle_favicon))
        // All other routes serve files from the root directory
        .fallback(handle_request)
        .layer(
            // CORS: allow all origins for dev
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Handle favicon requests with 204 No Content.
async fn handle_favicon() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

/// Handle all other requests by serving files from the root directory.
async fn handle_request(State(state): State<Arc<ServeState>>, uri: Uri) -> Response {
    let path = uri.path();

    let Some(relative) = sanitize_path(path) else {
        return plain_response(StatusCode::BAD_REQUEST, "invalid path");
    };

    let candidate = if relative.as_os_str().is_empty() {
        state.root.join("index.html")
    } else {
        state.root.join(&relative)
    };

    match tokio::fs::read(&candidate).await {
        Ok(content) => {
            file_response(&state, content, content_type_for(&candidate.to_string_lossy()))
        }
        Err(_) if state.spa && Path::new(path).extension().is_none() => {
            // Client-side routes resolve to the SPA shell
            match tokio::fs::read(state.root.join("index.html")).await {
                Ok(content) => file_response(&state, content, "text/html; charset=utf-8"),
                Err(_) => plain_response(StatusCode::NOT_FOUND, &format!("file not found: {path}")),
            }
        }
        Err(_) => plain_response(StatusCode::NOT_FOUND, &format!("file not found: {path}")),
    }
}

fn file_response(state: &ServeState, content: Vec<u8>, content_type: &str) -> Response {
    let cache_control = if state.cache {
        "public, max-age=3600"
    } else {
        "no-cache"
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, cache_control)
        .body(Body::from(content))
        .unwrap()
}

fn plain_response(status: StatusCode, message: &str) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(message.to_string()))
        .unwrap()
}

/// Reduce a request path to a safe relative path under the root.
///
/// Returns `None` when the path tries to escape the root via `..` or
/// absolute components.
fn sanitize_path(path: &str) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for component in Path::new(path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(clean)
}

/// Determine content type from file extension.
fn content_type_for(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension {
        "wasm" => "application/wasm",
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "html" => "text/html; charset=utf-8",
        "css" => "text/css",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "txt" => "text/plain; charset=utf-8",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use std::io::Write;
    use tower::ServiceExt;

    fn fixture_root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut index = std::fs::File::create(dir.path().join("index.html")).unwrap();
        index
            .write_all(b"<html><body><h1>fixture</h1></body></html>")
            .unwrap();
        let mut app = std::fs::File::create(dir.path().join("app.js")).unwrap();
        app.write_all(b"console.log('hi');").unwrap();
        dir
    }

    fn test_router(root: &Path, cache: bool, spa: bool) -> Router {
        router(Arc::new(ServeState {
            root: root.to_path_buf(),
            cache,
            spa,
        }))
    }

    async fn get_response(app: Router, path: &str) -> Response {
        app.oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[test]
    fn url_joining_normalizes_slashes() {
        let server = StaticUrlServer::new("http://localhost:3000");
        assert_eq!(server.url("/app"), "http://localhost:3000/app");
        assert_eq!(server.url("app"), "http://localhost:3000/app");

        let server_with_slash = StaticUrlServer::new("http://localhost:3000/");
        assert_eq!(server_with_slash.url("/app"), "http://localhost:3000/app");
    }

    #[tokio::test]
    async fn static_url_server_close_is_noop() {
        let mut server = StaticUrlServer::new("http://localhost:3000");
        server.close().await.unwrap();
        assert_eq!(server.base_url(), "http://localhost:3000");
    }

    #[test]
    fn sanitize_path_rejects_traversal() {
        assert!(sanitize_path("/../etc/passwd").is_none());
        assert!(sanitize_path("/a/../../b").is_none());
        assert_eq!(sanitize_path("/a/./b"), Some(PathBuf::from("a/b")));
        assert_eq!(sanitize_path("/"), Some(PathBuf::new()));
    }

    #[test]
    fn content_types_cover_bundled_assets() {
        assert_eq!(content_type_for("bundle.js"), "application/javascript");
        assert_eq!(content_type_for("bundle.js.map"), "application/json");
        assert_eq!(content_type_for("index.html"), "text/html; charset=utf-8");
        assert_eq!(content_type_for("lib.wasm"), "application/wasm");
        assert_eq!(content_type_for("unknown.xyz"), "application/octet-stream");
    }

    #[tokio::test]
    async fn root_serves_index_html() {
        let dir = fixture_root();
        let response = get_response(test_router(dir.path(), false, true), "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    }

    #[tokio::test]
    async fn files_are_served_with_content_type() {
        let dir = fixture_root();
        let response = get_response(test_router(dir.path(), false, true), "/app.js").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/javascript"
        );
    }

    #[tokio::test]
    async fn cache_header_follows_options() {
        let dir = fixture_root();
        let response = get_response(test_router(dir.path(), true, true), "/app.js").await;
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "public, max-age=3600"
        );
    }

    #[tokio::test]
    async fn spa_fallback_serves_index_for_routes() {
        let dir = fixture_root();
        let response = get_response(test_router(dir.path(), false, true), "/app/dashboard").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn spa_fallback_skips_asset_lookups() {
        let dir = fixture_root();
        let response = get_response(test_router(dir.path(), false, true), "/missing.png").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_files_404_without_spa() {
        let dir = fixture_root();
        let response = get_response(test_router(dir.path(), false, false), "/app/dashboard").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn favicon_returns_no_content() {
        let dir = fixture_root();
        let response = get_response(test_router(dir.path(), false, true), "/favicon.ico").await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
