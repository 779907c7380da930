//! Read-only static file server for the web UI and its `model.js`.
//!
//! Every request is a file lookup under one root directory; there are no
//! dynamic routes and no shared mutable state.
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use log::{debug, error, info};
use percent_encoding::percent_decode_str;

use crate::error::{Error, Result};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory served at `/`.  Must contain `index.html`.
    pub root: PathBuf,
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("web"),
            host: "127.0.0.1".to_string(),
            port: 5500,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The root must exist and hold an `index.html`.
    pub fn check_root(&self) -> Result<()> {
        if !self.root.is_dir() {
            return Err(Error::NotFound {
                what: "web directory".into(),
                path: self.root.clone(),
            });
        }
        let index = self.root.join("index.html");
        if !index.is_file() {
            return Err(Error::NotFound {
                what: "index page".into(),
                path: index,
            });
        }
        Ok(())
    }
}

/// Router with a single fallback that serves files from `root`.
pub fn router(root: PathBuf) -> Router {
    Router::new()
        .fallback(serve_static)
        .with_state(Arc::new(root))
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: ServerConfig) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!("Serving UI at http://{}", listener.local_addr()?);
    axum::serve(listener, router(config.root))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to install Ctrl-C handler: {e}");
        std::future::pending::<()>().await;
    }
}

async fn serve_static(State(root): State<Arc<PathBuf>>, method: Method, uri: Uri) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "GET, HEAD")],
            "Method Not Allowed",
        )
            .into_response();
    }

    let Some(mut path) = resolve_path(&root, uri.path()) else {
        debug!("{method} {} -> 404 (rejected)", uri.path());
        return not_found();
    };
    if tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_dir()) {
        path.push("index.html");
    }

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            debug!("{method} {} -> 200", uri.path());
            let body = if method == Method::HEAD {
                Body::empty()
            } else {
                Body::from(bytes)
            };
            (
                [
                    (header::CONTENT_TYPE, content_type(&path)),
                    (header::CACHE_CONTROL, "no-cache"),
                ],
                body,
            )
                .into_response()
        }
        Err(_) => {
            debug!("{method} {} -> 404", uri.path());
            not_found()
        }
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

/// Map a request path onto a file under `root`.
///
/// The path is percent-decoded first.  `/` and paths ending in `/` map to
/// `index.html`.  Anything that is not a plain relative path (`..`, drive
/// prefixes) or does not decode to UTF-8 is rejected.  Directories without a
/// trailing slash are resolved by the handler.
pub fn resolve_path(root: &Path, uri_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(uri_path).decode_utf8().ok()?;
    let rel = decoded.trim_start_matches('/');
    let mut path = root.to_path_buf();
    for component in Path::new(rel).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if rel.is_empty() || rel.ends_with('/') {
        path.push("index.html");
    }
    Some(path)
}

/// MIME type from the file extension.
pub fn content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("js") | Some("mjs") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>hi</html>").unwrap();
        std::fs::write(dir.path().join("model.js"), "window.APP_CONFIG = {};\n").unwrap();
        dir
    }

    async fn get(root: &Path, method: Method, path: &str) -> (StatusCode, Option<String>, Vec<u8>) {
        let resp = serve_static(
            State(Arc::new(root.to_path_buf())),
            method,
            path.parse::<Uri>().unwrap(),
        )
        .await;
        let status = resp.status();
        let ct = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        (status, ct, body)
    }

    #[test]
    fn default_binds_localhost_5500() {
        assert_eq!(ServerConfig::default().bind_addr(), "127.0.0.1:5500");
    }

    #[test]
    fn resolve_rejects_traversal() {
        let root = Path::new("/srv/web");
        assert_eq!(resolve_path(root, "/model.js"), Some(root.join("model.js")));
        assert_eq!(resolve_path(root, "/"), Some(root.join("index.html")));
        assert_eq!(resolve_path(root, "/../etc/passwd"), None);
        assert_eq!(resolve_path(root, "/a/../../b"), None);
        assert_eq!(resolve_path(root, "/%2e%2e/etc/passwd"), None);
    }

    #[test]
    fn resolve_decodes_percent_escapes() {
        let root = Path::new("/srv/web");
        assert_eq!(
            resolve_path(root, "/my%20file.js"),
            Some(root.join("my file.js"))
        );
        assert_eq!(resolve_path(root, "/docs/"), Some(root.join("docs").join("index.html")));
        assert_eq!(resolve_path(root, "/%ff.js"), None);
    }

    #[test]
    fn check_root_requires_index() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ServerConfig {
            root: dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        assert!(matches!(cfg.check_root(), Err(Error::NotFound { .. })));
        std::fs::write(dir.path().join("index.html"), "").unwrap();
        cfg.check_root().unwrap();
    }

    #[tokio::test]
    async fn serves_index_and_model() {
        let dir = site();
        let (status, ct, body) = get(dir.path(), Method::GET, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ct.as_deref(), Some("text/html; charset=utf-8"));
        assert_eq!(body, b"<html>hi</html>");

        let (status, ct, _) = get(dir.path(), Method::GET, "/model.js").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ct.as_deref(), Some("text/javascript; charset=utf-8"));
    }

    #[tokio::test]
    async fn serves_escaped_names_and_directory_index() {
        let dir = site();
        std::fs::write(dir.path().join("my file.js"), "// spaced").unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs").join("index.html"), "docs").unwrap();

        let (status, _, body) = get(dir.path(), Method::GET, "/my%20file.js").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"// spaced");

        let (status, ct, body) = get(dir.path(), Method::GET, "/docs").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ct.as_deref(), Some("text/html; charset=utf-8"));
        assert_eq!(body, b"docs");

        let (status, _, _) = get(dir.path(), Method::GET, "/%2e%2e/model.js").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn head_has_no_body() {
        let dir = site();
        let (status, _, body) = get(dir.path(), Method::HEAD, "/model.js").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn missing_file_and_post_rejected() {
        let dir = site();
        let (status, _, _) = get(dir.path(), Method::GET, "/nope.js").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _, _) = get(dir.path(), Method::POST, "/model.js").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }
}
