//! HTTP surface of the appliance.
//!
//! Routes, in the order a browser meets them:
//!
//! | Route | Method | Behavior |
//! |---|---|---|
//! | `/` | GET | Gallery page, newest photo first |
//! | `/live` | GET | Auto-refreshing newest-photo view |
//! | `/latest` | GET | Serves the newest photo, 404 if none |
//! | `/photos/:filename` | GET | Serves a photo, 400 on invalid name |
//! | `/capture` | POST | Takes a photo, redirects back |
//! | `/delete/:filename` | POST | Deletes a photo, redirects back |
//! | `/latest_ts` | GET | Newest photo mtime (ns) for polling |
//!
//! Every filename coming off the wire passes through the photo store's
//! validation before any filesystem access; responses never echo paths
//! outside the photo directory.

mod pages;

use crate::capture::CaptureCoordinator;
use crate::store::{PhotoStore, StoreError};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;

/// Errors that can occur while running the web server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    #[error("server error: {0}")]
    Server(String),
}

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    /// The capture coordinator; `/capture` is one of its trigger sources.
    pub coordinator: Arc<CaptureCoordinator>,
    /// The photo store backing every read route.
    pub store: PhotoStore,
    /// Refresh/poll interval surfaced to the pages.
    pub refresh_secs: u64,
}

/// Builds the application router. Separate from [`serve`] so tests can
/// drive it without a socket.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/live", get(live_view))
        .route("/latest", get(latest))
        .route("/photos/:filename", get(serve_photo))
        .route("/capture", post(capture))
        .route("/delete/:filename", post(delete))
        .route("/latest_ts", get(latest_ts))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds and runs the server until the shutdown future resolves.
pub async fn serve(
    state: AppState,
    addr: SocketAddr,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(addr = %addr, "web server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Server(e.to_string()))
}

async fn index(State(state): State<AppState>) -> Response {
    match state.store.list() {
        Ok(photos) => {
            let names: Vec<String> = photos.into_iter().map(|p| p.name).collect();
            pages::gallery(&names, state.refresh_secs).into_response()
        }
        Err(e) => store_error_response(e),
    }
}

async fn live_view(State(state): State<AppState>) -> Response {
    match state.store.latest() {
        Ok(newest) => {
            let newest = newest
                .as_ref()
                .map(|p| (p.name.as_str(), p.modified_ns()));
            pages::live(newest, state.refresh_secs).into_response()
        }
        Err(e) => store_error_response(e),
    }
}

async fn latest(State(state): State<AppState>) -> Response {
    match state.store.latest() {
        Ok(Some(photo)) => serve_file(&photo.name, photo.path).await,
        Ok(None) => (StatusCode::NOT_FOUND, "No photos yet.").into_response(),
        Err(e) => store_error_response(e),
    }
}

async fn serve_photo(
    Path(filename): Path<String>,
    State(state): State<AppState>,
) -> Response {
    match state.store.resolve(&filename) {
        Ok(path) => serve_file(&filename, path).await,
        Err(e) => store_error_response(e),
    }
}

async fn capture(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let coordinator = Arc::clone(&state.coordinator);
    // Capture blocks on device I/O (or a frame-slot copy); keep it off
    // the async workers.
    let result = tokio::task::spawn_blocking(move || coordinator.capture()).await;

    match result {
        Ok(Ok(photo)) => {
            tracing::debug!(photo = %photo.name, "capture via HTTP");
            redirect_back(&headers)
        }
        Ok(Err(e)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Capture failed: {e}")).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "capture task panicked");
            (StatusCode::INTERNAL_SERVER_ERROR, "Capture failed").into_response()
        }
    }
}

async fn delete(
    Path(filename): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    match state.store.delete(&filename) {
        Ok(_) => redirect_back(&headers),
        Err(e @ StoreError::InvalidPath(_)) => store_error_response(e),
        Err(e) => {
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Delete failed: {e}")).into_response()
        }
    }
}

async fn latest_ts(State(state): State<AppState>) -> Response {
    match state.store.latest_modified_ns() {
        Ok(ns) => ns.to_string().into_response(),
        Err(e) => store_error_response(e),
    }
}

/// Sends the caller back to the page the request came from, or to the
/// gallery when there is no referrer.
fn redirect_back(headers: &HeaderMap) -> Response {
    let target = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .unwrap_or("/");
    Redirect::to(target).into_response()
}

async fn serve_file(name: &str, path: std::path::PathBuf) -> Response {
    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type(name))],
            bytes,
        )
            .into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, "Photo not found").into_response()
        }
        Err(e) => {
            tracing::error!(photo = %name, error = %e, "failed to read photo");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read photo").into_response()
        }
    }
}

fn content_type(name: &str) -> &'static str {
    if name.to_ascii_lowercase().ends_with(".png") {
        "image/png"
    } else {
        "image/jpeg"
    }
}

fn store_error_response(e: StoreError) -> Response {
    match e {
        StoreError::InvalidPath(_) => {
            (StatusCode::BAD_REQUEST, "Invalid photo name").into_response()
        }
        StoreError::Io(e) => {
            tracing::error!(error = %e, "photo store error");
            (StatusCode::INTERNAL_SERVER_ERROR, "Photo store error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraConfig, MockCamera};
    use crate::capture::{CaptureStrategy, EncodeConfig};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_app() -> (tempfile::TempDir, PhotoStore, Router) {
        let dir = tempfile::tempdir().unwrap();
        let store = PhotoStore::new(dir.path()).unwrap();
        let coordinator = CaptureCoordinator::start(
            Box::new(MockCamera::new()),
            &CameraConfig {
                width: 8,
                height: 8,
                ..Default::default()
            },
            CaptureStrategy::Direct { discard_frames: 0 },
            store.clone(),
            EncodeConfig::default(),
        )
        .unwrap();

        let state = AppState {
            coordinator: Arc::new(coordinator),
            store: store.clone(),
            refresh_secs: 2,
        };
        (dir, store, router(state))
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8_lossy(&body).to_string())
    }

    async fn post(app: &Router, uri: &str, referer: Option<&str>) -> Response {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(r) = referer {
            builder = builder.header(header::REFERER, r);
        }
        app.clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    fn write_pair(store: &PhotoStore) -> (String, String) {
        std::fs::write(store.dir().join("a.png"), b"old").unwrap();
        std::thread::sleep(Duration::from_millis(10));
        std::fs::write(store.dir().join("b.jpg"), b"new").unwrap();
        ("a.png".to_string(), "b.jpg".to_string())
    }

    #[tokio::test]
    async fn test_gallery_lists_newest_first() {
        let (_dir, store, app) = test_app();
        write_pair(&store);

        let (status, body) = get(&app, "/").await;
        assert_eq!(status, StatusCode::OK);
        let b = body.find("/photos/b.jpg").unwrap();
        let a = body.find("/photos/a.png").unwrap();
        assert!(b < a);
    }

    #[tokio::test]
    async fn test_latest_ts_empty_and_populated() {
        let (_dir, store, app) = test_app();

        let (status, body) = get(&app, "/latest_ts").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "0");

        write_pair(&store);
        let expected = store.latest_modified_ns().unwrap().to_string();
        let (_, body) = get(&app, "/latest_ts").await;
        assert_eq!(body, expected);
        assert_ne!(body, "0");
    }

    #[tokio::test]
    async fn test_latest_serves_newest_photo() {
        let (_dir, store, app) = test_app();

        let (status, body) = get(&app, "/latest").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "No photos yet.");

        write_pair(&store);
        let (status, body) = get(&app, "/latest").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "new");
    }

    #[tokio::test]
    async fn test_photo_route_serves_and_guards() {
        let (_dir, store, app) = test_app();
        write_pair(&store);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/photos/b.jpg")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/jpeg"
        );

        let (status, _) = get(&app, "/photos/missing.png").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        for uri in [
            "/photos/..%2F..%2Fetc%2Fpasswd.png",
            "/photos/secret.txt",
            "/photos/..png",
        ] {
            let (status, body) = get(&app, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "uri {uri}");
            assert!(!body.contains("/etc"), "leaked path for {uri}");
        }
    }

    #[tokio::test]
    async fn test_capture_redirects_and_stores() {
        let (_dir, store, app) = test_app();

        let response = post(&app, "/capture", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
        assert_eq!(store.list().unwrap().len(), 1);

        let response = post(&app, "/capture", Some("/live")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/live");
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_removes_and_guards() {
        let (_dir, store, app) = test_app();
        let (a, b) = write_pair(&store);

        let response = post(&app, &format!("/delete/{b}"), Some("/")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(!store.dir().join(&b).exists());

        // latest now reflects the remaining photo
        let expected = store.latest().unwrap().unwrap();
        assert_eq!(expected.name, a);

        let response = post(&app, "/delete/..%2Fa.png", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // deleting a missing photo still redirects
        let response = post(&app, "/delete/gone.png", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_live_view_renders() {
        let (_dir, store, app) = test_app();

        let (status, body) = get(&app, "/live").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("No photos yet."));

        write_pair(&store);
        let (_, body) = get(&app, "/live").await;
        assert!(body.contains("/photos/b.jpg?t="));
    }
}
