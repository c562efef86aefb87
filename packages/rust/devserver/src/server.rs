//! Axum middleware and standalone dev server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    http::{StatusCode, Uri, header},
    middleware::{self, Next},
    response::Response,
};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use siteindex_shared::{Result, SiteIndexError};

use crate::resolver::ArtifactResolver;

/// Serve `idx.json` / `docs.json` requests from the last build's output.
///
/// Other requests go to `next` untouched. Artifacts are read from disk on
/// every request; a missing one answers 500 with a descriptive message.
pub async fn artifact_middleware(
    State(resolver): State<Arc<ArtifactResolver>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    let file = match resolver.resolve(&path) {
        None => return next.run(request).await,
        Some(Ok(file)) => file,
        Some(Err(e)) => return error_response(&path, &e),
    };

    match tokio::fs::read(&file).await {
        Ok(bytes) => {
            debug!(%path, file = %file.display(), size = bytes.len(), "served artifact");
            bytes_response(StatusCode::OK, "application/json", bytes)
        }
        Err(_) => error_response(&path, &SiteIndexError::ArtifactNotBuilt { path: file }),
    }
}

/// Fallback handler: static files from the output directory.
///
/// Directories serve their `index.html`.
async fn static_files(State(resolver): State<Arc<ArtifactResolver>>, uri: Uri) -> Response {
    let path = uri.path();

    let mut file = match resolver.local_path(path) {
        Ok(file) => file,
        Err(e) => return error_response(path, &e),
    };
    if file.is_dir() {
        file.push("index.html");
    }

    match tokio::fs::read(&file).await {
        Ok(bytes) => bytes_response(StatusCode::OK, content_type(&file), bytes),
        Err(_) => bytes_response(
            StatusCode::NOT_FOUND,
            "text/plain; charset=utf-8",
            format!("not found: {path}").into_bytes(),
        ),
    }
}

/// Standalone router: artifact middleware over a static-file fallback.
pub fn router(resolver: Arc<ArtifactResolver>) -> Router {
    Router::new()
        .fallback(static_files)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&resolver),
            artifact_middleware,
        ))
        .with_state(resolver)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, resolver: ArtifactResolver) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| SiteIndexError::Network(format!("cannot bind {addr}: {e}")))?;

    info!(%addr, out_dir = %resolver.out_dir().display(), "dev server listening");

    axum::serve(listener, router(Arc::new(resolver)))
        .await
        .map_err(|e| SiteIndexError::Network(e.to_string()))?;

    Ok(())
}

fn error_response(path: &str, err: &SiteIndexError) -> Response {
    let status = match err {
        SiteIndexError::Validation { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error!(%path, error = %err, "artifact request failed");
    bytes_response(
        status,
        "text/plain; charset=utf-8",
        err.to_string().into_bytes(),
    )
}

fn bytes_response(status: StatusCode, content_type: &str, bytes: Vec<u8>) -> Response {
    let len = bytes.len();
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, len.to_string())
        .body(Body::from(bytes))
        .unwrap_or_else(|_| {
            let mut fallback = Response::new(Body::empty());
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
}

fn content_type(file: &std::path::Path) -> &'static str {
    match file.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js" | "mjs") => "text/javascript",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
