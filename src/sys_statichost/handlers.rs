//! HTTP glue: serve whatever `core::map_static_path` gives us.

use std::path::Path;

use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Response};
use mime_guess::mime;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::error::ApiError;
use crate::sys_statichost::core::map_static_path;

/// Serve the file `uri` maps to under `root`.
/// Returns `None` if the path does not name a page or asset.
pub async fn handler_static(root: &Path, uri: &str) -> Option<Result<Response<Body>, ApiError>> {
    let path = map_static_path(root, uri).await?;
    Some(serve_file(&path).await)
}

/// Serve a named page from `root`, e.g. `admin.html`.
pub async fn serve_page(root: &Path, page: &str) -> Result<Response<Body>, ApiError> {
    serve_file(&root.join(page)).await
}

async fn serve_file(path: &Path) -> Result<Response<Body>, ApiError> {
    let file = File::open(path).await.map_err(|e| {
        debug!(path = %path.display(), error = %e, "static file unavailable");
        ApiError::NotFound("Page not found.".into())
    })?;
    let guessed = mime_guess::from_path(path).first_or(mime::TEXT_PLAIN);
    let content_type = if guessed.type_() == mime::TEXT && guessed.get_param(mime::CHARSET).is_none()
    {
        format!("{guessed}; charset=utf-8")
    } else {
        guessed.to_string()
    };

    let mut resp = Response::new(Body::wrap_stream(ReaderStream::new(file)));
    if let Ok(value) = HeaderValue::from_str(&content_type) {
        resp.headers_mut().insert(CONTENT_TYPE, value);
    }
    Ok(resp)
}
