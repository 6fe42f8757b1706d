//! Route table and the outermost request wrapper.

use std::any::Any;
use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN,
};
use hyper::{Body, Method, Request, Response, StatusCode};
use tracing::{debug, error};

use crate::error::ApiError;
use crate::sys_auth::handlers as auth;
use crate::sys_core::response::redirect;
use crate::sys_core::AppState;
use crate::sys_fileapi::handlers as files;
use crate::sys_statichost::core::ADMIN_PAGE;
use crate::sys_statichost::handlers as statichost;

/// hyper entry point: route, turn panics into a 500, add CORS headers.
pub async fn handle(req: Request<Body>, state: Arc<AppState>) -> Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let resp = match AssertUnwindSafe(dispatch(req, state)).catch_unwind().await {
        Ok(resp) => resp,
        Err(panic) => {
            let detail = panic_message(panic.as_ref());
            error!(%method, %path, %detail, "handler panicked");
            ApiError::internal("Internal server error.", detail).into_response()
        }
    };

    debug!(%method, %path, status = resp.status().as_u16(), "request handled");
    Ok(with_cors(resp))
}

/// Pick a handler for `req`. Errors are rendered as JSON bodies.
pub async fn dispatch(req: Request<Body>, state: Arc<AppState>) -> Response<Body> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let result = match (&method, path.as_str()) {
        (&Method::OPTIONS, _) => Ok(preflight()),
        (&Method::GET, "/admin" | "/admin.html") => {
            if auth::is_admin(&req, &state.gate) {
                statichost::serve_page(&state.config.static_dir, ADMIN_PAGE).await
            } else {
                Ok(redirect("/login"))
            }
        }
        (&Method::POST, "/login") => auth::handler_login(req, &state.gate).await,
        (&Method::GET, "/logout") => Ok(auth::handler_logout(&req, &state.gate)),
        (&Method::POST, "/upload-pdf") => {
            files::handler_upload(req, &state.repo, state.config.max_upload_bytes).await
        }
        (&Method::GET, "/contracts") => files::handler_list(&state.repo).await,
        (&Method::GET, p) if p.starts_with("/download/") => {
            let name = p.trim_start_matches("/download/");
            files::handler_download(&state.repo, name).await
        }
        (&Method::DELETE, p) if p.starts_with("/delete/") => {
            let name = p.trim_start_matches("/delete/");
            files::handler_remove(&state.repo, name).await
        }
        (&Method::GET, p) => match statichost::handler_static(&state.config.static_dir, p).await {
            Some(result) => result,
            None => Err(ApiError::NotFound("Not found.".into())),
        },
        _ => Err(ApiError::NotFound("Not found.".into())),
    };

    result.unwrap_or_else(ApiError::into_response)
}

fn preflight() -> Response<Body> {
    let mut resp = Response::new(Body::empty());
    *resp.status_mut() = StatusCode::NO_CONTENT;
    let headers = resp.headers_mut();
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, DELETE, OPTIONS"),
    );
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type"));
    resp
}

fn with_cors(mut resp: Response<Body>) -> Response<Body> {
    resp.headers_mut()
        .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    resp
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
