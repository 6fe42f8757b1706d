//! HTTP glue for the admin login: JSON login, logout, and the session check.

use hyper::header::{HeaderValue, COOKIE, SET_COOKIE};
use hyper::{Body, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::sys_auth::core::{Clock, SessionGate, SESSION_TTL};
use crate::sys_core::response::{json_response, redirect};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "sid";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LoginRequest {
    admin_id: String,
    admin_pw: String,
}

#[derive(Serialize)]
struct LoginResponse<'a> {
    success: bool,
    message: &'a str,
    redirect: &'a str,
}

/// `POST /login`
pub async fn handler_login<C: Clock>(
    req: Request<Body>,
    gate: &SessionGate<C>,
) -> Result<Response<Body>, ApiError> {
    let body = hyper::body::to_bytes(req.into_body())
        .await
        .map_err(|e| ApiError::Validation(format!("Could not read request body: {e}")))?;
    let login: LoginRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::Validation(format!("Invalid login payload: {e}")))?;

    let token = gate
        .authenticate(&login.admin_id, &login.admin_pw)
        .ok_or_else(|| ApiError::Unauthorized("Invalid ID or password.".into()))?;
    let sealed = gate
        .seal(&token)
        .ok_or_else(|| ApiError::internal("Login failed.", "could not sign session"))?;
    let cookie = HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={sealed}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_TTL.as_secs()
    ))
    .map_err(|e| ApiError::internal("Login failed.", e))?;

    info!(admin_id = %login.admin_id, "admin logged in");
    let mut resp = json_response(
        StatusCode::OK,
        &LoginResponse {
            success: true,
            message: "Login successful.",
            redirect: "/admin",
        },
    );
    resp.headers_mut().insert(SET_COOKIE, cookie);
    Ok(resp)
}

/// `GET /logout`: drop the session and send the browser back to `/login`.
pub fn handler_logout<C: Clock>(req: &Request<Body>, gate: &SessionGate<C>) -> Response<Body> {
    let mut dropped = 0;
    for token in session_tokens(req, gate) {
        gate.invalidate(token);
        dropped += 1;
    }
    if dropped > 0 {
        info!("admin logged out");
    }
    let mut resp = redirect("/login");
    resp.headers_mut().insert(
        SET_COOKIE,
        HeaderValue::from_static("sid=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
    );
    resp
}

/// Whether the request carries a live admin session.
///
/// Every `sid` cookie is tried, so a stale one sent alongside a fresh one
/// does not lock the admin out.
pub fn is_admin<C: Clock>(req: &Request<Body>, gate: &SessionGate<C>) -> bool {
    session_tokens(req, gate).any(|token| gate.authorize(token))
}

/// Tokens from every `sid` cookie whose signature verifies.
fn session_tokens<'r, C: Clock>(
    req: &'r Request<Body>,
    gate: &'r SessionGate<C>,
) -> impl Iterator<Item = &'r str> {
    req.headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE).then_some(value)
        })
        .filter_map(move |value| gate.unseal(value))
}
