//! Request outcome logging.
//!
//! `TraceLayer` opens the per-request span; this middleware adds one event
//! describing what the request did to the browser session and where it was
//! sent next. Query strings are never logged since they carry codes and state.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};

use crate::session::{SESSION_COOKIE, session_id_from_headers};
use crate::state::AppState;

/// What a response did to the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    Unchanged,
    Started,
    Cleared,
}

impl SessionChange {
    /// Inspect `Set-Cookie` headers for the session cookie.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let prefix = format!("{}=", SESSION_COOKIE);
        let value = headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| v.strip_prefix(prefix.as_str()));

        match value {
            None => SessionChange::Unchanged,
            Some(rest) if rest.starts_with(';') || rest.is_empty() => SessionChange::Cleared,
            Some(_) => SessionChange::Started,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            SessionChange::Unchanged => "unchanged",
            SessionChange::Started => "set",
            SessionChange::Cleared => "cleared",
        }
    }
}

/// Redirect target without its query string.
pub fn redirect_target(headers: &HeaderMap) -> Option<String> {
    let location = headers.get(header::LOCATION)?.to_str().ok()?;
    let target = location.split_once('?').map_or(location, |(base, _)| base);
    Some(target.to_string())
}

/// Log each request's status, session and redirect target.
pub async fn request_logging_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.request_logging {
        return next.run(request).await;
    }

    let session = session_id_from_headers(request.headers())
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());

    let start = std::time::Instant::now();
    let response = next.run(request).await;
    let duration_ms = start.elapsed().as_millis();

    let status = response.status().as_u16();
    let cookie = SessionChange::from_headers(response.headers()).as_str();
    let redirect = redirect_target(response.headers()).unwrap_or_default();

    if response.status().is_server_error() {
        tracing::error!(status, %session, cookie, duration_ms, "Request failed");
    } else if response.status().is_client_error() {
        tracing::warn!(status, %session, cookie, duration_ms, "Request rejected");
    } else if response.status().is_redirection() {
        tracing::info!(status, %session, cookie, %redirect, duration_ms, "Redirected");
    } else {
        tracing::debug!(status, %session, cookie, duration_ms, "Served");
    }

    response
}
