//! Status page.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use uuid::Uuid;

use crate::error::Result;
use crate::session::SessionCookie;
use crate::state::AppState;
use crate::view::{Notice, render_index};

/// Render the status page for a session, optionally with a notice.
pub(crate) async fn render_status_page(
    state: &AppState,
    session_id: Option<Uuid>,
    notice: Option<Notice>,
    status: StatusCode,
) -> Result<Response> {
    let registration = state.store.read_registration().await?;
    let session = state.sessions.get(session_id).await;
    let token = session.and_then(|s| s.token);

    let html = render_index(&registration, token.as_ref(), notice.as_ref());
    Ok((status, Html(html)).into_response())
}

/// GET / - Status panel and registration form.
pub async fn index_handler(
    State(state): State<AppState>,
    cookie: SessionCookie,
) -> Result<Response> {
    render_status_page(&state, cookie.id(), None, StatusCode::OK).await
}

/// Fallback for unknown paths.
pub async fn not_found_handler(uri: axum::http::Uri) -> crate::error::ServerError {
    crate::error::ServerError::NotFound(uri.path().to_string())
}
