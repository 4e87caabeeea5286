//! OAuth2 flow endpoints.
//!
//! Provider failures (non-200 answers) are rendered on the status page with
//! the provider's status and message; they never touch stored state.

use axum::{
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use nugu_oob_oauth::{OAuthError, TokenRecord, generate_state};
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::index::render_status_page;
use crate::error::{Result, ServerError};
use crate::session::{SessionCookie, clear_session_cookie, session_cookie};
use crate::state::AppState;
use crate::view::Notice;

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn redirect_with_session(location: &str, session_id: Uuid) -> Response {
    (
        [(header::SET_COOKIE, session_cookie(session_id))],
        Redirect::to(location),
    )
        .into_response()
}

fn redirect_clearing_session(location: &str) -> Response {
    (
        [(header::SET_COOKIE, clear_session_cookie())],
        Redirect::to(location),
    )
        .into_response()
}

/// Persist a freshly issued token and cache it in the session.
async fn store_token(state: &AppState, session_id: Option<Uuid>, token: TokenRecord) -> Result<Uuid> {
    state.store.write_token(&token).await?;
    let id = state
        .sessions
        .update(session_id, |session| {
            session.token = Some(token);
            session.oauth_state = None;
        })
        .await;
    Ok(id)
}

/// Render a provider failure, or propagate anything else.
async fn provider_failure(
    state: &AppState,
    session_id: Option<Uuid>,
    err: OAuthError,
) -> Result<Response> {
    match err {
        OAuthError::Provider { status, message } => {
            render_status_page(
                state,
                session_id,
                Some(Notice::provider(status, message)),
                StatusCode::BAD_GATEWAY,
            )
            .await
        }
        other => Err(other.into()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization code
// ─────────────────────────────────────────────────────────────────────────────

/// GET /loginAuthorizationCode - Redirect to the provider's authorize page.
pub async fn login_authorization_code_handler(
    State(state): State<AppState>,
    cookie: SessionCookie,
) -> Result<Response> {
    let registration = state.store.read_registration().await?;
    if !registration.has_client_id() {
        return Err(ServerError::BadRequest(
            "clientId is not configured".to_string(),
        ));
    }

    let oauth_state = generate_state();
    let url = state.oauth.authorization_url(&registration, &oauth_state);
    debug!(state = %oauth_state, "Generated authorization state");

    let id = state
        .sessions
        .update(cookie.id(), |session| {
            session.oauth_state = Some(oauth_state);
        })
        .await;

    info!(session = %id, client_id = %registration.client_id, "Starting authorization code flow");
    Ok(redirect_with_session(&url, id))
}

/// Query parameters on the provider's redirect back to us.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// GET /callback - Exchange the authorization code for a token.
///
/// The state check is lenient unless strict mode is configured: a missing or
/// mismatched state is logged and the exchange still happens.
pub async fn callback_handler(
    State(state): State<AppState>,
    cookie: SessionCookie,
    Query(params): Query<CallbackParams>,
) -> Result<Response> {
    if let Some(error) = params.error {
        let message = match params.error_description {
            Some(description) => format!("Authorization failed: {} ({})", error, description),
            None => format!("Authorization failed: {}", error),
        };
        warn!(%message, "Provider reported an authorization error");
        return render_status_page(
            &state,
            cookie.id(),
            Some(Notice::message(message)),
            StatusCode::BAD_REQUEST,
        )
        .await;
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ServerError::BadRequest("Missing authorization code".to_string()))?;

    let expected = state
        .sessions
        .get(cookie.id())
        .await
        .and_then(|session| session.oauth_state);

    match (expected.as_deref(), params.state.as_deref()) {
        (Some(expected), Some(returned)) if expected == returned => {
            debug!("Authorization state verified");
        }
        (None, _) => {
            warn!("No oauth_state found in session");
            if state.config.strict_state {
                return Err(ServerError::BadRequest(
                    "No authorization in progress for this session".to_string(),
                ));
            }
        }
        (Some(_), _) => {
            warn!("Authorization state does not match the session");
            if state.config.strict_state {
                return Err(ServerError::BadRequest(
                    "Authorization state mismatch".to_string(),
                ));
            }
        }
    }

    let registration = state.store.read_registration().await?;
    match state.oauth.exchange_code(&registration, &code).await {
        Ok(token) => {
            let id = store_token(&state, cookie.id(), token).await?;
            info!(session = %id, "Authorization code exchanged");
            Ok(redirect_with_session("/", id))
        }
        Err(err) => provider_failure(&state, cookie.id(), err).await,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client credentials
// ─────────────────────────────────────────────────────────────────────────────

/// GET /loginClientCredentials - Obtain a token with the client id/secret.
pub async fn login_client_credentials_handler(
    State(state): State<AppState>,
    cookie: SessionCookie,
) -> Result<Response> {
    let registration = state.store.read_registration().await?;

    match state.oauth.client_credentials(&registration).await {
        Ok(token) => {
            let id = store_token(&state, cookie.id(), token).await?;
            info!(session = %id, "Client credentials token issued");
            Ok(redirect_with_session("/", id))
        }
        Err(err) => provider_failure(&state, cookie.id(), err).await,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Refresh / revoke / logout
// ─────────────────────────────────────────────────────────────────────────────

/// GET /refresh - Exchange the stored refresh token for a new token.
///
/// Without a stored refresh token this is a no-op.
pub async fn refresh_handler(
    State(state): State<AppState>,
    cookie: SessionCookie,
) -> Result<Response> {
    let stored = state.store.read_token().await?;
    let Some(refresh_token) = stored.refresh_token() else {
        warn!("No refresh token stored, nothing to refresh");
        return Ok(Redirect::to("/").into_response());
    };

    let registration = state.store.read_registration().await?;
    match state.oauth.refresh(&registration, refresh_token).await {
        Ok(mut token) => {
            token.inherit_refresh_token(&stored);
            let id = store_token(&state, cookie.id(), token).await?;
            info!(session = %id, "Token refreshed");
            Ok(redirect_with_session("/", id))
        }
        Err(err) => provider_failure(&state, cookie.id(), err).await,
    }
}

/// POST /revoke - Revoke the current access token.
///
/// On success the token file goes back to its default and the session ends.
pub async fn revoke_handler(
    State(state): State<AppState>,
    cookie: SessionCookie,
) -> Result<Response> {
    let stored = state.store.read_token().await?;
    let session_token = state
        .sessions
        .get(cookie.id())
        .await
        .and_then(|session| session.token);

    let access_token = stored
        .access_token()
        .or_else(|| session_token.as_ref().and_then(|t| t.access_token()))
        .map(str::to_string);

    let Some(access_token) = access_token else {
        warn!("No access token to revoke");
        return render_status_page(
            &state,
            cookie.id(),
            Some(Notice::message("No access token to revoke")),
            StatusCode::BAD_REQUEST,
        )
        .await;
    };

    let registration = state.store.read_registration().await?;
    match state.oauth.revoke(&registration, &access_token).await {
        Ok(()) => {
            state.store.reset_token().await?;
            state.sessions.remove(cookie.id()).await;
            info!("Token revoked and reset to defaults");
            Ok(redirect_clearing_session("/"))
        }
        Err(err) => provider_failure(&state, cookie.id(), err).await,
    }
}

/// GET /logout - Forget this browser's session.
pub async fn logout_handler(
    State(state): State<AppState>,
    cookie: SessionCookie,
) -> Response {
    if state.sessions.remove(cookie.id()).await {
        info!("Session cleared");
    }
    redirect_clearing_session("/")
}
