//! Authentication handlers for login, callback, and logout flows
//!
//! - `login_handler`: starts the authorization code + PKCE flow
//! - `callback_handler`: validates state, exchanges the code, decodes the ID token once,
//!   rotates the session id
//! - `logout_handler`: drops the portal session and redirects to Asgardeo end-session
//! - `logout_complete_handler`: final landing after logout

use axum::{
    extract::{Query, State},
    http::{header::InvalidHeaderValue, header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::helpers::{extract_cookie, session_profile};
use super::session::{AuthPhase, PendingSignIn};
use crate::session::SESSION_COOKIE;
use crate::view::{IdentityLoad, UserInfo};
use crate::AppState;

#[derive(Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

// =============================================================================
// Internal Helpers
// =============================================================================

/// Create a HeaderValue from a string, returning an error response if invalid.
fn header_value(s: &str) -> Result<HeaderValue, Box<Response>> {
    HeaderValue::from_str(s).map_err(|e: InvalidHeaderValue| {
        tracing::error!(
            error = %e,
            value_len = s.len(),
            "Failed to create header value"
        );
        Box::new(
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Internal error setting response headers"})),
            )
                .into_response(),
        )
    })
}

fn session_cookie(state: &AppState, session_id: &str) -> String {
    format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax{}",
        SESSION_COOKIE,
        session_id,
        state.config.session_ttl_secs,
        state.config.cookie_secure_flag()
    )
}

fn cleared_session_cookie(state: &AppState) -> String {
    format!(
        "{}=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax{}",
        SESSION_COOKIE,
        state.config.cookie_secure_flag()
    )
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// The single ID token decode for this sign-in
async fn decode_identity(state: &AppState, id_token: Option<&str>) -> IdentityLoad {
    let Some(id_token) = id_token else {
        tracing::warn!("No id_token received from Asgardeo - identity card stays on placeholders");
        return IdentityLoad::Failed;
    };

    match state.idp.decode_id_token(id_token).await {
        Ok(claims) => {
            let info = UserInfo::from_claims(&claims);
            tracing::info!(
                event = "identity_decoded",
                is_admin = info.is_admin,
                "Identity claims decoded"
            );
            IdentityLoad::Loaded(info)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to decode token");
            IdentityLoad::Failed
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Login handler - initiates the authorization code flow
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, Response> {
    tracing::info!("Login requested");

    // Reuse a live session, otherwise start a fresh one
    let mut session_id = None;
    if let Some(id) = extract_cookie(&headers, SESSION_COOKIE) {
        if state.sessions.read(&id, |_| ()).await.is_some() {
            session_id = Some(id);
        }
    }
    let session_id = match session_id {
        Some(id) => id,
        None => state.sessions.create().await,
    };

    let request = state.idp.sign_in_request();
    let pending = request.pending;
    state
        .sessions
        .update(&session_id, move |s| {
            s.reset_identity();
            s.auth = AuthPhase::Redirected(pending);
        })
        .await;

    tracing::info!(event = "signin_redirect", "Redirecting to Asgardeo for authentication");

    let mut response = Redirect::to(request.authorize_url.as_str()).into_response();
    response.headers_mut().insert(
        SET_COOKIE,
        header_value(&session_cookie(&state, &session_id)).map_err(|e| *e)?,
    );

    Ok(response)
}

/// Callback handler - validates state, exchanges the code, decodes identity
pub async fn callback_handler(
    Query(params): Query<CallbackParams>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    tracing::info!("OAuth callback received");

    if let Some(error) = params.error {
        tracing::warn!(
            error = %error,
            description = ?params.error_description,
            "OAuth authorization failed"
        );
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": error,
                "error_description": params.error_description
            })),
        )
            .into_response();
    }

    let Some(session_id) = extract_cookie(&headers, SESSION_COOKIE) else {
        tracing::warn!("Callback without session cookie");
        return json_error(StatusCode::UNAUTHORIZED, "Missing session cookie");
    };

    let Some(returned_state) = params.state else {
        tracing::warn!("CSRF validation failed: No state parameter in callback");
        return json_error(StatusCode::BAD_REQUEST, "Missing state parameter");
    };

    // Move Redirected -> Exchanging only when the state matches
    let pending = state
        .sessions
        .update(&session_id, |s| match std::mem::take(&mut s.auth) {
            AuthPhase::Redirected(pending) if pending.csrf_state == returned_state => {
                s.auth = AuthPhase::Exchanging;
                Some(pending)
            }
            other => {
                s.auth = other;
                None
            }
        })
        .await;

    let pending = match pending {
        None => {
            tracing::warn!("Callback for unknown or expired session");
            return json_error(StatusCode::UNAUTHORIZED, "Unknown or expired session");
        }
        Some(None) => {
            tracing::warn!("CSRF validation failed: state mismatch or no sign-in in progress");
            return json_error(StatusCode::UNAUTHORIZED, "CSRF validation failed: state mismatch");
        }
        Some(Some(pending)) => pending,
    };

    tracing::info!("CSRF validation successful");

    // Runs detached so a dropped request still leaves the session SignedIn or SignedOut
    let code = params.code;
    let task_state = Arc::clone(&state);
    let task = tokio::spawn(async move {
        complete_sign_in(&task_state, &session_id, code, pending).await
    });

    match task.await {
        Ok(Ok(Some(new_session_id))) => {
            let mut response = Redirect::to("/").into_response();
            match header_value(&session_cookie(&state, &new_session_id)) {
                Ok(h) => {
                    response.headers_mut().insert(SET_COOKIE, h);
                    response
                }
                Err(e) => *e,
            }
        }
        Ok(Ok(None)) => Redirect::to("/").into_response(),
        Ok(Err(response)) => response,
        Err(e) => {
            tracing::error!(error = %e, "Sign-in task failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Sign-in did not complete")
        }
    }
}

/// Exchange the code, decode identity once, then rotate the session id.
///
/// Returns the new session id, or None when the session expired mid-flight.
async fn complete_sign_in(
    state: &AppState,
    session_id: &str,
    code: Option<String>,
    pending: PendingSignIn,
) -> Result<Option<String>, Response> {
    let Some(code) = code else {
        tracing::warn!("No authorization code received");
        state
            .sessions
            .update(session_id, |s| s.auth = AuthPhase::SignedOut)
            .await;
        return Err(json_error(StatusCode::BAD_REQUEST, "Missing authorization code"));
    };

    let tokens = match state.idp.exchange_code(code, &pending.pkce_verifier).await {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::error!(error = %e, "Failed to exchange code for tokens");
            state
                .sessions
                .update(session_id, |s| s.auth = AuthPhase::SignedOut)
                .await;
            return Err(json_error(StatusCode::UNAUTHORIZED, "Token exchange failed"));
        }
    };

    let profile = session_profile(tokens.id_token.as_deref());
    let identity = decode_identity(state, tokens.id_token.as_deref()).await;

    let stored = state
        .sessions
        .update(session_id, move |s| {
            s.reset_identity();
            s.identity = identity;
            s.auth = AuthPhase::SignedIn { tokens, profile };
        })
        .await;

    if stored.is_none() {
        tracing::warn!("Session expired during sign-in; tokens discarded");
        return Ok(None);
    }

    // A pre-login id must never become the authenticated one
    let new_session_id = state.sessions.rotate(session_id).await;
    tracing::info!(
        event = "signin_complete",
        session_rotated = new_session_id.is_some(),
        "Authentication successful"
    );
    Ok(new_session_id)
}

/// Logout handler - drops the portal session, then ends the Asgardeo session
pub async fn logout_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let removed = match extract_cookie(&headers, SESSION_COOKIE) {
        Some(id) => state.sessions.remove(&id).await,
        None => None,
    };

    let id_token = removed
        .as_ref()
        .and_then(|s| s.auth.tokens())
        .and_then(|t| t.id_token.clone());

    // Do not log the URL: it may carry id_token_hint
    tracing::info!(
        event = "asgardeo_logout_redirect",
        had_session = removed.is_some(),
        has_id_token = id_token.is_some(),
        "Redirecting to Asgardeo end-session"
    );

    let mut response = Redirect::to(&state.idp.sign_out_url(id_token.as_deref())).into_response();

    // Clearing the cookie is best-effort; never block logout on it
    if let Ok(h) = header_value(&cleared_session_cookie(&state)) {
        response.headers_mut().insert(SET_COOKIE, h);
    }

    response
}

/// Logout complete handler - landing spot after Asgardeo end-session
pub async fn logout_complete_handler() -> Response {
    tracing::info!(event = "logout_complete", redirect_to = "/", "Logout complete");
    Redirect::to("/").into_response()
}
