use super::extractors::{PortalError, SessionId};
use super::templates::{AdminTemplate, CardTemplate, LoadingTemplate, LoginTemplate};
use crate::admin::{
    create_user, send_invite, AdminPortal, AdminTab, InviteForm, InviteOutcome, PreparedUser,
    ProvisioningForm,
};
use crate::idp::helpers::extract_cookie;
use crate::idp::{AccessToken, SessionState, TokenSet};
use crate::session::SESSION_COOKIE;
use crate::view::{derive_view, IdentityLoad, ViewState};
use crate::AppState;
use askama::Template;
use axum::extract::{Form, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;
use std::sync::Arc;

/// Liveness probe - always returns OK if the process is running
pub async fn healthz_handler() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness probe - checks if the service is ready to handle requests
///
/// Returns 200 OK once the Asgardeo signing keys are cached, 503 before that.
pub async fn readyz_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.idp.verifier().is_jwks_cached().await {
        (StatusCode::OK, "ready")
    } else {
        tracing::warn!("Readiness check failed: JWKS not cached");
        (StatusCode::SERVICE_UNAVAILABLE, "not ready: JWKS not cached")
    }
}

fn render(template: impl Template) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Template render failed");
            PortalError::Internal("Template error".to_string()).into_response()
        }
    }
}

fn unknown_session() -> PortalError {
    PortalError::Unauthenticated("Unknown or expired session".to_string())
}

/// What one page render needs, copied out of the session under the read lock
#[derive(Default)]
struct PageSnapshot {
    session: SessionState,
    identity: IdentityLoad,
    show_admin: bool,
    admin: AdminPortal,
}

pub async fn index_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let snapshot = match extract_cookie(&headers, SESSION_COOKIE) {
        Some(id) => {
            state
                .sessions
                .read(&id, |s| PageSnapshot {
                    session: s.auth.session_state(),
                    identity: s.identity.clone(),
                    show_admin: s.show_admin,
                    admin: s.admin.clone(),
                })
                .await
        }
        None => None,
    }
    .unwrap_or_default();

    match derive_view(&snapshot.session, &snapshot.identity, snapshot.show_admin) {
        ViewState::Loading => render(LoadingTemplate::default()),
        ViewState::Unauthenticated => render(LoginTemplate {
            login_url: "/auth/login",
        }),
        ViewState::Member(card) => render(CardTemplate { card }),
        ViewState::Admin => render(AdminTemplate::new(&snapshot.admin)),
    }
}

/// Open the admin portal; only for a signed-in user whose roles include the admin role
pub async fn enter_admin_handler(
    State(state): State<Arc<AppState>>,
    SessionId(id): SessionId,
) -> Result<Redirect, PortalError> {
    let allowed = state
        .sessions
        .update(&id, |s| {
            let allowed = s.auth.session_state().is_authenticated && s.identity.is_admin();
            if allowed {
                s.show_admin = true;
            }
            allowed
        })
        .await
        .ok_or_else(unknown_session)?;

    if !allowed {
        tracing::warn!(event = "admin_portal_denied", "Admin portal requested without admin role");
        return Err(PortalError::Forbidden(
            "Administrator role required".to_string(),
        ));
    }

    tracing::info!(event = "admin_portal_opened", "Admin portal opened");
    Ok(Redirect::to("/"))
}

pub async fn leave_admin_handler(
    State(state): State<Arc<AppState>>,
    SessionId(id): SessionId,
) -> Result<Redirect, PortalError> {
    state
        .sessions
        .update(&id, |s| s.show_admin = false)
        .await
        .ok_or_else(unknown_session)?;
    Ok(Redirect::to("/"))
}

#[derive(Deserialize)]
pub struct TabForm {
    pub tab: AdminTab,
}

pub async fn select_tab_handler(
    State(state): State<Arc<AppState>>,
    SessionId(id): SessionId,
    Form(form): Form<TabForm>,
) -> Result<Redirect, PortalError> {
    state
        .sessions
        .update(&id, |s| s.admin.tab = form.tab)
        .await
        .ok_or_else(unknown_session)?;
    Ok(Redirect::to("/"))
}

/// Send an invitation with the admin's own access token
pub async fn invite_handler(
    State(state): State<Arc<AppState>>,
    SessionId(id): SessionId,
    Form(form): Form<InviteForm>,
) -> Result<Redirect, PortalError> {
    let started = state
        .sessions
        .update(&id, |s| -> Result<Option<(String, TokenSet)>, PortalError> {
            if !s.show_admin {
                return Err(PortalError::Forbidden("Admin portal is not open".to_string()));
            }
            let tokens = s
                .auth
                .tokens()
                .cloned()
                .ok_or_else(|| PortalError::Unauthenticated("Not signed in".to_string()))?;
            Ok(s.admin.invite.begin(form.email).map(|email| (email, tokens)))
        })
        .await
        .ok_or_else(unknown_session)??;

    let Some((email, tokens)) = started else {
        tracing::info!(event = "invite_in_flight", "Invitation already in flight; ignoring submit");
        return Ok(Redirect::to("/"));
    };

    // Detached: the flow is finished even if the request is dropped mid-call
    tokio::spawn(finish_invite(Arc::clone(&state), id, email, tokens))
        .await
        .map_err(|e| PortalError::Internal(format!("Invitation task failed: {}", e)))?;

    Ok(Redirect::to("/"))
}

async fn finish_invite(state: Arc<AppState>, id: String, email: String, tokens: TokenSet) {
    let (outcome, renewed) = match state.idp.access_token(&tokens).await {
        Ok(token) => {
            let outcome = send_invite(
                &state.http,
                &state.config.invite_url(),
                token.secret(),
                &email,
            )
            .await;
            (outcome, renewed_tokens(token))
        }
        Err(e) => {
            tracing::error!(error = %e, "No usable access token for invitation");
            (InviteOutcome::TransportFailed, None)
        }
    };

    state
        .sessions
        .update(&id, |s| {
            s.admin.invite.finish(&email, &outcome);
            store_renewed(s.auth.tokens_mut(), renewed);
        })
        .await;
}

/// Create a student through the SCIM proxy
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    SessionId(id): SessionId,
    Form(form): Form<ProvisioningForm>,
) -> Result<Redirect, PortalError> {
    let prepared = state
        .sessions
        .update(&id, |s| {
            if !s.show_admin {
                return Err(PortalError::Forbidden("Admin portal is not open".to_string()));
            }
            Ok(s.admin.provisioning.begin(form))
        })
        .await
        .ok_or_else(unknown_session)??;

    let Some(prepared) = prepared else {
        tracing::info!(event = "create_user_in_flight", "User creation already in flight; ignoring submit");
        return Ok(Redirect::to("/"));
    };

    tokio::spawn(finish_create_user(Arc::clone(&state), id, prepared))
        .await
        .map_err(|e| PortalError::Internal(format!("User creation task failed: {}", e)))?;

    Ok(Redirect::to("/"))
}

async fn finish_create_user(state: Arc<AppState>, id: String, prepared: PreparedUser) {
    let outcome = create_user(&state.http, &state.config.proxy_create_user_url, &prepared).await;

    state
        .sessions
        .update(&id, |s| s.admin.provisioning.finish(&outcome))
        .await;
}

fn renewed_tokens(token: AccessToken) -> Option<TokenSet> {
    match token {
        AccessToken::Renewed(tokens) => Some(tokens),
        AccessToken::Current(_) => None,
    }
}

fn store_renewed(current: Option<&mut TokenSet>, renewed: Option<TokenSet>) {
    if let (Some(current), Some(renewed)) = (current, renewed) {
        tracing::debug!("Storing refreshed access token");
        *current = renewed;
    }
}
