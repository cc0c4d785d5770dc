use super::handlers::{
    create_user_handler, enter_admin_handler, healthz_handler, index_handler, invite_handler,
    leave_admin_handler, readyz_handler, select_tab_handler,
};
use crate::{
    idp::{callback_handler, login_handler, logout_complete_handler, logout_handler},
    AppState,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .route("/auth/login", get(login_handler))
        .route("/auth/callback", get(callback_handler))
        // POST only: a cross-site GET must not be able to sign the user out
        .route("/auth/logout", post(logout_handler))
        .route("/auth/logout/complete", get(logout_complete_handler))
        .route("/admin/enter", post(enter_admin_handler))
        .route("/admin/leave", post(leave_admin_handler))
        .route("/admin/tab", post(select_tab_handler))
        .route("/admin/invite", post(invite_handler))
        .route("/admin/users", post(create_user_handler))
        .with_state(state)
}
