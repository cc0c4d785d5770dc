use crate::idp::helpers::extract_cookie;
use crate::session::SESSION_COOKIE;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error returned by the portal's form endpoints
#[derive(Debug)]
pub enum PortalError {
    Unauthenticated(String),
    Forbidden(String),
    Internal(String),
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        match self {
            PortalError::Unauthenticated(msg) => (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "Authentication required",
                    "message": msg,
                    "code": "UNAUTHENTICATED"
                })),
            )
                .into_response(),

            PortalError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "error": "Access denied",
                    "message": msg,
                    "code": "FORBIDDEN"
                })),
            )
                .into_response(),

            PortalError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Internal server error",
                    "message": msg
                })),
            )
                .into_response(),
        }
    }
}

/// Portal session id taken from the `sid` cookie
///
/// Only checks that the cookie is present. Handlers look the id up in the
/// session store and treat an unknown or expired id as unauthenticated.
pub struct SessionId(pub String);

impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = PortalError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        extract_cookie(&parts.headers, SESSION_COOKIE)
            .map(SessionId)
            .ok_or_else(|| PortalError::Unauthenticated("Missing session cookie".to_string()))
    }
}
