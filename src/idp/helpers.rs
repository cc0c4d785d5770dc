//! Pure helper functions for the identity provider client
//!
//! Stateless helpers for cookie extraction, HTTP client construction,
//! logout URL building and unverified ID-token payload reads.

use axum::http::HeaderMap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::time::Duration;

use super::session::SessionProfile;
use crate::config::HttpTimeouts;

// =============================================================================
// JWT Payload Helpers (display and logout only, never for authorization)
// =============================================================================

/// Decode the payload segment of a JWT without verifying its signature.
///
/// Returns None for anything that is not three dot-separated segments with a
/// base64url JSON object in the middle.
pub fn decode_jwt_payload(token: &str) -> Option<serde_json::Value> {
    let mut parts = token.split('.');
    let (_, payload, _) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let json: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    json.is_object().then_some(json)
}

/// Check if a JWT token is expired (without signature verification)
///
/// Used for logout to avoid sending an expired id_token_hint to Asgardeo.
/// Returns true if the token is expired or malformed.
pub fn is_jwt_expired(token: &str) -> bool {
    let Some(exp) = decode_jwt_payload(token)
        .as_ref()
        .and_then(|json| json.get("exp"))
        .and_then(|v| v.as_i64())
    else {
        return true;
    };

    // 5 second buffer for clock skew
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    exp < (now - 5)
}

/// Read the display name and email for the session header from an ID token.
///
/// Name preference: `name`, then `given_name family_name`, then
/// `preferred_username`, then `sub`.
pub fn session_profile(id_token: Option<&str>) -> SessionProfile {
    let Some(payload) = id_token.and_then(decode_jwt_payload) else {
        return SessionProfile::default();
    };

    let claim = |key: &str| {
        payload
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let full_name = match (claim("given_name"), claim("family_name")) {
        (Some(given), Some(family)) => Some(format!("{} {}", given, family)),
        (Some(given), None) => Some(given),
        (None, Some(family)) => Some(family),
        (None, None) => None,
    };

    SessionProfile {
        display_name: claim("name")
            .or(full_name)
            .or_else(|| claim("preferred_username"))
            .or_else(|| claim("sub"))
            .unwrap_or_default(),
        email: claim("email").unwrap_or_default(),
    }
}

// =============================================================================
// HTTP Client Builders
// =============================================================================

/// Create a reqwest client for identity provider and proxy calls
pub fn create_http_client(timeouts: HttpTimeouts) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none()) // Security: prevent SSRF
        .connect_timeout(Duration::from_secs(timeouts.connect_timeout_secs));

    if let Some(secs) = timeouts.request_timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }

    builder.build()
}

// =============================================================================
// URL Builders
// =============================================================================

/// Build the Asgardeo end-session URL
///
/// Asgardeo requires either `client_id` or `id_token_hint` alongside
/// `post_logout_redirect_uri`. The hint is preferred while the token is still
/// valid, falling back to `client_id`.
pub fn build_logout_url(
    asgardeo_base_url: &str,
    portal_public_url: &str,
    client_id: &str,
    id_token: Option<&str>,
) -> String {
    let logout_complete_url = format!("{}/auth/logout/complete", portal_public_url);
    let post_logout_redirect = urlencoding::encode(&logout_complete_url);

    let valid_id_token = id_token
        .filter(|t| !t.trim().is_empty())
        .filter(|t| {
            if is_jwt_expired(t) {
                tracing::info!("id_token expired, using client_id for Asgardeo logout");
                false
            } else {
                true
            }
        });

    match valid_id_token {
        Some(id_token) => format!(
            "{}/oidc/logout?id_token_hint={}&post_logout_redirect_uri={}",
            asgardeo_base_url,
            urlencoding::encode(id_token),
            post_logout_redirect
        ),
        None => format!(
            "{}/oidc/logout?client_id={}&post_logout_redirect_uri={}",
            asgardeo_base_url,
            urlencoding::encode(client_id),
            post_logout_redirect
        ),
    }
}

// =============================================================================
// Cookie Extraction
// =============================================================================

/// Extract a cookie value from headers
///
/// Proxies may fold or duplicate Cookie headers, so every Cookie header is
/// scanned and the first match wins.
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);

    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix(&prefix))
        .map(str::to_string)
}

// =============================================================================
// Tests
// =============================================================================
