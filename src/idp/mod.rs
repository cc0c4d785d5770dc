//! Identity provider client
//!
//! This module wraps everything the portal needs from Asgardeo.
//!
//! ## Structure
//!
//! - `client`: OAuth2/OIDC client (sign-in URL, code exchange, refresh, sign-out URL)
//! - `jwt`: ID token verification against the tenant JWKS, with caching
//! - `session`: per-browser sign-in phase and the derived `SessionState`
//! - `helpers`: pure helpers (cookies, logout URL, unverified payload reads)
//! - `handlers`: HTTP handlers for login, callback and logout
//!
//! ## Authentication Flow
//!
//! 1. User visits `/auth/login` → redirect to Asgardeo with state + PKCE challenge
//! 2. Asgardeo authenticates → redirect to `/auth/callback`
//! 3. Portal exchanges the code, decodes the ID token once, redirects to `/`
//! 4. User posts `/auth/logout` → session dropped → Asgardeo end-session

pub mod client;
pub mod handlers;
pub mod helpers;
pub mod jwt;
pub mod session;

pub use client::{AccessToken, IdentityProviderClient, SignInRequest};
pub use handlers::{callback_handler, login_handler, logout_complete_handler, logout_handler};
pub use jwt::{IdTokenVerifier, IdentityClaims};
pub use session::{AuthPhase, SessionProfile, SessionState, TokenSet};

#[derive(Debug, thiserror::Error)]
pub enum IdpError {
    #[error("identity provider endpoint misconfigured: {0}")]
    Endpoint(String),
    #[error("authorization code exchange failed: {0}")]
    TokenExchange(String),
    #[error("refresh token exchange failed: {0}")]
    Refresh(String),
    #[error("access token expired and no refresh token is available")]
    AccessTokenUnavailable,
}
