//! Sign-in state held for one browser session

use std::time::{Duration, Instant};

use crate::secret::Secret;

/// Access tokens within this window of expiry are treated as expired
const EXPIRY_SKEW: Duration = Duration::from_secs(30);

/// Tokens issued by the identity provider for a signed-in session
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: Secret,
    pub expires_at: Instant,
    pub refresh_token: Option<Secret>,
    pub id_token: Option<String>,
}

impl TokenSet {
    pub fn is_expired(&self) -> bool {
        Instant::now() + EXPIRY_SKEW >= self.expires_at
    }
}

/// Values remembered between the sign-in redirect and the callback
#[derive(Debug, Clone)]
pub struct PendingSignIn {
    pub csrf_state: String,
    pub pkce_verifier: Secret,
}

/// Display fields for the signed-in user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionProfile {
    pub display_name: String,
    pub email: String,
}

/// Where a session is in the sign-in lifecycle
#[derive(Debug, Clone, Default)]
pub enum AuthPhase {
    #[default]
    SignedOut,
    /// Browser was sent to the authorize endpoint
    Redirected(PendingSignIn),
    /// Callback received; code exchange and ID token decode in progress
    Exchanging,
    SignedIn {
        tokens: TokenSet,
        profile: SessionProfile,
    },
}

impl AuthPhase {
    pub fn session_state(&self) -> SessionState {
        match self {
            AuthPhase::SignedOut | AuthPhase::Redirected(_) => SessionState::default(),
            AuthPhase::Exchanging => SessionState {
                is_loading: true,
                ..SessionState::default()
            },
            AuthPhase::SignedIn { profile, .. } => SessionState {
                is_loading: false,
                is_authenticated: true,
                display_name: profile.display_name.clone(),
                email: profile.email.clone(),
            },
        }
    }

    pub fn tokens(&self) -> Option<&TokenSet> {
        match self {
            AuthPhase::SignedIn { tokens, .. } => Some(tokens),
            _ => None,
        }
    }

    pub fn tokens_mut(&mut self) -> Option<&mut TokenSet> {
        match self {
            AuthPhase::SignedIn { tokens, .. } => Some(tokens),
            _ => None,
        }
    }
}

/// Read-only session view consumed by the view controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub is_loading: bool,
    pub is_authenticated: bool,
    pub display_name: String,
    pub email: String,
}
