//! In-memory portal session store
//!
//! Each browser gets a random `sid` cookie pointing at a `PortalSession`.
//! Access goes through short closures so the lock is never held across an
//! outbound HTTP call.

use oauth2::CsrfToken;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::admin::AdminPortal;
use crate::idp::AuthPhase;
use crate::view::IdentityLoad;

pub const SESSION_COOKIE: &str = "sid";

#[derive(Debug)]
pub struct PortalSession {
    pub auth: AuthPhase,
    pub identity: IdentityLoad,
    /// Admin portal toggle; only switched on while the loaded user is an admin
    pub show_admin: bool,
    pub admin: AdminPortal,
    created_at: Instant,
}

impl PortalSession {
    fn new() -> Self {
        Self {
            auth: AuthPhase::SignedOut,
            identity: IdentityLoad::Pending,
            show_admin: false,
            admin: AdminPortal::default(),
            created_at: Instant::now(),
        }
    }

    /// Forget everything tied to the previous sign-in
    pub fn reset_identity(&mut self) {
        self.identity = IdentityLoad::Pending;
        self.show_admin = false;
        self.admin = AdminPortal::default();
    }
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, PortalSession>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Create an empty session and return its id. Expired sessions are purged.
    pub async fn create(&self) -> String {
        let id = CsrfToken::new_random().secret().clone();
        let mut sessions = self.sessions.write().await;

        let before = sessions.len();
        sessions.retain(|_, s| s.created_at.elapsed() < self.ttl);
        let purged = before - sessions.len();
        if purged > 0 {
            tracing::info!(purged = purged, "Purged expired portal sessions");
        }

        sessions.insert(id.clone(), PortalSession::new());
        id
    }

    /// Run `f` against a session, if it exists and has not expired
    pub async fn read<R>(&self, id: &str, f: impl FnOnce(&PortalSession) -> R) -> Option<R> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .filter(|s| s.created_at.elapsed() < self.ttl)
            .map(f)
    }

    /// Run `f` against a mutable session, if it exists and has not expired
    pub async fn update<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut PortalSession) -> R,
    ) -> Option<R> {
        let mut sessions = self.sessions.write().await;
        sessions
            .get_mut(id)
            .filter(|s| s.created_at.elapsed() < self.ttl)
            .map(f)
    }

    /// Move a live session under a fresh id; the old id stops resolving
    pub async fn rotate(&self, id: &str) -> Option<String> {
        let mut sessions = self.sessions.write().await;
        let mut session = sessions
            .remove(id)
            .filter(|s| s.created_at.elapsed() < self.ttl)?;
        session.created_at = Instant::now();

        let new_id = CsrfToken::new_random().secret().clone();
        sessions.insert(new_id.clone(), session);
        Some(new_id)
    }

    pub async fn remove(&self, id: &str) -> Option<PortalSession> {
        self.sessions.write().await.remove(id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
