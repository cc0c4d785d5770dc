//! Digital student ID library
//!
//! Provides the portal (Asgardeo sign-in, identity card, admin workflows)
//! and the SCIM create-user proxy.

#![deny(dead_code)]

pub mod admin;
pub mod config;
pub mod idp;
pub mod proxy;
pub mod secret;
pub mod session;
pub mod view;
pub mod web;

use config::Config;
use idp::IdentityProviderClient;
use session::SessionStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub idp: Arc<IdentityProviderClient>,
    pub sessions: Arc<SessionStore>,
    /// Shared client for the invitation and create-user calls
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http = idp::helpers::create_http_client(config.http)
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;
        let idp = IdentityProviderClient::new(&config, http.clone())
            .map_err(|e| anyhow::anyhow!("Failed to initialize Asgardeo client: {}", e))?;
        let sessions = SessionStore::new(std::time::Duration::from_secs(config.session_ttl_secs));

        Ok(Self {
            config: Arc::new(config),
            idp: Arc::new(idp),
            sessions: Arc::new(sessions),
            http,
        })
    }
}
