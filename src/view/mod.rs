//! View controller
//!
//! Picks exactly one page for the current session: a single `match` over
//! `ViewState` replaces a chain of early returns.

pub mod authz;
pub mod models;

pub use authz::{is_admin, ADMIN_ROLE};
pub use models::{IdentityLoad, UserInfo, LOADING_PLACEHOLDER};

use crate::idp::SessionState;

/// The four mutually exclusive pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    Loading,
    Unauthenticated,
    Member(CardView),
    Admin,
}

/// Everything the identity card page renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub display_name: String,
    pub email: String,
    pub user: UserInfo,
    pub avatar_url: String,
    /// The ID token could not be decoded for this sign-in
    pub identity_failed: bool,
}

impl CardView {
    pub fn title(&self) -> &'static str {
        if self.user.is_admin {
            "ADMINISTRATOR ID"
        } else {
            "STUDENT ID"
        }
    }

    pub fn id_label(&self) -> &'static str {
        if self.user.is_admin {
            "Administrator ID"
        } else {
            "Student ID"
        }
    }
}

pub fn derive_view(session: &SessionState, identity: &IdentityLoad, show_admin: bool) -> ViewState {
    if session.is_loading {
        return ViewState::Loading;
    }
    if !session.is_authenticated {
        return ViewState::Unauthenticated;
    }
    if show_admin {
        return ViewState::Admin;
    }

    let user = identity.user_info();
    ViewState::Member(CardView {
        display_name: session.display_name.clone(),
        email: session.email.clone(),
        avatar_url: avatar_url(user.photo_url.as_deref(), &session.display_name),
        user,
        identity_failed: *identity == IdentityLoad::Failed,
    })
}

/// Profile photo, or a generated initials avatar keyed by display name
pub fn avatar_url(photo_url: Option<&str>, display_name: &str) -> String {
    match photo_url.filter(|p| !p.is_empty()) {
        Some(photo) => photo.to_string(),
        None => format!(
            "https://api.dicebear.com/9.x/initials/svg?seed={}&backgroundColor=0369a1&textColor=ffffff",
            urlencoding::encode(display_name)
        ),
    }
}
