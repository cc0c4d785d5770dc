use super::authz::is_admin;
use crate::idp::IdentityClaims;

/// Shown in the card fields until the ID token has been decoded
pub const LOADING_PLACEHOLDER: &str = "Loading...";

/// Identity card view model derived from the ID token claims
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub student_id: String,
    pub photo_url: Option<String>,
    pub involvement: String,
    pub valid_thru: String,
    pub is_admin: bool,
}

impl UserInfo {
    pub fn placeholder() -> Self {
        Self {
            student_id: LOADING_PLACEHOLDER.to_string(),
            photo_url: None,
            involvement: LOADING_PLACEHOLDER.to_string(),
            valid_thru: LOADING_PLACEHOLDER.to_string(),
            is_admin: false,
        }
    }

    /// Missing claims fall back to "N/A" (ids, dates) or "Student" (involvement)
    pub fn from_claims(claims: &IdentityClaims) -> Self {
        let non_empty = |value: &Option<String>| value.clone().filter(|s| !s.is_empty());

        Self {
            student_id: non_empty(&claims.student_id).unwrap_or_else(|| "N/A".to_string()),
            photo_url: non_empty(&claims.picture),
            involvement: non_empty(&claims.involvement).unwrap_or_else(|| "Student".to_string()),
            valid_thru: non_empty(&claims.valid_thru).unwrap_or_else(|| "N/A".to_string()),
            is_admin: is_admin(&claims.roles),
        }
    }
}

/// Outcome of the single ID token decode per sign-in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IdentityLoad {
    #[default]
    Pending,
    Loaded(UserInfo),
    /// Decode failed for this sign-in; not retried
    Failed,
}

impl IdentityLoad {
    /// Card fields to render; placeholders unless loaded
    pub fn user_info(&self) -> UserInfo {
        match self {
            IdentityLoad::Loaded(info) => info.clone(),
            IdentityLoad::Pending | IdentityLoad::Failed => UserInfo::placeholder(),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, IdentityLoad::Loaded(info) if info.is_admin)
    }
}
