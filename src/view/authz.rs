//! Role checks for UI gating
//!
//! This is UI-only gating; Asgardeo remains the enforcement point for every
//! privileged API call the admin portal makes.

/// Role that unlocks the admin portal entry point
pub const ADMIN_ROLE: &str = "UniversityAdmin";

/// Whether the role set contains the administrator role (exact match)
pub fn is_admin(roles: &[String]) -> bool {
    roles.iter().any(|role| role == ADMIN_ROLE)
}
