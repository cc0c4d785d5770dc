//! Admin workflow
//!
//! Two independent request flows behind a tab toggle:
//!
//! - `invite`: email invitation sent straight to Asgardeo with the admin's
//!   access token
//! - `provisioning`: manual student creation routed through the SCIM proxy
//!
//! Each flow follows begin → send → finish. `begin` marks the flow pending
//! and refuses a second submission while one is in flight; `send` performs
//! the HTTP call without touching session state; `finish` records the
//! operator-facing message and clears the pending flag.

pub mod invite;
pub mod provisioning;
pub mod scim;

pub use invite::{send_invite, InviteFlow, InviteForm, InviteOutcome};
pub use provisioning::{
    create_user, temporary_password, CreateUserOutcome, Involvement, PreparedUser,
    ProvisioningFlow, ProvisioningForm,
};
pub use scim::ScimUser;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminTab {
    #[default]
    Invite,
    Add,
}

/// Pending flag and last message of one flow
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitState {
    pending: bool,
    message: Option<String>,
}

impl SubmitState {
    /// Mark pending and clear the previous message; false if already pending
    pub fn try_begin(&mut self) -> bool {
        if self.pending {
            return false;
        }
        self.pending = true;
        self.message = None;
        true
    }

    pub fn finish(&mut self, message: String) {
        self.pending = false;
        self.message = Some(message);
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdminPortal {
    pub tab: AdminTab,
    pub invite: InviteFlow,
    pub provisioning: ProvisioningFlow,
}
