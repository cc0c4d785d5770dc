use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use super::SubmitState;

pub const NETWORK_ERROR_MESSAGE: &str =
    "❌ Network or CORS Error: The request succeeded, but the response couldn't be read.";

#[derive(Debug, Clone, Deserialize)]
pub struct InviteForm {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InviteOutcome {
    Sent,
    Rejected { status: u16, body: String },
    /// Token acquisition, connection, or body read failed
    TransportFailed,
}

impl InviteOutcome {
    pub fn message(&self, email: &str) -> String {
        match self {
            InviteOutcome::Sent => format!("✅ Success! Invitation sent to {}.", email),
            InviteOutcome::Rejected { status, body } if body.is_empty() => {
                format!("❌ Error: Request failed with status {}", status)
            }
            InviteOutcome::Rejected { body, .. } => format!("❌ Error: {}", body),
            InviteOutcome::TransportFailed => NETWORK_ERROR_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InviteFlow {
    pub email: String,
    pub submit: SubmitState,
}

impl InviteFlow {
    /// Start a submission; returns the address to invite, or None while a
    /// previous invitation is still in flight
    pub fn begin(&mut self, email: String) -> Option<String> {
        if !self.submit.try_begin() {
            return None;
        }
        self.email = email;
        Some(self.email.clone())
    }

    /// Record the outcome; the field is cleared only after a successful send
    pub fn finish(&mut self, email: &str, outcome: &InviteOutcome) {
        self.submit.finish(outcome.message(email));
        if *outcome == InviteOutcome::Sent {
            self.email.clear();
        }
    }
}

/// POST `{email}` to the Asgardeo guest invitation endpoint
pub async fn send_invite(
    http: &reqwest::Client,
    invite_url: &str,
    access_token: &str,
    email: &str,
) -> InviteOutcome {
    let response = match http
        .post(invite_url)
        .bearer_auth(access_token)
        .json(&json!({ "email": email }))
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Invitation request failed");
            return InviteOutcome::TransportFailed;
        }
    };

    let status = response.status();
    if status == StatusCode::CREATED {
        tracing::info!(event = "invite_sent", "Invitation sent");
        return InviteOutcome::Sent;
    }

    match response.text().await {
        Ok(body) => {
            tracing::warn!(
                event = "invite_rejected",
                status = status.as_u16(),
                "Asgardeo rejected the invitation"
            );
            InviteOutcome::Rejected {
                status: status.as_u16(),
                body,
            }
        }
        Err(e) => {
            tracing::error!(error = %e, status = status.as_u16(), "Failed to read invitation response");
            InviteOutcome::TransportFailed
        }
    }
}
