use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

use super::scim::{ScimEmail, ScimName, ScimRole, ScimUser, Wso2Claims, STUDENT_ROLE};
use super::SubmitState;

pub const NETWORK_ERROR_MESSAGE: &str = "❌ Network or Server Error.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Involvement {
    #[default]
    Undergraduate,
    Postgraduate,
}

impl Involvement {
    pub const ALL: [Involvement; 2] = [Involvement::Undergraduate, Involvement::Postgraduate];

    pub fn as_str(&self) -> &'static str {
        match self {
            Involvement::Undergraduate => "Undergraduate",
            Involvement::Postgraduate => "Postgraduate",
        }
    }

    /// Four-character prefix of the temporary password
    pub fn password_prefix(&self) -> &'static str {
        match self {
            Involvement::Undergraduate => "UStu",
            Involvement::Postgraduate => "PStu",
        }
    }
}

impl fmt::Display for Involvement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Temporary password handed to the operator once, never stored
pub fn temporary_password(involvement: Involvement, student_id: &str) -> String {
    format!("{}{}", involvement.password_prefix(), student_id)
}

/// Manual creation form; `Default` is the empty form shown after a success
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProvisioningForm {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub student_id: String,
    pub involvement: Involvement,
    pub valid_thru: String,
}

impl ProvisioningForm {
    pub fn to_scim_user(&self, password: String) -> ScimUser {
        ScimUser {
            schemas: ScimUser::schemas(),
            user_name: self.email.clone(),
            password,
            name: ScimName {
                given_name: self.first_name.clone(),
                family_name: self.last_name.clone(),
            },
            emails: vec![ScimEmail {
                primary: true,
                value: self.email.clone(),
                email_type: "home".to_string(),
            }],
            wso2_extension: Wso2Claims {
                student_id: self.student_id.clone(),
                involvement: self.involvement.as_str().to_string(),
                valid_thru: self.valid_thru.clone(),
            },
            roles: vec![ScimRole {
                value: STUDENT_ROLE.to_string(),
            }],
        }
    }
}

/// Payload and password for one submission
#[derive(Debug, Clone)]
pub struct PreparedUser {
    pub payload: ScimUser,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CreateUserOutcome {
    Created { password: String },
    /// Non-201 reply; body is `{}` when empty or not JSON
    Rejected { status: u16, body: Value },
    TransportFailed,
}

impl CreateUserOutcome {
    pub fn message(&self) -> String {
        match self {
            CreateUserOutcome::Created { password } => {
                format!("✅ User created! Temporary password: {}", password)
            }
            CreateUserOutcome::Rejected { body, .. } => format!("❌ Error: {}", error_detail(body)),
            CreateUserOutcome::TransportFailed => NETWORK_ERROR_MESSAGE.to_string(),
        }
    }
}

/// A truthy `detail` field as display text, otherwise the whole body as JSON
pub fn error_detail(body: &Value) -> String {
    match body.get("detail") {
        Some(detail) if is_truthy(detail) => display_text(detail),
        _ => body.to_string(),
    }
}

/// Falsy values are null, false, 0 and the empty string
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// String coercion used in messages: arrays join their items with commas,
/// objects collapse to `[object Object]`
fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => display_text(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProvisioningFlow {
    pub form: ProvisioningForm,
    pub submit: SubmitState,
}

impl ProvisioningFlow {
    /// Start a submission; None while a previous one is still in flight
    pub fn begin(&mut self, form: ProvisioningForm) -> Option<PreparedUser> {
        if !self.submit.try_begin() {
            return None;
        }
        self.form = form;

        let password = temporary_password(self.form.involvement, &self.form.student_id);
        Some(PreparedUser {
            payload: self.form.to_scim_user(password.clone()),
            password,
        })
    }

    /// Record the outcome; the form resets to its empty defaults on success
    pub fn finish(&mut self, outcome: &CreateUserOutcome) {
        self.submit.finish(outcome.message());
        if matches!(outcome, CreateUserOutcome::Created { .. }) {
            self.form = ProvisioningForm::default();
        }
    }
}

/// POST the SCIM record to the create-user proxy (which adds the credential)
pub async fn create_user(
    http: &reqwest::Client,
    proxy_url: &str,
    prepared: &PreparedUser,
) -> CreateUserOutcome {
    let response = match http.post(proxy_url).json(&prepared.payload).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Create user request failed");
            return CreateUserOutcome::TransportFailed;
        }
    };

    let status = response.status();
    let body = match response.text().await {
        Ok(text) if !text.is_empty() => serde_json::from_str(&text).unwrap_or_else(|_| empty_object()),
        Ok(_) => empty_object(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read create user response body");
            empty_object()
        }
    };

    if status == StatusCode::CREATED {
        tracing::info!(
            event = "user_created",
            involvement = %prepared.payload.wso2_extension.involvement,
            "Student user created"
        );
        return CreateUserOutcome::Created {
            password: prepared.password.clone(),
        };
    }

    tracing::warn!(
        event = "user_create_rejected",
        status = status.as_u16(),
        "Create user request rejected"
    );
    CreateUserOutcome::Rejected {
        status: status.as_u16(),
        body,
    }
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}
