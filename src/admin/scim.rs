//! SCIM 2.0 user record (RFC 7643) with the WSO2 custom claim extension

use serde::{Deserialize, Serialize};

pub const CORE_USER_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
pub const WSO2_EXTENSION_SCHEMA: &str = "urn:scim:wso2:schema";

/// Role assigned to every manually created user
pub const STUDENT_ROLE: &str = "Student";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimUser {
    pub schemas: Vec<String>,
    /// The email address doubles as the username
    pub user_name: String,
    pub password: String,
    pub name: ScimName,
    pub emails: Vec<ScimEmail>,
    /// No userStoreDomain, so Asgardeo uses the PRIMARY store
    #[serde(rename = "urn:scim:wso2:schema")]
    pub wso2_extension: Wso2Claims,
    pub roles: Vec<ScimRole>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimName {
    pub given_name: String,
    pub family_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScimEmail {
    pub primary: bool,
    pub value: String,
    #[serde(rename = "type")]
    pub email_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wso2Claims {
    #[serde(rename = "http://wso2.org/claims/student_id")]
    pub student_id: String,
    #[serde(rename = "http://wso2.org/claims/involvement")]
    pub involvement: String,
    #[serde(rename = "http://wso2.org/claims/valid_thru")]
    pub valid_thru: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScimRole {
    pub value: String,
}

impl ScimUser {
    pub fn schemas() -> Vec<String> {
        vec![
            CORE_USER_SCHEMA.to_string(),
            WSO2_EXTENSION_SCHEMA.to_string(),
        ]
    }
}
