//! Request and response bodies for the `/auth` endpoints.

use serde::{Deserialize, Serialize};

use super::UserRole;

#[derive(Debug, Clone, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub role: UserRole,
    #[serde(default)]
    pub school_id: String,
    pub county: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetRequest {
    pub email: String,
    #[serde(default)]
    pub redirect_to: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordUpdateRequest {
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthQuery {
    #[serde(default)]
    pub redirect_to: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecoveryQuery {
    pub fragment: String,
}

/// Whether a redirect fragment starts the password-reset flow.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryStatus {
    pub recovery: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OAuthRedirect {
    pub url: String,
}
