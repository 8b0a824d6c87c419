//! Client for the hosted identity provider's auth REST API.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::session::revalidate_deadline;
use crate::errors::AppError;
use crate::models::{UserMetadata, UserRole};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Values shipped in sample `.env` files; treated as unset.
const PLACEHOLDERS: [&str; 3] = ["your_supabase_url", "your_supabase_anon_key", "changeme"];

/// A user record as returned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// Tokens and user returned by a successful sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix time at which the access token expires.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: ProviderUser,
}

impl ProviderSession {
    /// When the access token stops being valid. Without either field the
    /// token is re-checked after the usual revalidation window.
    pub fn expires(&self) -> DateTime<Utc> {
        if let Some(at) = self.expires_at.and_then(|secs| DateTime::from_timestamp(secs, 0)) {
            return at;
        }
        match self.expires_in {
            Some(secs) => Utc::now() + chrono::Duration::seconds(secs.max(0)),
            None => revalidate_deadline(),
        }
    }
}

/// Result of a sign-up: a live session, or only a user when email
/// confirmation is pending.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    Session(ProviderSession),
    ConfirmationPending(ProviderUser),
}

/// Talks to `{auth_url}/auth/v1/...` with the public anon key.
#[derive(Clone)]
pub struct IdentityClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || PLACEHOLDERS.iter().any(|p| value.eq_ignore_ascii_case(p))
}

impl IdentityClient {
    /// Fails with a config error when the URL or key is missing or a placeholder.
    pub fn new(auth_url: Option<&str>, anon_key: Option<&str>) -> Result<Self, AppError> {
        let (Some(url), Some(key)) = (auth_url, anon_key) else {
            return Err(AppError::Config(
                "Identity provider not configured. Please set SYNCSENTA_AUTH_URL and SYNCSENTA_AUTH_ANON_KEY"
                    .to_string(),
            ));
        };
        if is_placeholder(url) || is_placeholder(key) {
            return Err(AppError::Config(
                "Identity provider settings still hold placeholder values".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: url.trim().trim_end_matches('/').to_string(),
            anon_key: key.trim().to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(self.url(path)).header("apikey", &self.anon_key)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderSession, AppError> {
        let response = self
            .post("/token")
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        match check(response).await {
            Ok(response) => Ok(response.json().await?),
            // The provider answers 400 for unknown users and wrong passwords alike
            Err(AppError::Validation(msg)) => Err(AppError::Unauthorized(msg)),
            Err(e) => Err(e),
        }
    }

    /// Register a user with portal metadata; `full_name` defaults to the
    /// local part of the email.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        role: UserRole,
        school_id: &str,
        county: &str,
    ) -> Result<SignUpOutcome, AppError> {
        let metadata = UserMetadata {
            role: Some(role.as_str().to_string()),
            school_id: Some(school_id.to_string()),
            county: Some(county.to_string()),
            full_name: email.split('@').next().map(str::to_string),
            avatar_url: None,
        };

        let response = self
            .post("/signup")
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()
            .await?;
        let body: Value = check(response).await?.json().await?;

        if body.get("access_token").is_some() {
            Ok(SignUpOutcome::Session(serde_json::from_value(body)?))
        } else {
            let user = body.get("user").cloned().unwrap_or(body);
            Ok(SignUpOutcome::ConfirmationPending(serde_json::from_value(user)?))
        }
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        let response = self
            .post("/logout")
            .bearer_auth(access_token)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// The user behind an access token obtained out of band (OAuth or recovery
    /// redirects).
    pub async fn get_user(&self, access_token: &str) -> Result<ProviderUser, AppError> {
        let response = self
            .client
            .get(self.url("/user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Browser URL that starts an OAuth sign-in with `provider`.
    pub fn oauth_url(&self, provider: &str, redirect_to: Option<&str>) -> Result<String, AppError> {
        if provider.is_empty() || !provider.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::Validation(format!(
                "Unsupported OAuth provider '{}'",
                provider
            )));
        }
        let mut url = reqwest::Url::parse(&self.url("/authorize"))
            .map_err(|e| AppError::Config(format!("Invalid identity provider URL: {}", e)))?;
        url.query_pairs_mut().append_pair("provider", provider);
        if let Some(redirect_to) = redirect_to {
            url.query_pairs_mut().append_pair("redirect_to", redirect_to);
        }
        Ok(url.to_string())
    }

    pub async fn send_password_reset(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), AppError> {
        let mut request = self.post("/recover").json(&json!({ "email": email }));
        if let Some(redirect_to) = redirect_to {
            request = request.query(&[("redirect_to", redirect_to)]);
        }
        check(request.send().await?).await?;
        Ok(())
    }

    pub async fn update_password(
        &self,
        access_token: &str,
        password: &str,
    ) -> Result<ProviderUser, AppError> {
        self.update_user(access_token, json!({ "password": password }))
            .await
    }

    /// Only the display fields are sent; role, school and county stay as they are.
    pub async fn update_metadata(
        &self,
        access_token: &str,
        full_name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<ProviderUser, AppError> {
        let mut data = serde_json::Map::new();
        if let Some(name) = full_name {
            data.insert("full_name".to_string(), json!(name));
        }
        if let Some(url) = avatar_url {
            data.insert("avatar_url".to_string(), json!(url));
        }
        self.update_user(access_token, json!({ "data": data }))
            .await
    }

    async fn update_user(&self, access_token: &str, body: Value) -> Result<ProviderUser, AppError> {
        let response = self
            .client
            .put(self.url("/user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }
}

/// Map a non-2xx provider answer to an error carrying the provider's message.
async fn check(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: Value = response.json().await.unwrap_or(Value::Null);
    let message = ["msg", "error_description", "message", "error"]
        .iter()
        .find_map(|field| body.get(*field).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Identity provider returned {}", status));

    tracing::warn!("Identity provider rejected request ({}): {}", status, message);
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthorized(message),
        s if s.is_client_error() => AppError::Validation(message),
        _ => AppError::Upstream(message),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_expiry_fields() {
        let at: ProviderSession = serde_json::from_value(json!({
            "access_token": "t",
            "expires_at": 1_900_000_000,
            "expires_in": 5,
            "user": {"id": "u1"}
        }))
        .unwrap();
        assert_eq!(at.expires().timestamp(), 1_900_000_000);

        let within: ProviderSession = serde_json::from_value(json!({
            "access_token": "t",
            "expires_in": 3600,
            "user": {"id": "u1"}
        }))
        .unwrap();
        let left = within.expires() - Utc::now();
        assert!(left.num_seconds() > 3500 && left.num_seconds() <= 3600);

        let bare: ProviderSession =
            serde_json::from_value(json!({"access_token": "t", "user": {"id": "u1"}})).unwrap();
        assert!(bare.expires() > Utc::now());
    }

    #[test]
    fn test_new_requires_real_settings() {
        for (url, key) in [
            (None, Some("key")),
            (Some("https://auth.example"), None),
            (Some("your_supabase_url"), Some("key")),
            (Some("https://auth.example"), Some("  ")),
        ] {
            let err = IdentityClient::new(url, key).err().unwrap();
            assert_eq!(err.error_code(), "CONFIG_ERROR");
        }
        assert!(IdentityClient::new(Some("https://auth.example/"), Some("anon")).is_ok());
    }

    #[test]
    fn test_oauth_url() {
        let client = IdentityClient::new(Some("https://auth.example/"), Some("anon")).unwrap();
        assert_eq!(
            client.oauth_url("google", None).unwrap(),
            "https://auth.example/auth/v1/authorize?provider=google"
        );
        let with_redirect = client
            .oauth_url("google", Some("https://portal.example/"))
            .unwrap();
        assert!(with_redirect.contains("redirect_to=https%3A%2F%2Fportal.example%2F"));
        assert!(client.oauth_url("../admin", None).is_err());
    }

    #[test]
    fn test_provider_user_tolerates_missing_metadata() {
        let user: ProviderUser = serde_json::from_value(json!({"id": "u1"})).unwrap();
        assert_eq!(user.user_metadata, UserMetadata::default());
        assert!(user.email.is_none());
    }
}
