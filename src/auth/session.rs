//! In-memory session store: access token to signed-in user.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use super::provider::ProviderUser;
use crate::errors::AppError;
use crate::models::{Identity, UserRole};

/// How long a token the provider vouched for is trusted before asking again.
pub const REVALIDATE_AFTER_SECS: i64 = 300;

/// Deadline for a token that was just checked against the provider.
pub fn revalidate_deadline() -> DateTime<Utc> {
    Utc::now() + Duration::seconds(REVALIDATE_AFTER_SECS)
}

/// A signed-in user.
///
/// `identity` is `None` when the provider metadata lacks role, school or
/// county. Such a session stays valid, but no dashboard is shown for it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
    pub identity: Option<Identity>,
    /// After this instant the token must be checked with the provider again.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn from_user(user: &ProviderUser, expires_at: DateTime<Utc>) -> Self {
        let identity = Identity::from_metadata(&user.id, user.email.as_deref(), &user.user_metadata);
        if identity.is_none() {
            tracing::warn!(
                "User metadata (role, school_id, county) is incomplete for user {}",
                user.id
            );
        }
        Self {
            user_id: user.id.clone(),
            email: user.email.clone(),
            identity,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn profile_complete(&self) -> bool {
        self.identity.is_some()
    }

    /// The complete identity, or an error for sessions without one.
    pub fn identity(&self) -> Result<&Identity, AppError> {
        self.identity.as_ref().ok_or_else(|| {
            AppError::Forbidden(
                "Your profile is incomplete: role, school and county are required".to_string(),
            )
        })
    }

    /// The complete identity, only if it has one of `roles`.
    pub fn require_role(&self, roles: &[UserRole]) -> Result<&Identity, AppError> {
        let identity = self.identity()?;
        if roles.contains(&identity.role) {
            Ok(identity)
        } else {
            Err(AppError::Forbidden(format!(
                "This view is not available to the {} role",
                identity.role.as_str()
            )))
        }
    }
}

/// Live sessions keyed by access token.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The live session for `token`. An expired entry is evicted and reported
    /// as absent.
    pub async fn get(&self, token: &str) -> Option<Session> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                None => return None,
                Some(session) if !session.is_expired(now) => return Some(session.clone()),
                Some(_) => {}
            }
        }

        let mut sessions = self.sessions.write().await;
        if sessions.get(token).is_some_and(|s| s.is_expired(now)) {
            if let Some(session) = sessions.remove(token) {
                tracing::debug!("Session for user {} expired", session.user_id);
            }
        }
        None
    }

    /// Store the session for `token`, valid until `expires_at`. Expired
    /// entries of other tokens are pruned on the way.
    pub async fn insert(
        &self,
        token: &str,
        user: &ProviderUser,
        expires_at: DateTime<Utc>,
    ) -> Session {
        let session = Session::from_user(user, expires_at);
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| !s.is_expired(now));
        sessions.insert(token.to_string(), session.clone());
        session
    }

    /// Replace the user record behind `token`, keeping the expiry of a cached
    /// session.
    pub async fn update_user(&self, token: &str, user: &ProviderUser) -> Session {
        let expires_at = self
            .get(token)
            .await
            .map(|s| s.expires_at)
            .unwrap_or_else(revalidate_deadline);
        self.insert(token, user, expires_at).await
    }

    pub async fn remove(&self, token: &str) -> Option<Session> {
        self.sessions.write().await.remove(token)
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
