//! Bearer-session authentication.
//!
//! Access tokens are issued by the identity provider. A token the store has
//! not seen yet (e.g. one handed back by an OAuth redirect), or one whose
//! cached session has expired, is resolved against the provider and cached
//! until it is due for another check.

mod provider;
mod session;
pub mod validation;

pub use provider::{IdentityClient, ProviderSession, ProviderUser, SignUpOutcome};
pub use session::{revalidate_deadline, Session, SessionStore};

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::errors::AppError;
use crate::AppState;

/// Session attached to a request by [`require_session`].
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub token: String,
    pub session: Session,
}

/// Token from an `Authorization: Bearer ...` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Rejects requests without a live session and exposes the session to handlers.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()).map(str::to_string) else {
        return AppError::Unauthorized("Missing bearer token".to_string()).into_response();
    };

    match resolve(&state, &token).await {
        Ok(session) => {
            request
                .extensions_mut()
                .insert(CurrentSession { token, session });
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

async fn resolve(state: &AppState, token: &str) -> Result<Session, AppError> {
    if let Some(session) = state.sessions.get(token).await {
        return Ok(session);
    }

    // Unknown tokens are only worth a provider round-trip when one is configured.
    let client = state
        .identity_client()
        .map_err(|_| AppError::Unauthorized("Invalid or expired session".to_string()))?;
    let user = client.get_user(token).await.map_err(|e| match e {
        AppError::Validation(msg) | AppError::Unauthorized(msg) => AppError::Unauthorized(msg),
        other => other,
    })?;
    tracing::debug!("Restored session for user {} from provider", user.id);
    Ok(state.sessions.insert(token, &user, revalidate_deadline()).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);
    }
}
