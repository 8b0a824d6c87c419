//! Identity endpoints under `/auth`.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Serialize;

use super::{success, ApiResult};
use crate::auth::{bearer_token, validation, Session, SignUpOutcome};
use crate::errors::AppError;
use crate::models::{
    OAuthQuery, OAuthRedirect, PasswordResetRequest, PasswordUpdateRequest, RecoveryQuery,
    RecoveryStatus, SignInRequest, SignUpRequest, UserRole,
};
use crate::AppState;

/// Result of sign-in or sign-up.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    /// Sign-up succeeded but the email must be confirmed before signing in
    pub confirmation_required: bool,
}

/// POST /auth/sign-in - Email and password sign-in.
pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> ApiResult<AuthResponse> {
    let email = request.email.trim();
    if email.is_empty() || request.password.is_empty() {
        return Err(AppError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let provider = state.identity_client()?.sign_in(email, &request.password).await?;
    let session = state
        .sessions
        .insert(&provider.access_token, &provider.user, provider.expires())
        .await;
    tracing::info!("User {} signed in", session.user_id);

    success(AuthResponse {
        access_token: Some(provider.access_token),
        refresh_token: provider.refresh_token,
        session: Some(session),
        confirmation_required: false,
    })
}

/// POST /auth/sign-up - Register with role, school and county.
pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> ApiResult<AuthResponse> {
    let email = request.email.trim();
    validation::validate_sign_up(email, &request.password, request.role)?;

    let county = request.county.trim();
    let school_id = request.school_id.trim();
    if county.is_empty() {
        return Err(AppError::Validation("County is required".to_string()));
    }
    if school_id.is_empty() && request.role != UserRole::CountyOfficer {
        return Err(AppError::Validation("Please select your school".to_string()));
    }

    let outcome = state
        .identity_client()?
        .sign_up(email, &request.password, request.role, school_id, county)
        .await?;

    let response = match outcome {
        SignUpOutcome::Session(provider) => {
            let session = state
                .sessions
                .insert(&provider.access_token, &provider.user, provider.expires())
                .await;
            AuthResponse {
                access_token: Some(provider.access_token),
                refresh_token: provider.refresh_token,
                session: Some(session),
                confirmation_required: false,
            }
        }
        SignUpOutcome::ConfirmationPending(user) => {
            tracing::info!("User {} signed up, awaiting email confirmation", user.id);
            AuthResponse {
                access_token: None,
                refresh_token: None,
                session: None,
                confirmation_required: true,
            }
        }
    };
    success(response)
}

/// POST /auth/sign-out - End the session behind the bearer token.
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<()> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    if let Some(session) = state.sessions.remove(token).await {
        state.chats.remove(&session.user_id).await;
        tracing::info!("User {} signed out", session.user_id);
    }

    // The local session is gone either way; a provider failure only means the
    // token lives on there until it expires.
    if let Ok(client) = state.identity_client() {
        if let Err(e) = client.sign_out(token).await {
            tracing::warn!("Identity provider sign-out failed: {}", e);
        }
    }
    success(())
}

/// GET /auth/oauth/{provider} - URL that starts an OAuth sign-in.
pub async fn oauth_url(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<OAuthQuery>,
) -> ApiResult<OAuthRedirect> {
    let url = state
        .identity_client()?
        .oauth_url(&provider, query.redirect_to.as_deref())?;
    success(OAuthRedirect { url })
}

/// POST /auth/recover - Email a password-reset link.
pub async fn send_password_reset(
    State(state): State<AppState>,
    Json(request): Json<PasswordResetRequest>,
) -> ApiResult<()> {
    let email = request.email.trim();
    if email.is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }
    state
        .identity_client()?
        .send_password_reset(email, request.redirect_to.as_deref())
        .await?;
    success(())
}

/// POST /auth/password - Set a new password using the token from a recovery link.
pub async fn update_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PasswordUpdateRequest>,
) -> ApiResult<Session> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;
    validation::validate_password(&request.password)?;

    let user = state
        .identity_client()?
        .update_password(token, &request.password)
        .await?;
    success(state.sessions.update_user(token, &user).await)
}

/// GET /auth/recovery?fragment= - Detect the password-reset redirect.
pub async fn recovery_status(Query(query): Query<RecoveryQuery>) -> ApiResult<RecoveryStatus> {
    let access_token = validation::recovery_token(&query.fragment).map(str::to_string);
    success(RecoveryStatus {
        recovery: validation::is_recovery_fragment(&query.fragment),
        access_token,
    })
}
