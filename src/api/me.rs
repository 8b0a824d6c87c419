//! Signed-in user endpoints: profile, navigation and dashboard.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::{success, ApiResult};
use crate::auth::{CurrentSession, Session};
use crate::dashboard;
use crate::errors::AppError;
use crate::models::{Dashboard, ProfileUpdate, UserRole};
use crate::views::{Navigation, View};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    #[serde(flatten)]
    pub session: Session,
    pub profile_complete: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ViewsQuery {
    #[serde(default)]
    pub active: Option<String>,
}

/// GET /api/me - The current session.
pub async fn get_me(Extension(current): Extension<CurrentSession>) -> ApiResult<MeResponse> {
    let profile_complete = current.session.profile_complete();
    success(MeResponse {
        session: current.session,
        profile_complete,
    })
}

/// PUT /api/me/profile - Update display name and avatar.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(request): Json<ProfileUpdate>,
) -> ApiResult<Session> {
    let display_name = request
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let avatar_ref = request
        .avatar_ref
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if display_name.is_none() && avatar_ref.is_none() {
        return Err(AppError::Validation(
            "Nothing to update: provide displayName or avatarRef".to_string(),
        ));
    }

    let user = state
        .identity_client()?
        .update_metadata(&current.token, display_name, avatar_ref)
        .await?;
    success(state.sessions.update_user(&current.token, &user).await)
}

/// GET /api/views - Views the user may open, with the header title.
pub async fn get_views(
    Extension(current): Extension<CurrentSession>,
    Query(query): Query<ViewsQuery>,
) -> ApiResult<Navigation> {
    let Some(identity) = current.session.identity.as_ref() else {
        return success(Navigation::empty());
    };
    let active = query.active.as_deref().and_then(View::parse);
    success(Navigation::for_role(identity.role, active))
}

/// GET /api/dashboard - Dashboard data for the user's role, or `null` when
/// the role has none or the profile is incomplete.
pub async fn get_dashboard(
    Extension(current): Extension<CurrentSession>,
) -> ApiResult<Option<Dashboard>> {
    let Some(identity) = current.session.identity.as_ref() else {
        tracing::warn!(
            "Dashboard suppressed for user {} with incomplete profile",
            current.session.user_id
        );
        return success(None);
    };

    let data = match identity.role {
        UserRole::Teacher => Some(Dashboard::Teacher(dashboard::teacher_dashboard(&identity.id))),
        UserRole::SchoolHead => Some(Dashboard::SchoolHead(dashboard::school_head_dashboard(
            &identity.school_id,
        ))),
        UserRole::CountyOfficer => {
            Some(Dashboard::County(dashboard::county_dashboard(&identity.county)))
        }
        UserRole::Student | UserRole::Parent | UserRole::MinistryOfficial => None,
    };
    success(data)
}
