//! Student learning settings.

use axum::{extract::State, Extension, Json};

use super::{success, ApiResult};
use crate::auth::CurrentSession;
use crate::errors::AppError;
use crate::models::{StudentSettings, StudentSettingsView, UserRole, MAX_GRADE, MIN_GRADE};
use crate::AppState;

/// GET /api/student/settings - Saved grade and subject, or `setupRequired`.
pub async fn get_student_settings(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> ApiResult<StudentSettingsView> {
    let identity = current.session.require_role(&[UserRole::Student])?;
    let settings = state.kv.student_settings(&identity.id).await?;
    success(StudentSettingsView {
        setup_required: settings.is_none(),
        settings,
    })
}

/// PUT /api/student/settings - Save grade and subject from the setup flow.
pub async fn save_student_settings(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(request): Json<StudentSettings>,
) -> ApiResult<StudentSettingsView> {
    let identity = current.session.require_role(&[UserRole::Student])?;
    if !(MIN_GRADE..=MAX_GRADE).contains(&request.grade_level) {
        return Err(AppError::Validation(format!(
            "Grade level must be between {} and {}",
            MIN_GRADE, MAX_GRADE
        )));
    }
    let settings = StudentSettings {
        grade_level: request.grade_level,
        current_subject: request.current_subject.trim().to_string(),
    };
    if settings.current_subject.is_empty() {
        return Err(AppError::Validation("Subject is required".to_string()));
    }

    state.kv.save_student_settings(&identity.id, &settings).await?;
    success(StudentSettingsView {
        setup_required: false,
        settings: Some(settings),
    })
}
