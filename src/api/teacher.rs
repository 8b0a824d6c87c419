//! Teacher hub endpoints: classes, registers and tutor customization.

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::{success, ApiResult};
use crate::auth::CurrentSession;
use crate::dashboard;
use crate::errors::AppError;
use crate::models::{
    AttendanceMap, AttendanceSlot, AttendanceToggle, Customization, RegisterEntry, TeacherClass,
    UserRole,
};
use crate::AppState;

/// GET /api/teacher/classes - The teacher's classes.
pub async fn list_classes(
    Extension(current): Extension<CurrentSession>,
) -> ApiResult<Vec<TeacherClass>> {
    let identity = current.session.require_role(&[UserRole::Teacher])?;
    success(dashboard::teacher_classes(&identity.id))
}

/// Default register with stored attendance applied on top.
async fn load_register(
    state: &AppState,
    teacher_id: &str,
    class_id: &str,
) -> Result<Vec<RegisterEntry>, AppError> {
    if !dashboard::teacher_classes(teacher_id)
        .iter()
        .any(|class| class.id == class_id)
    {
        return Err(AppError::NotFound(format!("Class {} not found", class_id)));
    }

    let saved = state.kv.attendance(class_id).await?;
    let mut register = dashboard::student_register(class_id);
    for entry in &mut register {
        if let Some(attendance) = saved.get(&entry.id) {
            entry.attendance = *attendance;
        }
    }
    Ok(register)
}

/// GET /api/teacher/classes/{id}/register - Students and their attendance.
pub async fn get_register(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(class_id): Path<String>,
) -> ApiResult<Vec<RegisterEntry>> {
    let identity = current.session.require_role(&[UserRole::Teacher])?;
    success(load_register(&state, &identity.id, &class_id).await?)
}

/// PUT /api/teacher/classes/{id}/attendance - Flip one morning/evening mark.
pub async fn toggle_attendance(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(class_id): Path<String>,
    Json(request): Json<AttendanceToggle>,
) -> ApiResult<Vec<RegisterEntry>> {
    let identity = current.session.require_role(&[UserRole::Teacher])?;
    let mut register = load_register(&state, &identity.id, &class_id).await?;

    let entry = register
        .iter_mut()
        .find(|entry| entry.id == request.student_id)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Student {} is not in class {}",
                request.student_id, class_id
            ))
        })?;
    match request.slot {
        AttendanceSlot::Morning => entry.attendance.morning = !entry.attendance.morning,
        AttendanceSlot::Evening => entry.attendance.evening = !entry.attendance.evening,
    }

    // The whole register is saved so later reads don't depend on the defaults.
    let map: AttendanceMap = register
        .iter()
        .map(|entry| (entry.id.clone(), entry.attendance))
        .collect();
    state.kv.save_attendance(&class_id, &map).await?;
    success(register)
}

/// GET /api/teacher/customization - Guidance given to the AI tutor.
pub async fn get_customization(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> ApiResult<Customization> {
    let identity = current.session.require_role(&[UserRole::Teacher])?;
    let text = state.kv.customization(&identity.id).await?.unwrap_or_default();
    success(Customization { text })
}

/// PUT /api/teacher/customization - Replace the guidance; blank text clears it.
pub async fn save_customization(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(request): Json<Customization>,
) -> ApiResult<Customization> {
    let identity = current.session.require_role(&[UserRole::Teacher])?;
    state.kv.save_customization(&identity.id, &request.text).await?;
    tracing::info!("Teacher {} updated AI tutor customization", identity.id);
    success(request)
}
