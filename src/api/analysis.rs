//! Staff analytics and AI gateway health.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use serde_json::Value;

use super::{success, ApiResult};
use crate::ai::GatewayErrorKind;
use crate::auth::CurrentSession;
use crate::dashboard;
use crate::errors::AppError;
use crate::models::{
    AnalysisAnswer, AnalysisKind, AnalysisQuery, EquityQuery, HeatmapEntry, Identity, UserRole,
};
use crate::AppState;

fn kind_from_path(kind: &str) -> Result<AnalysisKind, AppError> {
    match kind {
        "school-head" => Ok(AnalysisKind::SchoolHeadOperational),
        "teacher" => Ok(AnalysisKind::TeacherPerformance),
        "county-strategic" => Ok(AnalysisKind::CountyStrategic),
        other => Err(AppError::NotFound(format!("Unknown analysis '{}'", other))),
    }
}

fn role_for(kind: AnalysisKind) -> UserRole {
    match kind {
        AnalysisKind::SchoolHeadOperational => UserRole::SchoolHead,
        AnalysisKind::TeacherPerformance => UserRole::Teacher,
        AnalysisKind::CountyStrategic => UserRole::CountyOfficer,
    }
}

/// The caller's dashboard data, handed to the model as context.
fn analysis_context(kind: AnalysisKind, identity: &Identity) -> Result<Value, AppError> {
    let value = match kind {
        AnalysisKind::SchoolHeadOperational => {
            serde_json::to_value(dashboard::school_head_dashboard(&identity.school_id))?
        }
        AnalysisKind::TeacherPerformance => {
            serde_json::to_value(dashboard::teacher_dashboard(&identity.id))?
        }
        AnalysisKind::CountyStrategic => {
            serde_json::to_value(dashboard::county_dashboard(&identity.county))?
        }
    };
    Ok(value)
}

/// POST /api/analysis/{kind} - Narrative answer about the caller's dashboard.
///
/// Failures other than missing configuration degrade to a fixed message.
pub async fn analyze(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(kind): Path<String>,
    Json(request): Json<AnalysisQuery>,
) -> ApiResult<AnalysisAnswer> {
    let kind = kind_from_path(&kind)?;
    let identity = current.session.require_role(&[role_for(kind)])?;
    let query = request.query.trim();
    if query.is_empty() {
        return Err(AppError::Validation("Please enter a question".to_string()));
    }

    let gateway = state.gateway()?;
    let context = analysis_context(kind, identity)?;

    match gateway.analyze(kind, query, &context).await {
        Ok(analysis) => success(AnalysisAnswer {
            analysis,
            degraded: false,
        }),
        Err(e) if e.kind == GatewayErrorKind::Config => Err(e.into()),
        Err(e) => {
            tracing::warn!("{:?} analysis failed, serving fallback: {}", kind, e);
            success(AnalysisAnswer {
                analysis: kind.fallback_message().to_string(),
                degraded: true,
            })
        }
    }
}

/// POST /api/analysis/equity - Resource/score heatmap for a county, defaulting
/// to the officer's own.
pub async fn equity(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(query): Json<EquityQuery>,
) -> ApiResult<Vec<HeatmapEntry>> {
    let identity = current.session.require_role(&[UserRole::CountyOfficer])?;
    let county = query
        .county
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(&identity.county);

    let heatmap = state.gateway()?.equity(county).await?;
    success(heatmap)
}

#[derive(Debug, Serialize)]
pub struct AiHealth {
    pub configured: bool,
    pub backend: Option<&'static str>,
    pub healthy: bool,
}

/// GET /api/ai/health - Whether the AI backend is configured and answering.
pub async fn ai_health(State(state): State<AppState>) -> ApiResult<AiHealth> {
    let Ok(gateway) = state.gateway() else {
        return success(AiHealth {
            configured: false,
            backend: None,
            healthy: false,
        });
    };
    let healthy = gateway.health().await;
    success(AiHealth {
        configured: true,
        backend: Some(gateway.backend_name()),
        healthy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_path() {
        assert_eq!(kind_from_path("teacher").unwrap(), AnalysisKind::TeacherPerformance);
        assert_eq!(role_for(AnalysisKind::CountyStrategic), UserRole::CountyOfficer);
        assert_eq!(kind_from_path("equity").unwrap_err().error_code(), "NOT_FOUND");
    }
}
