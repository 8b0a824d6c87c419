//! School directory endpoints.

use axum::{
    extract::{Query, State},
    Json,
};

use super::{success, ApiResult};
use crate::models::{CreateSchoolRequest, School, SchoolQuery};
use crate::AppState;

/// GET /api/schools - All schools by name, or those of one county.
pub async fn list_schools(
    State(state): State<AppState>,
    Query(query): Query<SchoolQuery>,
) -> ApiResult<Vec<School>> {
    let schools = match query.county.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(county) => state.repo.list_schools_by_county(county).await?,
        None => state.repo.list_schools().await?,
    };
    success(schools)
}

/// POST /api/schools - Register a school; `(name, county)` must be new.
pub async fn add_school(
    State(state): State<AppState>,
    Json(request): Json<CreateSchoolRequest>,
) -> ApiResult<School> {
    let school = state.repo.add_school(&request.name, &request.county).await?;
    tracing::info!("Added school {} ({}) in {}", school.name, school.id, school.county);
    success(school)
}
