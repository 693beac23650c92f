use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::capacity::TeamLoad;
use crate::dashboard::DashboardSummary;
use crate::db::ValidationError;
use crate::engine::{AssignmentEngine, EngineError};
use crate::models::*;

type ApiResult<T> = Result<T, (StatusCode, String)>;

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
///
/// Store validation failures (missing parents, bad hours, empty packages)
/// are safe to expose and come back as BAD_REQUEST.
fn internal_error(e: anyhow::Error) -> (StatusCode, String) {
    if let Some(invalid) = e.downcast_ref::<ValidationError>() {
        tracing::warn!("Validation error: {}", invalid);
        return (StatusCode::BAD_REQUEST, invalid.to_string());
    }

    tracing::error!("Internal error: {:#}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

/// Map engine rejections onto HTTP statuses.
fn engine_error(e: EngineError) -> (StatusCode, String) {
    let status = match e {
        EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
        EngineError::NotInPackage { .. } => StatusCode::BAD_REQUEST,
        EngineError::AlreadyAssigned { .. }
        | EngineError::InvalidState { .. }
        | EngineError::InvalidTransition { .. }
        | EngineError::Immutable { .. } => StatusCode::CONFLICT,
        EngineError::Storage(_) => return internal_error(e.into()),
    };

    tracing::warn!("Rejected: {}", e);
    (status, e.to_string())
}

#[derive(Debug, Deserialize)]
pub struct ProjectScope {
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub team_id: Uuid,
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Projects
// ============================================================

pub async fn list_projects(State(engine): State<AssignmentEngine>) -> ApiResult<Json<Vec<Project>>> {
    engine
        .store()
        .get_all_projects()
        .map(Json)
        .map_err(internal_error)
}

pub async fn get_project(
    State(engine): State<AssignmentEngine>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    engine
        .store()
        .get_project(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Project not found".to_string()))
}

pub async fn create_project(
    State(engine): State<AssignmentEngine>,
    Json(input): Json<CreateProjectInput>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    engine
        .store()
        .create_project(input)
        .map(|p| (StatusCode::CREATED, Json(p)))
        .map_err(internal_error)
}

pub async fn delete_project(
    State(engine): State<AssignmentEngine>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if engine.store().delete_project(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Project not found".to_string()))
    }
}

// ============================================================
// Teams
// ============================================================

pub async fn list_teams(State(engine): State<AssignmentEngine>) -> ApiResult<Json<Vec<Team>>> {
    engine
        .store()
        .get_all_teams()
        .map(Json)
        .map_err(internal_error)
}

pub async fn get_team(
    State(engine): State<AssignmentEngine>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Team>> {
    engine
        .store()
        .get_team(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Team not found".to_string()))
}

pub async fn create_team(
    State(engine): State<AssignmentEngine>,
    Json(input): Json<CreateTeamInput>,
) -> ApiResult<(StatusCode, Json<Team>)> {
    engine
        .store()
        .create_team(input)
        .map(|t| (StatusCode::CREATED, Json(t)))
        .map_err(internal_error)
}

pub async fn update_team(
    State(engine): State<AssignmentEngine>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateTeamInput>,
) -> ApiResult<Json<Team>> {
    engine
        .store()
        .update_team(id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Team not found".to_string()))
}

pub async fn delete_team(
    State(engine): State<AssignmentEngine>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if engine.store().delete_team(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Team not found".to_string()))
    }
}

pub async fn get_team_load(
    State(engine): State<AssignmentEngine>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TeamLoad>> {
    engine.team_load(id).map(Json).map_err(engine_error)
}

pub async fn list_team_assignments(
    State(engine): State<AssignmentEngine>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Assignment>>> {
    engine
        .store()
        .get_team(id)
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, "Team not found".to_string()))?;

    engine
        .store()
        .get_assignments(&AssignmentFilter {
            team_id: Some(id),
            ..Default::default()
        })
        .map(Json)
        .map_err(internal_error)
}

// ============================================================
// Hangers
// ============================================================

pub async fn list_hangers(
    State(engine): State<AssignmentEngine>,
    Query(scope): Query<ProjectScope>,
) -> ApiResult<Json<Vec<Hanger>>> {
    engine
        .store()
        .get_hangers(scope.project_id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn get_hanger(
    State(engine): State<AssignmentEngine>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Hanger>> {
    engine
        .store()
        .get_hanger(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Hanger not found".to_string()))
}

pub async fn create_hanger(
    State(engine): State<AssignmentEngine>,
    Json(input): Json<CreateHangerInput>,
) -> ApiResult<(StatusCode, Json<Hanger>)> {
    engine
        .store()
        .create_hanger(input)
        .map(|h| (StatusCode::CREATED, Json(h)))
        .map_err(internal_error)
}

pub async fn record_actual_hours(
    State(engine): State<AssignmentEngine>,
    Path(id): Path<Uuid>,
    Json(input): Json<RecordActualHoursInput>,
) -> ApiResult<Json<Hanger>> {
    engine
        .store()
        .record_actual_hours(id, input.actual_hours)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Hanger not found".to_string()))
}

// ============================================================
// Packages
// ============================================================

pub async fn list_packages(
    State(engine): State<AssignmentEngine>,
    Query(scope): Query<ProjectScope>,
) -> ApiResult<Json<Vec<Package>>> {
    engine
        .store()
        .get_packages(scope.project_id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn get_package(
    State(engine): State<AssignmentEngine>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Package>> {
    engine
        .store()
        .get_package(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Package not found".to_string()))
}

pub async fn create_package(
    State(engine): State<AssignmentEngine>,
    Json(input): Json<CreatePackageInput>,
) -> ApiResult<(StatusCode, Json<Package>)> {
    engine
        .store()
        .create_package(input)
        .map(|p| (StatusCode::CREATED, Json(p)))
        .map_err(internal_error)
}

pub async fn update_package(
    State(engine): State<AssignmentEngine>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdatePackageInput>,
) -> ApiResult<Json<Package>> {
    engine
        .store()
        .update_package(id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Package not found".to_string()))
}

pub async fn assign_package(
    State(engine): State<AssignmentEngine>,
    Path(id): Path<Uuid>,
    Json(input): Json<AssignPackageInput>,
) -> ApiResult<(StatusCode, Json<PackagePlacement>)> {
    engine
        .assign_package(id, input.team_id)
        .await
        .map(|p| (StatusCode::CREATED, Json(p)))
        .map_err(engine_error)
}

pub async fn preview_placement(
    State(engine): State<AssignmentEngine>,
    Path(id): Path<Uuid>,
    Query(query): Query<PreviewQuery>,
) -> ApiResult<Json<PlacementPreview>> {
    engine
        .preview_placement(id, query.team_id)
        .map(Json)
        .map_err(engine_error)
}

// ============================================================
// Assignments
// ============================================================

pub async fn list_assignments(
    State(engine): State<AssignmentEngine>,
    Query(filter): Query<AssignmentFilter>,
) -> ApiResult<Json<Vec<Assignment>>> {
    engine
        .store()
        .get_assignments(&filter)
        .map(Json)
        .map_err(internal_error)
}

pub async fn get_assignment(
    State(engine): State<AssignmentEngine>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Assignment>> {
    engine
        .store()
        .get_assignment(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Assignment not found".to_string()))
}

pub async fn create_assignment(
    State(engine): State<AssignmentEngine>,
    Json(input): Json<AssignInput>,
) -> ApiResult<(StatusCode, Json<AssignmentOutcome>)> {
    let outcome = if input.queue {
        engine
            .enqueue(input.hanger_id, input.team_id, input.package_id)
            .await
    } else {
        engine
            .assign(input.hanger_id, input.team_id, input.package_id)
            .await
    };

    outcome
        .map(|o| (StatusCode::CREATED, Json(o)))
        .map_err(engine_error)
}

pub async fn move_assignment(
    State(engine): State<AssignmentEngine>,
    Path(id): Path<Uuid>,
    Json(input): Json<MoveAssignmentInput>,
) -> ApiResult<Json<AssignmentOutcome>> {
    engine
        .move_assignment(id, input.team_id)
        .map(Json)
        .map_err(engine_error)
}

pub async fn advance_assignment(
    State(engine): State<AssignmentEngine>,
    Path(id): Path<Uuid>,
    Json(input): Json<AdvanceStateInput>,
) -> ApiResult<Json<Assignment>> {
    engine
        .advance_state(id, input.state)
        .map(Json)
        .map_err(engine_error)
}

pub async fn cancel_assignment(
    State(engine): State<AssignmentEngine>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    engine
        .cancel(id)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(engine_error)
}

// ============================================================
// Dashboard
// ============================================================

pub async fn get_dashboard(
    State(engine): State<AssignmentEngine>,
) -> ApiResult<Json<DashboardSummary>> {
    engine.dashboard().map(Json).map_err(engine_error)
}
