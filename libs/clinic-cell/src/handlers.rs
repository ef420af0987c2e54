use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

use crate::models::{
    ClinicError, CreateClinicHoursRequest, CreateVetScheduleRequest, UpdateClinicHoursRequest,
    UpdateVetScheduleRequest,
};
use crate::services::hours::ClinicHoursService;
use crate::services::schedules::VetScheduleService;

fn map_clinic_error(e: ClinicError) -> AppError {
    match e {
        ClinicError::NotFound => AppError::NotFound("Record not found".to_string()),
        ClinicError::InvalidHoursInterval | ClinicError::InvalidScheduleInterval => {
            AppError::BadRequest(e.to_string())
        }
        ClinicError::DuplicateWeekday(_) => AppError::Conflict(e.to_string()),
        ClinicError::DatabaseError(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// CLINIC HOURS HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_clinic_hours(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = ClinicHoursService::new(&state);
    let hours = service
        .list_hours(auth.token())
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({ "clinic_hours": hours })))
}

#[axum::debug_handler]
pub async fn create_clinic_hours(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateClinicHoursRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin"])?;

    let service = ClinicHoursService::new(&state);
    let hours = service
        .create_hours(request, auth.token())
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({ "success": true, "clinic_hours": hours })))
}

#[axum::debug_handler]
pub async fn update_clinic_hours(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(hours_id): Path<Uuid>,
    Json(request): Json<UpdateClinicHoursRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin"])?;

    let service = ClinicHoursService::new(&state);
    let hours = service
        .update_hours(&hours_id.to_string(), request, auth.token())
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({ "success": true, "clinic_hours": hours })))
}

#[axum::debug_handler]
pub async fn delete_clinic_hours(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(hours_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin"])?;

    let service = ClinicHoursService::new(&state);
    service
        .delete_hours(&hours_id.to_string(), auth.token())
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({ "success": true })))
}

// ==============================================================================
// VET SCHEDULE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_vet_schedules(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(vet_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = VetScheduleService::new(&state);
    let schedules = service
        .list_schedules_for_vet(vet_id, auth.token())
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({ "schedules": schedules })))
}

#[axum::debug_handler]
pub async fn create_vet_schedule(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateVetScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin"])?;

    let service = VetScheduleService::new(&state);
    let schedule = service
        .create_schedule(request, auth.token())
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({ "success": true, "schedule": schedule })))
}

#[axum::debug_handler]
pub async fn update_vet_schedule(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(schedule_id): Path<Uuid>,
    Json(request): Json<UpdateVetScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin"])?;

    let service = VetScheduleService::new(&state);
    let schedule = service
        .update_schedule(&schedule_id.to_string(), request, auth.token())
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({ "success": true, "schedule": schedule })))
}

#[axum::debug_handler]
pub async fn delete_vet_schedule(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(schedule_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin"])?;

    let service = VetScheduleService::new(&state);
    service
        .delete_schedule(&schedule_id.to_string(), auth.token())
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({ "success": true })))
}
