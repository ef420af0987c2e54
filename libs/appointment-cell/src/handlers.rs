use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

use crate::models::{
    AppointmentCandidate, AppointmentError, AppointmentSearchQuery, AppointmentStatus,
    BookAppointmentRequest, UpdateAppointmentRequest, ValidationMode,
};
use crate::services::booking::AppointmentBookingService;

fn map_appointment_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::Rejected(violations) => {
            AppError::SchedulingRejected(AppointmentError::violation_messages(&violations))
        }
        AppointmentError::InvalidStatusTransition(_) => AppError::Conflict(e.to_string()),
        AppointmentError::ReferenceData(msg) => AppError::Database(msg),
        AppointmentError::DatabaseError(msg) => AppError::Database(msg),
    }
}

fn receptionist_id(user: &User) -> Result<Uuid, AppError> {
    user.user_id()
        .ok_or_else(|| AppError::Auth("Invalid user id in token".to_string()))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin", "receptionist"])?;

    // The creating receptionist is always the authenticated caller.
    let receptionist = receptionist_id(&user)?;

    let service = AppointmentBookingService::new(&state);
    let appointment = service
        .create_appointment(request, receptionist, auth.token())
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({ "success": true, "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointment = service
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({ "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin", "receptionist"])?;

    let service = AppointmentBookingService::new(&state);
    let appointment = service
        .update_appointment(appointment_id, request, auth.token())
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({ "success": true, "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin", "receptionist"])?;

    let service = AppointmentBookingService::new(&state);
    let appointment = service
        .cancel_appointment(appointment_id, auth.token())
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({ "success": true, "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<AppointmentSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointments = service
        .search_appointments(query, auth.token())
        .await
        .map_err(map_appointment_error)?;

    let count = appointments.len();
    Ok(Json(json!({
        "appointments": appointments,
        "count": count,
    })))
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    pub vet_id: Option<Uuid>,
}

#[axum::debug_handler]
pub async fn get_upcoming_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointments = service
        .get_upcoming_appointments(query.vet_id, auth.token())
        .await
        .map_err(map_appointment_error)?;

    let count = appointments.len();
    Ok(Json(json!({
        "appointments": appointments,
        "count": count,
    })))
}

/// Body for the dry-run check endpoint: a full candidate plus an optional
/// appointment id when rechecking an edit.
#[derive(Debug, Deserialize)]
pub struct CheckCandidateRequest {
    pub pet_id: Uuid,
    pub vet_id: Uuid,
    pub appointment_type_id: Uuid,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub end_time: chrono::DateTime<chrono::Utc>,
    pub exclude_appointment_id: Option<Uuid>,
}

#[axum::debug_handler]
pub async fn check_candidate(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CheckCandidateRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin", "receptionist"])?;

    let candidate = AppointmentCandidate {
        pet_id: request.pet_id,
        vet_id: request.vet_id,
        appointment_type_id: request.appointment_type_id,
        start_time: request.start_time,
        end_time: request.end_time,
        status: AppointmentStatus::Scheduled,
    };
    let mode = match request.exclude_appointment_id {
        Some(id) => ValidationMode::Edit {
            exclude_appointment_id: id,
        },
        None => ValidationMode::Create,
    };

    let service = AppointmentBookingService::new(&state);
    let violations = service
        .check_candidate(candidate, mode, auth.token())
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "valid": violations.is_empty(),
        "errors": AppointmentError::violation_messages(&violations),
    })))
}
