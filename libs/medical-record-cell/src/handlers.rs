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

use crate::models::{CreateMedicalRecordRequest, MedicalRecordError, UpdateMedicalRecordRequest};
use crate::services::records::MedicalRecordService;

fn map_record_error(e: MedicalRecordError) -> AppError {
    match e {
        MedicalRecordError::NotFound => AppError::NotFound("Medical record not found".to_string()),
        MedicalRecordError::AppointmentNotFound => {
            AppError::NotFound("Appointment not found".to_string())
        }
        MedicalRecordError::DuplicateRecord | MedicalRecordError::AppointmentCanceled => {
            AppError::Conflict(e.to_string())
        }
        MedicalRecordError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn create_medical_record(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateMedicalRecordRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin", "veterinarian"])?;

    let service = MedicalRecordService::new(&state);
    let record = service
        .create_record(request, auth.token())
        .await
        .map_err(map_record_error)?;

    Ok(Json(json!({ "success": true, "medical_record": record })))
}

/// Veterinarians see only the records they authored; admins see all.
#[axum::debug_handler]
pub async fn list_medical_records(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin", "veterinarian"])?;

    let service = MedicalRecordService::new(&state);
    let records = if user.is_veterinarian() {
        let vet_id = user
            .user_id()
            .ok_or_else(|| AppError::Auth("Invalid user id in token".to_string()))?;
        service
            .list_records_for_vet(vet_id, auth.token())
            .await
            .map_err(map_record_error)?
    } else {
        service
            .list_records(auth.token())
            .await
            .map_err(map_record_error)?
    };

    let count = records.len();
    Ok(Json(json!({
        "medical_records": records,
        "count": count,
    })))
}

#[axum::debug_handler]
pub async fn get_medical_record(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(record_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin", "veterinarian"])?;

    let service = MedicalRecordService::new(&state);
    let record = service
        .get_record(record_id, auth.token())
        .await
        .map_err(map_record_error)?;

    // Ownership check before the payload leaves the handler.
    if user.is_veterinarian() && user.user_id() != Some(record.vet_id) {
        return Err(AppError::Forbidden(
            "Veterinarians can only view their own medical records".to_string(),
        ));
    }

    Ok(Json(json!({ "medical_record": record })))
}

#[axum::debug_handler]
pub async fn update_medical_record(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(record_id): Path<Uuid>,
    Json(request): Json<UpdateMedicalRecordRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin", "veterinarian"])?;

    let service = MedicalRecordService::new(&state);

    if user.is_veterinarian() {
        let current = service
            .get_record(record_id, auth.token())
            .await
            .map_err(map_record_error)?;
        if user.user_id() != Some(current.vet_id) {
            return Err(AppError::Forbidden(
                "Veterinarians can only amend their own medical records".to_string(),
            ));
        }
    }

    let record = service
        .update_record(record_id, request, auth.token())
        .await
        .map_err(map_record_error)?;

    Ok(Json(json!({ "success": true, "medical_record": record })))
}
