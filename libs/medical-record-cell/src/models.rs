// libs/medical-record-cell/src/models.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Clinical documentation of one visit. A record shares its id with the
/// appointment it documents, so one appointment carries at most one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub pet_id: Uuid,
    pub vet_id: Uuid,
    pub visit_date: NaiveDate,
    pub diagnosis: String,
    pub treatment: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMedicalRecordRequest {
    pub appointment_id: Uuid,
    /// Defaults to the appointment's start date when omitted.
    pub visit_date: Option<NaiveDate>,
    pub diagnosis: String,
    pub treatment: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMedicalRecordRequest {
    pub visit_date: Option<NaiveDate>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MedicalRecordError {
    #[error("Medical record not found")]
    NotFound,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("A medical record already exists for this appointment")]
    DuplicateRecord,

    #[error("Cannot attach a medical record to a canceled appointment")]
    AppointmentCanceled,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
