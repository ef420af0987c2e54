// libs/medical-record-cell/src/services/records.rs
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use appointment_cell::services::booking::AppointmentBookingService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    CreateMedicalRecordRequest, MedicalRecord, MedicalRecordError, UpdateMedicalRecordRequest,
};

/// Visit documentation over the storage collaborator. Creating a record
/// also completes the documented appointment when it is still Scheduled.
pub struct MedicalRecordService {
    supabase: SupabaseClient,
    booking: AppointmentBookingService,
}

impl MedicalRecordService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            booking: AppointmentBookingService::new(config),
        }
    }

    /// Attach a record to an appointment. The record takes the appointment's
    /// id, pet and vet; a second record for the same appointment is
    /// rejected. A Scheduled appointment flips to Complete afterwards.
    pub async fn create_record(
        &self,
        request: CreateMedicalRecordRequest,
        auth_token: &str,
    ) -> Result<MedicalRecord, MedicalRecordError> {
        info!(
            "Creating medical record for appointment {}",
            request.appointment_id
        );

        let appointment = self
            .booking
            .get_appointment(request.appointment_id, auth_token)
            .await
            .map_err(|e| match e {
                appointment_cell::models::AppointmentError::NotFound => {
                    MedicalRecordError::AppointmentNotFound
                }
                other => MedicalRecordError::DatabaseError(other.to_string()),
            })?;

        if appointment.is_canceled() {
            return Err(MedicalRecordError::AppointmentCanceled);
        }

        if self
            .get_record_opt(request.appointment_id, auth_token)
            .await?
            .is_some()
        {
            return Err(MedicalRecordError::DuplicateRecord);
        }

        let visit_date = request
            .visit_date
            .unwrap_or_else(|| appointment.start_time.date_naive());

        let record_data = json!({
            "id": appointment.id,
            "appointment_id": appointment.id,
            "pet_id": appointment.pet_id,
            "vet_id": appointment.vet_id,
            "visit_date": visit_date.format("%Y-%m-%d").to_string(),
            "diagnosis": request.diagnosis,
            "treatment": request.treatment,
            "notes": request.notes,
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/medical_records",
                Some(auth_token),
                Some(record_data),
                Some(SupabaseClient::return_representation()),
            )
            .await
            .map_err(|e| MedicalRecordError::DatabaseError(e.to_string()))?;

        let record = Self::parse_single(result, "Failed to create medical record")?;

        self.booking
            .complete_for_medical_record(appointment.id, auth_token)
            .await
            .map_err(|e| MedicalRecordError::DatabaseError(e.to_string()))?;

        info!("Medical record {} created", record.id);
        Ok(record)
    }

    pub async fn get_record(
        &self,
        record_id: Uuid,
        auth_token: &str,
    ) -> Result<MedicalRecord, MedicalRecordError> {
        self.get_record_opt(record_id, auth_token)
            .await?
            .ok_or(MedicalRecordError::NotFound)
    }

    pub async fn list_records_for_vet(
        &self,
        vet_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<MedicalRecord>, MedicalRecordError> {
        let path = format!(
            "/rest/v1/medical_records?vet_id=eq.{}&order=visit_date.desc",
            vet_id
        );
        self.fetch_records(&path, auth_token).await
    }

    pub async fn list_records(
        &self,
        auth_token: &str,
    ) -> Result<Vec<MedicalRecord>, MedicalRecordError> {
        self.fetch_records("/rest/v1/medical_records?order=visit_date.desc", auth_token)
            .await
    }

    pub async fn list_records_for_pet(
        &self,
        pet_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<MedicalRecord>, MedicalRecordError> {
        let path = format!(
            "/rest/v1/medical_records?pet_id=eq.{}&order=visit_date.desc",
            pet_id
        );
        self.fetch_records(&path, auth_token).await
    }

    /// Amend the free-text fields or the visit date. The identity fields
    /// (appointment, pet, vet) never change after creation.
    pub async fn update_record(
        &self,
        record_id: Uuid,
        request: UpdateMedicalRecordRequest,
        auth_token: &str,
    ) -> Result<MedicalRecord, MedicalRecordError> {
        debug!("Updating medical record: {}", record_id);

        let mut update_data = serde_json::Map::new();
        if let Some(visit_date) = request.visit_date {
            update_data.insert(
                "visit_date".to_string(),
                json!(visit_date.format("%Y-%m-%d").to_string()),
            );
        }
        if let Some(diagnosis) = request.diagnosis {
            update_data.insert("diagnosis".to_string(), json!(diagnosis));
        }
        if let Some(treatment) = request.treatment {
            update_data.insert("treatment".to_string(), json!(treatment));
        }
        if let Some(notes) = request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }

        if update_data.is_empty() {
            return self.get_record(record_id, auth_token).await;
        }

        let path = format!("/rest/v1/medical_records?id=eq.{}", record_id);
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(SupabaseClient::return_representation()),
            )
            .await
            .map_err(|e| MedicalRecordError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(MedicalRecordError::NotFound);
        }

        Self::parse_single(result, "Failed to parse updated medical record")
    }

    async fn get_record_opt(
        &self,
        record_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<MedicalRecord>, MedicalRecordError> {
        let path = format!("/rest/v1/medical_records?id=eq.{}", record_id);
        let mut records = self.fetch_records(&path, auth_token).await?;
        Ok(records.pop())
    }

    async fn fetch_records(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<MedicalRecord>, MedicalRecordError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| MedicalRecordError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<MedicalRecord>, _>>()
            .map_err(|e| {
                MedicalRecordError::DatabaseError(format!("Failed to parse medical records: {}", e))
            })
    }

    fn parse_single(result: Vec<Value>, context: &str) -> Result<MedicalRecord, MedicalRecordError> {
        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| MedicalRecordError::DatabaseError(context.to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| MedicalRecordError::DatabaseError(format!("{}: {}", context, e)))
    }
}
