// libs/appointment-cell/src/services/booking.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use clinic_cell::models::Weekday;
use clinic_cell::services::hours::ClinicHoursService;
use clinic_cell::services::schedules::VetScheduleService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AppointmentCandidate, AppointmentError, AppointmentSearchQuery,
    AppointmentStatus, BookAppointmentRequest, ScheduleSnapshot, ScheduleViolation,
    UpdateAppointmentRequest, ValidationMode,
};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::validator::SchedulingValidator;

/// Validate-then-persist orchestration for appointments. Fetches reference
/// snapshots, runs the scheduling checks, and stamps lifecycle metadata
/// before handing the record to the storage collaborator. Nothing is written
/// when validation fails.
pub struct AppointmentBookingService {
    supabase: SupabaseClient,
    validator: SchedulingValidator,
    lifecycle: AppointmentLifecycleService,
    hours_service: ClinicHoursService,
    schedule_service: VetScheduleService,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            validator: SchedulingValidator::new(),
            lifecycle: AppointmentLifecycleService::new(),
            hours_service: ClinicHoursService::new(config),
            schedule_service: VetScheduleService::new(config),
        }
    }

    /// Book a new appointment on behalf of the authenticated receptionist.
    /// The receptionist identity always comes from the session, never from
    /// the request body.
    pub async fn create_appointment(
        &self,
        request: BookAppointmentRequest,
        receptionist_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        info!(
            "Booking appointment for pet {} with vet {}",
            request.pet_id, request.vet_id
        );

        let candidate = AppointmentCandidate {
            pet_id: request.pet_id,
            vet_id: request.vet_id,
            appointment_type_id: request.appointment_type_id,
            start_time: request.start_time,
            end_time: request.end_time,
            status: request.status.unwrap_or(AppointmentStatus::Scheduled),
        };

        let snapshot = self
            .load_snapshot(&candidate, ValidationMode::Create, auth_token)
            .await?;
        self.validator
            .validate(&candidate, ValidationMode::Create, &snapshot)
            .map_err(AppointmentError::Rejected)?;

        let now = Utc::now();
        let canceled_at = match candidate.status {
            AppointmentStatus::Canceled => Some(now),
            _ => None,
        };

        let appointment_data = json!({
            "pet_id": candidate.pet_id,
            "vet_id": candidate.vet_id,
            "appointment_type_id": candidate.appointment_type_id,
            "recepcionist_user_id": receptionist_id,
            "start_time": candidate.start_time.to_rfc3339(),
            "end_time": candidate.end_time.to_rfc3339(),
            "status": candidate.status,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
            "canceled_at": canceled_at.map(|t| t.to_rfc3339()),
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(appointment_data),
                Some(SupabaseClient::return_representation()),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let appointment = Self::parse_single(result, "Failed to create appointment")?;
        info!("Appointment {} booked with vet {}", appointment.id, appointment.vet_id);
        Ok(appointment)
    }

    /// Edit an existing appointment in place. Only the scheduling fields and
    /// status are mutable; the creating receptionist and created_at are not.
    /// The row's own id is excluded from conflict detection.
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Updating appointment: {}", appointment_id);

        let current = self.get_appointment(appointment_id, auth_token).await?;

        let new_status = request.status.unwrap_or(current.status);
        self.lifecycle
            .validate_status_transition(current.status, new_status)?;

        let candidate = AppointmentCandidate {
            pet_id: request.pet_id,
            vet_id: request.vet_id,
            appointment_type_id: request.appointment_type_id,
            start_time: request.start_time,
            end_time: request.end_time,
            status: new_status,
        };

        let mode = ValidationMode::Edit {
            exclude_appointment_id: appointment_id,
        };
        let snapshot = self.load_snapshot(&candidate, mode, auth_token).await?;
        self.validator
            .validate(&candidate, mode, &snapshot)
            .map_err(AppointmentError::Rejected)?;

        let now = Utc::now();
        let mut update_data = serde_json::Map::new();
        update_data.insert("pet_id".to_string(), json!(candidate.pet_id));
        update_data.insert("vet_id".to_string(), json!(candidate.vet_id));
        update_data.insert(
            "appointment_type_id".to_string(),
            json!(candidate.appointment_type_id),
        );
        update_data.insert(
            "start_time".to_string(),
            json!(candidate.start_time.to_rfc3339()),
        );
        update_data.insert("end_time".to_string(), json!(candidate.end_time.to_rfc3339()));
        update_data.insert("status".to_string(), json!(candidate.status));
        update_data.insert("updated_at".to_string(), json!(now.to_rfc3339()));

        // Soft-delete bookkeeping: stamp canceled_at the first time the
        // status moves to Canceled, clear it whenever the status is not.
        match candidate.status {
            AppointmentStatus::Canceled => {
                if current.canceled_at.is_none() {
                    update_data.insert("canceled_at".to_string(), json!(now.to_rfc3339()));
                }
            }
            _ => {
                update_data.insert("canceled_at".to_string(), Value::Null);
            }
        }

        let appointment = self
            .patch_appointment(appointment_id, Value::Object(update_data), auth_token)
            .await?;

        info!("Appointment {} updated", appointment_id);
        Ok(appointment)
    }

    /// Soft delete. The scheduling checks never run here: a cancellation
    /// cannot violate scheduling rules. Canceling an already-Canceled row is
    /// a no-op that keeps the original canceled_at.
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Canceling appointment: {}", appointment_id);

        let current = self.get_appointment(appointment_id, auth_token).await?;

        if current.is_canceled() {
            return Ok(current);
        }

        self.lifecycle
            .validate_status_transition(current.status, AppointmentStatus::Canceled)?;

        let now = Utc::now();
        let update_data = json!({
            "status": AppointmentStatus::Canceled,
            "canceled_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
        });

        let appointment = self
            .patch_appointment(appointment_id, update_data, auth_token)
            .await?;

        info!("Appointment {} canceled", appointment_id);
        Ok(appointment)
    }

    /// Flip a Scheduled appointment to Complete when a medical record is
    /// attached to it. Any other status leaves the row untouched.
    pub async fn complete_for_medical_record(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id, auth_token).await?;

        if !self.lifecycle.completes_on_medical_record(current.status) {
            return Ok(current);
        }

        let update_data = json!({
            "status": AppointmentStatus::Complete,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let appointment = self
            .patch_appointment(appointment_id, update_data, auth_token)
            .await?;

        info!("Appointment {} marked Complete", appointment_id);
        Ok(appointment)
    }

    /// Dry-run validation for the booking form: same checks, no write. An
    /// empty list means the candidate would be accepted.
    pub async fn check_candidate(
        &self,
        candidate: AppointmentCandidate,
        mode: ValidationMode,
        auth_token: &str,
    ) -> Result<Vec<ScheduleViolation>, AppointmentError> {
        let snapshot = self.load_snapshot(&candidate, mode, auth_token).await?;
        Ok(self
            .validator
            .validate(&candidate, mode, &snapshot)
            .err()
            .unwrap_or_default())
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        Self::parse_single(result, "Failed to parse appointment")
    }

    pub async fn search_appointments(
        &self,
        query: AppointmentSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Searching appointments with filters: {:?}", query);

        let mut query_parts = Vec::new();

        if let Some(pet_id) = query.pet_id {
            query_parts.push(format!("pet_id=eq.{}", pet_id));
        }
        if let Some(vet_id) = query.vet_id {
            query_parts.push(format!("vet_id=eq.{}", vet_id));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(from_date) = query.from_date {
            let encoded = urlencoding::encode(&from_date.to_rfc3339()).into_owned();
            query_parts.push(format!("start_time=gte.{}", encoded));
        }
        if let Some(to_date) = query.to_date {
            let encoded = urlencoding::encode(&to_date.to_rfc3339()).into_owned();
            query_parts.push(format!("start_time=lte.{}", encoded));
        }

        let mut path = format!(
            "/rest/v1/appointments?{}&order=start_time.asc",
            query_parts.join("&")
        );

        if let Some(limit) = query.limit {
            path.push_str(&format!("&limit={}", limit));
        }
        if let Some(offset) = query.offset {
            path.push_str(&format!("&offset={}", offset));
        }

        self.fetch_appointments(&path, auth_token).await
    }

    /// Upcoming non-Canceled appointments, clinic-wide or for one vet, as
    /// the dashboards show them.
    pub async fn get_upcoming_appointments(
        &self,
        vet_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let now = Utc::now();
        let encoded_now = urlencoding::encode(&now.to_rfc3339()).into_owned();

        let mut query_parts = vec![
            format!("start_time=gte.{}", encoded_now),
            "status=neq.Canceled".to_string(),
        ];
        if let Some(vet_id) = vet_id {
            query_parts.push(format!("vet_id=eq.{}", vet_id));
        }

        let path = format!(
            "/rest/v1/appointments?{}&order=start_time.asc&limit=50",
            query_parts.join("&")
        );

        self.fetch_appointments(&path, auth_token).await
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    /// Read the three reference collections the validator decides against:
    /// the clinic hours row for the candidate's weekday, the vet's intervals
    /// for that weekday, and the vet's potentially-overlapping ledger rows.
    async fn load_snapshot(
        &self,
        candidate: &AppointmentCandidate,
        mode: ValidationMode,
        auth_token: &str,
    ) -> Result<ScheduleSnapshot, AppointmentError> {
        let weekday = Weekday::from_date(candidate.start_time.date_naive());

        let clinic_hours = self
            .hours_service
            .get_hours_for_weekday(weekday, auth_token)
            .await
            .map_err(|e| AppointmentError::ReferenceData(e.to_string()))?;

        let vet_schedules = self
            .schedule_service
            .get_schedules_for_vet_day(candidate.vet_id, weekday, auth_token)
            .await
            .map_err(|e| AppointmentError::ReferenceData(e.to_string()))?;

        let vet_appointments = self
            .find_overlapping(
                candidate.vet_id,
                candidate,
                match mode {
                    ValidationMode::Create => None,
                    ValidationMode::Edit {
                        exclude_appointment_id,
                    } => Some(exclude_appointment_id),
                },
                auth_token,
            )
            .await?;

        Ok(ScheduleSnapshot {
            clinic_hours,
            vet_schedules,
            vet_appointments,
        })
    }

    /// Ledger rows for the vet that could overlap the candidate interval.
    /// Canceled rows and, on edits, the candidate's own row are filtered in
    /// the query; the validator re-applies the overlap predicate on what
    /// comes back.
    async fn find_overlapping(
        &self,
        vet_id: Uuid,
        candidate: &AppointmentCandidate,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let encoded_end = urlencoding::encode(&candidate.end_time.to_rfc3339()).into_owned();
        let encoded_start = urlencoding::encode(&candidate.start_time.to_rfc3339()).into_owned();

        let mut query_parts = vec![
            format!("vet_id=eq.{}", vet_id),
            "status=neq.Canceled".to_string(),
            format!("start_time=lt.{}", encoded_end),
            format!("end_time=gt.{}", encoded_start),
        ];

        if let Some(exclude_id) = exclude_appointment_id {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }

        let path = format!(
            "/rest/v1/appointments?{}&order=start_time.asc",
            query_parts.join("&")
        );

        self.fetch_appointments(&path, auth_token).await
    }

    async fn fetch_appointments(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e)))
    }

    async fn patch_appointment(
        &self,
        appointment_id: Uuid,
        update_data: Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(update_data),
                Some(SupabaseClient::return_representation()),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        Self::parse_single(result, "Failed to parse updated appointment")
    }

    fn parse_single(result: Vec<Value>, context: &str) -> Result<Appointment, AppointmentError> {
        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::DatabaseError(context.to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| AppointmentError::DatabaseError(format!("{}: {}", context, e)))
    }
}
