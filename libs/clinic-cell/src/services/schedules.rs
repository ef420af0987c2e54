use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{ClinicError, CreateVetScheduleRequest, UpdateVetScheduleRequest, VetSchedule, Weekday};

/// Vet Availability access: zero or more working intervals per
/// (veterinarian, weekday).
pub struct VetScheduleService {
    supabase: SupabaseClient,
}

impl VetScheduleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_schedule(
        &self,
        request: CreateVetScheduleRequest,
        auth_token: &str,
    ) -> Result<VetSchedule, ClinicError> {
        debug!(
            "Creating schedule for vet {} on {}",
            request.vet_id, request.day_of_week
        );

        if request.end_time <= request.start_time {
            return Err(ClinicError::InvalidScheduleInterval);
        }

        let schedule_data = json!({
            "vet_id": request.vet_id,
            "day_of_week": request.day_of_week,
            "start_time": request.start_time.format("%H:%M:%S").to_string(),
            "end_time": request.end_time.format("%H:%M:%S").to_string(),
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/vet_schedules",
                Some(auth_token),
                Some(schedule_data),
                Some(SupabaseClient::return_representation()),
            )
            .await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| ClinicError::DatabaseError("Failed to create schedule".to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| ClinicError::DatabaseError(format!("Failed to parse schedule: {}", e)))
    }

    pub async fn update_schedule(
        &self,
        schedule_id: &str,
        request: UpdateVetScheduleRequest,
        auth_token: &str,
    ) -> Result<VetSchedule, ClinicError> {
        debug!("Updating schedule: {}", schedule_id);

        let current = self.get_schedule_by_id(schedule_id, auth_token).await?;

        let start_time = request.start_time.unwrap_or(current.start_time);
        let end_time = request.end_time.unwrap_or(current.end_time);
        if end_time <= start_time {
            return Err(ClinicError::InvalidScheduleInterval);
        }

        let mut update_data = serde_json::Map::new();
        if let Some(day) = request.day_of_week {
            update_data.insert("day_of_week".to_string(), json!(day));
        }
        update_data.insert(
            "start_time".to_string(),
            json!(start_time.format("%H:%M:%S").to_string()),
        );
        update_data.insert(
            "end_time".to_string(),
            json!(end_time.format("%H:%M:%S").to_string()),
        );

        let path = format!("/rest/v1/vet_schedules?id=eq.{}", schedule_id);
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
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(ClinicError::NotFound)?;

        serde_json::from_value(row)
            .map_err(|e| ClinicError::DatabaseError(format!("Failed to parse schedule: {}", e)))
    }

    pub async fn list_schedules_for_vet(
        &self,
        vet_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<VetSchedule>, ClinicError> {
        let path = format!(
            "/rest/v1/vet_schedules?vet_id=eq.{}&order=day_of_week.asc,start_time.asc",
            vet_id
        );
        self.fetch_schedules(&path, auth_token).await
    }

    /// Vet Availability lookup for the Scheduling Validator: all intervals
    /// for one vet on one weekday, in start-time order.
    pub async fn get_schedules_for_vet_day(
        &self,
        vet_id: Uuid,
        weekday: Weekday,
        auth_token: &str,
    ) -> Result<Vec<VetSchedule>, ClinicError> {
        let path = format!(
            "/rest/v1/vet_schedules?vet_id=eq.{}&day_of_week=eq.{}&order=start_time.asc",
            vet_id, weekday
        );
        self.fetch_schedules(&path, auth_token).await
    }

    pub async fn delete_schedule(
        &self,
        schedule_id: &str,
        auth_token: &str,
    ) -> Result<(), ClinicError> {
        debug!("Deleting schedule: {}", schedule_id);

        let path = format!("/rest/v1/vet_schedules?id=eq.{}", schedule_id);
        let _: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                Some(auth_token),
                None,
                Some(SupabaseClient::return_representation()),
            )
            .await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn fetch_schedules(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<VetSchedule>, ClinicError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<VetSchedule>, _>>()
            .map_err(|e| ClinicError::DatabaseError(format!("Failed to parse schedules: {}", e)))
    }

    async fn get_schedule_by_id(
        &self,
        schedule_id: &str,
        auth_token: &str,
    ) -> Result<VetSchedule, ClinicError> {
        let path = format!("/rest/v1/vet_schedules?id=eq.{}", schedule_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(ClinicError::NotFound)?;

        serde_json::from_value(row)
            .map_err(|e| ClinicError::DatabaseError(format!("Failed to parse schedule: {}", e)))
    }
}
