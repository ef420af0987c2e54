use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{ClinicError, ClinicHours, CreateClinicHoursRequest, UpdateClinicHoursRequest, Weekday};

/// Clinic Calendar access: one open/close interval per weekday.
pub struct ClinicHoursService {
    supabase: SupabaseClient,
}

impl ClinicHoursService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_hours(
        &self,
        request: CreateClinicHoursRequest,
        auth_token: &str,
    ) -> Result<ClinicHours, ClinicError> {
        debug!("Configuring clinic hours for {}", request.day_of_week);

        if request.close_time <= request.open_time {
            return Err(ClinicError::InvalidHoursInterval);
        }

        // One row per weekday.
        if self
            .get_hours_for_weekday(request.day_of_week, auth_token)
            .await?
            .is_some()
        {
            return Err(ClinicError::DuplicateWeekday(request.day_of_week));
        }

        let hours_data = json!({
            "day_of_week": request.day_of_week,
            "open_time": request.open_time.format("%H:%M:%S").to_string(),
            "close_time": request.close_time.format("%H:%M:%S").to_string(),
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/clinic_hours",
                Some(auth_token),
                Some(hours_data),
                Some(SupabaseClient::return_representation()),
            )
            .await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| ClinicError::DatabaseError("Failed to create clinic hours".to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| ClinicError::DatabaseError(format!("Failed to parse clinic hours: {}", e)))
    }

    pub async fn update_hours(
        &self,
        hours_id: &str,
        request: UpdateClinicHoursRequest,
        auth_token: &str,
    ) -> Result<ClinicHours, ClinicError> {
        debug!("Updating clinic hours: {}", hours_id);

        let current = self.get_hours_by_id(hours_id, auth_token).await?;

        let open_time = request.open_time.unwrap_or(current.open_time);
        let close_time = request.close_time.unwrap_or(current.close_time);
        if close_time <= open_time {
            return Err(ClinicError::InvalidHoursInterval);
        }

        let update_data = json!({
            "open_time": open_time.format("%H:%M:%S").to_string(),
            "close_time": close_time.format("%H:%M:%S").to_string(),
        });

        let path = format!("/rest/v1/clinic_hours?id=eq.{}", hours_id);
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
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(ClinicError::NotFound)?;

        serde_json::from_value(row)
            .map_err(|e| ClinicError::DatabaseError(format!("Failed to parse clinic hours: {}", e)))
    }

    pub async fn list_hours(&self, auth_token: &str) -> Result<Vec<ClinicHours>, ClinicError> {
        let result: Vec<Value> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/clinic_hours?order=day_of_week.asc",
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<ClinicHours>, _>>()
            .map_err(|e| ClinicError::DatabaseError(format!("Failed to parse clinic hours: {}", e)))
    }

    /// Clinic Calendar lookup for the Scheduling Validator: `None` when the
    /// weekday has no configured row.
    pub async fn get_hours_for_weekday(
        &self,
        weekday: Weekday,
        auth_token: &str,
    ) -> Result<Option<ClinicHours>, ClinicError> {
        let path = format!("/rest/v1/clinic_hours?day_of_week=eq.{}", weekday);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => serde_json::from_value(row)
                .map(Some)
                .map_err(|e| ClinicError::DatabaseError(format!("Failed to parse clinic hours: {}", e))),
            None => Ok(None),
        }
    }

    pub async fn delete_hours(&self, hours_id: &str, auth_token: &str) -> Result<(), ClinicError> {
        debug!("Deleting clinic hours: {}", hours_id);

        let path = format!("/rest/v1/clinic_hours?id=eq.{}", hours_id);
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

    async fn get_hours_by_id(
        &self,
        hours_id: &str,
        auth_token: &str,
    ) -> Result<ClinicHours, ClinicError> {
        let path = format!("/rest/v1/clinic_hours?id=eq.{}", hours_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(ClinicError::NotFound)?;

        serde_json::from_value(row)
            .map_err(|e| ClinicError::DatabaseError(format!("Failed to parse clinic hours: {}", e)))
    }
}
