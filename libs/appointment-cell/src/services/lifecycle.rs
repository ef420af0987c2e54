// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

/// Status transition rules for the appointment lifecycle. Status is a closed
/// enumeration: Scheduled can complete or cancel, Complete and Canceled are
/// terminal.
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        // Keeping the same status is not a transition.
        if current_status == new_status {
            return Ok(());
        }

        debug!(
            "Validating status transition {} -> {}",
            current_status, new_status
        );

        if !self
            .valid_transitions(current_status)
            .contains(&new_status)
        {
            warn!(
                "Invalid status transition attempted: {} -> {}",
                current_status, new_status
            );
            return Err(AppointmentError::InvalidStatusTransition(current_status));
        }

        Ok(())
    }

    pub fn valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Scheduled => vec![
                AppointmentStatus::Complete,
                AppointmentStatus::Canceled,
            ],
            // Terminal states
            AppointmentStatus::Complete => vec![],
            AppointmentStatus::Canceled => vec![],
        }
    }

    /// Whether attaching a medical record should flip this appointment to
    /// Complete. Only Scheduled appointments are completed that way.
    pub fn completes_on_medical_record(&self, current_status: AppointmentStatus) -> bool {
        current_status == AppointmentStatus::Scheduled
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
