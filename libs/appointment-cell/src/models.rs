// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use clinic_cell::models::{ClinicHours, VetSchedule};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub vet_id: Uuid,
    pub recepcionist_user_id: Uuid,
    pub appointment_type_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn is_canceled(&self) -> bool {
        self.status == AppointmentStatus::Canceled
    }
}

/// Appointment lifecycle state. Canceled is a soft delete: the row stays and
/// `canceled_at` is stamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Scheduled,
    Complete,
    Canceled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "Scheduled"),
            AppointmentStatus::Complete => write!(f, "Complete"),
            AppointmentStatus::Canceled => write!(f, "Canceled"),
        }
    }
}

// ==============================================================================
// VALIDATION MODELS
// ==============================================================================

/// A proposed appointment as seen by the scheduling checks, before any
/// metadata stamping.
#[derive(Debug, Clone)]
pub struct AppointmentCandidate {
    pub pet_id: Uuid,
    pub vet_id: Uuid,
    pub appointment_type_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
}

/// Whether the candidate is a new booking or an in-place edit. Edits carry
/// their own row id so conflict detection skips it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Create,
    Edit { exclude_appointment_id: Uuid },
}

/// Reference data the validator decides against. Read once per validation,
/// never written.
#[derive(Debug, Clone, Default)]
pub struct ScheduleSnapshot {
    /// Clinic Calendar row for the candidate's weekday, if configured.
    pub clinic_hours: Option<ClinicHours>,
    /// Working intervals of the candidate's vet on that weekday.
    pub vet_schedules: Vec<VetSchedule>,
    /// Ledger rows for the candidate's vet, Canceled rows included or not
    /// as fetched; the validator skips Canceled itself.
    pub vet_appointments: Vec<Appointment>,
}

/// One reason a candidate is not legal to persist. Display carries the
/// message shown to the person correcting the booking.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleViolation {
    #[error("End time must be after start time.")]
    EndNotAfterStart,

    #[error("Clinic hours are not configured for this day.")]
    ClinicHoursNotConfigured,

    #[error("Appointment is outside clinic opening hours.")]
    OutsideClinicHours,

    #[error("This veterinarian has no schedule defined for that day.")]
    NoVetScheduleForDay,

    #[error("Appointment is outside this veterinarian's working hours.")]
    OutsideVetWorkingHours,

    #[error("This veterinarian already has an appointment in that time range.")]
    VetAlreadyBooked,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub pet_id: Uuid,
    pub vet_id: Uuid,
    pub appointment_type_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Defaults to Scheduled when omitted.
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub pet_id: Uuid,
    pub vet_id: Uuid,
    pub appointment_type_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub pet_id: Option<Uuid>,
    pub vet_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Scheduling rejected")]
    Rejected(Vec<ScheduleViolation>),

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Reference data error: {0}")]
    ReferenceData(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AppointmentError {
    /// Flatten a rejection into its display messages, in check order.
    pub fn violation_messages(violations: &[ScheduleViolation]) -> Vec<String> {
        violations.iter().map(|v| v.to_string()).collect()
    }
}
