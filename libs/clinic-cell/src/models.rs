use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Calendar weekday, serialized as the English day name. The day name is the
/// join key between appointments, clinic hours and vet schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// Weekday of a calendar date, taken from the date as stored with no
    /// timezone conversion.
    pub fn from_date(date: NaiveDate) -> Self {
        match date.weekday() {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clinic-wide opening interval for one weekday. At most one row per day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicHours {
    pub id: Uuid,
    pub day_of_week: Weekday,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
}

/// One working interval of a veterinarian on a weekday. A vet may have
/// several intervals on the same day (split shifts).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VetSchedule {
    pub id: Uuid,
    pub vet_id: Uuid,
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateClinicHoursRequest {
    pub day_of_week: Weekday,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateClinicHoursRequest {
    pub open_time: Option<NaiveTime>,
    pub close_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateVetScheduleRequest {
    pub vet_id: Uuid,
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateVetScheduleRequest {
    pub day_of_week: Option<Weekday>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ClinicError {
    #[error("Record not found")]
    NotFound,

    #[error("Close time must be after open time")]
    InvalidHoursInterval,

    #[error("End time must be after start time")]
    InvalidScheduleInterval,

    #[error("Clinic hours already configured for {0}")]
    DuplicateWeekday(Weekday),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
