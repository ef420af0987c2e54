// libs/appointment-cell/src/services/validator.rs
use tracing::debug;

use crate::models::{
    AppointmentCandidate, ScheduleSnapshot, ScheduleViolation, ValidationMode,
};

/// Decides whether a proposed appointment is legal to persist, against
/// snapshots of the clinic calendar, the vet's weekly availability and the
/// appointment ledger. Pure: no I/O, no writes.
///
/// All checks run independently and every violation is collected, so the
/// caller gets the complete correction list in one pass instead of fixing
/// one problem per round trip.
pub struct SchedulingValidator;

impl SchedulingValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(
        &self,
        candidate: &AppointmentCandidate,
        mode: ValidationMode,
        snapshot: &ScheduleSnapshot,
    ) -> Result<(), Vec<ScheduleViolation>> {
        let mut violations = Vec::new();

        self.check_interval(candidate, &mut violations);
        self.check_clinic_hours(candidate, snapshot, &mut violations);
        self.check_vet_availability(candidate, snapshot, &mut violations);
        self.check_conflicts(candidate, mode, snapshot, &mut violations);

        if violations.is_empty() {
            Ok(())
        } else {
            debug!(
                "Candidate for vet {} at {} rejected with {} violation(s)",
                candidate.vet_id,
                candidate.start_time,
                violations.len()
            );
            Err(violations)
        }
    }

    /// End must be strictly after start, independent of any reference data.
    fn check_interval(&self, candidate: &AppointmentCandidate, violations: &mut Vec<ScheduleViolation>) {
        if candidate.end_time <= candidate.start_time {
            violations.push(ScheduleViolation::EndNotAfterStart);
        }
    }

    /// The candidate's time-of-day range must sit inside the clinic's
    /// open/close interval for that weekday. A missing row is its own
    /// violation and suppresses the boundary check.
    fn check_clinic_hours(
        &self,
        candidate: &AppointmentCandidate,
        snapshot: &ScheduleSnapshot,
        violations: &mut Vec<ScheduleViolation>,
    ) {
        match &snapshot.clinic_hours {
            None => violations.push(ScheduleViolation::ClinicHoursNotConfigured),
            Some(hours) => {
                let start = candidate.start_time.time();
                let end = candidate.end_time.time();

                if start < hours.open_time || end > hours.close_time {
                    violations.push(ScheduleViolation::OutsideClinicHours);
                }
            }
        }
    }

    /// The candidate must fit entirely within one of the vet's working
    /// intervals for that weekday. Spanning two adjacent intervals does not
    /// count: a booking across a split-shift gap is rejected.
    fn check_vet_availability(
        &self,
        candidate: &AppointmentCandidate,
        snapshot: &ScheduleSnapshot,
        violations: &mut Vec<ScheduleViolation>,
    ) {
        if snapshot.vet_schedules.is_empty() {
            violations.push(ScheduleViolation::NoVetScheduleForDay);
            return;
        }

        let start = candidate.start_time.time();
        let end = candidate.end_time.time();

        let fits_some_interval = snapshot
            .vet_schedules
            .iter()
            .any(|shift| start >= shift.start_time && end <= shift.end_time);

        if !fits_some_interval {
            violations.push(ScheduleViolation::OutsideVetWorkingHours);
        }
    }

    /// Open-interval overlap against the vet's ledger rows. Canceled rows
    /// never conflict; in Edit mode the candidate's own row is skipped.
    /// Touching endpoints (back-to-back bookings) are not a conflict.
    /// Complete rows still block the slot.
    fn check_conflicts(
        &self,
        candidate: &AppointmentCandidate,
        mode: ValidationMode,
        snapshot: &ScheduleSnapshot,
        violations: &mut Vec<ScheduleViolation>,
    ) {
        let excluded_id = match mode {
            ValidationMode::Create => None,
            ValidationMode::Edit {
                exclude_appointment_id,
            } => Some(exclude_appointment_id),
        };

        let has_conflict = snapshot
            .vet_appointments
            .iter()
            .filter(|existing| existing.vet_id == candidate.vet_id)
            .filter(|existing| !existing.is_canceled())
            .filter(|existing| Some(existing.id) != excluded_id)
            .any(|existing| {
                existing.start_time < candidate.end_time
                    && existing.end_time > candidate.start_time
            });

        if has_conflict {
            violations.push(ScheduleViolation::VetAlreadyBooked);
        }
    }
}

impl Default for SchedulingValidator {
    fn default() -> Self {
        Self::new()
    }
}
