use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::models::{
    schedule_end, Appointment, AppointmentError, AppointmentFilter, AppointmentStatus, MAX_DURATION_MINUTES,
};
use crate::services::store::AppointmentStore;

/// Half-open interval test: `[a_start, a_end)` and `[b_start, b_end)` share at least one instant.
pub fn intervals_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

pub struct ConflictChecker {
    store: Arc<dyn AppointmentStore>,
}

impl ConflictChecker {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }

    /// True when an active, non-cancelled appointment of the doctor overlaps
    /// `[proposed_start, proposed_start + duration_minutes)`.
    pub async fn has_conflict(
        &self,
        doctor_id: i64,
        proposed_start: DateTime<Utc>,
        duration_minutes: i32,
        exclude_appointment_id: Option<i64>,
        auth_token: &str,
    ) -> Result<bool, AppointmentError> {
        let conflicts = self
            .find_conflicts(doctor_id, proposed_start, duration_minutes, exclude_appointment_id, auth_token)
            .await?;

        if !conflicts.is_empty() {
            warn!(
                "Conflict detected for doctor {} at {} - {} overlapping appointments",
                doctor_id, proposed_start, conflicts.len()
            );
        }

        Ok(!conflicts.is_empty())
    }

    pub async fn find_conflicts(
        &self,
        doctor_id: i64,
        proposed_start: DateTime<Utc>,
        duration_minutes: i32,
        exclude_appointment_id: Option<i64>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let proposed_end = schedule_end(proposed_start, duration_minutes)?;
        debug!(
            "Checking conflicts for doctor {} from {} to {}",
            doctor_id, proposed_start, proposed_end
        );

        // Nothing starting earlier than the longest allowed duration can reach the window.
        let filter = AppointmentFilter {
            doctor_id: Some(doctor_id),
            exclude_status: Some(AppointmentStatus::Cancelled),
            exclude_id: exclude_appointment_id,
            starts_from: Some(
                proposed_start
                    .checked_sub_signed(Duration::minutes(MAX_DURATION_MINUTES as i64))
                    .unwrap_or(DateTime::<Utc>::MIN_UTC),
            ),
            starts_before: Some(proposed_end),
            ..AppointmentFilter::active()
        };

        let candidates = self.store.find(&filter, auth_token).await?;

        Ok(candidates
            .into_iter()
            .filter(|existing| {
                intervals_overlap(
                    proposed_start,
                    proposed_end,
                    existing.appointment_date,
                    existing.end_time(),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        assert!(!intervals_overlap(at(9, 30), at(10, 0), at(10, 0), at(10, 30)));
        assert!(!intervals_overlap(at(10, 0), at(10, 30), at(9, 30), at(10, 0)));
    }

    #[test]
    fn partial_and_nested_intervals_overlap() {
        assert!(intervals_overlap(at(10, 0), at(10, 30), at(10, 15), at(10, 45)));
        assert!(intervals_overlap(at(10, 0), at(12, 0), at(10, 30), at(11, 0)));
        assert!(intervals_overlap(at(10, 0), at(10, 30), at(10, 0), at(10, 30)));
    }
}
