// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AppointmentChanges, AppointmentError, AppointmentFilter, AppointmentStatus,
    CalendarStatus, CreateAppointmentRequest, MeetLinkResponse, MeetingStrategiesResponse,
    NewAppointment, UpdateAppointmentRequest, DEFAULT_DURATION_MINUTES, MAX_DURATION_MINUTES,
    MIN_DURATION_MINUTES,
};
use crate::services::calendar::{CalendarSync, CalendarSyncError, DisabledCalendar, GoogleCalendarClient};
use crate::services::conflict::ConflictChecker;
use crate::services::meeting::{MeetingLinkFactory, MeetingLinkGenerator, MeetingLinkInput};
use crate::services::store::{AppointmentStore, SupabaseAppointmentStore};

/// Orchestrates scheduling: conflict checks, meeting links and calendar mirroring.
///
/// Check-then-insert is not atomic. Two concurrent bookings for the same doctor
/// can both pass the conflict check before either is stored.
pub struct AppointmentService {
    store: Arc<dyn AppointmentStore>,
    conflict_checker: ConflictChecker,
    meeting_links: MeetingLinkFactory,
    calendar: Arc<dyn CalendarSync>,
}

impl AppointmentService {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        meeting_links: MeetingLinkFactory,
        calendar: Arc<dyn CalendarSync>,
    ) -> Self {
        Self {
            conflict_checker: ConflictChecker::new(Arc::clone(&store)),
            store,
            meeting_links,
            calendar,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppointmentError> {
        let supabase = Arc::new(SupabaseClient::new(config));
        let store: Arc<dyn AppointmentStore> = Arc::new(SupabaseAppointmentStore::new(supabase));
        let meeting_links = MeetingLinkFactory::from_config(config)?;

        let calendar: Arc<dyn CalendarSync> = match GoogleCalendarClient::from_config(config) {
            Ok(Some(client)) => {
                info!("Google Calendar sync enabled");
                Arc::new(client)
            }
            Ok(None) => Arc::new(DisabledCalendar),
            Err(e) => {
                warn!("Google Calendar sync disabled: {}", e);
                Arc::new(DisabledCalendar)
            }
        };

        Ok(Self::new(store, meeting_links, calendar))
    }

    pub async fn create(
        &self,
        request: CreateAppointmentRequest,
        doctor_id: i64,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        info!("Creating appointment for doctor {} and patient {}", doctor_id, request.patient_id);

        let duration = request.duration.unwrap_or(DEFAULT_DURATION_MINUTES);
        validate_title(&request.title)?;
        validate_duration(duration)?;
        if request.patient_id <= 0 {
            return Err(AppointmentError::ValidationError("Paciente inválido".to_string()));
        }

        if self.conflict_checker
            .has_conflict(doctor_id, request.appointment_date, duration, None, auth_token)
            .await?
        {
            return Err(AppointmentError::TimeSlotUnavailable);
        }

        let strategy = self.meeting_links.get_default_strategy();

        let appointment = self.store.insert(
            NewAppointment {
                title: request.title.trim().to_string(),
                description: request.description,
                appointment_date: request.appointment_date,
                duration,
                status: request.status.unwrap_or_default(),
                appointment_type: request.appointment_type.unwrap_or_default(),
                notes: request.notes,
                meeting_link_type: strategy.meeting_link_type(),
                patient_id: request.patient_id,
                doctor_id,
                is_active: true,
            },
            auth_token,
        ).await?;

        let meet_link = strategy.generate_meeting_link(&MeetingLinkInput::from(&appointment));
        let appointment = self.store.update(
            appointment.id,
            AppointmentChanges {
                meet_link: Some(meet_link),
                meeting_link_type: Some(strategy.meeting_link_type()),
                ..AppointmentChanges::default()
            },
            auth_token,
        ).await?;

        let event = log_calendar_outcome(
            "create",
            appointment.id,
            self.calendar.create_event(&appointment).await,
        );
        if let Some(event) = event {
            let stored = self.store.update(
                appointment.id,
                AppointmentChanges {
                    google_event_id: Some(event.id.clone()),
                    ..AppointmentChanges::default()
                },
                auth_token,
            ).await;
            if let Err(e) = stored {
                warn!(
                    "Calendar event {} created but not linked to appointment {}: {}",
                    event.id, appointment.id, e
                );
            }
        }

        info!("Appointment {} created for doctor {}", appointment.id, doctor_id);
        self.find_one(appointment.id, auth_token).await
    }

    pub async fn find_all(&self, doctor_id: i64, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = AppointmentFilter {
            doctor_id: Some(doctor_id),
            ..AppointmentFilter::active()
        };
        self.store.find(&filter, auth_token).await
    }

    pub async fn find_by_patient(&self, patient_id: i64, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = AppointmentFilter {
            patient_id: Some(patient_id),
            ..AppointmentFilter::active()
        };
        self.store.find(&filter, auth_token).await
    }

    pub async fn find_by_date_range(
        &self,
        doctor_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        if end < start {
            return Err(AppointmentError::ValidationError(
                "A data final deve ser posterior à data inicial".to_string(),
            ));
        }

        let filter = AppointmentFilter {
            doctor_id: Some(doctor_id),
            starts_from: Some(start),
            starts_until: Some(end),
            ..AppointmentFilter::active()
        };
        self.store.find(&filter, auth_token).await
    }

    pub async fn find_today(&self, doctor_id: i64, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let (start, end) = day_bounds(Utc::now());
        self.find_by_date_range(doctor_id, start, end, auth_token).await
    }

    pub async fn find_week(&self, doctor_id: i64, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let (start, end) = week_bounds(Utc::now());
        self.find_by_date_range(doctor_id, start, end, auth_token).await
    }

    pub async fn find_one(&self, id: i64, auth_token: &str) -> Result<Appointment, AppointmentError> {
        self.store
            .find_by_id(id, auth_token)
            .await?
            .filter(|appointment| appointment.is_active)
            .ok_or(AppointmentError::NotFound(id))
    }

    pub async fn update(
        &self,
        id: i64,
        request: UpdateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let existing = self.find_one(id, auth_token).await?;
        debug!("Updating appointment {}", id);

        if let Some(title) = &request.title {
            validate_title(title)?;
        }
        if let Some(duration) = request.duration {
            validate_duration(duration)?;
        }

        if request.changes_schedule() {
            let start = request.appointment_date.unwrap_or(existing.appointment_date);
            let duration = request.duration.unwrap_or(existing.duration);

            if self.conflict_checker
                .has_conflict(existing.doctor_id, start, duration, Some(id), auth_token)
                .await?
            {
                return Err(AppointmentError::TimeSlotUnavailable);
            }
        }

        let mut changes = AppointmentChanges {
            title: request.title.map(|title| title.trim().to_string()),
            description: request.description,
            appointment_date: request.appointment_date,
            duration: request.duration,
            status: request.status,
            appointment_type: request.appointment_type,
            notes: request.notes,
            patient_id: request.patient_id,
            meeting_link_type: request.meeting_link_type,
            custom_meeting_url: request.custom_meeting_url,
            ..AppointmentChanges::default()
        };

        // A stored link must come from the strategy named by meeting_link_type.
        if let Some(link_type) = request.meeting_link_type.filter(|t| *t != existing.meeting_link_type) {
            let strategy = self.meeting_links.get_strategy(link_type)?;
            let mut preview = existing.clone();
            changes.clone().apply_to(&mut preview);
            changes.meet_link = Some(strategy.generate_meeting_link(&MeetingLinkInput::from(&preview)));
            debug!("Appointment {} switches meeting link to {}", id, link_type);
        }

        let updated = if changes.is_empty() {
            existing
        } else {
            self.store.update(id, changes, auth_token).await?
        };

        if let Some(event_id) = &updated.google_event_id {
            log_calendar_outcome(
                "update",
                id,
                self.calendar.update_event(event_id, &updated).await,
            );
        }

        info!("Appointment {} updated", id);
        Ok(updated)
    }

    /// Overwrites the status. Any status may follow any other.
    pub async fn update_status(
        &self,
        id: i64,
        status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let existing = self.find_one(id, auth_token).await?;
        info!("Appointment {} status {} -> {}", id, existing.status, status);

        self.store.update(
            id,
            AppointmentChanges {
                status: Some(status),
                ..AppointmentChanges::default()
            },
            auth_token,
        ).await
    }

    /// Soft delete: the record stays in the store with `is_active = false`.
    pub async fn remove(&self, id: i64, auth_token: &str) -> Result<(), AppointmentError> {
        let existing = self.find_one(id, auth_token).await?;

        if let Some(event_id) = &existing.google_event_id {
            log_calendar_outcome("cancel", id, self.calendar.cancel_event(event_id).await);
        }

        self.store.update(
            id,
            AppointmentChanges {
                is_active: Some(false),
                ..AppointmentChanges::default()
            },
            auth_token,
        ).await?;

        info!("Appointment {} deactivated", id);
        Ok(())
    }

    /// Returns the stored link, or derives and stores one with the appointment's strategy.
    pub async fn generate_meet_link(&self, id: i64, auth_token: &str) -> Result<MeetLinkResponse, AppointmentError> {
        let appointment = self.find_one(id, auth_token).await?;

        if let Some(link) = appointment.meet_link.clone().filter(|link| !link.is_empty()) {
            debug!("Appointment {} already has a meeting link", id);
            return Ok(MeetLinkResponse {
                meet_link: link,
                meeting_link_type: appointment.meeting_link_type,
            });
        }

        let strategy = self.meeting_links.get_strategy(appointment.meeting_link_type)?;
        let meet_link = strategy.generate_meeting_link(&MeetingLinkInput::from(&appointment));

        self.store.update(
            id,
            AppointmentChanges {
                meet_link: Some(meet_link.clone()),
                ..AppointmentChanges::default()
            },
            auth_token,
        ).await?;

        info!("Generated {} link for appointment {}", strategy.meeting_link_type(), id);
        Ok(MeetLinkResponse {
            meet_link,
            meeting_link_type: strategy.meeting_link_type(),
        })
    }

    pub fn meeting_strategies(&self) -> MeetingStrategiesResponse {
        self.meeting_links.describe()
    }

    pub fn calendar_status(&self) -> CalendarStatus {
        self.calendar.status()
    }
}

/// Logs a failed calendar call and turns it into `None`; calendar trouble never fails the caller.
fn log_calendar_outcome<T>(
    operation: &str,
    appointment_id: i64,
    outcome: Result<T, CalendarSyncError>,
) -> Option<T> {
    match outcome {
        Ok(value) => Some(value),
        Err(CalendarSyncError::Disabled) => {
            debug!("Calendar {} skipped for appointment {}: sync disabled", operation, appointment_id);
            None
        }
        Err(e) => {
            warn!("Calendar {} failed for appointment {}: {}", operation, appointment_id, e);
            None
        }
    }
}

fn validate_title(title: &str) -> Result<(), AppointmentError> {
    if title.trim().is_empty() {
        return Err(AppointmentError::ValidationError("O título é obrigatório".to_string()));
    }
    Ok(())
}

fn validate_duration(duration: i32) -> Result<(), AppointmentError> {
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration) {
        return Err(AppointmentError::ValidationError(format!(
            "A duração deve estar entre {} e {} minutos",
            MIN_DURATION_MINUTES, MAX_DURATION_MINUTES
        )));
    }
    Ok(())
}

/// `[00:00, 23:59:59.999]` of the UTC day containing `now`.
pub fn day_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1) - Duration::milliseconds(1))
}

/// Sunday through Saturday of the UTC week containing `now`.
pub fn week_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let (today_start, _) = day_bounds(now);
    let start = today_start - Duration::days(now.weekday().num_days_from_sunday() as i64);
    (start, start + Duration::days(7) - Duration::milliseconds(1))
}
