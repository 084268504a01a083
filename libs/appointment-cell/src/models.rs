// libs/appointment-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_DURATION_MINUTES: i32 = 15;
pub const MAX_DURATION_MINUTES: i32 = 480;
pub const DEFAULT_DURATION_MINUTES: i32 = 30;

pub const TIME_SLOT_TAKEN_MESSAGE: &str = "Já existe um agendamento neste horário";

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub appointment_date: DateTime<Utc>,
    pub duration: i32,
    pub status: AppointmentStatus,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub meeting_link_type: MeetingLinkType,
    #[serde(default)]
    pub meet_link: Option<String>,
    #[serde(default)]
    pub google_event_id: Option<String>,
    /// Free-form room URL kept for the front desk. Never used as `meet_link`.
    #[serde(default)]
    pub custom_meeting_url: Option<String>,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<AppointmentPatient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor: Option<AppointmentDoctor>,
}

impl Appointment {
    /// End of the half-open window `[appointment_date, end)`, clamped to the latest representable instant.
    pub fn end_time(&self) -> DateTime<Utc> {
        self.appointment_date
            .checked_add_signed(Duration::minutes(self.duration as i64))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// `start + minutes`, rejected when the result falls outside the supported calendar range.
pub fn schedule_end(start: DateTime<Utc>, minutes: i32) -> Result<DateTime<Utc>, AppointmentError> {
    start
        .checked_add_signed(Duration::minutes(minutes as i64))
        .ok_or_else(|| AppointmentError::ValidationError("Data do agendamento fora do intervalo permitido".to_string()))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentPatient {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentDoctor {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub crm: Option<String>,
    #[serde(default)]
    pub specialty: Option<String>,
}

/// Status values. Updates overwrite the status freely; no transition table is enforced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    #[default]
    Consultation,
    FollowUp,
    Emergency,
    Routine,
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentType::Consultation => write!(f, "consultation"),
            AppointmentType::FollowUp => write!(f, "follow_up"),
            AppointmentType::Emergency => write!(f, "emergency"),
            AppointmentType::Routine => write!(f, "routine"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum MeetingLinkType {
    #[default]
    GoogleMeet,
    CustomUrl,
    ExternalPlatform,
}

impl MeetingLinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingLinkType::GoogleMeet => "google_meet",
            MeetingLinkType::CustomUrl => "custom_url",
            MeetingLinkType::ExternalPlatform => "external_platform",
        }
    }
}

impl fmt::Display for MeetingLinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeetingLinkType {
    type Err = AppointmentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "google_meet" => Ok(MeetingLinkType::GoogleMeet),
            "custom_url" => Ok(MeetingLinkType::CustomUrl),
            "external_platform" => Ok(MeetingLinkType::ExternalPlatform),
            other => Err(AppointmentError::Configuration(format!(
                "Unknown meeting link type: {}",
                other
            ))),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(alias = "appointmentDate")]
    pub appointment_date: DateTime<Utc>,
    pub duration: Option<i32>,
    pub status: Option<AppointmentStatus>,
    #[serde(rename = "type", default)]
    pub appointment_type: Option<AppointmentType>,
    pub notes: Option<String>,
    #[serde(alias = "patientId")]
    pub patient_id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "appointmentDate")]
    pub appointment_date: Option<DateTime<Utc>>,
    pub duration: Option<i32>,
    pub status: Option<AppointmentStatus>,
    #[serde(rename = "type", default)]
    pub appointment_type: Option<AppointmentType>,
    pub notes: Option<String>,
    #[serde(alias = "patientId")]
    pub patient_id: Option<i64>,
    #[serde(alias = "meetingLinkType")]
    pub meeting_link_type: Option<MeetingLinkType>,
    /// Stored as-is; link generation ignores it.
    #[serde(alias = "customMeetingUrl")]
    pub custom_meeting_url: Option<String>,
}

impl UpdateAppointmentRequest {
    pub fn changes_schedule(&self) -> bool {
        self.appointment_date.is_some() || self.duration.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentListQuery {
    #[serde(alias = "patientId")]
    pub patient_id: Option<i64>,
    #[serde(alias = "startDate")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(alias = "endDate")]
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeetLinkResponse {
    pub meet_link: String,
    pub meeting_link_type: MeetingLinkType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeetingStrategiesResponse {
    pub current: MeetingLinkType,
    pub available: Vec<MeetingLinkType>,
    pub configuration: MeetingConfiguration,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeetingConfiguration {
    pub meeting_link_type: String,
    pub custom_base_url: String,
    pub custom_platform_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarStatus {
    pub enabled: bool,
    pub message: String,
}

// ==============================================================================
// STORE MODELS
// ==============================================================================

/// Row written when an appointment is first persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    pub title: String,
    pub description: Option<String>,
    pub appointment_date: DateTime<Utc>,
    pub duration: i32,
    pub status: AppointmentStatus,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    pub notes: Option<String>,
    pub meeting_link_type: MeetingLinkType,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub is_active: bool,
}

/// Partial update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppointmentChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub appointment_type: Option<AppointmentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_link_type: Option<MeetingLinkType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meet_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_meeting_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl AppointmentChanges {
    pub fn is_empty(&self) -> bool {
        *self == AppointmentChanges::default()
    }

    pub fn apply_to(self, appointment: &mut Appointment) {
        if let Some(title) = self.title {
            appointment.title = title;
        }
        if let Some(description) = self.description {
            appointment.description = Some(description);
        }
        if let Some(date) = self.appointment_date {
            appointment.appointment_date = date;
        }
        if let Some(duration) = self.duration {
            appointment.duration = duration;
        }
        if let Some(status) = self.status {
            appointment.status = status;
        }
        if let Some(appointment_type) = self.appointment_type {
            appointment.appointment_type = appointment_type;
        }
        if let Some(notes) = self.notes {
            appointment.notes = Some(notes);
        }
        if let Some(patient_id) = self.patient_id {
            appointment.patient_id = patient_id;
        }
        if let Some(link_type) = self.meeting_link_type {
            appointment.meeting_link_type = link_type;
        }
        if let Some(link) = self.meet_link {
            appointment.meet_link = Some(link);
        }
        if let Some(event_id) = self.google_event_id {
            appointment.google_event_id = Some(event_id);
        }
        if let Some(url) = self.custom_meeting_url {
            appointment.custom_meeting_url = Some(url);
        }
        if let Some(is_active) = self.is_active {
            appointment.is_active = is_active;
        }
        appointment.updated_at = Utc::now();
    }
}

/// Selection criteria understood by every [`crate::services::store::AppointmentStore`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentFilter {
    pub doctor_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub active_only: bool,
    pub exclude_status: Option<AppointmentStatus>,
    pub exclude_id: Option<i64>,
    /// Inclusive lower bound on `appointment_date`.
    pub starts_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `appointment_date`.
    pub starts_until: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `appointment_date`.
    pub starts_before: Option<DateTime<Utc>>,
}

impl AppointmentFilter {
    pub fn active() -> Self {
        Self {
            active_only: true,
            ..Self::default()
        }
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        if self.active_only && !appointment.is_active {
            return false;
        }
        if self.doctor_id.is_some_and(|id| id != appointment.doctor_id) {
            return false;
        }
        if self.patient_id.is_some_and(|id| id != appointment.patient_id) {
            return false;
        }
        if self.exclude_status.is_some_and(|status| status == appointment.status) {
            return false;
        }
        if self.exclude_id.is_some_and(|id| id == appointment.id) {
            return false;
        }
        if self.starts_from.is_some_and(|from| appointment.appointment_date < from) {
            return false;
        }
        if self.starts_until.is_some_and(|until| appointment.appointment_date > until) {
            return false;
        }
        if self.starts_before.is_some_and(|before| appointment.appointment_date >= before) {
            return false;
        }
        true
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error, PartialEq)]
pub enum AppointmentError {
    #[error("Agendamento não encontrado")]
    NotFound(i64),

    #[error("Já existe um agendamento neste horário")]
    TimeSlotUnavailable,

    #[error("{0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<AppointmentError> for shared_models::error::AppError {
    fn from(error: AppointmentError) -> Self {
        use shared_models::error::AppError;

        match error {
            AppointmentError::NotFound(_) => AppError::NotFound(error.to_string()),
            AppointmentError::TimeSlotUnavailable => AppError::ValidationError(error.to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::Configuration(msg) => AppError::Configuration(msg),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
