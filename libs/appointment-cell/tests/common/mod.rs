#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use appointment_cell::models::{
    Appointment, AppointmentChanges, AppointmentError, AppointmentFilter, AppointmentStatus,
    AppointmentType, CreateAppointmentRequest, MeetingLinkType, NewAppointment,
};
use appointment_cell::services::booking::AppointmentService;
use appointment_cell::services::calendar::{CalendarSync, DisabledCalendar};
use appointment_cell::services::meeting::MeetingLinkFactory;
use appointment_cell::services::store::AppointmentStore;
use shared_config::AppConfig;

pub const DOCTOR_ID: i64 = 1;
pub const OTHER_DOCTOR_ID: i64 = 2;
pub const PATIENT_ID: i64 = 5;
pub const TOKEN: &str = "test-token";

/// Store backed by a vector, ids assigned sequentially from 1.
#[derive(Default)]
pub struct MemoryAppointmentStore {
    rows: Mutex<Vec<Appointment>>,
    updates: Mutex<usize>,
    failing_update: Option<usize>,
}

impl MemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `n`th call to `update` (1-based) fails with a database error.
    pub fn failing_update(n: usize) -> Self {
        Self {
            failing_update: Some(n),
            ..Self::default()
        }
    }

    pub fn snapshot(&self, id: i64) -> Option<Appointment> {
        self.rows.lock().unwrap().iter().find(|row| row.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl AppointmentStore for MemoryAppointmentStore {
    async fn insert(&self, appointment: NewAppointment, _auth_token: &str) -> Result<Appointment, AppointmentError> {
        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();
        let row = Appointment {
            id: rows.len() as i64 + 1,
            title: appointment.title,
            description: appointment.description,
            appointment_date: appointment.appointment_date,
            duration: appointment.duration,
            status: appointment.status,
            appointment_type: appointment.appointment_type,
            notes: appointment.notes,
            meeting_link_type: appointment.meeting_link_type,
            meet_link: None,
            google_event_id: None,
            custom_meeting_url: None,
            patient_id: appointment.patient_id,
            doctor_id: appointment.doctor_id,
            is_active: appointment.is_active,
            created_at: now,
            updated_at: now,
            patient: None,
            doctor: None,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: i64, _auth_token: &str) -> Result<Option<Appointment>, AppointmentError> {
        Ok(self.snapshot(id))
    }

    async fn find(&self, filter: &AppointmentFilter, _auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let mut found: Vec<Appointment> = self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();
        found.sort_by_key(|row| row.appointment_date);
        Ok(found)
    }

    async fn update(&self, id: i64, changes: AppointmentChanges, _auth_token: &str) -> Result<Appointment, AppointmentError> {
        let call = {
            let mut updates = self.updates.lock().unwrap();
            *updates += 1;
            *updates
        };
        if self.failing_update == Some(call) {
            return Err(AppointmentError::DatabaseError("connection reset".to_string()));
        }

        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(AppointmentError::NotFound(id))?;
        changes.apply_to(row);
        Ok(row.clone())
    }
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, hour, minute, 0).unwrap()
}

pub fn create_request(start: DateTime<Utc>, duration: Option<i32>) -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        title: "Avaliação de joelho".to_string(),
        description: Some("Dor ao subir escadas".to_string()),
        appointment_date: start,
        duration,
        status: None,
        appointment_type: Some(AppointmentType::Consultation),
        notes: None,
        patient_id: PATIENT_ID,
    }
}

pub fn config_with_link_type(link_type: &str) -> AppConfig {
    AppConfig {
        meeting_link_type: link_type.to_string(),
        custom_meeting_base_url: "https://rooms.medflow.test".to_string(),
        ..AppConfig::default()
    }
}

pub fn service_with_calendar(
    store: Arc<MemoryAppointmentStore>,
    config: &AppConfig,
    calendar: Arc<dyn CalendarSync>,
) -> AppointmentService {
    let factory = MeetingLinkFactory::from_config(config).expect("factory builds");
    AppointmentService::new(store, factory, calendar)
}

pub fn service(store: Arc<MemoryAppointmentStore>) -> AppointmentService {
    service_with_calendar(store, &config_with_link_type("google_meet"), Arc::new(DisabledCalendar))
}

pub fn stored_appointment(id: i64, start: DateTime<Utc>, duration: i32) -> Appointment {
    Appointment {
        id,
        title: "Retorno".to_string(),
        description: None,
        appointment_date: start,
        duration,
        status: AppointmentStatus::Scheduled,
        appointment_type: AppointmentType::FollowUp,
        notes: None,
        meeting_link_type: MeetingLinkType::GoogleMeet,
        meet_link: None,
        google_event_id: None,
        custom_meeting_url: None,
        patient_id: PATIENT_ID,
        doctor_id: DOCTOR_ID,
        is_active: true,
        created_at: start,
        updated_at: start,
        patient: None,
        doctor: None,
    }
}
