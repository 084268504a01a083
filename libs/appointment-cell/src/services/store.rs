// libs/appointment-cell/src/services/store.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tracing::debug;

use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AppointmentChanges, AppointmentError, AppointmentFilter, NewAppointment,
};

const APPOINTMENT_SELECT: &str =
    "*,patient:patients(id,name,phone,email),doctor:users(id,name,email,crm,specialty)";

/// Persistence boundary of the appointment cell.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert(&self, appointment: NewAppointment, auth_token: &str) -> Result<Appointment, AppointmentError>;

    /// Looks an appointment up by id regardless of its `is_active` flag.
    async fn find_by_id(&self, id: i64, auth_token: &str) -> Result<Option<Appointment>, AppointmentError>;

    /// Returns matching appointments ordered by `appointment_date` ascending.
    async fn find(&self, filter: &AppointmentFilter, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError>;

    async fn update(&self, id: i64, changes: AppointmentChanges, auth_token: &str) -> Result<Appointment, AppointmentError>;
}

pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn filter_query(filter: &AppointmentFilter) -> String {
        let mut query_parts = vec![format!("select={}", APPOINTMENT_SELECT)];

        if let Some(doctor_id) = filter.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(patient_id) = filter.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if filter.active_only {
            query_parts.push("is_active=eq.true".to_string());
        }
        if let Some(status) = filter.exclude_status {
            query_parts.push(format!("status=neq.{}", status));
        }
        if let Some(exclude_id) = filter.exclude_id {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }
        if let Some(from) = filter.starts_from {
            query_parts.push(format!("appointment_date=gte.{}", encode_timestamp(from)));
        }
        if let Some(until) = filter.starts_until {
            query_parts.push(format!("appointment_date=lte.{}", encode_timestamp(until)));
        }
        if let Some(before) = filter.starts_before {
            query_parts.push(format!("appointment_date=lt.{}", encode_timestamp(before)));
        }

        query_parts.push("order=appointment_date.asc".to_string());
        query_parts.join("&")
    }

    fn parse_rows(rows: Vec<Value>) -> Result<Vec<Appointment>, AppointmentError> {
        rows.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e)))
    }

    fn first_row(rows: Vec<Value>, context: &str) -> Result<Appointment, AppointmentError> {
        Self::parse_rows(rows)?
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::DatabaseError(format!("{}: no row returned", context)))
    }
}

fn encode_timestamp(value: DateTime<Utc>) -> String {
    urlencoding::encode(&value.to_rfc3339_opts(SecondsFormat::Millis, true)).into_owned()
}

fn database_error(error: anyhow::Error) -> AppointmentError {
    AppointmentError::DatabaseError(error.to_string())
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn insert(&self, appointment: NewAppointment, auth_token: &str) -> Result<Appointment, AppointmentError> {
        debug!("Inserting appointment for doctor {} at {}", appointment.doctor_id, appointment.appointment_date);

        let body = serde_json::to_value(&appointment)
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;
        let rows = self.supabase
            .insert("appointments", body, auth_token)
            .await
            .map_err(database_error)?;

        Self::first_row(rows, "Failed to create appointment")
    }

    async fn find_by_id(&self, id: i64, auth_token: &str) -> Result<Option<Appointment>, AppointmentError> {
        let query = format!("id=eq.{}&select={}", id, APPOINTMENT_SELECT);
        let rows = self.supabase
            .select("appointments", &query, auth_token)
            .await
            .map_err(database_error)?;

        Ok(Self::parse_rows(rows)?.into_iter().next())
    }

    async fn find(&self, filter: &AppointmentFilter, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let query = Self::filter_query(filter);
        debug!("Querying appointments with {}", query);

        let rows = self.supabase
            .select("appointments", &query, auth_token)
            .await
            .map_err(database_error)?;

        Self::parse_rows(rows)
    }

    async fn update(&self, id: i64, changes: AppointmentChanges, auth_token: &str) -> Result<Appointment, AppointmentError> {
        let mut body = serde_json::to_value(&changes)
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;
        if let Value::Object(map) = &mut body {
            map.insert("updated_at".to_string(), Value::String(Utc::now().to_rfc3339()));
        }

        let filter = format!("id=eq.{}&select={}", id, APPOINTMENT_SELECT);
        let rows = self.supabase
            .update("appointments", &filter, body, auth_token)
            .await
            .map_err(database_error)?;

        if rows.is_empty() {
            return Err(AppointmentError::NotFound(id));
        }

        Self::first_row(rows, "Failed to update appointment")
    }
}
