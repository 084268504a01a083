use serde_json::{json, Value};
use tracing::{debug, info};
use chrono::Utc;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Patient, CreatePatientRequest, UpdatePatientRequest, PatientSearchQuery, PatientError};

pub struct PatientService {
    supabase: SupabaseClient,
}

fn database_error(error: anyhow::Error) -> PatientError {
    PatientError::DatabaseError(error.to_string())
}

fn parse_patients(rows: Vec<Value>) -> Result<Vec<Patient>, PatientError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<Patient>, _>>()
        .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patients: {}", e)))
}

fn validate_name(name: &str) -> Result<(), PatientError> {
    if name.trim().is_empty() {
        return Err(PatientError::ValidationError("O nome do paciente é obrigatório".to_string()));
    }
    Ok(())
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_patient(
        &self,
        request: CreatePatientRequest,
        doctor_id: i64,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Creating patient for doctor {}", doctor_id);
        validate_name(&request.name)?;

        if let Some(cpf) = request.cpf.as_deref().filter(|cpf| !cpf.trim().is_empty()) {
            let query = format!(
                "cpf=eq.{}&doctor_id=eq.{}&is_active=eq.true&select=id",
                urlencoding::encode(cpf.trim()),
                doctor_id
            );
            let existing = self.supabase
                .select("patients", &query, auth_token)
                .await
                .map_err(database_error)?;

            if !existing.is_empty() {
                return Err(PatientError::CpfAlreadyExists { cpf: cpf.trim().to_string() });
            }
        }

        let patient_data = json!({
            "name": request.name.trim(),
            "cpf": request.cpf,
            "birth_date": request.birth_date,
            "phone": request.phone,
            "email": request.email,
            "address": request.address,
            "medical_history": request.medical_history,
            "allergies": request.allergies,
            "doctor_id": doctor_id,
            "is_active": true
        });

        let rows = self.supabase
            .insert("patients", patient_data, auth_token)
            .await
            .map_err(database_error)?;

        let patient = parse_patients(rows)?
            .into_iter()
            .next()
            .ok_or_else(|| PatientError::DatabaseError("Failed to create patient".to_string()))?;

        info!("Patient {} created for doctor {}", patient.id, doctor_id);
        Ok(patient)
    }

    /// Active patients of the doctor ordered by name, optionally filtered by a case-insensitive name fragment.
    pub async fn list_patients(
        &self,
        doctor_id: i64,
        query: PatientSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Patient>, PatientError> {
        let mut query_parts = vec![
            format!("doctor_id=eq.{}", doctor_id),
            "is_active=eq.true".to_string(),
        ];

        if let Some(name) = query.name.as_deref().map(str::trim).filter(|name| !name.is_empty()) {
            query_parts.push(format!("name=ilike.{}", urlencoding::encode(&format!("%{}%", name))));
        }
        query_parts.push("order=name.asc".to_string());

        let query_string = query_parts.join("&");
        debug!("Listing patients with {}", query_string);

        let rows = self.supabase
            .select("patients", &query_string, auth_token)
            .await
            .map_err(database_error)?;

        parse_patients(rows)
    }

    pub async fn get_patient(
        &self,
        patient_id: i64,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Fetching patient {}", patient_id);

        let query = format!("id=eq.{}&is_active=eq.true", patient_id);
        let rows = self.supabase
            .select("patients", &query, auth_token)
            .await
            .map_err(database_error)?;

        parse_patients(rows)?
            .into_iter()
            .next()
            .ok_or(PatientError::NotFound(patient_id))
    }

    pub async fn update_patient(
        &self,
        patient_id: i64,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Updating patient {}", patient_id);
        if let Some(name) = &request.name {
            validate_name(name)?;
        }

        let existing = self.get_patient(patient_id, auth_token).await?;

        let mut update_data = serde_json::to_value(&request)
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;
        if let Value::Object(map) = &mut update_data {
            if map.is_empty() {
                return Ok(existing);
            }
            map.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
        }

        self.patch(patient_id, update_data, auth_token).await
    }

    /// Soft delete: the row stays with `is_active = false`.
    pub async fn remove_patient(
        &self,
        patient_id: i64,
        auth_token: &str,
    ) -> Result<(), PatientError> {
        self.get_patient(patient_id, auth_token).await?;

        self.patch(
            patient_id,
            json!({ "is_active": false, "updated_at": Utc::now().to_rfc3339() }),
            auth_token,
        ).await?;

        info!("Patient {} deactivated", patient_id);
        Ok(())
    }

    async fn patch(&self, patient_id: i64, body: Value, auth_token: &str) -> Result<Patient, PatientError> {
        let filter = format!("id=eq.{}", patient_id);
        let rows = self.supabase
            .update("patients", &filter, body, auth_token)
            .await
            .map_err(database_error)?;

        parse_patients(rows)?
            .into_iter()
            .next()
            .ok_or(PatientError::NotFound(patient_id))
    }
}
