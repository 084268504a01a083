use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    CreatePrescriptionRequest, Prescription, PrescriptionError, PrescriptionItemRequest,
    UpdatePrescriptionRequest,
};
use crate::services::cid::CidService;
use crate::services::medicine::MedicineService;
use crate::services::{database_error, first_row, parse_rows};

const PRESCRIPTION_SELECT: &str =
    "*,items:prescription_items(*,medicine:medicines(id,name,dosage,form)),cid:cids(id,code,description)";

pub struct PrescriptionService {
    supabase: SupabaseClient,
    medicines: MedicineService,
    cids: CidService,
}

impl PrescriptionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            medicines: MedicineService::new(config),
            cids: CidService::new(config),
        }
    }

    pub async fn create_prescription(
        &self,
        request: CreatePrescriptionRequest,
        doctor_id: i64,
        auth_token: &str,
    ) -> Result<Prescription, PrescriptionError> {
        debug!("Creating prescription for patient {} by doctor {}", request.patient_id, doctor_id);

        if request.patient_id <= 0 {
            return Err(PrescriptionError::ValidationError("Paciente inválido".to_string()));
        }
        self.validate_items(&request.items, auth_token).await?;
        if let Some(cid_id) = request.cid_id {
            self.cids.get_cid(cid_id, auth_token).await?;
        }

        let prescription_date = request.prescription_date.unwrap_or_else(|| Utc::now().date_naive());
        validate_validity(prescription_date, request.valid_until)?;

        let body = json!({
            "patient_id": request.patient_id,
            "doctor_id": doctor_id,
            "cid_id": request.cid_id,
            "instructions": request.instructions,
            "prescription_date": prescription_date,
            "valid_until": request.valid_until,
            "is_active": true
        });

        let rows = self.supabase
            .insert("prescriptions", body, auth_token)
            .await
            .map_err(database_error)?;
        let created: Prescription = first_row(rows, "Failed to create prescription")?;

        self.insert_items(created.id, &request.items, auth_token).await?;

        info!("Prescription {} created with {} items", created.id, request.items.len());
        self.get_prescription(created.id, auth_token).await
    }

    pub async fn list_by_doctor(&self, doctor_id: i64, auth_token: &str) -> Result<Vec<Prescription>, PrescriptionError> {
        self.list(&format!("doctor_id=eq.{}", doctor_id), auth_token).await
    }

    pub async fn list_by_patient(&self, patient_id: i64, auth_token: &str) -> Result<Vec<Prescription>, PrescriptionError> {
        self.list(&format!("patient_id=eq.{}", patient_id), auth_token).await
    }

    pub async fn get_prescription(&self, prescription_id: i64, auth_token: &str) -> Result<Prescription, PrescriptionError> {
        let query = format!(
            "id=eq.{}&is_active=eq.true&select={}",
            prescription_id, PRESCRIPTION_SELECT
        );
        let rows = self.supabase
            .select("prescriptions", &query, auth_token)
            .await
            .map_err(database_error)?;

        parse_rows::<Prescription>(rows)?
            .into_iter()
            .next()
            .ok_or(PrescriptionError::PrescriptionNotFound(prescription_id))
    }

    pub async fn update_prescription(
        &self,
        prescription_id: i64,
        request: UpdatePrescriptionRequest,
        auth_token: &str,
    ) -> Result<Prescription, PrescriptionError> {
        let existing = self.get_prescription(prescription_id, auth_token).await?;

        if let Some(items) = &request.items {
            self.validate_items(items, auth_token).await?;
        }
        if let Some(cid_id) = request.cid_id {
            self.cids.get_cid(cid_id, auth_token).await?;
        }
        validate_validity(
            request.prescription_date.unwrap_or(existing.prescription_date),
            request.valid_until.or(existing.valid_until),
        )?;

        let mut changes = Map::new();
        if let Some(cid_id) = request.cid_id {
            changes.insert("cid_id".to_string(), json!(cid_id));
        }
        if let Some(instructions) = &request.instructions {
            changes.insert("instructions".to_string(), json!(instructions));
        }
        if let Some(date) = request.prescription_date {
            changes.insert("prescription_date".to_string(), json!(date));
        }
        if let Some(valid_until) = request.valid_until {
            changes.insert("valid_until".to_string(), json!(valid_until));
        }

        if !changes.is_empty() {
            changes.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
            self.patch(prescription_id, Value::Object(changes), auth_token).await?;
        }

        if let Some(items) = &request.items {
            self.supabase
                .delete("prescription_items", &format!("prescription_id=eq.{}", prescription_id), auth_token)
                .await
                .map_err(database_error)?;
            self.insert_items(prescription_id, items, auth_token).await?;
        }

        info!("Prescription {} updated", prescription_id);
        self.get_prescription(prescription_id, auth_token).await
    }

    pub async fn remove_prescription(&self, prescription_id: i64, auth_token: &str) -> Result<(), PrescriptionError> {
        self.get_prescription(prescription_id, auth_token).await?;
        self.patch(
            prescription_id,
            json!({ "is_active": false, "updated_at": Utc::now().to_rfc3339() }),
            auth_token,
        ).await?;

        info!("Prescription {} deactivated", prescription_id);
        Ok(())
    }

    async fn list(&self, owner_filter: &str, auth_token: &str) -> Result<Vec<Prescription>, PrescriptionError> {
        let query = format!(
            "{}&is_active=eq.true&select={}&order=prescription_date.desc",
            owner_filter, PRESCRIPTION_SELECT
        );
        let rows = self.supabase
            .select("prescriptions", &query, auth_token)
            .await
            .map_err(database_error)?;

        parse_rows(rows)
    }

    async fn validate_items(&self, items: &[PrescriptionItemRequest], auth_token: &str) -> Result<(), PrescriptionError> {
        if items.is_empty() {
            return Err(PrescriptionError::ValidationError(
                "A receita deve conter pelo menos um medicamento".to_string(),
            ));
        }
        if items.iter().any(|item| item.dosage.trim().is_empty() || item.frequency.trim().is_empty()) {
            return Err(PrescriptionError::ValidationError(
                "Dosagem e frequência são obrigatórias".to_string(),
            ));
        }

        let medicine_ids: Vec<i64> = items.iter().map(|item| item.medicine_id).collect();
        self.medicines.ensure_exist(&medicine_ids, auth_token).await
    }

    async fn insert_items(
        &self,
        prescription_id: i64,
        items: &[PrescriptionItemRequest],
        auth_token: &str,
    ) -> Result<(), PrescriptionError> {
        let rows: Vec<Value> = items
            .iter()
            .map(|item| json!({
                "prescription_id": prescription_id,
                "medicine_id": item.medicine_id,
                "dosage": item.dosage.trim(),
                "frequency": item.frequency.trim(),
                "duration": item.duration.trim(),
                "notes": item.notes
            }))
            .collect();

        self.supabase
            .insert("prescription_items", Value::Array(rows), auth_token)
            .await
            .map_err(database_error)?;
        Ok(())
    }

    async fn patch(&self, prescription_id: i64, body: Value, auth_token: &str) -> Result<(), PrescriptionError> {
        let rows = self.supabase
            .update("prescriptions", &format!("id=eq.{}", prescription_id), body, auth_token)
            .await
            .map_err(database_error)?;

        if rows.is_empty() {
            return Err(PrescriptionError::PrescriptionNotFound(prescription_id));
        }
        Ok(())
    }
}

fn validate_validity(
    prescription_date: chrono::NaiveDate,
    valid_until: Option<chrono::NaiveDate>,
) -> Result<(), PrescriptionError> {
    if valid_until.is_some_and(|until| until < prescription_date) {
        return Err(PrescriptionError::ValidationError(
            "A validade deve ser posterior à data da receita".to_string(),
        ));
    }
    Ok(())
}
