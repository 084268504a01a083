use std::collections::BTreeSet;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{CreateMedicineRequest, Medicine, PrescriptionError, SearchQuery, UpdateMedicineRequest};
use crate::services::{database_error, first_row, parse_rows, search_pattern};

pub struct MedicineService {
    supabase: SupabaseClient,
}

impl MedicineService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_medicine(
        &self,
        request: CreateMedicineRequest,
        auth_token: &str,
    ) -> Result<Medicine, PrescriptionError> {
        if request.name.trim().is_empty() {
            return Err(PrescriptionError::ValidationError("O nome do medicamento é obrigatório".to_string()));
        }

        let body = json!({
            "name": request.name.trim(),
            "active_ingredient": request.active_ingredient,
            "dosage": request.dosage,
            "form": request.form,
            "manufacturer": request.manufacturer,
            "instructions": request.instructions,
            "is_active": true
        });

        let rows = self.supabase
            .insert("medicines", body, auth_token)
            .await
            .map_err(database_error)?;

        let medicine: Medicine = first_row(rows, "Failed to create medicine")?;
        info!("Medicine {} created", medicine.id);
        Ok(medicine)
    }

    /// Active medicines ordered by name; `search` matches name or active ingredient.
    pub async fn list_medicines(
        &self,
        query: SearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Medicine>, PrescriptionError> {
        let mut query_parts = vec!["is_active=eq.true".to_string()];

        if let Some(pattern) = search_pattern(query.search.as_deref()) {
            query_parts.push(format!("or=(name.ilike.{0},active_ingredient.ilike.{0})", pattern));
        }
        query_parts.push("order=name.asc".to_string());

        let rows = self.supabase
            .select("medicines", &query_parts.join("&"), auth_token)
            .await
            .map_err(database_error)?;

        parse_rows(rows)
    }

    pub async fn get_medicine(&self, medicine_id: i64, auth_token: &str) -> Result<Medicine, PrescriptionError> {
        let query = format!("id=eq.{}&is_active=eq.true", medicine_id);
        let rows = self.supabase
            .select("medicines", &query, auth_token)
            .await
            .map_err(database_error)?;

        parse_rows::<Medicine>(rows)?
            .into_iter()
            .next()
            .ok_or(PrescriptionError::MedicineNotFound(medicine_id))
    }

    pub async fn update_medicine(
        &self,
        medicine_id: i64,
        request: UpdateMedicineRequest,
        auth_token: &str,
    ) -> Result<Medicine, PrescriptionError> {
        if request.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(PrescriptionError::ValidationError("O nome do medicamento é obrigatório".to_string()));
        }
        let existing = self.get_medicine(medicine_id, auth_token).await?;

        let mut body = serde_json::to_value(&request)
            .map_err(|e| PrescriptionError::DatabaseError(e.to_string()))?;
        if let Value::Object(map) = &mut body {
            if map.is_empty() {
                return Ok(existing);
            }
            map.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
        }

        self.patch(medicine_id, body, auth_token).await
    }

    pub async fn remove_medicine(&self, medicine_id: i64, auth_token: &str) -> Result<(), PrescriptionError> {
        self.get_medicine(medicine_id, auth_token).await?;
        self.patch(
            medicine_id,
            json!({ "is_active": false, "updated_at": Utc::now().to_rfc3339() }),
            auth_token,
        ).await?;

        info!("Medicine {} deactivated", medicine_id);
        Ok(())
    }

    /// Fails with `MedicineNotFound` for the first id that is missing or inactive.
    pub async fn ensure_exist(&self, medicine_ids: &[i64], auth_token: &str) -> Result<(), PrescriptionError> {
        let wanted: BTreeSet<i64> = medicine_ids.iter().copied().collect();
        if wanted.is_empty() {
            return Ok(());
        }

        let id_list = wanted.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",");
        let query = format!("id=in.({})&is_active=eq.true&select=id", id_list);
        debug!("Checking medicines {}", id_list);

        let rows = self.supabase
            .select("medicines", &query, auth_token)
            .await
            .map_err(database_error)?;

        let found: BTreeSet<i64> = rows
            .iter()
            .filter_map(|row| row.get("id").and_then(Value::as_i64))
            .collect();

        match wanted.difference(&found).next() {
            Some(missing) => Err(PrescriptionError::MedicineNotFound(*missing)),
            None => Ok(()),
        }
    }

    async fn patch(&self, medicine_id: i64, body: Value, auth_token: &str) -> Result<Medicine, PrescriptionError> {
        let rows = self.supabase
            .update("medicines", &format!("id=eq.{}", medicine_id), body, auth_token)
            .await
            .map_err(database_error)?;

        parse_rows::<Medicine>(rows)?
            .into_iter()
            .next()
            .ok_or(PrescriptionError::MedicineNotFound(medicine_id))
    }
}
