use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    normalize_cid_code, Cid, CreateCidRequest, Medicine, PrescriptionError, SearchQuery, UpdateCidRequest,
};
use crate::services::medicine::MedicineService;
use crate::services::{database_error, first_row, parse_rows, search_pattern};

#[derive(Debug, Deserialize)]
struct CidMedicineLink {
    medicine: Option<Medicine>,
}

pub struct CidService {
    supabase: SupabaseClient,
    medicines: MedicineService,
}

impl CidService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            medicines: MedicineService::new(config),
        }
    }

    pub async fn create_cid(&self, request: CreateCidRequest, auth_token: &str) -> Result<Cid, PrescriptionError> {
        let code = normalize_cid_code(&request.code);
        if code.is_empty() || request.description.trim().is_empty() {
            return Err(PrescriptionError::ValidationError("Código e descrição do CID são obrigatórios".to_string()));
        }
        self.ensure_code_free(&code, None, auth_token).await?;

        let body = json!({
            "code": code,
            "description": request.description.trim(),
            "category": request.category,
            "is_active": true
        });

        let rows = self.supabase
            .insert("cids", body, auth_token)
            .await
            .map_err(database_error)?;

        let cid: Cid = first_row(rows, "Failed to create CID")?;
        info!("CID {} ({}) created", cid.id, cid.code);
        Ok(cid)
    }

    /// Active CIDs ordered by code; `search` matches code or description.
    pub async fn list_cids(&self, query: SearchQuery, auth_token: &str) -> Result<Vec<Cid>, PrescriptionError> {
        let mut query_parts = vec!["is_active=eq.true".to_string()];

        if let Some(pattern) = search_pattern(query.search.as_deref()) {
            query_parts.push(format!("or=(code.ilike.{0},description.ilike.{0})", pattern));
        }
        query_parts.push("order=code.asc".to_string());

        let rows = self.supabase
            .select("cids", &query_parts.join("&"), auth_token)
            .await
            .map_err(database_error)?;

        parse_rows(rows)
    }

    pub async fn get_cid(&self, cid_id: i64, auth_token: &str) -> Result<Cid, PrescriptionError> {
        let query = format!("id=eq.{}&is_active=eq.true", cid_id);
        let rows = self.supabase
            .select("cids", &query, auth_token)
            .await
            .map_err(database_error)?;

        parse_rows::<Cid>(rows)?
            .into_iter()
            .next()
            .ok_or(PrescriptionError::CidNotFound(cid_id))
    }

    pub async fn update_cid(
        &self,
        cid_id: i64,
        mut request: UpdateCidRequest,
        auth_token: &str,
    ) -> Result<Cid, PrescriptionError> {
        let existing = self.get_cid(cid_id, auth_token).await?;

        if let Some(code) = request.code.take() {
            let code = normalize_cid_code(&code);
            if code.is_empty() {
                return Err(PrescriptionError::ValidationError("Código e descrição do CID são obrigatórios".to_string()));
            }
            if code != existing.code {
                self.ensure_code_free(&code, Some(cid_id), auth_token).await?;
            }
            request.code = Some(code);
        }

        let mut body = serde_json::to_value(&request)
            .map_err(|e| PrescriptionError::DatabaseError(e.to_string()))?;
        if let Value::Object(map) = &mut body {
            if map.is_empty() {
                return Ok(existing);
            }
            map.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
        }

        self.patch(cid_id, body, auth_token).await
    }

    pub async fn remove_cid(&self, cid_id: i64, auth_token: &str) -> Result<(), PrescriptionError> {
        self.get_cid(cid_id, auth_token).await?;
        self.patch(
            cid_id,
            json!({ "is_active": false, "updated_at": Utc::now().to_rfc3339() }),
            auth_token,
        ).await?;

        info!("CID {} deactivated", cid_id);
        Ok(())
    }

    /// Active medicines linked to the CID.
    pub async fn medicines_for(&self, cid_id: i64, auth_token: &str) -> Result<Vec<Medicine>, PrescriptionError> {
        self.get_cid(cid_id, auth_token).await?;

        let query = format!("cid_id=eq.{}&select=medicine:medicines(*)", cid_id);
        let rows = self.supabase
            .select("cid_medicines", &query, auth_token)
            .await
            .map_err(database_error)?;

        let mut medicines: Vec<Medicine> = parse_rows::<CidMedicineLink>(rows)?
            .into_iter()
            .filter_map(|link| link.medicine)
            .filter(|medicine| medicine.is_active)
            .collect();
        medicines.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(medicines)
    }

    /// Replaces every medicine link of the CID with `medicine_ids`.
    pub async fn set_medicines(
        &self,
        cid_id: i64,
        medicine_ids: Vec<i64>,
        auth_token: &str,
    ) -> Result<Vec<Medicine>, PrescriptionError> {
        self.get_cid(cid_id, auth_token).await?;
        self.medicines.ensure_exist(&medicine_ids, auth_token).await?;

        debug!("Replacing medicines of CID {} with {:?}", cid_id, medicine_ids);
        self.supabase
            .delete("cid_medicines", &format!("cid_id=eq.{}", cid_id), auth_token)
            .await
            .map_err(database_error)?;

        let mut unique_ids = medicine_ids;
        unique_ids.sort_unstable();
        unique_ids.dedup();

        if !unique_ids.is_empty() {
            let links: Vec<Value> = unique_ids
                .iter()
                .map(|medicine_id| json!({ "cid_id": cid_id, "medicine_id": medicine_id }))
                .collect();
            self.supabase
                .insert("cid_medicines", Value::Array(links), auth_token)
                .await
                .map_err(database_error)?;
        }

        self.medicines_for(cid_id, auth_token).await
    }

    async fn ensure_code_free(
        &self,
        code: &str,
        except_id: Option<i64>,
        auth_token: &str,
    ) -> Result<(), PrescriptionError> {
        let mut query = format!("code=eq.{}&select=id", urlencoding::encode(code));
        if let Some(id) = except_id {
            query.push_str(&format!("&id=neq.{}", id));
        }

        let rows = self.supabase
            .select("cids", &query, auth_token)
            .await
            .map_err(database_error)?;

        if rows.is_empty() {
            Ok(())
        } else {
            Err(PrescriptionError::CidCodeExists { code: code.to_string() })
        }
    }

    async fn patch(&self, cid_id: i64, body: Value, auth_token: &str) -> Result<Cid, PrescriptionError> {
        let rows = self.supabase
            .update("cids", &format!("id=eq.{}", cid_id), body, auth_token)
            .await
            .map_err(database_error)?;

        parse_rows::<Cid>(rows)?
            .into_iter()
            .next()
            .ok_or(PrescriptionError::CidNotFound(cid_id))
    }
}
