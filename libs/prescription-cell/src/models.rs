use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use shared_models::error::AppError;

// ==============================================================================
// MEDICINES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medicine {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub active_ingredient: Option<String>,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub form: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMedicineRequest {
    pub name: String,
    #[serde(alias = "activeIngredient")]
    pub active_ingredient: Option<String>,
    pub dosage: Option<String>,
    pub form: Option<String>,
    pub manufacturer: Option<String>,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMedicineRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(alias = "activeIngredient", skip_serializing_if = "Option::is_none")]
    pub active_ingredient: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

// ==============================================================================
// CIDS
// ==============================================================================

/// ICD-10 diagnosis code as used in Brazilian prescriptions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cid {
    pub id: i64,
    pub code: String,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCidRequest {
    pub code: String,
    pub description: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCidRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CidMedicinesRequest {
    #[serde(alias = "medicineIds")]
    pub medicine_ids: Vec<i64>,
}

pub fn normalize_cid_code(code: &str) -> String {
    code.trim().to_uppercase()
}

// ==============================================================================
// PRESCRIPTIONS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionItem {
    #[serde(default)]
    pub id: Option<i64>,
    pub medicine_id: i64,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medicine: Option<PrescriptionMedicine>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionMedicine {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub form: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prescription {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    #[serde(default)]
    pub cid_id: Option<i64>,
    #[serde(default)]
    pub instructions: Option<String>,
    pub prescription_date: NaiveDate,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<PrescriptionItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<PrescriptionCid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionCid {
    pub id: i64,
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionItemRequest {
    #[serde(alias = "medicineId")]
    pub medicine_id: i64,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePrescriptionRequest {
    #[serde(alias = "patientId")]
    pub patient_id: i64,
    #[serde(alias = "cidId")]
    pub cid_id: Option<i64>,
    pub items: Vec<PrescriptionItemRequest>,
    pub instructions: Option<String>,
    #[serde(alias = "prescriptionDate")]
    pub prescription_date: Option<NaiveDate>,
    #[serde(alias = "validUntil")]
    pub valid_until: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePrescriptionRequest {
    #[serde(alias = "cidId")]
    pub cid_id: Option<i64>,
    /// Replaces every item when present.
    pub items: Option<Vec<PrescriptionItemRequest>>,
    pub instructions: Option<String>,
    #[serde(alias = "prescriptionDate")]
    pub prescription_date: Option<NaiveDate>,
    #[serde(alias = "validUntil")]
    pub valid_until: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrescriptionListQuery {
    #[serde(alias = "patientId")]
    pub patient_id: Option<i64>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error, PartialEq)]
pub enum PrescriptionError {
    #[error("Medicamento não encontrado")]
    MedicineNotFound(i64),

    #[error("CID não encontrado")]
    CidNotFound(i64),

    #[error("Receita não encontrada")]
    PrescriptionNotFound(i64),

    #[error("Já existe um CID com o código {code}")]
    CidCodeExists { code: String },

    #[error("{0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<PrescriptionError> for AppError {
    fn from(error: PrescriptionError) -> Self {
        match error {
            PrescriptionError::MedicineNotFound(_)
            | PrescriptionError::CidNotFound(_)
            | PrescriptionError::PrescriptionNotFound(_) => AppError::NotFound(error.to_string()),
            PrescriptionError::CidCodeExists { .. } => AppError::Conflict(error.to_string()),
            PrescriptionError::ValidationError(msg) => AppError::ValidationError(msg),
            PrescriptionError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
