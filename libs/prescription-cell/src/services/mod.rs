pub mod cid;
pub mod medicine;
pub mod prescription;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::models::PrescriptionError;

pub(crate) fn database_error(error: anyhow::Error) -> PrescriptionError {
    PrescriptionError::DatabaseError(error.to_string())
}

pub(crate) fn parse_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, PrescriptionError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| PrescriptionError::DatabaseError(format!("Failed to parse rows: {}", e)))
}

pub(crate) fn first_row<T: DeserializeOwned>(rows: Vec<Value>, context: &str) -> Result<T, PrescriptionError> {
    parse_rows(rows)?
        .into_iter()
        .next()
        .ok_or_else(|| PrescriptionError::DatabaseError(format!("{}: no row returned", context)))
}

/// PostgREST `ilike` pattern for a free-text fragment, `*` being its URL-safe wildcard.
pub(crate) fn search_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(|term| format!("*{}*", urlencoding::encode(term)))
}
