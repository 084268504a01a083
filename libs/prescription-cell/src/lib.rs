//! # Prescription Cell
//!
//! Medicine catalog, CID (ICD-10) codes with their usual medicines, and the
//! prescriptions doctors issue to patients.
//!
//! - `/medicines` - catalog CRUD with `?search=` on name or active ingredient
//! - `/cids` - CID CRUD, `GET`/`PUT /cids/{id}/medicines` for linked medicines
//! - `/prescriptions` - prescriptions of the authenticated doctor or `?patientId=`
//!
//! Deletes are soft: rows are kept with `is_active = false`.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use router::{cid_routes, medicine_routes, prescription_routes};
