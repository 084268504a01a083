use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::{appointment_routes, AppointmentService};
use auth_cell::router::auth_routes;
use patient_cell::patient_routes;
use prescription_cell::{cid_routes, medicine_routes, prescription_routes};
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>, appointments: Arc<AppointmentService>) -> Router {
    Router::new()
        .route("/", get(|| async { "MedFlow API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone(), appointments))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/medicines", medicine_routes(state.clone()))
        .nest("/cids", cid_routes(state.clone()))
        .nest("/prescriptions", prescription_routes(state))
}
