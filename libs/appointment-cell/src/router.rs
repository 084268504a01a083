// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, AppointmentState};
use crate::services::booking::AppointmentService;

pub fn appointment_routes(config: Arc<AppConfig>, service: Arc<AppointmentService>) -> Router {
    let state = AppointmentState { service };

    // Static segments are registered before the `{appointment_id}` captures.
    let protected_routes = Router::new()
        .route("/", post(handlers::create_appointment).get(handlers::list_appointments))
        .route("/today", get(handlers::today_appointments))
        .route("/week", get(handlers::week_appointments))
        .route("/meeting-strategies", get(handlers::meeting_strategies))
        .route("/google-calendar/status", get(handlers::calendar_status))
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment)
                .patch(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )
        .route("/{appointment_id}/status", patch(handlers::update_appointment_status))
        .route("/{appointment_id}/meet-link", post(handlers::generate_meet_link))
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
