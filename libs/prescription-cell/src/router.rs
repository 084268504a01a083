use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn medicine_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(list_medicines).post(create_medicine))
        .route("/{id}", get(get_medicine).patch(update_medicine).delete(delete_medicine))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}

pub fn cid_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(list_cids).post(create_cid))
        .route("/{id}", get(get_cid).patch(update_cid).delete(delete_cid))
        .route("/{id}/medicines", get(get_cid_medicines).put(set_cid_medicines))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}

pub fn prescription_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(list_prescriptions).post(create_prescription))
        .route(
            "/{id}",
            get(get_prescription).patch(update_prescription).delete(delete_prescription),
        )
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
