use std::sync::Arc;
use axum::{
    extract::{Path, Query, State, Extension},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::doctor_id_from_user;

use crate::models::{CreatePatientRequest, Patient, PatientSearchQuery, UpdatePatientRequest};
use crate::services::patient::PatientService;

#[axum::debug_handler]
pub async fn create_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<Patient>), AppError> {
    let doctor_id = doctor_id_from_user(&user)?;
    let service = PatientService::new(&config);

    let patient = service.create_patient(request, doctor_id, auth.token()).await?;

    Ok((StatusCode::CREATED, Json(patient)))
}

#[axum::debug_handler]
pub async fn list_patients(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Json<Vec<Patient>>, AppError> {
    let doctor_id = doctor_id_from_user(&user)?;
    let service = PatientService::new(&config);

    Ok(Json(service.list_patients(doctor_id, query, auth.token()).await?))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<i64>,
) -> Result<Json<Patient>, AppError> {
    let service = PatientService::new(&config);

    Ok(Json(service.get_patient(patient_id, auth.token()).await?))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<i64>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Patient>, AppError> {
    let service = PatientService::new(&config);

    Ok(Json(service.update_patient(patient_id, request, auth.token()).await?))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let service = PatientService::new(&config);

    service.remove_patient(patient_id, auth.token()).await?;
    Ok(StatusCode::NO_CONTENT)
}
