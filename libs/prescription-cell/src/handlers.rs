use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::doctor_id_from_user;

use crate::models::*;
use crate::services::cid::CidService;
use crate::services::medicine::MedicineService;
use crate::services::prescription::PrescriptionService;

// ==============================================================================
// MEDICINE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_medicine(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateMedicineRequest>,
) -> Result<(StatusCode, Json<Medicine>), AppError> {
    let medicine = MedicineService::new(&config).create_medicine(request, auth.token()).await?;
    Ok((StatusCode::CREATED, Json(medicine)))
}

#[axum::debug_handler]
pub async fn list_medicines(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Medicine>>, AppError> {
    Ok(Json(MedicineService::new(&config).list_medicines(query, auth.token()).await?))
}

#[axum::debug_handler]
pub async fn get_medicine(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(medicine_id): Path<i64>,
) -> Result<Json<Medicine>, AppError> {
    Ok(Json(MedicineService::new(&config).get_medicine(medicine_id, auth.token()).await?))
}

#[axum::debug_handler]
pub async fn update_medicine(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(medicine_id): Path<i64>,
    Json(request): Json<UpdateMedicineRequest>,
) -> Result<Json<Medicine>, AppError> {
    let medicine = MedicineService::new(&config)
        .update_medicine(medicine_id, request, auth.token())
        .await?;
    Ok(Json(medicine))
}

#[axum::debug_handler]
pub async fn delete_medicine(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(medicine_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    MedicineService::new(&config).remove_medicine(medicine_id, auth.token()).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// CID HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_cid(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateCidRequest>,
) -> Result<(StatusCode, Json<Cid>), AppError> {
    let cid = CidService::new(&config).create_cid(request, auth.token()).await?;
    Ok((StatusCode::CREATED, Json(cid)))
}

#[axum::debug_handler]
pub async fn list_cids(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Cid>>, AppError> {
    Ok(Json(CidService::new(&config).list_cids(query, auth.token()).await?))
}

#[axum::debug_handler]
pub async fn get_cid(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(cid_id): Path<i64>,
) -> Result<Json<Cid>, AppError> {
    Ok(Json(CidService::new(&config).get_cid(cid_id, auth.token()).await?))
}

#[axum::debug_handler]
pub async fn update_cid(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(cid_id): Path<i64>,
    Json(request): Json<UpdateCidRequest>,
) -> Result<Json<Cid>, AppError> {
    Ok(Json(CidService::new(&config).update_cid(cid_id, request, auth.token()).await?))
}

#[axum::debug_handler]
pub async fn delete_cid(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(cid_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    CidService::new(&config).remove_cid(cid_id, auth.token()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn get_cid_medicines(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(cid_id): Path<i64>,
) -> Result<Json<Vec<Medicine>>, AppError> {
    Ok(Json(CidService::new(&config).medicines_for(cid_id, auth.token()).await?))
}

#[axum::debug_handler]
pub async fn set_cid_medicines(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(cid_id): Path<i64>,
    Json(request): Json<CidMedicinesRequest>,
) -> Result<Json<Vec<Medicine>>, AppError> {
    let medicines = CidService::new(&config)
        .set_medicines(cid_id, request.medicine_ids, auth.token())
        .await?;
    Ok(Json(medicines))
}

// ==============================================================================
// PRESCRIPTION HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_prescription(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePrescriptionRequest>,
) -> Result<(StatusCode, Json<Prescription>), AppError> {
    let doctor_id = doctor_id_from_user(&user)?;
    let prescription = PrescriptionService::new(&config)
        .create_prescription(request, doctor_id, auth.token())
        .await?;
    Ok((StatusCode::CREATED, Json(prescription)))
}

#[axum::debug_handler]
pub async fn list_prescriptions(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<PrescriptionListQuery>,
) -> Result<Json<Vec<Prescription>>, AppError> {
    let service = PrescriptionService::new(&config);

    let prescriptions = match query.patient_id {
        Some(patient_id) => service.list_by_patient(patient_id, auth.token()).await?,
        None => service.list_by_doctor(doctor_id_from_user(&user)?, auth.token()).await?,
    };

    Ok(Json(prescriptions))
}

#[axum::debug_handler]
pub async fn get_prescription(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(prescription_id): Path<i64>,
) -> Result<Json<Prescription>, AppError> {
    Ok(Json(PrescriptionService::new(&config).get_prescription(prescription_id, auth.token()).await?))
}

#[axum::debug_handler]
pub async fn update_prescription(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(prescription_id): Path<i64>,
    Json(request): Json<UpdatePrescriptionRequest>,
) -> Result<Json<Prescription>, AppError> {
    let prescription = PrescriptionService::new(&config)
        .update_prescription(prescription_id, request, auth.token())
        .await?;
    Ok(Json(prescription))
}

#[axum::debug_handler]
pub async fn delete_prescription(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(prescription_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    PrescriptionService::new(&config).remove_prescription(prescription_id, auth.token()).await?;
    Ok(StatusCode::NO_CONTENT)
}
