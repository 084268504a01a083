// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use tracing::debug;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::doctor_id_from_user;

use crate::models::{
    Appointment, AppointmentListQuery, CalendarStatus, CreateAppointmentRequest, MeetLinkResponse,
    MeetingStrategiesResponse, UpdateAppointmentRequest, UpdateStatusRequest,
};
use crate::services::booking::AppointmentService;

#[derive(Clone)]
pub struct AppointmentState {
    pub service: Arc<AppointmentService>,
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let doctor_id = doctor_id_from_user(&user)?;

    let appointment = state.service.create(request, doctor_id, auth.token()).await?;

    Ok((StatusCode::CREATED, Json(appointment)))
}

/// Lists by patient when `patientId` is given, by range when both dates are, otherwise the doctor's whole book.
#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let token = auth.token();
    let doctor_id = doctor_id_from_user(&user)?;
    debug!("Listing appointments for doctor {} with {:?}", doctor_id, query);

    let appointments = match query {
        AppointmentListQuery { patient_id: Some(patient_id), .. } => {
            state.service.find_by_patient(patient_id, token).await?
        }
        AppointmentListQuery { start_date: Some(start), end_date: Some(end), .. } => {
            state.service.find_by_date_range(doctor_id, start, end, token).await?
        }
        _ => state.service.find_all(doctor_id, token).await?,
    };

    Ok(Json(appointments))
}

#[axum::debug_handler]
pub async fn today_appointments(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let doctor_id = doctor_id_from_user(&user)?;
    Ok(Json(state.service.find_today(doctor_id, auth.token()).await?))
}

#[axum::debug_handler]
pub async fn week_appointments(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let doctor_id = doctor_id_from_user(&user)?;
    Ok(Json(state.service.find_week(doctor_id, auth.token()).await?))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Appointment>, AppError> {
    Ok(Json(state.service.find_one(appointment_id, auth.token()).await?))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<i64>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = state.service.update(appointment_id, request, auth.token()).await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<i64>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = state.service
        .update_status(appointment_id, request.status, auth.token())
        .await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.service.remove(appointment_id, auth.token()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn generate_meet_link(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<MeetLinkResponse>, AppError> {
    Ok(Json(state.service.generate_meet_link(appointment_id, auth.token()).await?))
}

pub async fn meeting_strategies(
    State(state): State<AppointmentState>,
) -> Json<MeetingStrategiesResponse> {
    Json(state.service.meeting_strategies())
}

pub async fn calendar_status(
    State(state): State<AppointmentState>,
) -> Json<CalendarStatus> {
    Json(state.service.calendar_status())
}
