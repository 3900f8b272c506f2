use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use auth_cell::{Session, SessionManager};
use hybrid_api_cell::models::{DoctorFilters, NewTimeSlot, TimeSlotUpdate};
use shared_models::auth::UserRole;
use shared_models::error::AppError;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
}

#[axum::debug_handler]
pub async fn search_doctors(
    State(sessions): State<Arc<SessionManager>>,
    Query(filters): Query<DoctorFilters>,
) -> Result<Json<Value>, AppError> {
    debug!("Searching doctors: {:?}", filters);

    let served = sessions.api().get_doctors(&filters).await?;

    Ok(Json(json!({
        "doctors": served.payload,
        "total": served.payload.len(),
        "via": served.via
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(sessions): State<Arc<SessionManager>>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let served = sessions.api().get_doctor_by_id(&doctor_id).await
        .map_err(|_| AppError::NotFound("Doctor not found".to_string()))?;

    Ok(Json(json!({
        "doctor": served.payload,
        "via": served.via
    })))
}

#[axum::debug_handler]
pub async fn get_time_slots(
    State(sessions): State<Arc<SessionManager>>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let served = sessions.api().get_time_slots(&doctor_id).await?;

    Ok(Json(json!({
        "time_slots": served.payload,
        "doctor_id": doctor_id,
        "via": served.via
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_availability(
    State(sessions): State<Arc<SessionManager>>,
    Path(doctor_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let served = sessions.api().get_doctor_availability(&doctor_id, query.date).await?;

    Ok(Json(json!({
        "available_slots": served.payload,
        "doctor_id": doctor_id,
        "date": query.date,
        "total_slots": served.payload.len(),
        "via": served.via
    })))
}

#[axum::debug_handler]
pub async fn create_time_slot(
    State(sessions): State<Arc<SessionManager>>,
    Extension(session): Extension<Session>,
    Json(request): Json<NewTimeSlot>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if session.user.role == UserRole::Patient {
        return Err(AppError::Auth("Only doctors can manage time slots".to_string()));
    }

    request.validate().map_err(AppError::ValidationError)?;

    let served = sessions.api().create_time_slot(&request).await?;

    Ok((StatusCode::CREATED, Json(json!({
        "time_slot": served.payload,
        "via": served.via
    }))))
}

#[axum::debug_handler]
pub async fn update_time_slot(
    State(sessions): State<Arc<SessionManager>>,
    Extension(session): Extension<Session>,
    Path((doctor_id, slot_id)): Path<(String, String)>,
    Json(changes): Json<TimeSlotUpdate>,
) -> Result<Json<Value>, AppError> {
    if session.user.role == UserRole::Patient {
        return Err(AppError::Auth("Only doctors can manage time slots".to_string()));
    }
    if changes.is_empty() {
        return Err(AppError::BadRequest("No time slot fields to update".to_string()));
    }
    changes.validate().map_err(AppError::ValidationError)?;

    debug!("User {} updating slot {} of doctor {}", session.user.id, slot_id, doctor_id);

    let served = sessions.api().update_time_slot(&doctor_id, &slot_id, &changes).await?;

    Ok(Json(json!({
        "time_slot": served.payload,
        "via": served.via
    })))
}
