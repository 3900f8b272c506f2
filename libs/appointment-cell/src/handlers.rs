use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use auth_cell::{Session, SessionManager};
use hybrid_api_cell::models::{AppointmentFilters, AppointmentUpdate};
use shared_models::error::AppError;

use crate::models::BookAppointmentRequest;

#[axum::debug_handler]
pub async fn list_appointments(
    State(sessions): State<Arc<SessionManager>>,
    Extension(session): Extension<Session>,
    Query(filters): Query<AppointmentFilters>,
) -> Result<Json<Value>, AppError> {
    debug!("Listing appointments for {} ({})", session.user.id, session.user.role);

    let served = sessions.api()
        .get_appointments(&session.user.id, session.user.role, &filters)
        .await?;

    Ok(Json(json!({
        "appointments": served.payload,
        "total": served.payload.len(),
        "via": served.via
    })))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(sessions): State<Arc<SessionManager>>,
    Extension(session): Extension<Session>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let appointment = request.for_patient(&session.user.id);
    appointment.validate().map_err(AppError::ValidationError)?;

    let served = sessions.api().create_appointment(&appointment).await?;

    info!("Appointment {} booked via {:?}", served.payload.id, served.via);

    Ok((StatusCode::CREATED, Json(json!({
        "appointment": served.payload,
        "via": served.via
    }))))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(sessions): State<Arc<SessionManager>>,
    Extension(session): Extension<Session>,
    Path(appointment_id): Path<String>,
    Json(changes): Json<AppointmentUpdate>,
) -> Result<Json<Value>, AppError> {
    debug!("User {} updating appointment {}", session.user.id, appointment_id);

    if changes == AppointmentUpdate::default() {
        return Err(AppError::BadRequest("No appointment fields to update".to_string()));
    }
    changes.validate().map_err(AppError::ValidationError)?;

    let served = sessions.api().update_appointment(&appointment_id, &changes).await?;

    Ok(Json(json!({
        "appointment": served.payload,
        "via": served.via
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(sessions): State<Arc<SessionManager>>,
    Extension(session): Extension<Session>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    debug!("User {} cancelling appointment {}", session.user.id, appointment_id);

    let served = sessions.api().cancel_appointment(&appointment_id).await?;

    Ok(Json(json!({
        "appointment": served.payload,
        "via": served.via
    })))
}

#[axum::debug_handler]
pub async fn send_reminder(
    State(sessions): State<Arc<SessionManager>>,
    Extension(session): Extension<Session>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    debug!("User {} requesting reminder for {}", session.user.id, appointment_id);

    sessions.api().send_appointment_reminder(&appointment_id).await?;

    Ok(Json(json!({
        "message": "Reminder sent",
        "appointment_id": appointment_id
    })))
}
