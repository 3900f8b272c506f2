use std::sync::Arc;

use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
};
use serde_json::{json, Value};
use tracing::debug;

use hybrid_api_cell::models::{ProfileUpdate, Registration};
use shared_models::auth::{AuthState, User};
use shared_models::error::AppError;

use crate::models::{LoginRequest, Session, SessionError};
use crate::services::session::SessionManager;

fn session_body(session: &Session) -> Value {
    json!({
        "user": session.user,
        "token": session.token,
        "via": session.origin,
    })
}

pub async fn get_session(
    State(sessions): State<Arc<SessionManager>>,
) -> Json<AuthState> {
    Json(sessions.snapshot().await)
}

#[axum::debug_handler]
pub async fn login(
    State(sessions): State<Arc<SessionManager>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("Login attempt for {}", request.email);

    let session = sessions
        .login(&request.email, &request.password)
        .await
        .map_err(|e| match e {
            SessionError::Backend(err) => AppError::Auth(err.to_string()),
            other => other.into(),
        })?;

    Ok(Json(session_body(&session)))
}

#[axum::debug_handler]
pub async fn register(
    State(sessions): State<Arc<SessionManager>>,
    Json(registration): Json<Registration>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    debug!("Registering {} as {}", registration.email, registration.role);

    registration.validate().map_err(AppError::ValidationError)?;

    let session = sessions.register(&registration).await?;

    Ok((StatusCode::CREATED, Json(session_body(&session))))
}

pub async fn logout(
    State(sessions): State<Arc<SessionManager>>,
) -> Json<AuthState> {
    Json(sessions.logout().await)
}

#[axum::debug_handler]
pub async fn update_profile(
    State(sessions): State<Arc<SessionManager>>,
    Extension(session): Extension<Session>,
    Json(changes): Json<ProfileUpdate>,
) -> Result<Json<User>, AppError> {
    debug!("Updating profile for user: {}", session.user.id);

    if changes.is_empty() {
        return Err(AppError::BadRequest("No profile fields to update".to_string()));
    }

    let user = sessions.update_profile(&changes).await?;

    Ok(Json(user))
}
