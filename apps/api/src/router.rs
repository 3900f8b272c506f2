use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use auth_cell::SessionManager;
use doctor_cell::router::doctor_routes;

pub fn create_router(sessions: Arc<SessionManager>) -> Router {
    Router::new()
        .route("/", get(|| async { "Hospital portal API is running!" }))
        .nest("/auth", auth_routes(sessions.clone()))
        .nest("/doctors", doctor_routes(sessions.clone()))
        .nest("/appointments", appointment_routes(sessions))
}
