use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
    middleware,
};

use auth_cell::middleware::require_session;
use auth_cell::SessionManager;

use crate::handlers;

pub fn doctor_routes(sessions: Arc<SessionManager>) -> Router {
    // Browsing the directory needs no session
    let public_routes = Router::new()
        .route("/", get(handlers::search_doctors))
        .route("/{doctor_id}", get(handlers::get_doctor))
        .route("/{doctor_id}/time-slots", get(handlers::get_time_slots))
        .route("/{doctor_id}/availability", get(handlers::get_doctor_availability));

    let protected_routes = Router::new()
        .route("/time-slots", post(handlers::create_time_slot))
        .route("/{doctor_id}/time-slots/{slot_id}", patch(handlers::update_time_slot))
        .layer(middleware::from_fn_with_state(sessions.clone(), require_session));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(sessions)
}
