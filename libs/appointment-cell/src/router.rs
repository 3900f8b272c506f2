use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
    middleware,
};

use auth_cell::middleware::require_session;
use auth_cell::SessionManager;

use crate::handlers;

pub fn appointment_routes(sessions: Arc<SessionManager>) -> Router {
    // All appointment operations require a session
    let protected_routes = Router::new()
        .route("/", get(handlers::list_appointments).post(handlers::book_appointment))
        .route("/{appointment_id}", patch(handlers::update_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/reminder", post(handlers::send_reminder))
        .layer(middleware::from_fn_with_state(sessions.clone(), require_session));

    Router::new()
        .merge(protected_routes)
        .with_state(sessions)
}
