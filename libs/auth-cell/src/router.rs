use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
    middleware,
};

use crate::handlers;
use crate::middleware::require_session;
use crate::services::session::SessionManager;

pub fn auth_routes(sessions: Arc<SessionManager>) -> Router {
    let public_routes = Router::new()
        .route("/session", get(handlers::get_session))
        .route("/login", post(handlers::login))
        .route("/register", post(handlers::register))
        .route("/logout", post(handlers::logout));

    let protected_routes = Router::new()
        .route("/profile", patch(handlers::update_profile))
        .layer(middleware::from_fn_with_state(sessions.clone(), require_session));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(sessions)
}
