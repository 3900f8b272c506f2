use std::sync::Arc;

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
    body::Body,
};

use shared_models::error::AppError;

use crate::services::session::SessionManager;

/// Lets the request through only while a session is established, and hands
/// that session to the handler through the request extensions.
pub async fn require_session(
    State(sessions): State<Arc<SessionManager>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let session = sessions
        .current_session()
        .await
        .ok_or_else(|| AppError::Auth("Not signed in".to_string()))?;

    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}
