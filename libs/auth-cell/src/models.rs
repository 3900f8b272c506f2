use serde::{Deserialize, Serialize};
use thiserror::Error;

use hybrid_api_cell::models::Backend;
use shared_models::auth::{AuthState, User};
use shared_models::error::AppError;

/// Token reported for a Supabase-backed session that carries no access token.
pub const SUPABASE_SESSION_SENTINEL: &str = "supabase-session";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub user: User,
    pub token: String,
    pub origin: Backend,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Uninitialized,
    Authenticating { previous: Option<Session> },
    Authenticated(Session),
    Anonymous,
}

impl SessionState {
    /// The session requests act on. While a sign-in is in flight that is
    /// still the previous one, matching `snapshot`.
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            SessionState::Authenticating { previous } => previous.as_ref(),
            _ => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            SessionState::Authenticating { previous } => previous.as_mut(),
            _ => None,
        }
    }

    /// While a login is in flight the previous session, if any, stays visible.
    pub fn snapshot(&self) -> AuthState {
        match self {
            SessionState::Uninitialized => AuthState::initial(),
            SessionState::Authenticating { previous } => AuthState {
                user: previous.as_ref().map(|s| s.user.clone()),
                token: previous.as_ref().map(|s| s.token.clone()),
                is_loading: true,
            },
            SessionState::Authenticated(session) => AuthState {
                user: Some(session.user.clone()),
                token: Some(session.token.clone()),
                is_loading: false,
            },
            SessionState::Anonymous => AuthState::signed_out(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Profile creation failed")]
    ProfileCreationFailed,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Sign-in superseded by a later session change")]
    Superseded,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match &err {
            SessionError::ProfileCreationFailed => AppError::Internal(err.to_string()),
            SessionError::NotAuthenticated | SessionError::Superseded => AppError::Auth(err.to_string()),
            SessionError::Backend(e) => AppError::ExternalService(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_models::auth::UserRole;

    fn session() -> Session {
        Session {
            user: User {
                id: "u1".to_string(),
                email: "a@b.com".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                phone: String::new(),
                role: UserRole::Patient,
                created_at: None,
            },
            token: "t1".to_string(),
            origin: Backend::Supabase,
        }
    }

    #[test]
    fn test_snapshot_per_state() {
        assert_eq!(SessionState::Uninitialized.snapshot(), AuthState::initial());
        assert_eq!(SessionState::Anonymous.snapshot(), AuthState::signed_out());

        let authenticated = SessionState::Authenticated(session()).snapshot();
        assert!(authenticated.is_authenticated());
        assert!(!authenticated.is_loading);
    }

    #[test]
    fn test_authenticating_keeps_previous_user_visible() {
        let state = SessionState::Authenticating { previous: Some(session()) };
        let snapshot = state.snapshot();

        assert!(snapshot.is_loading);
        assert_eq!(snapshot.token.as_deref(), Some("t1"));
        assert_eq!(state.session().map(|s| s.user.id.as_str()), Some("u1"));

        let fresh = SessionState::Authenticating { previous: None };
        assert!(fresh.snapshot().is_loading);
        assert!(!fresh.snapshot().is_authenticated());
        assert!(fresh.session().is_none());
    }
}
