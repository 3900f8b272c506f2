pub mod handlers;
pub mod middleware;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Session, SessionError, SessionState};
pub use services::session::SessionManager;
