use std::sync::Arc;

use anyhow::Context;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use hybrid_api_cell::models::{AuthOutcome, Backend, DjangoSession, ProfileUpdate, Registration};
use hybrid_api_cell::HybridApiService;
use shared_database::session_store::{SessionStore, TOKEN_KEY, USER_KEY};
use shared_models::auth::{AuthState, User};

use crate::models::{Session, SessionError, SessionState, SUPABASE_SESSION_SENTINEL};

/// Owns the process-wide session. Backend A keeps its own session inside its
/// client; a Django session is mirrored into the store under `TOKEN_KEY` and
/// `USER_KEY`, which only this manager writes.
///
/// Every sign-in takes a ticket from a generation counter that `logout` and
/// each new sign-in advance. A sign-in whose ticket is stale when it returns
/// is discarded, store writes included.
pub struct SessionManager {
    api: Arc<HybridApiService>,
    store: Arc<dyn SessionStore>,
    state: RwLock<Tracked>,
}

struct Tracked {
    state: SessionState,
    generation: u64,
}

/// A backend accepted the credentials but nothing has been applied yet.
enum SignedIn {
    Supabase(Session),
    Django(DjangoSession),
}

impl SessionManager {
    pub fn new(api: Arc<HybridApiService>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            api,
            store,
            state: RwLock::new(Tracked {
                state: SessionState::Uninitialized,
                generation: 0,
            }),
        }
    }

    pub fn api(&self) -> &HybridApiService {
        &self.api
    }

    pub async fn snapshot(&self) -> AuthState {
        self.state.read().await.state.snapshot()
    }

    pub async fn current_session(&self) -> Option<Session> {
        self.state.read().await.state.session().cloned()
    }

    /// Resolves the initial state: a live Supabase session first, then a
    /// persisted Django session, otherwise anonymous. A sign-in or logout
    /// that lands while this runs takes precedence.
    pub async fn bootstrap(&self) -> AuthState {
        let ticket = self.state.read().await.generation;

        let resolved = match self.api.supabase().get_current_user().await {
            Ok(Some(current)) => {
                info!("Resumed Supabase session for {}", current.profile.email);
                SessionState::Authenticated(Session {
                    user: current.profile,
                    token: current
                        .session
                        .map(|s| s.access_token)
                        .unwrap_or_else(|| SUPABASE_SESSION_SENTINEL.to_string()),
                    origin: Backend::Supabase,
                })
            }
            Ok(None) => match self.restore_persisted().await {
                Some(session) => {
                    info!("Resumed stored session for {}", session.user.email);
                    SessionState::Authenticated(session)
                }
                None => SessionState::Anonymous,
            },
            Err(e) => {
                error!("Auth check failed: {}", e);
                SessionState::Anonymous
            }
        };

        let mut tracked = self.state.write().await;
        if tracked.generation == ticket {
            tracked.state = resolved;
        } else {
            debug!("Session changed during bootstrap, keeping it");
        }
        tracked.state.snapshot()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, SessionError> {
        let ticket = self.begin().await;

        let result = match self.api.login(email, password).await {
            Ok(AuthOutcome::Supabase(sign_in)) => Ok(SignedIn::Supabase(Session {
                user: sign_in.profile,
                token: sign_in.session.access_token,
                origin: Backend::Supabase,
            })),
            Ok(AuthOutcome::Django(session)) => Ok(SignedIn::Django(session)),
            Err(e) => Err(SessionError::Backend(e)),
        };

        self.finish(ticket, result).await
    }

    /// On the Supabase path the new profile is read back through the current
    /// session; a sign-up that left no session or no `users` row behind is
    /// reported as `ProfileCreationFailed`.
    pub async fn register(&self, registration: &Registration) -> Result<Session, SessionError> {
        let ticket = self.begin().await;

        let result = match self.api.register(registration).await {
            Ok(AuthOutcome::Supabase(sign_up)) => self
                .read_back_profile(sign_up.session.map(|s| s.access_token))
                .await
                .map(SignedIn::Supabase),
            Ok(AuthOutcome::Django(session)) => Ok(SignedIn::Django(session)),
            Err(e) => Err(SessionError::Backend(e)),
        };

        self.finish(ticket, result).await
    }

    /// Always ends anonymous with both store keys cleared, whatever the
    /// remote sign-out does. Sign-ins still in flight are invalidated.
    pub async fn logout(&self) -> AuthState {
        if let Err(e) = self.api.supabase().sign_out().await {
            error!("Supabase sign out failed: {}", e);
        }

        let mut tracked = self.state.write().await;
        tracked.generation += 1;

        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.store.remove_item(key).await {
                warn!("Failed to clear {}: {}", key, e);
            }
        }

        tracked.state = SessionState::Anonymous;
        tracked.state.snapshot()
    }

    /// The remote update always stands; the local copy is only rewritten if
    /// the session it was made for is still the current one.
    pub async fn update_profile(&self, changes: &ProfileUpdate) -> Result<User, SessionError> {
        let (ticket, session) = {
            let tracked = self.state.read().await;
            let session = tracked.state.session().cloned().ok_or(SessionError::NotAuthenticated)?;
            (tracked.generation, session)
        };

        let user = self.api.update_profile(&session.user.id, changes).await?.into_payload();

        let mut tracked = self.state.write().await;
        if tracked.generation != ticket {
            debug!("Session changed during profile update, local copy left alone");
            return Ok(user);
        }

        if self.store.get_item(USER_KEY).await.is_some() {
            let raw = serde_json::to_string(&user).context("Failed to serialize user")?;
            self.store.set_item(USER_KEY, &raw).await?;
        }

        if let Some(current) = tracked.state.session_mut() {
            if current.user.id == session.user.id {
                current.user = user.clone();
            }
        }

        Ok(user)
    }

    async fn begin(&self) -> u64 {
        let mut tracked = self.state.write().await;
        tracked.generation += 1;
        let previous = tracked.state.session().cloned();
        tracked.state = SessionState::Authenticating { previous };
        tracked.generation
    }

    /// Applies a sign-in result if `ticket` is still current. Store writes
    /// for a Django session happen under the state lock.
    async fn finish(&self, ticket: u64, result: Result<SignedIn, SessionError>) -> Result<Session, SessionError> {
        let mut tracked = self.state.write().await;

        if tracked.generation != ticket {
            let signed_out = tracked.state == SessionState::Anonymous;
            drop(tracked);
            return match result {
                Ok(signed_in) => {
                    debug!("Discarding sign-in superseded by a later session change");
                    if signed_out && matches!(signed_in, SignedIn::Supabase(_)) {
                        if let Err(e) = self.api.supabase().sign_out().await {
                            warn!("Failed to drop superseded Supabase session: {}", e);
                        }
                    }
                    Err(SessionError::Superseded)
                }
                Err(e) => Err(e),
            };
        }

        let applied = match result {
            Ok(SignedIn::Supabase(session)) => Ok(session),
            Ok(SignedIn::Django(session)) => self.persist(session).await,
            Err(e) => Err(e),
        };

        match applied {
            Ok(session) => {
                debug!("Signed in {} via {:?}", session.user.email, session.origin);
                tracked.state = SessionState::Authenticated(session.clone());
                Ok(session)
            }
            Err(e) => {
                let previous = match std::mem::replace(&mut tracked.state, SessionState::Anonymous) {
                    SessionState::Authenticating { previous } => previous,
                    _ => None,
                };
                if let Some(session) = previous {
                    tracked.state = SessionState::Authenticated(session);
                }
                Err(e)
            }
        }
    }

    async fn read_back_profile(&self, sign_up_token: Option<String>) -> Result<Session, SessionError> {
        let current = self
            .api
            .supabase()
            .find_current_user()
            .await?
            .ok_or(SessionError::ProfileCreationFailed)?;

        let token = sign_up_token
            .or_else(|| current.session.map(|s| s.access_token))
            .unwrap_or_else(|| SUPABASE_SESSION_SENTINEL.to_string());

        Ok(Session {
            user: current.profile,
            token,
            origin: Backend::Supabase,
        })
    }

    async fn persist(&self, session: DjangoSession) -> Result<Session, SessionError> {
        let raw = serde_json::to_string(&session.user).context("Failed to serialize user")?;
        self.store.set_item(TOKEN_KEY, &session.access_token).await?;
        self.store.set_item(USER_KEY, &raw).await?;

        Ok(Session {
            user: session.user,
            token: session.access_token,
            origin: Backend::Django,
        })
    }

    async fn restore_persisted(&self) -> Option<Session> {
        let token = self.store.get_item(TOKEN_KEY).await?;
        let raw = self.store.get_item(USER_KEY).await?;

        match serde_json::from_str::<User>(&raw) {
            Ok(user) => Some(Session {
                user,
                token,
                origin: Backend::Django,
            }),
            Err(e) => {
                warn!("Ignoring unreadable stored user: {}", e);
                None
            }
        }
    }
}
