use std::sync::Arc;

use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use shared_config::AppConfig;

use crate::session_store::SessionStore;

/// Store key under which the auth session survives restarts.
pub const SUPABASE_SESSION_KEY: &str = "supabase.auth.token";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub token_type: Option<String>,
    pub user: AuthUser,
}

/// What `/auth/v1/signup` hands back. With e-mail confirmation enabled the
/// body is the bare user and no session is issued.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpResponse {
    pub user: Option<AuthUser>,
    pub session: Option<AuthSession>,
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    store: Arc<dyn SessionStore>,
    session: RwLock<Option<AuthSession>>,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig, store: Arc<dyn SessionStore>) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
            store,
            session: RwLock::new(None),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let bearer = auth_token.unwrap_or(&self.anon_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", bearer))?,
        );

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(&self, method: Method, path: &str,
                                         auth_token: Option<&str>, body: Option<Value>,
                                         extra_headers: Option<HeaderMap>)
                                         -> Result<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Row-level request on behalf of the signed-in user, or the anon role
    /// when nobody is signed in.
    pub async fn rest<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T>
    where T: DeserializeOwned {
        let token = self.access_token().await;
        let mut headers = HeaderMap::new();
        if method != Method::GET {
            headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        }
        self.request_with_headers(method, path, token.as_deref(), body, Some(headers)).await
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResponse> {
        let body: Value = self.request(
            Method::POST,
            "/auth/v1/signup",
            None,
            Some(json!({ "email": email, "password": password })),
        ).await?;

        let response = if body.get("access_token").is_some() {
            let session: AuthSession = serde_json::from_value(body)?;
            SignUpResponse {
                user: Some(session.user.clone()),
                session: Some(session),
            }
        } else {
            SignUpResponse {
                user: serde_json::from_value(body).ok(),
                session: None,
            }
        };

        if let Some(session) = &response.session {
            self.set_session(session.clone()).await;
        }

        Ok(response)
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession> {
        let session: AuthSession = self.request(
            Method::POST,
            "/auth/v1/token?grant_type=password",
            None,
            Some(json!({ "email": email, "password": password })),
        ).await?;

        self.set_session(session.clone()).await;
        Ok(session)
    }

    /// Drops the local session first, then revokes it remotely. A remote
    /// failure is reported but the local session is already gone.
    pub async fn sign_out(&self) -> Result<()> {
        let session = self.session.write().await.take();
        if let Err(e) = self.store.remove_item(SUPABASE_SESSION_KEY).await {
            warn!("Failed to clear persisted auth session: {}", e);
        }

        let Some(session) = session else {
            return Ok(());
        };

        let url = format!("{}/auth/v1/logout", self.base_url);
        let response = self.client
            .post(&url)
            .headers(self.get_headers(Some(&session.access_token))?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(anyhow!("Sign out failed ({}): {}", status, error_text));
        }

        Ok(())
    }

    /// Validates the current session against the auth server. `None` when
    /// there is no session at all.
    pub async fn get_user(&self) -> Result<Option<AuthUser>> {
        self.restore_session().await;

        let Some(token) = self.access_token().await else {
            return Ok(None);
        };

        let user: AuthUser = self.request(
            Method::GET,
            "/auth/v1/user",
            Some(&token),
            None,
        ).await?;

        Ok(Some(user))
    }

    pub async fn current_session(&self) -> Option<AuthSession> {
        self.restore_session().await;
        self.session.read().await.clone()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.session.read().await.as_ref().map(|s| s.access_token.clone())
    }

    async fn set_session(&self, session: AuthSession) {
        match serde_json::to_string(&session) {
            Ok(raw) => {
                if let Err(e) = self.store.set_item(SUPABASE_SESSION_KEY, &raw).await {
                    warn!("Failed to persist auth session: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize auth session: {}", e),
        }
        *self.session.write().await = Some(session);
    }

    async fn restore_session(&self) {
        if self.session.read().await.is_some() {
            return;
        }

        let Some(raw) = self.store.get_item(SUPABASE_SESSION_KEY).await else {
            return;
        };

        match serde_json::from_str::<AuthSession>(&raw) {
            Ok(session) => {
                debug!("Restored persisted auth session for {}", session.user.id);
                *self.session.write().await = Some(session);
            }
            Err(e) => warn!("Discarding unreadable persisted auth session: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::session_store::MemorySessionStore;

    fn config(url: &str) -> AppConfig {
        AppConfig {
            supabase_url: url.to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            django_api_url: "http://localhost:8000/api".to_string(),
            session_store_path: PathBuf::from("unused.json"),
            portal_port: 3000,
        }
    }

    fn session_body() -> Value {
        json!({
            "access_token": "t1",
            "refresh_token": "r1",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": { "id": "u1", "email": "a@b.com" }
        })
    }

    #[tokio::test]
    async fn test_sign_in_persists_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(header("apikey", "test-anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::new());
        let client = SupabaseClient::new(&config(&server.uri()), store.clone());

        let session = client.sign_in_with_password("a@b.com", "pw").await.unwrap();
        assert_eq!(session.access_token, "t1");
        assert_eq!(client.access_token().await.as_deref(), Some("t1"));
        assert!(store.get_item(SUPABASE_SESSION_KEY).await.is_some());
    }

    #[tokio::test]
    async fn test_get_user_without_session_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&config(&server.uri()), Arc::new(MemorySessionStore::new()));
        assert_eq!(client.get_user().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_user_restores_persisted_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("Authorization", "Bearer t1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "u1", "email": "a@b.com" })))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::new());
        store.set_item(SUPABASE_SESSION_KEY, &session_body().to_string()).await.unwrap();

        let client = SupabaseClient::new(&config(&server.uri()), store);
        let user = client.get_user().await.unwrap().unwrap();
        assert_eq!(user.id, "u1");
    }

    #[tokio::test]
    async fn test_sign_out_clears_local_session_even_on_remote_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::new());
        store.set_item(SUPABASE_SESSION_KEY, &session_body().to_string()).await.unwrap();
        let client = SupabaseClient::new(&config(&server.uri()), store.clone());
        assert!(client.current_session().await.is_some());

        assert!(client.sign_out().await.is_err());
        assert_eq!(client.access_token().await, None);
        assert_eq!(store.get_item(SUPABASE_SESSION_KEY).await, None);
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&config(&server.uri()), Arc::new(MemorySessionStore::new()));
        let err = client.rest::<Value>(Method::GET, "/rest/v1/users", None).await.unwrap_err();
        assert!(err.to_string().starts_with("Resource not found"));
    }
}
