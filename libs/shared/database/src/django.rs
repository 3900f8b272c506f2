use std::sync::Arc;

use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::session_store::{SessionStore, TOKEN_KEY};

/// Token-authenticated client for the Django REST API. The bearer token is
/// re-read from the session store on every call.
pub struct DjangoClient {
    client: Client,
    base_url: String,
    store: Arc<dyn SessionStore>,
}

impl DjangoClient {
    pub fn new(config: &AppConfig, store: Arc<dyn SessionStore>) -> Self {
        Self {
            client: Client::new(),
            base_url: config.django_api_url.clone(),
            store,
        }
    }

    async fn get_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = self.store.get_item(TOKEN_KEY).await {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, endpoint: &str, body: Option<Value>) -> Result<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("Making request to {}", url);

        let mut req = self.client.request(method, &url)
            .headers(self.get_headers().await?);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Django API error ({}): {}", status, error_text);
            return Err(anyhow!(
                "API Error: {}",
                status.canonical_reason().unwrap_or(status.as_str())
            ));
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::session_store::MemorySessionStore;

    fn config(url: &str) -> AppConfig {
        AppConfig {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            django_api_url: url.to_string(),
            session_store_path: PathBuf::from("unused.json"),
            portal_port: 3000,
        }
    }

    #[tokio::test]
    async fn test_bearer_token_read_from_store() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/profile/"))
            .and(header("Authorization", "Bearer t2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 2 })))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::new());
        store.set_item(TOKEN_KEY, "t2").await.unwrap();

        let client = DjangoClient::new(&config(&server.uri()), store);
        let body: Value = client.request(Method::GET, "/users/profile/", None).await.unwrap();
        assert_eq!(body["id"], 2);
    }

    #[tokio::test]
    async fn test_error_carries_status_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login/"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "bad" })))
            .mount(&server)
            .await;

        let client = DjangoClient::new(&config(&server.uri()), Arc::new(MemorySessionStore::new()));
        let err = client
            .request::<Value>(Method::POST, "/auth/login/", Some(json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "API Error: Unauthorized");
    }
}
