use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Bearer token of a Django-issued session.
pub const TOKEN_KEY: &str = "hospital_token";
/// Canonical user record (JSON) belonging to `TOKEN_KEY`.
pub const USER_KEY: &str = "hospital_user";

/// String key/value persistence that outlives the process, the way browser
/// local storage does for the web client.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_item(&self, key: &str) -> Option<String>;
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;
    async fn remove_item(&self, key: &str) -> Result<()>;
}

#[derive(Default)]
pub struct MemorySessionStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().await.get(key).cloned()
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items.lock().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.items.lock().await.remove(key);
        Ok(())
    }
}

/// JSON-file backed store. Every mutation rewrites the whole file.
pub struct FileSessionStore {
    path: PathBuf,
    items: Mutex<HashMap<String, String>>,
}

impl FileSessionStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let items = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring unreadable session store {}: {}", path.display(), e);
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read session store {}", path.display()));
            }
        };

        debug!("Opened session store at {} ({} keys)", path.display(), items.len());

        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, items: &HashMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string_pretty(items)?;
        tokio::fs::write(&self.path, raw)
            .await
            .with_context(|| format!("Failed to write session store {}", self.path.display()))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().await.get(key).cloned()
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock().await;
        items.insert(key.to_string(), value.to_string());
        self.flush(&items).await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.lock().await;
        if items.remove(key).is_some() {
            self.flush(&items).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_set_get_remove() {
        let store = MemorySessionStore::new();
        assert_eq!(store.get_item(TOKEN_KEY).await, None);

        store.set_item(TOKEN_KEY, "abc").await.unwrap();
        assert_eq!(store.get_item(TOKEN_KEY).await.as_deref(), Some("abc"));

        store.remove_item(TOKEN_KEY).await.unwrap();
        assert_eq!(store.get_item(TOKEN_KEY).await, None);
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = FileSessionStore::open(&path).await.unwrap();
        store.set_item(TOKEN_KEY, "t2").await.unwrap();
        store.set_item(USER_KEY, "{\"id\":\"u2\"}").await.unwrap();
        drop(store);

        let reopened = FileSessionStore::open(&path).await.unwrap();
        assert_eq!(reopened.get_item(TOKEN_KEY).await.as_deref(), Some("t2"));
        assert_eq!(reopened.get_item(USER_KEY).await.as_deref(), Some("{\"id\":\"u2\"}"));

        reopened.remove_item(TOKEN_KEY).await.unwrap();
        let again = FileSessionStore::open(&path).await.unwrap();
        assert_eq!(again.get_item(TOKEN_KEY).await, None);
    }

    #[tokio::test]
    async fn test_file_store_ignores_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileSessionStore::open(&path).await.unwrap();
        assert_eq!(store.get_item(TOKEN_KEY).await, None);
    }
}
