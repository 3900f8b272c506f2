use std::env;
use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

pub const DEFAULT_DJANGO_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_SESSION_STORE_PATH: &str = ".hospital-session.json";
pub const DEFAULT_PORTAL_PORT: u16 = 3000;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing Supabase environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub django_api_url: String,
    pub session_store_path: PathBuf,
    pub portal_port: u16,
}

impl AppConfig {
    /// Reads the process environment. Supabase credentials are mandatory;
    /// everything else falls back to a local default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let supabase_url = required("SUPABASE_URL")?;
        let supabase_anon_key = required("SUPABASE_ANON_PUBLIC_KEY")?;

        let django_api_url = lookup("DJANGO_API_URL")
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| {
                warn!("DJANGO_API_URL not set, using default");
                DEFAULT_DJANGO_API_URL.to_string()
            });

        let session_store_path = lookup("SESSION_STORE_PATH")
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                warn!("SESSION_STORE_PATH not set, using default");
                PathBuf::from(DEFAULT_SESSION_STORE_PATH)
            });

        let portal_port = match lookup("PORTAL_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "PORTAL_PORT",
                value: raw,
            })?,
            None => DEFAULT_PORTAL_PORT,
        };

        Ok(Self {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key,
            django_api_url: django_api_url.trim_end_matches('/').to_string(),
            session_store_path,
            portal_port,
        })
    }
}
