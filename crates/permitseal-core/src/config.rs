//! Configuration module
//!
//! Environment-driven configuration for the API and stores. The backend
//! provider is chosen exactly once per process from `BACKEND_PROVIDER`;
//! there is no runtime switching.

use std::env;
use std::str::FromStr;

use crate::constants::{DEFAULT_ID_PREFIX, DEFAULT_STALE_THRESHOLD_SECS};
use crate::error::AppError;

const DEFAULT_SERVER_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_MAX_DOCUMENT_SIZE_BYTES: usize = 50 * 1024 * 1024;
const DEFAULT_FIREBASE_POLL_INTERVAL_SECS: u64 = 5;

/// Which backend pair (document store + file store) to construct at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendProvider {
    /// Postgres (sqlx) + S3-compatible object storage.
    Supabase,
    /// Firestore + Firebase Storage over REST.
    Firebase,
    /// In-process store with a JSON-file KV and filesystem storage.
    Local,
}

impl BackendProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendProvider::Supabase => "supabase",
            BackendProvider::Firebase => "firebase",
            BackendProvider::Local => "local",
        }
    }
}

impl FromStr for BackendProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "supabase" => Ok(BackendProvider::Supabase),
            "firebase" => Ok(BackendProvider::Firebase),
            "local" => Ok(BackendProvider::Local),
            other => Err(format!("unknown backend provider: {}", other)),
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    /// Origin used to build shareable viewer URLs.
    pub public_origin: String,
    pub backend: BackendProvider,
    /// Human-readable prefix for generated permit ids.
    pub permit_id_prefix: String,
    pub environment: String,

    // Upload limits
    pub max_document_size_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,

    // Supabase (Postgres + S3-compatible storage)
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub storage_endpoint: Option<String>,
    pub storage_region: Option<String>,

    // Firebase (REST)
    pub firebase_project_id: Option<String>,
    pub firebase_storage_bucket: Option<String>,
    pub firebase_auth_token: Option<String>,
    pub firebase_poll_interval_secs: u64,

    // Local fallback
    pub local_data_path: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,

    // Operations
    pub stale_threshold_secs: i64,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("invalid value for {}: {}", key, raw))),
        Err(_) => Ok(default),
    }
}

fn env_list(key: &str, default: &[&str]) -> Vec<String> {
    match env::var(key) {
        Ok(raw) => raw
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => default.iter().map(|s| s.to_string()).collect(),
    }
}

impl AppConfig {
    /// Load configuration from the environment (and a `.env` file if present).
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let backend = env_or("BACKEND_PROVIDER", "local")
            .parse::<BackendProvider>()
            .map_err(AppError::Config)?;

        let config = AppConfig {
            server_port: env_parse("SERVER_PORT", DEFAULT_SERVER_PORT)?,
            cors_origins: env_list("CORS_ORIGINS", &["*"]),
            public_origin: env_or("PUBLIC_ORIGIN", "http://localhost:3000"),
            backend,
            permit_id_prefix: env_or("PERMIT_ID_PREFIX", DEFAULT_ID_PREFIX),
            environment: env_or("ENVIRONMENT", "development"),
            max_document_size_bytes: env_parse(
                "MAX_DOCUMENT_SIZE_BYTES",
                DEFAULT_MAX_DOCUMENT_SIZE_BYTES,
            )?,
            allowed_extensions: env_list("DOCUMENT_ALLOWED_EXTENSIONS", &["pdf"]),
            allowed_content_types: env_list(
                "DOCUMENT_ALLOWED_CONTENT_TYPES",
                &["application/pdf"],
            ),
            database_url: env_opt("DATABASE_URL"),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            storage_endpoint: env_opt("STORAGE_ENDPOINT"),
            storage_region: env_opt("STORAGE_REGION"),
            firebase_project_id: env_opt("FIREBASE_PROJECT_ID"),
            firebase_storage_bucket: env_opt("FIREBASE_STORAGE_BUCKET"),
            firebase_auth_token: env_opt("FIREBASE_AUTH_TOKEN"),
            firebase_poll_interval_secs: env_parse(
                "FIREBASE_POLL_INTERVAL_SECS",
                DEFAULT_FIREBASE_POLL_INTERVAL_SECS,
            )?,
            local_data_path: env_opt("LOCAL_DATA_PATH"),
            local_storage_path: env_opt("LOCAL_STORAGE_PATH"),
            local_storage_base_url: env_opt("LOCAL_STORAGE_BASE_URL"),
            stale_threshold_secs: env_parse(
                "STALE_PROCESSING_THRESHOLD_SECS",
                DEFAULT_STALE_THRESHOLD_SECS,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check that the selected provider has the settings it needs.
    pub fn validate(&self) -> Result<(), AppError> {
        match self.backend {
            BackendProvider::Supabase => {
                if self.database_url.is_none() {
                    return Err(AppError::Config(
                        "DATABASE_URL is required for the supabase backend".to_string(),
                    ));
                }
            }
            BackendProvider::Firebase => {
                if self.firebase_project_id.is_none() {
                    return Err(AppError::Config(
                        "FIREBASE_PROJECT_ID is required for the firebase backend".to_string(),
                    ));
                }
                if self.firebase_storage_bucket.is_none() {
                    return Err(AppError::Config(
                        "FIREBASE_STORAGE_BUCKET is required for the firebase backend".to_string(),
                    ));
                }
            }
            BackendProvider::Local => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_provider_parse() {
        assert_eq!(
            "supabase".parse::<BackendProvider>().unwrap(),
            BackendProvider::Supabase
        );
        assert_eq!(
            "Firebase".parse::<BackendProvider>().unwrap(),
            BackendProvider::Firebase
        );
        assert!("mongo".parse::<BackendProvider>().is_err());
    }

    #[test]
    fn test_validate_requires_provider_settings() {
        let mut config = AppConfig {
            server_port: 3000,
            cors_origins: vec!["*".to_string()],
            public_origin: "http://localhost:3000".to_string(),
            backend: BackendProvider::Supabase,
            permit_id_prefix: "PERMIT".to_string(),
            environment: "test".to_string(),
            max_document_size_bytes: 1024,
            allowed_extensions: vec!["pdf".to_string()],
            allowed_content_types: vec!["application/pdf".to_string()],
            database_url: None,
            db_max_connections: 5,
            storage_endpoint: None,
            storage_region: None,
            firebase_project_id: None,
            firebase_storage_bucket: None,
            firebase_auth_token: None,
            firebase_poll_interval_secs: 5,
            local_data_path: None,
            local_storage_path: None,
            local_storage_base_url: None,
            stale_threshold_secs: 900,
        };
        assert!(config.validate().is_err());

        config.database_url = Some("postgres://localhost/permits".to_string());
        assert!(config.validate().is_ok());

        config.backend = BackendProvider::Local;
        config.database_url = None;
        assert!(config.validate().is_ok());
    }
}
