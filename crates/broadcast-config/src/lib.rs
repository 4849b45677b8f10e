// ============================================================================
// Broadcast Config - Centralized configuration management
// ============================================================================
//
// Loads the broadcast server configuration from environment variables (and
// an optional .env file) with sensible defaults.
//
// ============================================================================

mod constants;
mod database;
mod env;
mod logging;
mod messages;
mod push;

// Re-export all public types
pub use constants::{
    MAX_CONTACT_NAME_LENGTH, MAX_DEVICE_TOKEN_LENGTH, MAX_GROUP_NAME_LENGTH,
    MAX_MESSAGE_CONTENT_LENGTH, MAX_PHONE_NUMBER_LENGTH, MAX_REQUEST_BODY_SIZE,
};
pub use database::DbConfig;
pub use logging::LoggingConfig;
pub use messages::MessageConfig;
pub use push::{FcmConfig, PushConfig, PushProvider};

use anyhow::Result;
use constants::*;

/// Where groups, contacts and messages are persisted
#[derive(Clone, Debug, PartialEq)]
pub enum StorageBackend {
    Postgres,
    /// Process-local storage, lost on restart (development and tests)
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" | "in-memory" => Ok(Self::Memory),
            _ => anyhow::bail!(
                "Invalid storage backend: {}. Must be 'postgres' or 'memory'",
                s
            ),
        }
    }
}

/// Cross-origin settings for the admin dashboard
#[derive(Clone, Debug)]
pub struct CorsConfig {
    /// Allowed origins; `*` allows any origin
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    fn from_env() -> Self {
        let allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Self { allowed_origins }
    }

    pub fn allows_any(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }
}

/// Main configuration structure for the broadcast server
#[derive(Clone, Debug)]
pub struct Config {
    /// Required when `storage_backend` is Postgres
    pub database_url: Option<String>,
    pub storage_backend: StorageBackend,

    pub port: u16,
    pub bind_address: String,
    /// True when ENVIRONMENT is set to anything but development/dev/local/test.
    /// An unset ENVIRONMENT counts as development.
    pub is_production: bool,

    // Sub-configurations
    pub logging: LoggingConfig,
    pub db: DbConfig,
    pub push: PushConfig,
    pub messages: MessageConfig,
    pub cors: CorsConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let is_production = std::env::var("ENVIRONMENT")
            .map(|v| !matches!(v.as_str(), "development" | "dev" | "local" | "test"))
            .unwrap_or(false);

        let storage_backend = env::parse_or("STORAGE_BACKEND", StorageBackend::Postgres)?;

        let database_url = env::optional("DATABASE_URL");
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set when STORAGE_BACKEND=postgres");
        }

        let port = env::parse_or("PORT", DEFAULT_PORT)?;

        Ok(Self {
            database_url,
            storage_backend,
            port,
            bind_address: env::string_or("BIND_ADDRESS", &format!("[::]:{}", port)),
            is_production,
            logging: LoggingConfig::from_env(is_production)?,
            db: DbConfig::from_env()?,
            push: PushConfig::from_env()?,
            messages: MessageConfig::from_env()?,
            cors: CorsConfig::from_env(),
        })
    }
}
