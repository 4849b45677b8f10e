// ============================================================================
// Database Pool Configuration
// ============================================================================
//
// Parsed for every backend; only used when STORAGE_BACKEND=postgres.
//
// ============================================================================

use anyhow::Result;

use crate::constants::{
    DEFAULT_DB_ACQUIRE_TIMEOUT_SECS, DEFAULT_DB_IDLE_TIMEOUT_SECS, DEFAULT_DB_MAX_CONNECTIONS,
};
use crate::env::parse_or;

#[derive(Clone, Debug)]
pub struct DbConfig {
    /// Pool size; bulk imports and broadcasts each hold one connection
    pub max_connections: u32,
    /// Seconds to wait for a free connection before failing the request
    pub acquire_timeout_secs: u64,
    /// Seconds an unused connection stays open
    pub idle_timeout_secs: u64,
}

impl DbConfig {
    pub(crate) fn from_env() -> Result<Self> {
        let config = Self {
            max_connections: parse_or("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            acquire_timeout_secs: parse_or(
                "DB_ACQUIRE_TIMEOUT_SECS",
                DEFAULT_DB_ACQUIRE_TIMEOUT_SECS,
            )?,
            idle_timeout_secs: parse_or("DB_IDLE_TIMEOUT_SECS", DEFAULT_DB_IDLE_TIMEOUT_SECS)?,
        };

        if config.max_connections == 0 {
            anyhow::bail!("DB_MAX_CONNECTIONS must be at least 1");
        }
        Ok(config)
    }
}
