// ============================================================================
// Message Lifetime Configuration
// ============================================================================

use anyhow::Result;

use crate::constants::*;
use crate::env::parse_or;

#[derive(Clone, Debug)]
pub struct MessageConfig {
    /// Expiry applied when a broadcast doesn't specify one
    pub default_expiry_days: i64,
    /// Upper bound accepted for `expiry_days`
    pub max_expiry_days: i64,
    pub max_content_length: usize,
    /// 0 disables the cleanup task
    pub cleanup_interval_secs: u64,
    /// Days an expired message is kept in history before cleanup removes it
    pub retention_days: i64,
}

impl MessageConfig {
    pub(crate) fn from_env() -> Result<Self> {
        let config = Self {
            default_expiry_days: parse_or(
                "MESSAGE_DEFAULT_EXPIRY_DAYS",
                DEFAULT_MESSAGE_EXPIRY_DAYS,
            )?,
            max_expiry_days: parse_or("MESSAGE_MAX_EXPIRY_DAYS", DEFAULT_MAX_EXPIRY_DAYS)?,
            max_content_length: parse_or(
                "MESSAGE_MAX_CONTENT_LENGTH",
                MAX_MESSAGE_CONTENT_LENGTH,
            )?,
            cleanup_interval_secs: parse_or("MESSAGE_CLEANUP_INTERVAL_SECS", 0)?,
            retention_days: parse_or("MESSAGE_RETENTION_DAYS", DEFAULT_RETENTION_DAYS)?,
        };

        if !(1..=MAX_CONFIGURABLE_DAYS).contains(&config.max_expiry_days) {
            anyhow::bail!(
                "MESSAGE_MAX_EXPIRY_DAYS must be between 1 and {}",
                MAX_CONFIGURABLE_DAYS
            );
        }
        if config.default_expiry_days < 1 || config.default_expiry_days > config.max_expiry_days {
            anyhow::bail!(
                "MESSAGE_DEFAULT_EXPIRY_DAYS must be between 1 and {}",
                config.max_expiry_days
            );
        }
        if config.max_content_length == 0 {
            anyhow::bail!("MESSAGE_MAX_CONTENT_LENGTH must be at least 1");
        }
        if !(0..=MAX_CONFIGURABLE_DAYS).contains(&config.retention_days) {
            anyhow::bail!(
                "MESSAGE_RETENTION_DAYS must be between 0 and {}",
                MAX_CONFIGURABLE_DAYS
            );
        }

        Ok(config)
    }
}
