// ============================================================================
// Logging Configuration
// ============================================================================
//
// Phone numbers only reach the logs as salted hashes unless
// LOG_PHONE_NUMBERS is switched on outside production.
//
// ============================================================================

use anyhow::Result;

use crate::env::{parse_or, string_or};

const DEV_HASH_SALT: &str = "broadcast-dev-salt";

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// Log raw phone numbers instead of salted hashes (debugging only)
    pub enable_phone_numbers: bool,
    pub hash_salt: String,
}

impl LoggingConfig {
    pub(crate) fn from_env(is_production: bool) -> Result<Self> {
        let hash_salt = string_or("LOG_HASH_SALT", DEV_HASH_SALT);
        let enable_phone_numbers = parse_or("LOG_PHONE_NUMBERS", false)?;

        if is_production {
            if hash_salt == DEV_HASH_SALT {
                anyhow::bail!("LOG_HASH_SALT must be set to a unique, secret value in production");
            }
            if enable_phone_numbers {
                anyhow::bail!("LOG_PHONE_NUMBERS cannot be enabled in production");
            }
        } else if hash_salt == DEV_HASH_SALT {
            tracing::warn!("LOG_HASH_SALT not set, using the development salt");
        }

        Ok(Self {
            enable_phone_numbers,
            hash_salt,
        })
    }
}
