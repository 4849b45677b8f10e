// ============================================================================
// Push Delivery Configuration
// ============================================================================

use anyhow::Result;

use crate::constants::*;
use crate::env::{optional, parse_or, string_or};

/// Which push provider delivers broadcasts to devices
#[derive(Clone, Debug, PartialEq)]
pub enum PushProvider {
    /// Firebase Cloud Messaging (HTTP v1 API)
    Fcm,
    /// No provider: notifications are logged and reported as sent
    Disabled,
}

impl std::str::FromStr for PushProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fcm" | "firebase" => Ok(Self::Fcm),
            "disabled" | "none" | "off" => Ok(Self::Disabled),
            _ => anyhow::bail!(
                "Invalid push provider: {}. Must be 'fcm' or 'disabled'",
                s
            ),
        }
    }
}

/// Firebase Cloud Messaging configuration
#[derive(Clone, Debug)]
pub struct FcmConfig {
    /// Path to the service-account JSON downloaded from the Firebase console
    pub service_account_path: String,
    /// Overrides the `project_id` found in the service account
    pub project_id: Option<String>,
    /// Base URL of the FCM API (overridable for staging proxies)
    pub api_base: String,
}

/// Push fan-out configuration
#[derive(Clone, Debug)]
pub struct PushConfig {
    pub provider: PushProvider,
    /// Notification title shown on devices
    pub title: String,
    /// Maximum number of concurrent provider requests per broadcast
    pub concurrency: usize,
    pub request_timeout_secs: u64,
    pub fcm: FcmConfig,
}

impl PushConfig {
    pub(crate) fn from_env() -> Result<Self> {
        let provider: PushProvider = parse_or("PUSH_PROVIDER", PushProvider::Disabled)?;

        let service_account_path = string_or("FCM_SERVICE_ACCOUNT_PATH", "firebase_config.json");

        let concurrency = parse_or("PUSH_CONCURRENCY", DEFAULT_PUSH_CONCURRENCY)?;
        if concurrency == 0 {
            anyhow::bail!("PUSH_CONCURRENCY must be at least 1");
        }

        Ok(Self {
            provider,
            title: string_or("PUSH_TITLE", DEFAULT_PUSH_TITLE),
            concurrency,
            request_timeout_secs: parse_or("PUSH_TIMEOUT_SECS", DEFAULT_PUSH_TIMEOUT_SECS)?,
            fcm: FcmConfig {
                service_account_path,
                project_id: optional("FCM_PROJECT_ID"),
                api_base: string_or("FCM_API_BASE", DEFAULT_FCM_API_BASE),
            },
        })
    }
}
