// ============================================================================
// Push Delivery
// ============================================================================
//
// Delivers broadcast notifications to registered devices.
//
// Gateways:
// - FcmClient: Firebase Cloud Messaging HTTP v1
// - LogOnlyGateway: PUSH_PROVIDER=disabled, logs instead of sending
//
// A gateway sends to one token at a time; fan-out and per-token error
// isolation live in broadcast.rs.
//
// ============================================================================

pub mod fcm;

pub use fcm::{FcmClient, ServiceAccount};

use anyhow::Result;
use broadcast_config::{PushConfig, PushProvider};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::Priority;

/// A notification addressed to one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushNotification {
    pub token: String,
    pub title: String,
    pub body: String,
    pub priority: Priority,
    pub broadcast_id: Uuid,
}

#[async_trait::async_trait]
pub trait PushGateway: Send + Sync {
    /// Short provider name for logs and metrics
    fn provider(&self) -> &'static str;

    /// Deliver one notification, returning the provider's message id
    async fn send(&self, notification: &PushNotification) -> Result<String>;
}

/// Gateway used when no provider is configured
pub struct LogOnlyGateway;

#[async_trait::async_trait]
impl PushGateway for LogOnlyGateway {
    fn provider(&self) -> &'static str {
        "disabled"
    }

    async fn send(&self, notification: &PushNotification) -> Result<String> {
        tracing::debug!(
            broadcast_id = %notification.broadcast_id,
            priority = %notification.priority,
            "Push disabled - notification not sent"
        );
        Ok(format!("local/{}", Uuid::new_v4()))
    }
}

/// Build the gateway selected by `PUSH_PROVIDER`
pub fn build_gateway(config: &PushConfig) -> Result<Arc<dyn PushGateway>> {
    match config.provider {
        PushProvider::Fcm => {
            let client = FcmClient::from_config(config)?;
            tracing::info!(project_id = %client.project_id(), "FCM push gateway initialized");
            Ok(Arc::new(client))
        }
        PushProvider::Disabled => {
            tracing::info!("Push provider disabled - notifications will only be logged");
            Ok(Arc::new(LogOnlyGateway))
        }
    }
}
