use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

use crate::metrics;
use crate::store::BroadcastStore;

/// Background task that periodically deletes long-expired messages
///
/// Runs every `cleanup_interval` and removes messages whose expiry lies more
/// than `retention` in the past. Expired messages are already hidden from
/// inboxes; retention only keeps them visible in the history view a while
/// longer.
pub struct ExpiredMessageCleanupTask {
    store: Arc<dyn BroadcastStore>,
    cleanup_interval: Duration,
    retention_days: i64,
}

impl ExpiredMessageCleanupTask {
    pub fn new(
        store: Arc<dyn BroadcastStore>,
        cleanup_interval: Duration,
        retention_days: i64,
    ) -> Self {
        Self {
            store,
            cleanup_interval,
            retention_days,
        }
    }

    /// Delete everything that expired before `now - retention`
    pub async fn run_once(&self) -> Result<u64> {
        let cutoff = ChronoDuration::try_days(self.retention_days)
            .and_then(|retention| Utc::now().checked_sub_signed(retention))
            .with_context(|| format!("Retention of {} days is out of range", self.retention_days))?;
        let deleted = self.store.delete_messages_expired_before(cutoff).await?;
        metrics::EXPIRED_MESSAGES_DELETED_TOTAL.inc_by(deleted);
        Ok(deleted)
    }

    /// Runs until the surrounding task is dropped; failures are logged and
    /// retried on the next tick.
    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.cleanup_interval.as_secs(),
            retention_days = self.retention_days,
            "Starting expired message cleanup task"
        );

        let mut interval = time::interval(self.cleanup_interval);

        loop {
            interval.tick().await;

            match self.run_once().await {
                Ok(0) => tracing::debug!("No expired messages to clean up"),
                Ok(deleted_count) => {
                    tracing::info!(deleted_count = deleted_count, "Cleaned up expired messages");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to clean up expired messages");
                }
            }
        }
    }
}
