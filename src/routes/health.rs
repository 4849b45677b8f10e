//! Liveness and Prometheus endpoints
//!
//! `/health` reports which storage backend and push provider are wired in, so
//! an operator can tell a memory-backed dev instance from a real deployment.

use axum::{Json, extract::State, http::StatusCode, http::header, response::IntoResponse};
use broadcast_config::StorageBackend;
use broadcast_error::AppError;
use serde::Serialize;
use std::sync::Arc;

use crate::context::AppContext;
use crate::metrics;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub storage: &'static str,
    pub push_provider: &'static str,
}

fn storage_label(backend: &StorageBackend) -> &'static str {
    match backend {
        StorageBackend::Postgres => "postgres",
        StorageBackend::Memory => "memory",
    }
}

/// GET /health
///
/// 200 while the store answers a ping, 503 otherwise. The body is the same
/// shape either way.
pub async fn health_check(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    let storage = storage_label(&ctx.config.storage_backend);
    let push_provider = ctx.push.provider();

    let (code, status) = match ctx.store.ping().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::error!(error = %e, storage = storage, "Store ping failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };

    (
        code,
        Json(HealthReport {
            status,
            storage,
            push_provider,
        }),
    )
}

/// GET /metrics
pub async fn metrics() -> Result<impl IntoResponse, AppError> {
    let body = metrics::gather_metrics()
        .map_err(|e| AppError::internal(format!("Failed to gather metrics: {}", e)))?;

    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingPush, UnavailableStore, test_config, test_context};

    async fn report(ctx: AppContext) -> (StatusCode, serde_json::Value) {
        let response = health_check(State(Arc::new(ctx))).await.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_healthy_store_reports_ok() {
        let (status, body) = report(test_context(RecordingPush::new())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["storage"], "memory");
        assert_eq!(body["push_provider"], "recording");
    }

    #[tokio::test]
    async fn test_failed_ping_is_service_unavailable() {
        let mut config = test_config();
        config.storage_backend = StorageBackend::Postgres;
        let ctx = AppContext::new(
            Arc::new(UnavailableStore),
            RecordingPush::new(),
            Arc::new(config),
        );

        let (status, body) = report(ctx).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unavailable");
        assert_eq!(body["storage"], "postgres");
        assert_eq!(body["push_provider"], "recording");
    }
}
