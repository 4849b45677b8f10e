// ============================================================================
// Stats Route
// ============================================================================
//
// Endpoints:
// - GET /api/stats/ - Dashboard totals
//
// ============================================================================

use axum::{Json, extract::State, response::IntoResponse};
use broadcast_error::AppError;
use std::sync::Arc;

use crate::context::AppContext;
use crate::messages;

/// GET /api/stats/
pub async fn get_stats(
    State(app_context): State<Arc<AppContext>>,
) -> Result<impl IntoResponse, AppError> {
    let counts = messages::stats(&app_context).await?;
    Ok(Json(counts))
}
