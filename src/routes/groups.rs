// ============================================================================
// Group Routes
// ============================================================================
//
// Endpoints:
// - GET /api/groups/hierarchy/?group_name= - Nested group tree
// - POST /api/groups/ - Create one group
// - POST /api/upload-groups/ - Bulk group import
//
// ============================================================================

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use broadcast_error::AppError;
use serde::Deserialize;
use std::sync::Arc;

use crate::context::AppContext;
use crate::directory::{self, CreateGroupInput, GroupRow};
use crate::routes::extractors::JsonBody;

#[derive(Debug, Deserialize)]
pub struct HierarchyQuery {
    pub group_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UploadGroupsRequest {
    pub rows: Vec<GroupRow>,
}

/// GET /api/groups/hierarchy/
pub async fn get_hierarchy(
    State(app_context): State<Arc<AppContext>>,
    Query(query): Query<HierarchyQuery>,
) -> Result<impl IntoResponse, AppError> {
    let nodes = directory::group_hierarchy(&app_context, query.group_name.as_deref()).await?;
    Ok(Json(nodes))
}

/// POST /api/groups/
pub async fn create_group(
    State(app_context): State<Arc<AppContext>>,
    JsonBody(input): JsonBody<CreateGroupInput>,
) -> Result<impl IntoResponse, AppError> {
    let group = directory::create_group(&app_context, input).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// POST /api/upload-groups/
pub async fn upload_groups(
    State(app_context): State<Arc<AppContext>>,
    JsonBody(request): JsonBody<UploadGroupsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let output = directory::import_groups(&app_context, request.rows).await?;
    Ok(Json(output))
}
