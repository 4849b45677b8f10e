// ============================================================================
// Contact & Device Routes
// ============================================================================
//
// Endpoints:
// - POST /api/upload-contacts/:group_id/ - Bulk contact import into a group
// - POST /api/register-device/:device_id/:phone_number - Bind a push token
//
// ============================================================================

use axum::{Json, extract::State, response::IntoResponse};
use broadcast_error::AppError;
use serde::Deserialize;
use std::sync::Arc;

use crate::context::AppContext;
use crate::directory::{self, ContactRow, RegisterDeviceInput};
use crate::models::GroupId;
use crate::routes::extractors::{ApiPath, JsonBody};

#[derive(Debug, Deserialize)]
pub struct UploadContactsRequest {
    pub rows: Vec<ContactRow>,
}

/// POST /api/upload-contacts/:group_id/
pub async fn upload_contacts(
    State(app_context): State<Arc<AppContext>>,
    ApiPath(group_id): ApiPath<GroupId>,
    JsonBody(request): JsonBody<UploadContactsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let output = directory::import_contacts(&app_context, group_id, request.rows).await?;
    Ok(Json(output))
}

/// POST /api/register-device/:device_id/:phone_number
pub async fn register_device(
    State(app_context): State<Arc<AppContext>>,
    ApiPath((device_id, phone_number)): ApiPath<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let output = directory::register_device(
        &app_context,
        RegisterDeviceInput {
            device_id,
            phone_number,
        },
    )
    .await?;
    Ok(Json(output))
}
