// ============================================================================
// Messages Routes
// ============================================================================
//
// Endpoints:
// - POST /api/send-message/:group_id/?content&priority&expiry_days - Broadcast
// - GET /api/messages/history/ - Every stored message, newest first
// - GET /api/messages/:phone_number/ - Inbox of one contact
// - PUT /api/messages/:message_id/ - Edit content, priority or expiry
// - DELETE /api/messages/:message_id/ - Delete one stored message
//
// ============================================================================

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use broadcast_error::AppError;
use serde::Deserialize;
use std::sync::Arc;

use crate::broadcast::{self, SendBroadcastInput};
use crate::context::AppContext;
use crate::messages::{self, UpdateMessageInput};
use crate::models::{GroupId, MessageId};
use crate::routes::extractors::{ApiPath, JsonBody};

/// Query parameters of the send endpoint, kept as raw strings so that
/// malformed values surface as validation errors
#[derive(Debug, Deserialize)]
pub struct SendMessageQuery {
    pub content: Option<String>,
    pub priority: Option<String>,
    pub expiry_days: Option<String>,
}

fn parse_expiry_days(raw: Option<&str>) -> Result<Option<i64>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse::<i64>().map(Some).map_err(|_| {
            AppError::validation(format!("expiry_days must be a whole number, got '{}'", value))
        }),
    }
}

/// POST /api/send-message/:group_id/
pub async fn send_message(
    State(app_context): State<Arc<AppContext>>,
    ApiPath(group_id): ApiPath<GroupId>,
    Query(query): Query<SendMessageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let input = SendBroadcastInput {
        group_id,
        content: query.content.unwrap_or_default(),
        priority: query.priority,
        expiry_days: parse_expiry_days(query.expiry_days.as_deref())?,
    };

    let output = broadcast::send_broadcast(&app_context, input).await?;
    Ok(Json(output))
}

/// GET /api/messages/history/
pub async fn message_history(
    State(app_context): State<Arc<AppContext>>,
) -> Result<impl IntoResponse, AppError> {
    let history = messages::message_history(&app_context).await?;
    Ok(Json(history))
}

/// GET /api/messages/:phone_number/
pub async fn contact_inbox(
    State(app_context): State<Arc<AppContext>>,
    ApiPath(phone_number): ApiPath<String>,
) -> Result<impl IntoResponse, AppError> {
    let inbox = messages::contact_inbox(&app_context, &phone_number).await?;
    Ok(Json(inbox))
}

/// PUT /api/messages/:message_id/
pub async fn update_message(
    State(app_context): State<Arc<AppContext>>,
    ApiPath(message_id): ApiPath<MessageId>,
    JsonBody(input): JsonBody<UpdateMessageInput>,
) -> Result<impl IntoResponse, AppError> {
    let view = messages::update_message(&app_context, message_id, input).await?;
    Ok(Json(view))
}

/// DELETE /api/messages/:message_id/
pub async fn delete_message(
    State(app_context): State<Arc<AppContext>>,
    ApiPath(message_id): ApiPath<MessageId>,
) -> Result<impl IntoResponse, AppError> {
    let output = messages::delete_message(&app_context, message_id).await?;
    Ok(Json(output))
}
