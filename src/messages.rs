// ============================================================================
// Message Queries & Administration
// ============================================================================

use broadcast_error::{AppError, AppResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::AppContext;
use crate::hierarchy::GroupTree;
use crate::models::{
    DISPLAY_DATE_FORMAT, MessageId, MessageUpdate, Priority, StoreCounts, StoredMessage,
};
use crate::utils::loggable_phone;
use crate::visibility::resolve_inbox;

/// A stored message as shown to dashboards and devices
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageView {
    pub id: MessageId,
    pub broadcast_id: Uuid,
    /// Name of the group this copy was addressed to
    pub group: String,
    pub content: String,
    pub priority: Priority,
    pub expiry: String,
    pub timestamp: String,
    /// Contacts linked directly to the addressed group
    pub recipient_count: usize,
}

impl MessageView {
    fn new(message: StoredMessage, tree: &GroupTree) -> Self {
        Self {
            recipient_count: tree.direct_contact_count(message.group_id),
            id: message.id,
            broadcast_id: message.broadcast_id,
            group: message.group_name,
            content: message.content,
            priority: message.priority,
            expiry: message.expires_at.format(DISPLAY_DATE_FORMAT).to_string(),
            timestamp: message.created_at.format(DISPLAY_DATE_FORMAT).to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMessageInput {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    /// RFC 3339 or `YYYY-MM-DD HH:MM` (UTC)
    #[serde(default)]
    pub expiry: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteMessageOutput {
    pub status: &'static str,
}

/// Accepts RFC 3339 or the display format (interpreted as UTC)
pub fn parse_expiry(raw: &str) -> AppResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, DISPLAY_DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| {
            AppError::validation(format!(
                "Invalid expiry '{}': expected RFC 3339 or YYYY-MM-DD HH:MM",
                raw
            ))
        })
}

fn into_update(ctx: &AppContext, input: UpdateMessageInput) -> AppResult<MessageUpdate> {
    let content = match input.content {
        Some(raw) => {
            let content = raw.trim();
            if content.is_empty() {
                return Err(AppError::validation("Message content must not be empty"));
            }
            if content.chars().count() > ctx.config.messages.max_content_length {
                return Err(AppError::validation(format!(
                    "Message content exceeds {} characters",
                    ctx.config.messages.max_content_length
                )));
            }
            Some(content.to_string())
        }
        None => None,
    };

    let priority = input
        .priority
        .as_deref()
        .map(|raw| {
            raw.parse::<Priority>()
                .map_err(|e| AppError::validation(e.to_string()))
        })
        .transpose()?;

    let expires_at = input.expiry.as_deref().map(parse_expiry).transpose()?;

    let update = MessageUpdate {
        content,
        priority,
        expires_at,
    };
    if update.is_empty() {
        return Err(AppError::validation(
            "Nothing to update: provide content, priority or expiry",
        ));
    }
    Ok(update)
}

/// Messages visible to the contact with this phone number.
///
/// Visibility covers the contact's groups and all their ancestors; copies of
/// one broadcast collapse into the highest-priority copy.
pub async fn contact_inbox(ctx: &AppContext, phone_number: &str) -> AppResult<Vec<MessageView>> {
    let phone = phone_number.trim();
    let contact = ctx
        .store
        .find_contact_by_phone(phone)
        .await?
        .ok_or_else(|| AppError::not_found("Contact not found"))?;

    let tree = ctx.store.load_tree().await?;
    let own_groups = ctx.store.contact_group_ids(contact.id).await?;
    let visible: Vec<_> = tree.visible_group_ids(own_groups).into_iter().collect();

    let now = Utc::now();
    let candidates = ctx.store.messages_for_groups(&visible, now).await?;
    let inbox = resolve_inbox(candidates, now);

    let logging = &ctx.config.logging;
    tracing::debug!(
        phone = %loggable_phone(phone, logging.enable_phone_numbers, &logging.hash_salt),
        visible_groups = visible.len(),
        messages = inbox.len(),
        "Inbox resolved"
    );

    Ok(inbox
        .into_iter()
        .map(|m| MessageView::new(m, &tree))
        .collect())
}

/// Every stored message copy, newest first
pub async fn message_history(ctx: &AppContext) -> AppResult<Vec<MessageView>> {
    let tree = ctx.store.load_tree().await?;
    let messages = ctx.store.message_history().await?;
    Ok(messages
        .into_iter()
        .map(|m| MessageView::new(m, &tree))
        .collect())
}

pub async fn update_message(
    ctx: &AppContext,
    id: MessageId,
    input: UpdateMessageInput,
) -> AppResult<MessageView> {
    let update = into_update(ctx, input)?;

    let updated = ctx
        .store
        .update_message(id, &update)
        .await?
        .ok_or_else(|| AppError::not_found("Message not found"))?;

    tracing::info!(
        message_id = id,
        content_changed = update.content.is_some(),
        priority = ?update.priority,
        expires_at = ?update.expires_at,
        "Message updated"
    );

    let tree = ctx.store.load_tree().await?;
    Ok(MessageView::new(updated, &tree))
}

pub async fn delete_message(ctx: &AppContext, id: MessageId) -> AppResult<DeleteMessageOutput> {
    if !ctx.store.delete_message(id).await? {
        return Err(AppError::not_found("Message not found"));
    }
    tracing::info!(message_id = id, "Message deleted");
    Ok(DeleteMessageOutput {
        status: "Message deleted",
    })
}

pub async fn stats(ctx: &AppContext) -> AppResult<StoreCounts> {
    Ok(ctx.store.counts(Utc::now()).await?)
}
