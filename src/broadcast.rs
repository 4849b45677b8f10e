// ============================================================================
// Broadcast Fan-out
// ============================================================================
//
// A broadcast addressed to a group reaches that group and every descendant:
// one message row is stored per group of the subtree (all sharing one
// broadcast_id), then every device registered by a contact of the subtree
// gets a push notification.
//
// Push failures are per token and never abort the broadcast; the messages
// are already stored by the time pushes go out.
//
// ============================================================================

use broadcast_error::{AppError, AppResult};
use chrono::{Duration, Utc};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use uuid::Uuid;

use crate::context::AppContext;
use crate::metrics;
use crate::models::{GroupId, NewBroadcast, Priority};
use crate::push::PushNotification;
use crate::utils::log_safe_id;

#[derive(Debug, Clone)]
pub struct SendBroadcastInput {
    pub group_id: GroupId,
    pub content: String,
    /// Raw priority as received; `None` means `low`
    pub priority: Option<String>,
    /// `None` means the configured default
    pub expiry_days: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PushStatus {
    Sent,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct PushResult {
    pub token: String,
    pub status: PushStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendBroadcastOutput {
    pub status: &'static str,
    pub broadcast_id: Uuid,
    pub group_ids: Vec<GroupId>,
    /// Distinct contacts in the addressed subtree
    pub recipient_count: usize,
    pub push_results: Vec<PushResult>,
}

struct ValidatedBroadcast {
    content: String,
    priority: Priority,
    expiry_days: i64,
}

fn validate(ctx: &AppContext, input: &SendBroadcastInput) -> AppResult<ValidatedBroadcast> {
    let limits = &ctx.config.messages;

    let content = input.content.trim();
    if content.is_empty() {
        return Err(AppError::validation("Message content must not be empty"));
    }
    if content.chars().count() > limits.max_content_length {
        return Err(AppError::validation(format!(
            "Message content exceeds {} characters",
            limits.max_content_length
        )));
    }

    let priority = match input.priority.as_deref().map(str::trim) {
        None | Some("") => Priority::default(),
        Some(raw) => raw
            .parse::<Priority>()
            .map_err(|e| AppError::validation(e.to_string()))?,
    };

    let expiry_days = input.expiry_days.unwrap_or(limits.default_expiry_days);
    if !(1..=limits.max_expiry_days).contains(&expiry_days) {
        return Err(AppError::validation(format!(
            "expiry_days must be between 1 and {}",
            limits.max_expiry_days
        )));
    }

    Ok(ValidatedBroadcast {
        content: content.to_string(),
        priority,
        expiry_days,
    })
}

/// Store a broadcast for a group subtree and push it to the subtree's devices
pub async fn send_broadcast(
    ctx: &AppContext,
    input: SendBroadcastInput,
) -> AppResult<SendBroadcastOutput> {
    let validated = validate(ctx, &input)?;

    let tree = ctx.store.load_tree().await?;
    if !tree.contains(input.group_id) {
        return Err(AppError::not_found("Group not found"));
    }

    let group_ids = tree.subtree_ids(input.group_id);
    let recipient_count = tree.subtree_contacts(input.group_id).len();

    let now = Utc::now();
    let expires_at = Duration::try_days(validated.expiry_days)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| AppError::validation("expiry_days is out of range"))?;
    let broadcast = NewBroadcast {
        broadcast_id: Uuid::new_v4(),
        group_ids: group_ids.clone(),
        content: validated.content,
        priority: validated.priority,
        created_at: now,
        expires_at,
    };

    let stored = ctx.store.insert_broadcast(&broadcast).await?;
    metrics::BROADCASTS_TOTAL.inc();
    metrics::MESSAGES_STORED_TOTAL.inc_by(stored.len() as u64);

    tracing::info!(
        broadcast_id = %broadcast.broadcast_id,
        group_id = input.group_id,
        group_count = group_ids.len(),
        recipient_count = recipient_count,
        priority = %broadcast.priority,
        expiry_days = validated.expiry_days,
        "Broadcast stored"
    );

    let tokens = ctx.store.device_tokens_for_groups(&group_ids).await?;
    let push_results = push_to_devices(ctx, &broadcast, tokens).await;

    Ok(SendBroadcastOutput {
        status: "Message sent to groups",
        broadcast_id: broadcast.broadcast_id,
        group_ids,
        recipient_count,
        push_results,
    })
}

/// Push one broadcast to every token with bounded concurrency.
/// Results are sorted by token.
async fn push_to_devices(
    ctx: &AppContext,
    broadcast: &NewBroadcast,
    tokens: Vec<String>,
) -> Vec<PushResult> {
    if tokens.is_empty() {
        return Vec::new();
    }

    let timer = metrics::PUSH_FANOUT_SECONDS.start_timer();
    let salt = &ctx.config.logging.hash_salt;
    let concurrency = ctx.config.push.concurrency.max(1);
    let title = ctx.config.push.title.clone();

    let mut results: Vec<PushResult> = stream::iter(tokens)
        .map(|token| {
            let notification = PushNotification {
                token,
                title: title.clone(),
                body: broadcast.content.clone(),
                priority: broadcast.priority,
                broadcast_id: broadcast.broadcast_id,
            };
            async move {
                match ctx.push.send(&notification).await {
                    Ok(response) => {
                        metrics::PUSH_SENT_TOTAL.inc();
                        PushResult {
                            token: notification.token,
                            status: PushStatus::Sent,
                            response: Some(response),
                            error: None,
                        }
                    }
                    Err(e) => {
                        metrics::PUSH_FAILED_TOTAL.inc();
                        tracing::warn!(
                            broadcast_id = %notification.broadcast_id,
                            token_hash = %log_safe_id(&notification.token, salt),
                            provider = ctx.push.provider(),
                            error = %e,
                            "Push notification failed"
                        );
                        PushResult {
                            token: notification.token,
                            status: PushStatus::Failed,
                            response: None,
                            error: Some(e.to_string()),
                        }
                    }
                }
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    timer.observe_duration();
    results.sort_by(|a, b| a.token.cmp(&b.token));

    let failed = results
        .iter()
        .filter(|r| r.status == PushStatus::Failed)
        .count();
    tracing::info!(
        broadcast_id = %broadcast.broadcast_id,
        provider = ctx.push.provider(),
        sent = results.len() - failed,
        failed = failed,
        "Push fan-out complete"
    );

    results
}
