use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type GroupId = i64;
pub type ContactId = i64;
pub type MessageId = i64;

/// Display format used by the admin dashboard for message dates
pub const DISPLAY_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Message priority. Ordering follows urgency: `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => anyhow::bail!(
                "Invalid priority: {}. Must be 'low', 'medium' or 'high'",
                s
            ),
        }
    }
}

/// A node of the group forest (college, department, class, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub parent_id: Option<GroupId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub phone_number: String,
    /// Push token of the contact's registered device
    pub device_token: Option<String>,
}

/// Contact ↔ group link
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct Membership {
    pub contact_id: ContactId,
    pub group_id: GroupId,
}

/// One stored copy of a broadcast, addressed to a single group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: MessageId,
    /// Shared by every copy created by the same broadcast
    pub broadcast_id: Uuid,
    pub group_id: GroupId,
    pub group_name: String,
    pub content: String,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StoredMessage {
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// A broadcast about to be persisted: one row per group in `group_ids`
#[derive(Debug, Clone)]
pub struct NewBroadcast {
    pub broadcast_id: Uuid,
    pub group_ids: Vec<GroupId>,
    pub content: String,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Partial update of a stored message; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct MessageUpdate {
    pub content: Option<String>,
    pub priority: Option<Priority>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl MessageUpdate {
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.priority.is_none() && self.expires_at.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StoreCounts {
    pub total_groups: i64,
    pub total_contacts: i64,
    pub total_messages: i64,
    pub active_messages: i64,
    pub registered_devices: i64,
}
