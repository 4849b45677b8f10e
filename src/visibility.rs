//! Inbox resolution: which stored messages a contact sees.
//!
//! A contact sees messages addressed to its own groups and to every ancestor
//! of those groups. Because a broadcast stores one copy per group of the
//! addressed subtree, a contact usually reaches several copies of the same
//! broadcast through its ancestor chain; those collapse to the single copy
//! with the highest priority.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::StoredMessage;

/// Ranking used both to pick the surviving copy of a broadcast and to order
/// the inbox: priority, then recency, then id.
fn rank(a: &StoredMessage, b: &StoredMessage) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Drop expired copies, keep one copy per broadcast and order the result
/// most important first.
///
/// `messages` should already be restricted to the contact's visible groups.
pub fn resolve_inbox(messages: Vec<StoredMessage>, now: DateTime<Utc>) -> Vec<StoredMessage> {
    let mut best: HashMap<Uuid, StoredMessage> = HashMap::new();

    for message in messages {
        if !message.is_visible_at(now) {
            continue;
        }
        match best.get(&message.broadcast_id) {
            Some(current) if rank(current, &message) != Ordering::Less => {}
            _ => {
                best.insert(message.broadcast_id, message);
            }
        }
    }

    let mut inbox: Vec<StoredMessage> = best.into_values().collect();
    inbox.sort_by(|a, b| rank(b, a));
    inbox
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use chrono::Duration;

    fn message(
        id: i64,
        broadcast_id: Uuid,
        priority: Priority,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> StoredMessage {
        StoredMessage {
            id,
            broadcast_id,
            group_id: id,
            group_name: format!("group-{}", id),
            content: format!("content-{}", id),
            priority,
            created_at,
            expires_at,
        }
    }

    #[test]
    fn test_expired_messages_are_hidden() {
        let now = Utc::now();
        let messages = vec![
            message(1, Uuid::new_v4(), Priority::Low, now, now + Duration::days(1)),
            message(2, Uuid::new_v4(), Priority::High, now, now - Duration::minutes(1)),
            // Expiring exactly now is already invisible
            message(3, Uuid::new_v4(), Priority::High, now, now),
        ];

        let inbox = resolve_inbox(messages, now);
        assert_eq!(inbox.iter().map(|m| m.id).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_copies_of_a_broadcast_collapse_to_highest_priority() {
        let now = Utc::now();
        let later = now + Duration::days(3);
        let broadcast = Uuid::new_v4();
        let messages = vec![
            message(10, broadcast, Priority::Low, now, later),
            message(11, broadcast, Priority::High, now, later),
            message(12, broadcast, Priority::Medium, now, later),
        ];

        let inbox = resolve_inbox(messages, now);
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].id, 11);
        assert_eq!(inbox[0].priority, Priority::High);
    }

    #[test]
    fn test_expired_copy_does_not_shadow_live_copy() {
        let now = Utc::now();
        let broadcast = Uuid::new_v4();
        let messages = vec![
            message(1, broadcast, Priority::High, now, now - Duration::hours(1)),
            message(2, broadcast, Priority::Low, now, now + Duration::hours(1)),
        ];

        let inbox = resolve_inbox(messages, now);
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].id, 2);
    }

    #[test]
    fn test_priority_ties_prefer_newest_then_highest_id() {
        let now = Utc::now();
        let later = now + Duration::days(1);
        let broadcast = Uuid::new_v4();
        let messages = vec![
            message(5, broadcast, Priority::Medium, now - Duration::minutes(5), later),
            message(6, broadcast, Priority::Medium, now, later),
            message(4, broadcast, Priority::Medium, now, later),
        ];

        let inbox = resolve_inbox(messages, now);
        assert_eq!(inbox[0].id, 6);
    }

    #[test]
    fn test_inbox_ordering() {
        let now = Utc::now();
        let later = now + Duration::days(1);
        let messages = vec![
            message(1, Uuid::new_v4(), Priority::Low, now, later),
            message(2, Uuid::new_v4(), Priority::High, now - Duration::hours(2), later),
            message(3, Uuid::new_v4(), Priority::High, now - Duration::hours(1), later),
            message(4, Uuid::new_v4(), Priority::Medium, now - Duration::days(1), later),
        ];

        let inbox = resolve_inbox(messages, now - Duration::days(2));
        assert_eq!(
            inbox.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![3, 2, 4, 1]
        );
    }
}
