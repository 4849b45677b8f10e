// ============================================================================
// Storage
// ============================================================================
//
// Persistence for groups, contacts, memberships and messages.
//
// Implementations:
// - PostgresStore: production storage (sqlx, migrations in ./migrations)
// - MemoryStore: process-local storage for development and tests
//
// Tree walks never happen in SQL: callers load the whole forest with
// `load_tree` and traverse it in memory (see hierarchy.rs).
//
// ============================================================================

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{DbPool, PostgresStore, create_pool};

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::hierarchy::GroupTree;
use crate::models::{
    Contact, ContactId, Group, GroupId, MessageId, MessageUpdate, Membership, NewBroadcast,
    StoreCounts, StoredMessage,
};

/// A sibling group with this name already exists. Stores return it from
/// `create_group` so callers can tell a lost race from a storage failure.
#[derive(Debug, thiserror::Error)]
#[error("Group '{name}' already exists under this parent")]
pub struct DuplicateGroup {
    pub name: String,
}

#[async_trait::async_trait]
pub trait BroadcastStore: Send + Sync {
    /// Cheap liveness check for /health
    async fn ping(&self) -> Result<()>;

    async fn list_groups(&self) -> Result<Vec<Group>>;

    async fn list_memberships(&self) -> Result<Vec<Membership>>;

    /// Snapshot of the whole group forest with its memberships
    async fn load_tree(&self) -> Result<GroupTree> {
        let groups = self.list_groups().await?;
        let memberships = self.list_memberships().await?;
        Ok(GroupTree::new(groups, &memberships))
    }

    async fn find_group(&self, id: GroupId) -> Result<Option<Group>>;

    /// First group (lowest id) with exactly this name, under any parent
    async fn find_group_by_name(&self, name: &str) -> Result<Option<Group>>;

    /// The group called `name` directly under `parent_id` (`None` = top level)
    async fn find_child_group(&self, name: &str, parent_id: Option<GroupId>)
    -> Result<Option<Group>>;

    async fn create_group(&self, name: &str, parent_id: Option<GroupId>) -> Result<Group>;

    async fn find_contact_by_phone(&self, phone_number: &str) -> Result<Option<Contact>>;

    /// Create the contact unless one with this phone number exists.
    /// Existing contacts are returned untouched. The flag is true when a
    /// new contact was created.
    async fn upsert_contact(&self, name: &str, phone_number: &str) -> Result<(Contact, bool)>;

    /// Returns false when the link already existed
    async fn add_membership(&self, contact_id: ContactId, group_id: GroupId) -> Result<bool>;

    async fn contact_group_ids(&self, contact_id: ContactId) -> Result<Vec<GroupId>>;

    /// Attach `token` to the contact, first detaching it from any other
    /// contact that held it. Returns None if the contact doesn't exist.
    async fn assign_device_token(
        &self,
        contact_id: ContactId,
        token: &str,
    ) -> Result<Option<Contact>>;

    /// Distinct device tokens of contacts linked to any of `group_ids`
    async fn device_tokens_for_groups(&self, group_ids: &[GroupId]) -> Result<Vec<String>>;

    /// Store one message per target group, all or nothing
    async fn insert_broadcast(&self, broadcast: &NewBroadcast) -> Result<Vec<StoredMessage>>;

    /// Messages addressed to any of `group_ids` that expire after `now`
    async fn messages_for_groups(
        &self,
        group_ids: &[GroupId],
        now: DateTime<Utc>,
    ) -> Result<Vec<StoredMessage>>;

    /// Every stored message, newest first
    async fn message_history(&self) -> Result<Vec<StoredMessage>>;

    async fn find_message(&self, id: MessageId) -> Result<Option<StoredMessage>>;

    async fn update_message(
        &self,
        id: MessageId,
        update: &MessageUpdate,
    ) -> Result<Option<StoredMessage>>;

    /// Returns false when no such message existed
    async fn delete_message(&self, id: MessageId) -> Result<bool>;

    /// Delete messages whose expiry is before `cutoff`, returning the count
    async fn delete_messages_expired_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    async fn counts(&self, now: DateTime<Utc>) -> Result<StoreCounts>;
}
