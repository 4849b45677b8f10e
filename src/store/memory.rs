use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

use super::{BroadcastStore, DuplicateGroup};
use crate::models::{
    Contact, ContactId, Group, GroupId, MessageId, MessageUpdate, Membership, NewBroadcast,
    StoreCounts, StoredMessage,
};

#[derive(Default)]
struct MemoryState {
    groups: BTreeMap<GroupId, Group>,
    contacts: BTreeMap<ContactId, Contact>,
    memberships: BTreeSet<(ContactId, GroupId)>,
    messages: BTreeMap<MessageId, StoredMessage>,
    last_group_id: GroupId,
    last_contact_id: ContactId,
    last_message_id: MessageId,
}

/// Process-local implementation of BroadcastStore
///
/// Data lives only as long as the process. Ids are assigned sequentially
/// starting at 1, like the Postgres sequences.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl BroadcastStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        Ok(self.state.read().await.groups.values().cloned().collect())
    }

    async fn list_memberships(&self) -> Result<Vec<Membership>> {
        Ok(self
            .state
            .read()
            .await
            .memberships
            .iter()
            .map(|&(contact_id, group_id)| Membership {
                contact_id,
                group_id,
            })
            .collect())
    }

    async fn find_group(&self, id: GroupId) -> Result<Option<Group>> {
        Ok(self.state.read().await.groups.get(&id).cloned())
    }

    async fn find_group_by_name(&self, name: &str) -> Result<Option<Group>> {
        Ok(self
            .state
            .read()
            .await
            .groups
            .values()
            .find(|g| g.name == name)
            .cloned())
    }

    async fn find_child_group(
        &self,
        name: &str,
        parent_id: Option<GroupId>,
    ) -> Result<Option<Group>> {
        Ok(self
            .state
            .read()
            .await
            .groups
            .values()
            .find(|g| g.name == name && g.parent_id == parent_id)
            .cloned())
    }

    async fn create_group(&self, name: &str, parent_id: Option<GroupId>) -> Result<Group> {
        let mut state = self.state.write().await;

        if let Some(parent) = parent_id {
            if !state.groups.contains_key(&parent) {
                anyhow::bail!("Parent group {} does not exist", parent);
            }
        }
        if state
            .groups
            .values()
            .any(|g| g.name == name && g.parent_id == parent_id)
        {
            return Err(DuplicateGroup {
                name: name.to_string(),
            }
            .into());
        }

        state.last_group_id += 1;
        let group = Group {
            id: state.last_group_id,
            name: name.to_string(),
            parent_id,
        };
        state.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn find_contact_by_phone(&self, phone_number: &str) -> Result<Option<Contact>> {
        Ok(self
            .state
            .read()
            .await
            .contacts
            .values()
            .find(|c| c.phone_number == phone_number)
            .cloned())
    }

    async fn upsert_contact(&self, name: &str, phone_number: &str) -> Result<(Contact, bool)> {
        let mut state = self.state.write().await;

        if let Some(existing) = state
            .contacts
            .values()
            .find(|c| c.phone_number == phone_number)
        {
            return Ok((existing.clone(), false));
        }

        state.last_contact_id += 1;
        let contact = Contact {
            id: state.last_contact_id,
            name: name.to_string(),
            phone_number: phone_number.to_string(),
            device_token: None,
        };
        state.contacts.insert(contact.id, contact.clone());
        Ok((contact, true))
    }

    async fn add_membership(&self, contact_id: ContactId, group_id: GroupId) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state.contacts.contains_key(&contact_id) {
            anyhow::bail!("Contact {} does not exist", contact_id);
        }
        if !state.groups.contains_key(&group_id) {
            anyhow::bail!("Group {} does not exist", group_id);
        }
        Ok(state.memberships.insert((contact_id, group_id)))
    }

    async fn contact_group_ids(&self, contact_id: ContactId) -> Result<Vec<GroupId>> {
        Ok(self
            .state
            .read()
            .await
            .memberships
            .iter()
            .filter(|(cid, _)| *cid == contact_id)
            .map(|(_, gid)| *gid)
            .collect())
    }

    async fn assign_device_token(
        &self,
        contact_id: ContactId,
        token: &str,
    ) -> Result<Option<Contact>> {
        let mut state = self.state.write().await;
        if !state.contacts.contains_key(&contact_id) {
            return Ok(None);
        }

        for contact in state.contacts.values_mut() {
            if contact.id != contact_id && contact.device_token.as_deref() == Some(token) {
                contact.device_token = None;
            }
        }

        let contact = state
            .contacts
            .get_mut(&contact_id)
            .map(|c| {
                c.device_token = Some(token.to_string());
                c.clone()
            });
        Ok(contact)
    }

    async fn device_tokens_for_groups(&self, group_ids: &[GroupId]) -> Result<Vec<String>> {
        let state = self.state.read().await;
        let wanted: BTreeSet<GroupId> = group_ids.iter().copied().collect();

        let tokens: BTreeSet<String> = state
            .memberships
            .iter()
            .filter(|(_, gid)| wanted.contains(gid))
            .filter_map(|(cid, _)| state.contacts.get(cid))
            .filter_map(|c| c.device_token.clone())
            .collect();

        Ok(tokens.into_iter().collect())
    }

    async fn insert_broadcast(&self, broadcast: &NewBroadcast) -> Result<Vec<StoredMessage>> {
        let mut state = self.state.write().await;

        // Validate every target before writing anything
        let mut targets = Vec::with_capacity(broadcast.group_ids.len());
        for group_id in &broadcast.group_ids {
            let group = state
                .groups
                .get(group_id)
                .ok_or_else(|| anyhow::anyhow!("Group {} does not exist", group_id))?;
            targets.push((group.id, group.name.clone()));
        }

        let mut stored = Vec::with_capacity(targets.len());
        for (group_id, group_name) in targets {
            state.last_message_id += 1;
            let message = StoredMessage {
                id: state.last_message_id,
                broadcast_id: broadcast.broadcast_id,
                group_id,
                group_name,
                content: broadcast.content.clone(),
                priority: broadcast.priority,
                created_at: broadcast.created_at,
                expires_at: broadcast.expires_at,
            };
            state.messages.insert(message.id, message.clone());
            stored.push(message);
        }

        Ok(stored)
    }

    async fn messages_for_groups(
        &self,
        group_ids: &[GroupId],
        now: DateTime<Utc>,
    ) -> Result<Vec<StoredMessage>> {
        let wanted: BTreeSet<GroupId> = group_ids.iter().copied().collect();
        Ok(self
            .state
            .read()
            .await
            .messages
            .values()
            .filter(|m| wanted.contains(&m.group_id) && m.is_visible_at(now))
            .cloned()
            .collect())
    }

    async fn message_history(&self) -> Result<Vec<StoredMessage>> {
        let mut messages: Vec<StoredMessage> =
            self.state.read().await.messages.values().cloned().collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(messages)
    }

    async fn find_message(&self, id: MessageId) -> Result<Option<StoredMessage>> {
        Ok(self.state.read().await.messages.get(&id).cloned())
    }

    async fn update_message(
        &self,
        id: MessageId,
        update: &MessageUpdate,
    ) -> Result<Option<StoredMessage>> {
        let mut state = self.state.write().await;
        let Some(message) = state.messages.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(content) = &update.content {
            message.content = content.clone();
        }
        if let Some(priority) = update.priority {
            message.priority = priority;
        }
        if let Some(expires_at) = update.expires_at {
            message.expires_at = expires_at;
        }

        Ok(Some(message.clone()))
    }

    async fn delete_message(&self, id: MessageId) -> Result<bool> {
        Ok(self.state.write().await.messages.remove(&id).is_some())
    }

    async fn delete_messages_expired_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.write().await;
        let before = state.messages.len();
        state.messages.retain(|_, m| m.expires_at >= cutoff);
        Ok((before - state.messages.len()) as u64)
    }

    async fn counts(&self, now: DateTime<Utc>) -> Result<StoreCounts> {
        let state = self.state.read().await;
        Ok(StoreCounts {
            total_groups: state.groups.len() as i64,
            total_contacts: state.contacts.len() as i64,
            total_messages: state.messages.len() as i64,
            active_messages: state
                .messages
                .values()
                .filter(|m| m.is_visible_at(now))
                .count() as i64,
            registered_devices: state
                .contacts
                .values()
                .filter(|c| c.device_token.is_some())
                .count() as i64,
        })
    }
}
