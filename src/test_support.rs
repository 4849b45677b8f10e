//! Shared fixtures for unit tests.

use anyhow::Result;
use chrono::{DateTime, Utc};
use broadcast_config::{
    Config, CorsConfig, DbConfig, FcmConfig, LoggingConfig, MessageConfig, PushConfig,
    PushProvider, StorageBackend,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::context::AppContext;
use crate::models::{
    Contact, ContactId, Group, GroupId, Membership, MessageId, MessageUpdate, NewBroadcast,
    StoreCounts, StoredMessage,
};
use crate::push::{PushGateway, PushNotification};
use crate::store::{BroadcastStore, MemoryStore};

pub fn test_config() -> Config {
    Config {
        database_url: None,
        storage_backend: StorageBackend::Memory,
        port: 0,
        bind_address: "127.0.0.1:0".to_string(),
        is_production: false,
        logging: LoggingConfig {
            enable_phone_numbers: false,
            hash_salt: "test-salt".to_string(),
        },
        db: DbConfig {
            max_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 60,
        },
        push: PushConfig {
            provider: PushProvider::Disabled,
            title: "New Message".to_string(),
            concurrency: 4,
            request_timeout_secs: 5,
            fcm: FcmConfig {
                service_account_path: String::new(),
                project_id: None,
                api_base: "http://127.0.0.1:9".to_string(),
            },
        },
        messages: MessageConfig {
            default_expiry_days: 7,
            max_expiry_days: 365,
            max_content_length: 4096,
            cleanup_interval_secs: 0,
            retention_days: 30,
        },
        cors: CorsConfig {
            allowed_origins: vec!["*".to_string()],
        },
    }
}

/// Push gateway that records every notification and fails for chosen tokens
#[derive(Default)]
pub struct RecordingPush {
    sent: Mutex<Vec<PushNotification>>,
    failing: HashSet<String>,
}

impl RecordingPush {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_for(tokens: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            failing: tokens.iter().map(|t| t.to_string()).collect(),
        })
    }

    pub fn sent(&self) -> Vec<PushNotification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PushGateway for RecordingPush {
    fn provider(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, notification: &PushNotification) -> Result<String> {
        if self.failing.contains(&notification.token) {
            anyhow::bail!("Unregistered device token");
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(format!("projects/test/messages/{}", notification.token))
    }
}

pub fn test_context(push: Arc<RecordingPush>) -> AppContext {
    AppContext::new(
        Arc::new(MemoryStore::new()),
        push,
        Arc::new(test_config()),
    )
}

/// Context with an arbitrary push gateway and config
pub fn test_context_with(push: Arc<dyn PushGateway>, config: Config) -> AppContext {
    AppContext::new(Arc::new(MemoryStore::new()), push, Arc::new(config))
}

/// Store whose database is gone: every call fails
pub struct UnavailableStore;

macro_rules! unavailable {
    () => {
        anyhow::bail!("connection refused")
    };
}

#[async_trait::async_trait]
impl BroadcastStore for UnavailableStore {
    async fn ping(&self) -> Result<()> {
        unavailable!()
    }
    async fn list_groups(&self) -> Result<Vec<Group>> {
        unavailable!()
    }
    async fn list_memberships(&self) -> Result<Vec<Membership>> {
        unavailable!()
    }
    async fn find_group(&self, _id: GroupId) -> Result<Option<Group>> {
        unavailable!()
    }
    async fn find_group_by_name(&self, _name: &str) -> Result<Option<Group>> {
        unavailable!()
    }
    async fn find_child_group(
        &self,
        _name: &str,
        _parent_id: Option<GroupId>,
    ) -> Result<Option<Group>> {
        unavailable!()
    }
    async fn create_group(&self, _name: &str, _parent_id: Option<GroupId>) -> Result<Group> {
        unavailable!()
    }
    async fn find_contact_by_phone(&self, _phone_number: &str) -> Result<Option<Contact>> {
        unavailable!()
    }
    async fn upsert_contact(&self, _name: &str, _phone_number: &str) -> Result<(Contact, bool)> {
        unavailable!()
    }
    async fn add_membership(&self, _contact_id: ContactId, _group_id: GroupId) -> Result<bool> {
        unavailable!()
    }
    async fn contact_group_ids(&self, _contact_id: ContactId) -> Result<Vec<GroupId>> {
        unavailable!()
    }
    async fn assign_device_token(
        &self,
        _contact_id: ContactId,
        _token: &str,
    ) -> Result<Option<Contact>> {
        unavailable!()
    }
    async fn device_tokens_for_groups(&self, _group_ids: &[GroupId]) -> Result<Vec<String>> {
        unavailable!()
    }
    async fn insert_broadcast(&self, _broadcast: &NewBroadcast) -> Result<Vec<StoredMessage>> {
        unavailable!()
    }
    async fn messages_for_groups(
        &self,
        _group_ids: &[GroupId],
        _now: DateTime<Utc>,
    ) -> Result<Vec<StoredMessage>> {
        unavailable!()
    }
    async fn message_history(&self) -> Result<Vec<StoredMessage>> {
        unavailable!()
    }
    async fn find_message(&self, _id: MessageId) -> Result<Option<StoredMessage>> {
        unavailable!()
    }
    async fn update_message(
        &self,
        _id: MessageId,
        _update: &MessageUpdate,
    ) -> Result<Option<StoredMessage>> {
        unavailable!()
    }
    async fn delete_message(&self, _id: MessageId) -> Result<bool> {
        unavailable!()
    }
    async fn delete_messages_expired_before(&self, _cutoff: DateTime<Utc>) -> Result<u64> {
        unavailable!()
    }
    async fn counts(&self, _now: DateTime<Utc>) -> Result<StoreCounts> {
        unavailable!()
    }
}
