// ============================================================================
// Test Utilities
// ============================================================================
//
// Spawns the full HTTP router on an ephemeral port with the in-memory store
// and a push gateway that records notifications instead of sending them.
//
// ============================================================================

#![allow(dead_code)]

use broadcast_server::context::AppContext;
use broadcast_server::push::{PushGateway, PushNotification};
use broadcast_server::routes::create_router;
use broadcast_server::store::{BroadcastStore, MemoryStore};
use broadcast_server::Config;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// Push gateway that records every notification; tokens listed in
/// `failing` are rejected like unregistered devices
#[derive(Default)]
pub struct RecordingPush {
    sent: Mutex<Vec<PushNotification>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingPush {
    pub fn fail_token(&self, token: &str) {
        self.failing.lock().unwrap().insert(token.to_string());
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

    async fn send(&self, notification: &PushNotification) -> anyhow::Result<String> {
        if self.failing.lock().unwrap().contains(&notification.token) {
            anyhow::bail!("Requested entity was not found");
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(format!("projects/test/messages/{}", notification.token))
    }
}

pub struct TestApp {
    pub address: String,
    pub store: Arc<MemoryStore>,
    pub push: Arc<RecordingPush>,
    pub config: Arc<Config>,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// URL with an encoded query string
    pub fn url_with(&self, path: &str, params: &[(&str, &str)]) -> reqwest::Url {
        reqwest::Url::parse_with_params(&self.url(path), params).unwrap()
    }
}

/// Build the config the way production does, from the environment
fn create_test_config() -> Config {
    // SAFETY: every integration test that spawns an app is #[serial]
    unsafe {
        std::env::set_var("ENVIRONMENT", "test");
        std::env::set_var("STORAGE_BACKEND", "memory");
        std::env::set_var("PUSH_PROVIDER", "disabled");
        std::env::set_var("LOG_HASH_SALT", "integration-test-salt");
        std::env::set_var("MESSAGE_CLEANUP_INTERVAL_SECS", "0");
        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("MESSAGE_DEFAULT_EXPIRY_DAYS");
        std::env::remove_var("MESSAGE_MAX_EXPIRY_DAYS");
        std::env::remove_var("CORS_ALLOWED_ORIGINS");
    }

    let mut config = Config::from_env().expect("Failed to build test config");
    config.bind_address = "127.0.0.1:0".to_string();
    config
}

pub async fn spawn_app() -> TestApp {
    let config = Arc::new(create_test_config());
    let store = Arc::new(MemoryStore::new());
    let push = Arc::new(RecordingPush::default());

    let store_handle: Arc<dyn BroadcastStore> = store.clone();
    let push_handle: Arc<dyn PushGateway> = push.clone();
    let app_context = Arc::new(AppContext::new(store_handle, push_handle, config.clone()));

    let listener = TcpListener::bind(&config.bind_address)
        .await
        .expect("Failed to bind random port");
    let address = format!("http://{}", listener.local_addr().unwrap());

    let app = create_router(app_context);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        store,
        push,
        config,
        client: reqwest::Client::new(),
    }
}

/// Create a group through the API and return its id
pub async fn create_group(app: &TestApp, name: &str, parent_id: Option<i64>) -> i64 {
    let response = app
        .client
        .post(app.url("/api/groups/"))
        .json(&serde_json::json!({ "name": name, "parent_id": parent_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201, "creating group {}", name);
    let body: serde_json::Value = response.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

/// Import contacts `(name, phone)` into a group through the API
pub async fn upload_contacts(app: &TestApp, group_id: i64, contacts: &[(&str, &str)]) {
    let rows: Vec<serde_json::Value> = contacts
        .iter()
        .map(|(name, phone)| serde_json::json!({ "name": name, "phone": phone }))
        .collect();
    let response = app
        .client
        .post(app.url(&format!("/api/upload-contacts/{}/", group_id)))
        .json(&serde_json::json!({ "rows": rows }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

pub async fn register_device(app: &TestApp, token: &str, phone: &str) -> reqwest::Response {
    app.client
        .post(app.url(&format!("/api/register-device/{}/{}", token, phone)))
        .send()
        .await
        .unwrap()
}
