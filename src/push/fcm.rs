use anyhow::{Context, Result};
use broadcast_config::PushConfig;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::{PushGateway, PushNotification};
use crate::models::Priority;

const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Lifetime requested for the signed assertion
const ASSERTION_TTL_SECS: i64 = 3600;
/// Access tokens are refreshed this long before they expire
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// `application/x-www-form-urlencoded` body for the JWT bearer grant
fn token_request_body(token_uri: &str, assertion: &str) -> Result<String> {
    let mut encoder = reqwest::Url::parse(token_uri)
        .with_context(|| format!("Invalid FCM token_uri: {}", token_uri))?;
    encoder.set_query(None);
    encoder
        .query_pairs_mut()
        .append_pair("grant_type", JWT_BEARER_GRANT)
        .append_pair("assertion", assertion);
    Ok(encoder.query().unwrap_or_default().to_string())
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a Google service-account key file that FCM needs
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub project_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    name: String,
}

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

/// Firebase Cloud Messaging HTTP v1 client
///
/// Authenticates with a service account: an RS256-signed assertion is
/// exchanged for an OAuth2 access token, which is reused until shortly
/// before it expires.
pub struct FcmClient {
    http_client: reqwest::Client,
    client_email: String,
    token_uri: String,
    project_id: String,
    send_url: String,
    encoding_key: EncodingKey,
    token: RwLock<Option<CachedToken>>,
}

impl FcmClient {
    pub fn new(
        account: ServiceAccount,
        project_id_override: Option<String>,
        api_base: &str,
        request_timeout: Duration,
    ) -> Result<Self> {
        let project_id = project_id_override.or(account.project_id).context(
            "FCM project id missing: set FCM_PROJECT_ID or use a service account with project_id",
        )?;

        let encoding_key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .context("Invalid private key in FCM service account")?;

        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            client_email: account.client_email,
            token_uri: account.token_uri,
            send_url: format!(
                "{}/v1/projects/{}/messages:send",
                api_base.trim_end_matches('/'),
                project_id
            ),
            project_id,
            encoding_key,
            token: RwLock::new(None),
        })
    }

    /// Load the service account named by `FCM_SERVICE_ACCOUNT_PATH`
    pub fn from_config(config: &PushConfig) -> Result<Self> {
        let path = &config.fcm.service_account_path;
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read FCM service account: {}", path))?;
        let account: ServiceAccount = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse FCM service account: {}", path))?;

        Self::new(
            account,
            config.fcm.project_id.clone(),
            &config.fcm.api_base,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn sign_assertion(&self) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: self.client_email.clone(),
            scope: FCM_SCOPE.to_string(),
            aud: self.token_uri.clone(),
            iat: now,
            exp: now + ASSERTION_TTL_SECS,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .context("Failed to sign FCM assertion")
    }

    async fn access_token(&self) -> Result<String> {
        if let Some(cached) = self.token.read().await.as_ref() {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.access_token.clone());
            }
        }

        let mut slot = self.token.write().await;
        // Another task may have refreshed while we waited for the lock
        if let Some(cached) = slot.as_ref() {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.access_token.clone());
            }
        }

        let assertion = self.sign_assertion()?;
        let response = self
            .http_client
            .post(&self.token_uri)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(token_request_body(&self.token_uri, &assertion)?)
            .send()
            .await
            .context("FCM token request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("FCM token exchange failed ({}): {}", status, body);
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Invalid FCM token response")?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        *slot = Some(CachedToken {
            access_token: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });

        tracing::debug!(expires_in = token.expires_in, "FCM access token refreshed");
        Ok(token.access_token)
    }
}

/// HTTP v1 request body for one device
pub(crate) fn message_payload(notification: &PushNotification) -> serde_json::Value {
    let android_priority = match notification.priority {
        Priority::High => "HIGH",
        Priority::Medium | Priority::Low => "NORMAL",
    };

    json!({
        "message": {
            "token": notification.token,
            "notification": {
                "title": notification.title,
                "body": notification.body,
            },
            "android": {
                "priority": android_priority,
            },
            "data": {
                "broadcast_id": notification.broadcast_id.to_string(),
                "priority": notification.priority.as_str(),
            },
        }
    })
}

#[async_trait::async_trait]
impl PushGateway for FcmClient {
    fn provider(&self) -> &'static str {
        "fcm"
    }

    async fn send(&self, notification: &PushNotification) -> Result<String> {
        let access_token = self.access_token().await?;

        let response = self
            .http_client
            .post(&self.send_url)
            .bearer_auth(access_token)
            .json(&message_payload(notification))
            .send()
            .await
            .context("FCM send request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("FCM rejected notification ({}): {}", status, body);
        }

        let sent: SendResponse = response.json().await.context("Invalid FCM send response")?;
        Ok(sent.name)
    }
}
