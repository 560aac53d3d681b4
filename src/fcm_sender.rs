use crate::{config::FcmSettings, models::FcmPayload};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum FcmError {
    #[error("Initialization error: {0}")]
    Initialization(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("FCM indicated the registration token is malformed")]
    InvalidToken,
    #[error("FCM indicated the token is not registered")]
    Unregistered,
    #[error("Invalid request: {0}")]
    InvalidArgument(String),
    #[error("FCM quota exceeded")]
    QuotaExceeded,
    #[error("FCM temporarily unavailable")]
    Unavailable,
    #[error("FCM internal error: {0}")]
    Internal(String),
    #[error("Unknown FCM error: {0}")]
    Unknown(String),
}

impl FcmError {
    /// Provider-style failure classification surfaced in dispatch reports.
    pub fn error_code(&self) -> &'static str {
        match self {
            FcmError::Initialization(_) => "messaging/initialization-error",
            FcmError::Unauthorized(_) => "messaging/authentication-error",
            FcmError::InvalidToken => "messaging/invalid-registration-token",
            FcmError::Unregistered => "messaging/registration-token-not-registered",
            FcmError::InvalidArgument(_) => "messaging/invalid-argument",
            FcmError::QuotaExceeded => "messaging/quota-exceeded",
            FcmError::Unavailable => "messaging/unavailable",
            FcmError::Internal(_) => "messaging/internal-error",
            FcmError::Unknown(_) => "unknown_error",
        }
    }
}

// Define the trait for sending FCM messages
#[async_trait]
pub trait FcmSend: Send + Sync {
    async fn send_single(
        &self,
        token: &str,
        payload: FcmPayload,
    ) -> std::result::Result<(), FcmError>;
}

/// Firebase service-account key, parsed from the credentials JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    pub token_uri: String,
}

/// Refresh the OAuth token while it is still valid for at least this long.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct TokenCache {
    access_token: String,
    expires_at: i64,
}

impl TokenCache {
    /// Cached access token, provided it stays valid past the refresh margin
    /// at `now` (unix seconds).
    fn fresh_token(cache: &Option<TokenCache>, now: i64) -> Option<String> {
        cache
            .as_ref()
            .filter(|c| c.expires_at > now + TOKEN_REFRESH_MARGIN_SECS)
            .map(|c| c.access_token.clone())
    }
}

#[derive(Debug, Serialize)]
struct JwtClaims {
    iss: String,
    sub: String,
    scope: String,
    aud: String,
    exp: i64,
    iat: i64,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct FcmErrorBody {
    error: Option<FcmErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct FcmErrorDetail {
    status: Option<String>,
    message: Option<String>,
}

/// Real FCM HTTP v1 client. Exchanges the service-account key for a cached
/// OAuth2 bearer token and posts one message per registration token.
struct HttpV1Client {
    project_id: String,
    credentials: Arc<ServiceAccountKey>,
    token_cache: Arc<Mutex<Option<TokenCache>>>,
    http_client: reqwest::Client,
}

impl HttpV1Client {
    fn new(project_id: String, credentials: ServiceAccountKey) -> Self {
        Self {
            project_id,
            credentials: Arc::new(credentials),
            token_cache: Arc::new(Mutex::new(None)),
            http_client: reqwest::Client::new(),
        }
    }

    async fn get_access_token(&self) -> Result<String, FcmError> {
        {
            let cache = self.token_cache.lock().expect("Token cache lock poisoned");
            if let Some(token) = TokenCache::fresh_token(&*cache, Utc::now().timestamp()) {
                return Ok(token);
            }
        }

        let now = Utc::now();
        let claims = JwtClaims {
            iss: self.credentials.client_email.clone(),
            sub: self.credentials.client_email.clone(),
            scope: "https://www.googleapis.com/auth/firebase.messaging".to_string(),
            aud: self.credentials.token_uri.clone(),
            exp: (now + ChronoDuration::hours(1)).timestamp(),
            iat: now.timestamp(),
        };

        let encoding_key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map_err(|e| FcmError::Unauthorized(format!("Failed to parse private key: {}", e)))?;
        let assertion =
            encode(&Header::new(jsonwebtoken::Algorithm::RS256), &claims, &encoding_key)
                .map_err(|e| FcmError::Unauthorized(format!("Failed to encode JWT: {}", e)))?;

        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ];
        let response = self
            .http_client
            .post(&self.credentials.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| FcmError::Internal(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FcmError::Unauthorized(format!(
                "Token request failed with status {}",
                response.status()
            )));
        }

        let token_response: GoogleTokenResponse = response
            .json()
            .await
            .map_err(|e| FcmError::Internal(format!("Failed to parse token response: {}", e)))?;

        let expires_at = Utc::now().timestamp() + token_response.expires_in;
        {
            let mut cache = self.token_cache.lock().expect("Token cache lock poisoned");
            *cache = Some(TokenCache {
                access_token: token_response.access_token.clone(),
                expires_at,
            });
        }

        Ok(token_response.access_token)
    }

    fn classify_error(status: reqwest::StatusCode, body: &str) -> FcmError {
        let detail: Option<FcmErrorDetail> = serde_json::from_str::<FcmErrorBody>(body)
            .ok()
            .and_then(|b| b.error);
        let api_status = detail
            .as_ref()
            .and_then(|d| d.status.as_deref())
            .unwrap_or("");
        let message = detail
            .as_ref()
            .and_then(|d| d.message.clone())
            .unwrap_or_else(|| body.chars().take(200).collect());

        match (status.as_u16(), api_status) {
            (_, "UNREGISTERED") | (404, _) => FcmError::Unregistered,
            (_, "INVALID_ARGUMENT") | (400, _) => {
                if message.to_lowercase().contains("token") {
                    FcmError::InvalidToken
                } else {
                    FcmError::InvalidArgument(message)
                }
            }
            (_, "QUOTA_EXCEEDED") | (429, _) => FcmError::QuotaExceeded,
            (401, _) | (403, _) => FcmError::Unauthorized(message),
            (_, "UNAVAILABLE") | (503, _) => FcmError::Unavailable,
            (500..=599, _) => FcmError::Internal(message),
            _ => FcmError::Unknown(message),
        }
    }
}

#[async_trait]
impl FcmSend for HttpV1Client {
    async fn send_single(
        &self,
        token: &str,
        payload: FcmPayload,
    ) -> std::result::Result<(), FcmError> {
        let access_token = self.get_access_token().await?;

        let mut message = serde_json::to_value(&payload)
            .map_err(|e| FcmError::Internal(format!("Failed to serialize payload: {}", e)))?;
        message["token"] = json!(token);

        let url = format!(
            "https://fcm.googleapis.com/v1/projects/{}/messages:send",
            self.project_id
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(access_token)
            .json(&json!({ "message": message }))
            .send()
            .await
            .map_err(|e| FcmError::Internal(format!("FCM send request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(
                token_prefix = token_prefix(token),
                "FCM send successful"
            );
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let error = Self::classify_error(status, &body);
        tracing::warn!(
            token_prefix = token_prefix(token),
            code = error.error_code(),
            "FCM send failed"
        );
        Err(error)
    }
}

/// Short, log-safe token prefix.
fn token_prefix(token: &str) -> &str {
    let end = token
        .char_indices()
        .nth(8)
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    &token[..end]
}

// The public FcmClient holds a trait object so tests can substitute a mock
pub struct FcmClient {
    client: Box<dyn FcmSend>,
}

impl FcmClient {
    /// Builds the real HTTP v1 client from settings. The service-account key
    /// is read from `fcm.credentials_path`, falling back to the
    /// GOOGLE_APPLICATION_CREDENTIALS environment variable.
    pub fn new(settings: &FcmSettings) -> Result<Self, FcmError> {
        let credentials_path = settings
            .credentials_path
            .clone()
            .or_else(|| std::env::var("GOOGLE_APPLICATION_CREDENTIALS").ok())
            .ok_or_else(|| {
                FcmError::Initialization(
                    "No FCM credentials configured (set fcm.credentials_path or \
                     GOOGLE_APPLICATION_CREDENTIALS)"
                        .to_string(),
                )
            })?;

        let raw = std::fs::read_to_string(&credentials_path).map_err(|e| {
            FcmError::Initialization(format!(
                "Failed to read credentials file {}: {}",
                credentials_path, e
            ))
        })?;
        let key: ServiceAccountKey = serde_json::from_str(&raw).map_err(|e| {
            FcmError::Initialization(format!("Failed to parse credentials file: {}", e))
        })?;

        let project_id = if settings.project_id.is_empty() {
            key.project_id.clone().ok_or_else(|| {
                FcmError::Initialization(
                    "fcm.project_id is empty and the credentials file has no project_id"
                        .to_string(),
                )
            })?
        } else {
            settings.project_id.clone()
        };

        tracing::info!(%project_id, "Initialized FCM HTTP v1 client");
        Ok(FcmClient {
            client: Box::new(HttpV1Client::new(project_id, key)),
        })
    }

    // Constructor for injecting a mock/custom implementation (for testing)
    pub fn new_with_impl(client_impl: Box<dyn FcmSend>) -> Self {
        FcmClient {
            client: client_impl,
        }
    }

    /// Sends a notification payload to a single FCM token.
    pub async fn send_single(
        &self,
        token: &str,
        payload: FcmPayload,
    ) -> std::result::Result<(), FcmError> {
        self.client.send_single(token, payload).await
    }
}

// Mock FCM sender, public (outside cfg(test)) so integration tests can use it
#[derive(Clone, Default)]
pub struct MockFcmSender {
    sent_messages: Arc<Mutex<Vec<(String, FcmPayload)>>>,
    error_tokens: Arc<Mutex<HashMap<String, FcmError>>>,
    send_delay: Arc<Mutex<Option<Duration>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockFcmSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve sent messages for assertions
    pub fn get_sent_messages(&self) -> Vec<(String, FcmPayload)> {
        self.sent_messages.lock().unwrap().clone()
    }

    /// Simulate an error for a specific token
    pub fn set_error_for_token(&self, token: &str, error: FcmError) {
        self.error_tokens
            .lock()
            .unwrap()
            .insert(token.to_string(), error);
    }

    /// Hold every send open for `delay`, so concurrency tests can observe
    /// overlapping sends.
    pub fn set_send_delay(&self, delay: Duration) {
        *self.send_delay.lock().unwrap() = Some(delay);
    }

    /// Highest number of sends that were ever unresolved at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.sent_messages.lock().unwrap().clear();
        self.error_tokens.lock().unwrap().clear();
        self.in_flight.store(0, Ordering::SeqCst);
        self.max_in_flight.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl FcmSend for MockFcmSender {
    async fn send_single(
        &self,
        token: &str,
        payload: FcmPayload,
    ) -> std::result::Result<(), FcmError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = *self.send_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = {
            let errors = self.error_tokens.lock().unwrap();
            match errors.get(token) {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        };

        if result.is_ok() {
            self.sent_messages
                .lock()
                .unwrap()
                .push((token.to_string(), payload));
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
