//! OAuth 2.0 device authorization grant (RFC 8628).
//!
//! The flow is driven by the caller: [`DeviceCodeAuthenticator::begin`] asks the
//! identity provider for a user code, the human signs in on another device, and
//! each [`DeviceCodeAuthenticator::poll`] performs exactly one token request.
//! Sessions are passed by value so a consumed session can't be polled again.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// Default Microsoft identity platform authority (multi-tenant v2 endpoints).
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com/common/oauth2/v2.0";

/// Public client id used for the device-code flow.
pub const DEFAULT_CLIENT_ID: &str = "d3590ed6-52b3-4102-aeff-aad2292ab01c";

/// Scope needed to create To Do tasks.
pub const DEFAULT_SCOPE: &str = "Tasks.ReadWrite offline_access";

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Poll interval when the provider doesn't advertise one (RFC 8628 §3.2).
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Added to the interval on every `slow_down` answer (RFC 8628 §3.5).
const SLOW_DOWN_STEP_SECS: u64 = 5;

/// Lifetime assumed when the provider omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 900;

/// Errors from the device-code flow. All of them end the flow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Failed to start device sign-in: {0}")]
    Init(String),

    #[error(
        "Sign-in was denied ({error}): {}",
        .description.as_deref().unwrap_or("no details from identity provider")
    )]
    Denied {
        error: String,
        description: Option<String>,
    },

    #[error("Sign-in code expired before sign-in was completed")]
    Timeout,

    #[error("Token request failed: {0}")]
    Poll(String),

    #[error("Sign-in was cancelled")]
    Cancelled,
}

/// A pending device-code sign-in.
///
/// # Invariants
/// - `expires_at` is fixed when the session is created
/// - `interval` only grows (on `slow_down`)
#[derive(Debug, Clone)]
pub struct DeviceCodeSession {
    user_code: String,
    device_code: String,
    verification_uri: String,
    message: Option<String>,
    interval: Duration,
    expires_at: DateTime<Utc>,
}

impl DeviceCodeSession {
    /// Code the user types at the verification page.
    pub fn user_code(&self) -> &str {
        &self.user_code
    }

    pub fn verification_uri(&self) -> &str {
        &self.verification_uri
    }

    /// Human-readable instructions, when the provider supplies them.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// How long to wait before the next poll: the advertised interval, capped
    /// by the time left until the code expires.
    pub fn next_poll_delay(&self, now: DateTime<Utc>) -> Duration {
        let remaining = (self.expires_at - now).to_std().unwrap_or(Duration::ZERO);
        self.interval.min(remaining)
    }
}

/// Bearer credential for the task API. Never persisted.
#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Result of a single poll that didn't fail.
#[derive(Debug)]
pub enum PollOutcome {
    /// The user hasn't finished signing in yet; poll again with this session.
    Pending(DeviceCodeSession),
    /// Sign-in completed. The session has been consumed.
    Authorized(AccessToken),
}

/// Device-code client for one identity provider and public client.
#[derive(Debug, Clone)]
pub struct DeviceCodeAuthenticator {
    client: Client,
    authority: String,
    client_id: String,
    scope: String,
}

impl DeviceCodeAuthenticator {
    pub fn new(client: Client, authority: &str, client_id: &str, scope: &str) -> Self {
        Self {
            client,
            authority: authority.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            scope: scope.to_string(),
        }
    }

    /// Request a device code. One request; any failure is [`AuthError::Init`].
    pub async fn begin(&self) -> Result<DeviceCodeSession, AuthError> {
        let url = format!("{}/devicecode", self.authority);

        let response = self
            .client
            .post(&url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Init(format!("device code request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Init(format!("failed to read device code response: {}", e)))?;

        if !status.is_success() {
            tracing::error!("Device code request failed with status {}: {}", status, body);
            return Err(AuthError::Init(format!(
                "identity provider returned {}: {}",
                status, body
            )));
        }

        let parsed: DeviceCodeResponse = serde_json::from_str(&body).map_err(|e| {
            AuthError::Init(format!("failed to parse device code response: {}", e))
        })?;

        let expires_in = parsed.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS).max(0);
        let expires_at = expiry_after(expires_in).ok_or_else(|| {
            AuthError::Init(format!("device code lifetime out of range: {}s", expires_in))
        })?;
        let session = DeviceCodeSession {
            user_code: parsed.user_code,
            device_code: parsed.device_code,
            verification_uri: parsed.verification_uri,
            message: parsed.message,
            interval: Duration::from_secs(parsed.interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS)),
            expires_at,
        };

        tracing::info!(
            verification_uri = %session.verification_uri,
            expires_in,
            interval_secs = session.interval.as_secs(),
            "Device sign-in started"
        );

        Ok(session)
    }

    /// Perform one token request for `session`.
    ///
    /// An expired session fails with [`AuthError::Timeout`] before any request
    /// is sent.
    pub async fn poll(&self, mut session: DeviceCodeSession) -> Result<PollOutcome, AuthError> {
        if session.is_expired(Utc::now()) {
            tracing::warn!("Device code expired before sign-in completed");
            return Err(AuthError::Timeout);
        }

        let url = format!("{}/token", self.authority);
        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", DEVICE_CODE_GRANT),
                ("client_id", self.client_id.as_str()),
                ("device_code", session.device_code.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Poll(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Poll(format!("failed to read token response: {}", e)))?;

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            AuthError::Poll(format!(
                "failed to parse token response (HTTP {}): {}",
                status, e
            ))
        })?;

        if let Some(access_token) = parsed.access_token {
            let expires_at = parsed.expires_in.and_then(expiry_after);
            tracing::info!("Device sign-in completed");
            return Ok(PollOutcome::Authorized(AccessToken::new(
                access_token,
                expires_at,
            )));
        }

        match parsed.error.as_deref() {
            Some("authorization_pending") => {
                tracing::debug!("Sign-in still pending");
                Ok(PollOutcome::Pending(session))
            }
            Some("slow_down") => {
                session.interval = session
                    .interval
                    .saturating_add(Duration::from_secs(SLOW_DOWN_STEP_SECS));
                tracing::debug!(
                    interval_secs = session.interval.as_secs(),
                    "Identity provider asked to slow down"
                );
                Ok(PollOutcome::Pending(session))
            }
            Some(error) => {
                tracing::warn!(error = %error, "Device sign-in denied");
                Err(AuthError::Denied {
                    error: error.to_string(),
                    description: parsed.error_description,
                })
            }
            None => Err(AuthError::Denied {
                error: "invalid_response".to_string(),
                description: Some(format!("HTTP {} without an access token", status)),
            }),
        }
    }

    /// Poll until a token arrives, the code expires, or `cancel` fires.
    ///
    /// Waits the session's interval between attempts, never past its expiry.
    pub async fn wait_for_token(
        &self,
        session: DeviceCodeSession,
        cancel: &CancellationToken,
    ) -> Result<AccessToken, AuthError> {
        let mut session = session;
        let mut attempts: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(AuthError::Cancelled);
            }
            attempts += 1;

            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Err(AuthError::Cancelled),
                outcome = self.poll(session) => outcome?,
            };

            match outcome {
                PollOutcome::Authorized(token) => {
                    tracing::info!(attempts, "Access token obtained");
                    return Ok(token);
                }
                PollOutcome::Pending(pending) => {
                    let delay = pending.next_poll_delay(Utc::now());
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(AuthError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    session = pending;
                }
            }
        }
    }
}

/// `now + secs`, or `None` when the provider's lifetime doesn't fit a timestamp.
fn expiry_after(secs: i64) -> Option<DateTime<Utc>> {
    chrono::Duration::try_seconds(secs).and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
}

/// Device authorization response.
#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    user_code: String,
    device_code: String,
    #[serde(alias = "verification_url")]
    verification_uri: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    interval: Option<u64>,
    #[serde(default)]
    message: Option<String>,
}

/// Token endpoint response (success and error share one shape).
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}
