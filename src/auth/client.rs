use std::time::Duration;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;

use super::device_code::{DeviceCodePoll, DeviceCodeSession};
use super::error::AuthError;

/// How much `slow_down` adds to the poll interval, per RFC 8628.
const SLOW_DOWN_INCREMENT_SECS: u64 = 5;

/// OAuth 2.0 Device Authorization Grant client.
///
/// Obtains a bot access token without a client secret: requests a device
/// code, then polls the token endpoint until the user approves the code in
/// a browser. The server is authoritative for expiry; no client-side timer
/// duplicates `expires_in`.
///
/// # Example
/// ```no_run
/// use tunebot::auth::DeviceAuthClient;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), tunebot::auth::AuthError> {
/// let client = DeviceAuthClient::new("client-id");
/// let session = client
///     .request_device_code(&["user:read:chat".to_string()])
///     .await?;
/// println!("visit {} and enter {}", session.verification_uri, session.user_code);
/// let token = client
///     .poll_for_token(&session, &CancellationToken::new(), |status| {
///         println!("{status}");
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct DeviceAuthClient {
    http: reqwest::Client,
    client_id: String,
    device_code_url: String,
    token_url: String,
}

impl DeviceAuthClient {
    pub fn new(client_id: impl Into<String>) -> Self {
        let defaults = ClientConfig::default();
        Self {
            http: reqwest::Client::new(),
            client_id: client_id.into(),
            device_code_url: defaults.device_code_url,
            token_url: defaults.token_url,
        }
    }

    /// Build a client using the endpoints from `config`.
    pub fn from_config(client_id: impl Into<String>, config: &ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id: client_id.into(),
            device_code_url: config.device_code_url.clone(),
            token_url: config.token_url.clone(),
        }
    }

    pub fn with_device_code_url(mut self, url: impl Into<String>) -> Self {
        self.device_code_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Request a device code for the given scopes.
    pub async fn request_device_code(
        &self,
        scopes: &[String],
    ) -> Result<DeviceCodeSession, AuthError> {
        let scope = scopes.join(" ");
        let resp = self
            .http
            .post(&self.device_code_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("scope", scope.as_str()),
            ])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AuthError::InvalidResponse(format!(
                "Device code request failed with status {}",
                resp.status()
            )));
        }
        resp.json::<DeviceCodeSession>()
            .await
            .map_err(|err| AuthError::InvalidResponse(format!("Device code body: {err}")))
    }

    /// Perform one token-endpoint poll for `session`.
    ///
    /// `interval_secs` is the currently effective interval; it only ever
    /// grows (a `slow_down` response adds five seconds, nothing shrinks it).
    pub async fn poll_once(
        &self,
        session: &DeviceCodeSession,
        interval_secs: u64,
    ) -> Result<DeviceCodePoll, AuthError> {
        let resp = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("device_code", session.device_code.as_str()),
                ("grant_type", "urn:ietf:params:oauth:grant-type:device_code"),
            ])
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;

        if status.is_success() {
            let payload: TokenResponse = serde_json::from_str(&body)
                .map_err(|err| AuthError::InvalidResponse(format!("Token body: {err}")))?;
            return match payload.access_token {
                Some(access_token) => Ok(DeviceCodePoll::Authorized { access_token }),
                None => Err(AuthError::InvalidResponse(
                    "Token response missing access_token".to_string(),
                )),
            };
        }

        let message = serde_json::from_str::<TokenErrorResponse>(&body)
            .ok()
            .and_then(|err| err.message)
            .unwrap_or(body);

        if message.contains("authorization_pending") {
            Ok(DeviceCodePoll::Pending { interval_secs })
        } else if message.contains("slow_down") {
            Ok(DeviceCodePoll::SlowDown {
                interval_secs: interval_secs + SLOW_DOWN_INCREMENT_SECS,
            })
        } else if message.contains("access_denied") {
            Err(AuthError::AccessDenied)
        } else if message.contains("expired_token") || message.contains("invalid_grant") {
            Err(AuthError::ExpiredToken)
        } else if message.contains("invalid_client") {
            Err(AuthError::InvalidClient)
        } else {
            Err(AuthError::Unknown(message))
        }
    }

    /// Poll the token endpoint until the user authorizes, the grant fails,
    /// or `cancel` fires.
    ///
    /// Sleeps the session interval before every attempt. Cancellation is
    /// silent: the caller gets `Ok(None)` and treats the attempt as a no-op.
    pub async fn poll_for_token(
        &self,
        session: &DeviceCodeSession,
        cancel: &CancellationToken,
        mut on_progress: impl FnMut(&str),
    ) -> Result<Option<String>, AuthError> {
        let mut interval_secs = session.interval;
        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            tokio::select! {
                _ = cancel.cancelled() => return Ok(None),
                _ = tokio::time::sleep(Duration::from_secs(interval_secs)) => {}
            }

            match self.poll_once(session, interval_secs).await? {
                DeviceCodePoll::Authorized { access_token } => {
                    return Ok(Some(access_token));
                }
                DeviceCodePoll::Pending { .. } => {
                    on_progress("Waiting for authorization…");
                }
                DeviceCodePoll::SlowDown {
                    interval_secs: increased,
                } => {
                    // The effective interval never decreases within a session.
                    interval_secs = interval_secs.max(increased);
                    tracing::debug!(interval_secs, "token endpoint asked to slow down");
                    on_progress("Waiting for authorization…");
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    message: Option<String>,
}
