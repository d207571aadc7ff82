use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::ClientConfig;

use super::error::ApiError;
use super::{ChatApi, Identity};

/// Helix REST client bound to one `(token, client_id)` pair.
///
/// Stateless beyond the credentials it was built with; the controller
/// constructs one per connection attempt.
pub struct HelixClient {
    http: reqwest::Client,
    token: String,
    client_id: String,
    helix_url: String,
    validate_url: String,
}

impl HelixClient {
    pub fn new(token: impl Into<String>, client_id: impl Into<String>) -> Self {
        let defaults = ClientConfig::default();
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            client_id: client_id.into(),
            helix_url: defaults.helix_url,
            validate_url: defaults.validate_url,
        }
    }

    pub fn from_config(
        token: impl Into<String>,
        client_id: impl Into<String>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            client_id: client_id.into(),
            helix_url: config.helix_url.clone(),
            validate_url: config.validate_url.clone(),
        }
    }

    pub fn with_helix_url(mut self, url: impl Into<String>) -> Self {
        self.helix_url = url.into();
        self
    }

    pub fn with_validate_url(mut self, url: impl Into<String>) -> Self {
        self.validate_url = url.into();
        self
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    async fn fetch_users(&self, login: Option<&str>) -> Result<Vec<UserEntry>, ApiError> {
        let mut request = self
            .http
            .get(format!("{}/users", self.helix_url))
            .header("Authorization", self.bearer())
            .header("Client-Id", &self.client_id);
        if let Some(login) = login {
            request = request.query(&[("login", login)]);
        }
        let resp = request.send().await?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::AuthenticationFailed);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::api(status.as_u16(), body));
        }
        let payload: DataEnvelope<UserEntry> = resp
            .json()
            .await
            .map_err(|err| ApiError::InvalidResponse(format!("users body: {err}")))?;
        Ok(payload.data)
    }
}

#[async_trait]
impl ChatApi for HelixClient {
    async fn resolve_user_id(&self, login: &str) -> Result<String, ApiError> {
        let users = self.fetch_users(Some(login)).await?;
        users
            .into_iter()
            .next()
            .map(|user| user.id)
            .ok_or_else(|| ApiError::InvalidResponse(format!("no user named {login}")))
    }

    async fn fetch_authenticated_identity(&self) -> Result<Identity, ApiError> {
        let users = self.fetch_users(None).await?;
        users
            .into_iter()
            .next()
            .map(|user| Identity {
                user_id: user.id,
                login: user.login,
                display_name: user.display_name,
            })
            .ok_or_else(|| ApiError::InvalidResponse("empty users response".to_string()))
    }

    async fn validate_token(&self, required_scopes: &[String]) -> bool {
        // The validate endpoint uses the legacy `OAuth` scheme, not
        // `Bearer`. Twitch rejects the request otherwise.
        let resp = self
            .http
            .get(&self.validate_url)
            .header("Authorization", format!("OAuth {}", self.token))
            .send()
            .await;
        let resp = match resp {
            Ok(resp) => resp,
            Err(err) => {
                tracing::warn!(error = %err, "token validation request failed");
                return false;
            }
        };
        if !resp.status().is_success() {
            return false;
        }
        let payload: ValidateResponse = match resp.json().await {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(error = %err, "token validation body unreadable");
                return false;
            }
        };
        let granted = payload.scopes.unwrap_or_default();
        required_scopes
            .iter()
            .all(|required| granted.iter().any(|scope| scope == required))
    }

    async fn send_chat_message(
        &self,
        broadcaster_id: &str,
        sender_id: &str,
        text: &str,
        reply_to_message_id: Option<&str>,
    ) -> Result<bool, ApiError> {
        let mut body = json!({
            "broadcaster_id": broadcaster_id,
            "sender_id": sender_id,
            "message": text,
        });
        if let Some(parent) = reply_to_message_id {
            body["reply_parent_message_id"] = json!(parent);
        }
        let resp = self
            .http
            .post(format!("{}/chat/messages", self.helix_url))
            .header("Authorization", self.bearer())
            .header("Client-Id", &self.client_id)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::AuthenticationFailed);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::api(status.as_u16(), body));
        }
        let payload: DataEnvelope<SendMessageEntry> = resp
            .json()
            .await
            .map_err(|err| ApiError::InvalidResponse(format!("send body: {err}")))?;
        let sent = payload
            .data
            .first()
            .map(|entry| entry.is_sent)
            .unwrap_or(false);
        if !sent {
            // Soft failure: the platform accepted the request but dropped
            // the message (e.g. automod). The session keeps running.
            tracing::warn!(broadcaster_id, "chat message was not delivered");
        }
        Ok(sent)
    }

    async fn create_chat_subscription(
        &self,
        session_id: &str,
        broadcaster_id: &str,
        bot_id: &str,
    ) -> Result<(), ApiError> {
        let body = SubscriptionRequest {
            kind: "channel.chat.message".to_string(),
            version: "1".to_string(),
            condition: SubscriptionCondition {
                broadcaster_user_id: broadcaster_id.to_string(),
                user_id: bot_id.to_string(),
            },
            transport: SubscriptionTransport {
                method: "websocket".to_string(),
                session_id: session_id.to_string(),
            },
        };
        let resp = self
            .http
            .post(format!("{}/eventsub/subscriptions", self.helix_url))
            .header("Authorization", self.bearer())
            .header("Client-Id", &self.client_id)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::AuthenticationFailed);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::api(status.as_u16(), body));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct UserEntry {
    id: String,
    login: String,
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct ValidateResponse {
    #[serde(default)]
    scopes: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct SendMessageEntry {
    is_sent: bool,
}

#[derive(Debug, Serialize)]
struct SubscriptionRequest {
    #[serde(rename = "type")]
    kind: String,
    version: String,
    condition: SubscriptionCondition,
    transport: SubscriptionTransport,
}

#[derive(Debug, Serialize)]
struct SubscriptionCondition {
    broadcaster_user_id: String,
    user_id: String,
}

#[derive(Debug, Serialize)]
struct SubscriptionTransport {
    method: String,
    session_id: String,
}
