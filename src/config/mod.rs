//! Client configuration (layered: env var > configured value).

use thiserror::Error;

/// Environment variable that overrides the configured client ID.
pub const CLIENT_ID_ENV: &str = "TWITCH_CLIENT_ID";

/// Scopes required by the current API generation.
///
/// The previous generation used `chat:read`/`chat:edit`; callers targeting it
/// can override [`ClientConfig::scopes`] instead of editing code.
pub const DEFAULT_SCOPES: &[&str] = &["user:read:chat", "user:write:chat"];

const DEFAULT_DEVICE_CODE_URL: &str = "https://id.twitch.tv/oauth2/device";
const DEFAULT_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
const DEFAULT_VALIDATE_URL: &str = "https://id.twitch.tv/oauth2/validate";
const DEFAULT_HELIX_URL: &str = "https://api.twitch.tv/helix";
const DEFAULT_EVENTSUB_WS_URL: &str = "wss://eventsub.wss.twitch.tv/ws";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing client ID: set {CLIENT_ID_ENV} or configure one")]
    MissingClientId,
}

/// Endpoint and credential configuration for the integration.
///
/// Defaults target production Twitch; every endpoint can be overridden so
/// tests can point the client at a mock server.
///
/// # Example
/// ```
/// use tunebot::config::ClientConfig;
///
/// let config = ClientConfig::new(Some("my-client-id".to_string()))
///     .with_helix_url("http://localhost:9999/helix");
/// assert_eq!(config.resolve_client_id().unwrap(), "my-client-id");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub client_id: Option<String>,
    pub scopes: Vec<String>,
    pub device_code_url: String,
    pub token_url: String,
    pub validate_url: String,
    pub helix_url: String,
    pub eventsub_ws_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            device_code_url: DEFAULT_DEVICE_CODE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            validate_url: DEFAULT_VALIDATE_URL.to_string(),
            helix_url: DEFAULT_HELIX_URL.to_string(),
            eventsub_ws_url: DEFAULT_EVENTSUB_WS_URL.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(client_id: Option<String>) -> Self {
        Self {
            client_id,
            ..Self::default()
        }
    }

    /// Load configuration from the environment (reads `.env` if present).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let client_id = std::env::var(CLIENT_ID_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty());
        Self::new(client_id)
    }

    pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_device_code_url(mut self, url: impl Into<String>) -> Self {
        self.device_code_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_validate_url(mut self, url: impl Into<String>) -> Self {
        self.validate_url = url.into();
        self
    }

    pub fn with_helix_url(mut self, url: impl Into<String>) -> Self {
        self.helix_url = url.into();
        self
    }

    pub fn with_eventsub_ws_url(mut self, url: impl Into<String>) -> Self {
        self.eventsub_ws_url = url.into();
        self
    }

    /// Resolve the effective client ID.
    ///
    /// The environment variable wins over the configured value; a missing or
    /// empty value is an error, never a panic.
    pub fn resolve_client_id(&self) -> Result<String, ConfigError> {
        if let Ok(value) = std::env::var(CLIENT_ID_ENV) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Ok(trimmed.to_string());
            }
        }
        self.client_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or(ConfigError::MissingClientId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_client_id_resolves() {
        let config = ClientConfig::new(Some("abc123".to_string()));
        assert_eq!(config.resolve_client_id().unwrap(), "abc123");
    }

    #[test]
    fn missing_client_id_is_an_error() {
        let config = ClientConfig::new(None);
        assert!(matches!(
            config.resolve_client_id(),
            Err(ConfigError::MissingClientId)
        ));
    }

    #[test]
    fn empty_client_id_is_an_error() {
        let config = ClientConfig::new(Some("   ".to_string()));
        assert!(matches!(
            config.resolve_client_id(),
            Err(ConfigError::MissingClientId)
        ));
    }

    #[test]
    fn default_scopes_cover_chat_read_and_write() {
        let config = ClientConfig::default();
        assert!(config.scopes.iter().any(|s| s == "user:read:chat"));
        assert!(config.scopes.iter().any(|s| s == "user:write:chat"));
    }

    #[test]
    fn scopes_are_overridable() {
        let config =
            ClientConfig::new(Some("id".to_string())).with_scopes(["chat:read", "chat:edit"]);
        assert_eq!(config.scopes, vec!["chat:read", "chat:edit"]);
    }
}
