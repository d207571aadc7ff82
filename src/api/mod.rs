//! Platform REST API surface.

pub mod error;
pub mod helix;

pub use error::ApiError;
pub use helix::HelixClient;

use async_trait::async_trait;

/// The authenticated user behind a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub login: String,
    pub display_name: String,
}

/// Narrow contract over the chat platform's REST endpoints.
///
/// The controller only talks to this trait, so tests can substitute a
/// recording mock and assert call counts.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Resolve a channel login to its user ID.
    async fn resolve_user_id(&self, login: &str) -> Result<String, ApiError>;

    /// Fetch the identity of the user the token belongs to.
    async fn fetch_authenticated_identity(&self) -> Result<Identity, ApiError>;

    /// Check that the token is valid and carries every required scope.
    ///
    /// Expected failures (bad token, missing scope, non-2xx) are `false`,
    /// never an error.
    async fn validate_token(&self, required_scopes: &[String]) -> bool;

    /// Send a chat message, optionally as a threaded reply.
    ///
    /// Returns `Ok(false)` when the platform accepted the request but did
    /// not deliver the message; that is a soft failure, logged upstream.
    async fn send_chat_message(
        &self,
        broadcaster_id: &str,
        sender_id: &str,
        text: &str,
        reply_to_message_id: Option<&str>,
    ) -> Result<bool, ApiError>;

    /// Subscribe the open event-stream session to chat messages for
    /// `(broadcaster_id, bot_id)`.
    async fn create_chat_subscription(
        &self,
        session_id: &str,
        broadcaster_id: &str,
        bot_id: &str,
    ) -> Result<(), ApiError>;
}
