use thiserror::Error;

/// Errors raised by the device authorization flow.
///
/// `authorization_pending` and `slow_down` server responses are flow
/// control, not errors, and never surface here.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Access denied by the user")]
    AccessDenied,
    #[error("Device code expired or grant invalid")]
    ExpiredToken,
    #[error("Client ID rejected by the authorization server")]
    InvalidClient,
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Authorization failed: {0}")]
    Unknown(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}
