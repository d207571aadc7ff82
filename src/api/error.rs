use thiserror::Error;

/// Errors raised by the platform REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 401 from an authenticated endpoint. Distinct from generic network
    /// failure: the caller should surface a re-authentication prompt.
    #[error("Authentication failed: token rejected by the platform")]
    AuthenticationFailed,
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}
