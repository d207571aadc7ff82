use serde::Deserialize;

/// Device-code session details returned by the device endpoint.
///
/// Lives only for the duration of one authorization attempt; never
/// persisted.
///
/// # Example
/// ```
/// use tunebot::auth::DeviceCodeSession;
///
/// let session = DeviceCodeSession {
///     device_code: "device-auth-id".to_string(),
///     user_code: "ABCD-EFGH".to_string(),
///     verification_uri: "https://www.twitch.tv/activate".to_string(),
///     verification_uri_complete: None,
///     expires_in: 1800,
///     interval: 5,
/// };
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCodeSession {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub verification_uri_complete: Option<String>,
    pub expires_in: u64,
    pub interval: u64,
}

/// Outcome of a single token-endpoint poll.
#[derive(Debug, Clone)]
pub enum DeviceCodePoll {
    /// Authorization still pending; poll again after `interval_secs`.
    Pending { interval_secs: u64 },
    /// Server asked to back off; poll again after the increased interval.
    SlowDown { interval_secs: u64 },
    /// User authorized; the grant produced an access token.
    Authorized { access_token: String },
}
