//! Observable controller states.

/// Lifecycle of the chat connection, as seen by observers.
///
/// `Error` is terminal but recoverable: an explicit retry moves it back
/// through `Connecting`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}

/// Lifecycle of an authorization attempt.
///
/// Owned solely by the controller; starting a new attempt cancels the
/// previous one, so at most one is ever in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Idle,
    RequestingCode,
    WaitingForAuth {
        user_code: String,
        verification_uri: String,
    },
    ResolvingIdentity,
    Error(String),
}
