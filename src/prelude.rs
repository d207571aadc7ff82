//! Commonly used types, re-exported for one-line imports.

pub use crate::api::{ChatApi, HelixClient, Identity};
pub use crate::auth::{AuthError, DeviceAuthClient, DeviceCodeSession};
pub use crate::commands::{
    last_song_command, song_command, BotCommand, CommandDispatcher, NowPlayingProvider,
};
pub use crate::config::ClientConfig;
pub use crate::controller::{AuthState, ConnectionState, IntegrationController};
pub use crate::credentials::{Credential, CredentialStore, FileCredentialStore};
pub use crate::session::{ChatMessage, ChatSession, SessionState};
