//! Tunebot — resilient Twitch chat integration core.
//!
//! Obtains a bot credential through the OAuth Device Authorization Grant,
//! holds a long-lived EventSub WebSocket session for chat messages,
//! dispatches matching messages to registered commands, and replies
//! through the Helix REST API — tolerating token expiry, network failures,
//! and user-triggered reconnects.
//!
//! The crate is UI-free. The surrounding app supplies two collaborators:
//! a [`commands::NowPlayingProvider`] for track strings and a
//! [`credentials::CredentialStore`] for secrets, then drives everything
//! through [`controller::IntegrationController`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tunebot::prelude::*;
//!
//! # struct Player;
//! # impl NowPlayingProvider for Player {
//! #     fn current_track(&self) -> String { String::new() }
//! #     fn last_track(&self) -> String { String::new() }
//! # }
//! # async fn example() -> Result<(), tunebot::controller::ControllerError> {
//! let provider: Arc<dyn NowPlayingProvider> = Arc::new(Player);
//! let mut dispatcher = CommandDispatcher::new();
//! dispatcher.register(song_command(provider.clone()));
//! dispatcher.register(last_song_command(provider));
//!
//! let controller = IntegrationController::new(
//!     ClientConfig::from_env(),
//!     Arc::new(FileCredentialStore::new_default()),
//!     Arc::new(dispatcher),
//! );
//! controller.start_authorization().await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod commands;
pub mod config;
pub mod controller;
pub mod credentials;
pub mod prelude;
pub mod session;
