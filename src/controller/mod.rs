//! Integration façade.
//!
//! [`IntegrationController`] is the single entry point the surrounding app
//! talks to: it drives authorization, owns the active chat session, and is
//! the one place that translates component errors into observable states
//! and human-readable status messages. Collaborators are injected at
//! construction; the controller holds no globals.

pub mod state;

pub use state::{AuthState, ConnectionState};

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex};
use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, ChatApi, HelixClient};
use crate::auth::{AuthError, DeviceAuthClient};
use crate::commands::CommandDispatcher;
use crate::config::{ClientConfig, ConfigError};
use crate::credentials::{CredentialError, CredentialStore};
use crate::session::{ChatSession, SessionConfig, SessionError, SessionState};

/// Channel logins are at most 25 characters on the platform.
const MAX_CHANNEL_NAME_LEN: usize = 25;

/// Builds a [`ChatApi`] bound to `(token, client_id)`.
pub type ApiFactory = Arc<dyn Fn(&str, &str) -> Arc<dyn ChatApi> + Send + Sync>;

/// Errors surfaced by controller operations.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Invalid channel name: {0:?}")]
    InvalidChannel(String),
    #[error("Already connected; disconnect before joining another channel")]
    AlreadyConnected,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// Orchestrates authorization and the single active chat session.
pub struct IntegrationController {
    config: ClientConfig,
    store: Arc<dyn CredentialStore>,
    dispatcher: Arc<CommandDispatcher>,
    api_factory: ApiFactory,
    conn_tx: watch::Sender<ConnectionState>,
    auth_tx: watch::Sender<AuthState>,
    status_tx: mpsc::UnboundedSender<String>,
    status_rx: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
    // Serializes authorization attempts; holding it means one is running.
    auth_gate: Mutex<()>,
    auth_cancel: Mutex<CancellationToken>,
    session: Mutex<Option<ChatSession>>,
}

impl IntegrationController {
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn CredentialStore>,
        dispatcher: Arc<CommandDispatcher>,
    ) -> Self {
        let endpoints = config.clone();
        let factory: ApiFactory = Arc::new(move |token, client_id| {
            Arc::new(HelixClient::from_config(token, client_id, &endpoints))
        });
        Self::with_api_factory(config, store, dispatcher, factory)
    }

    /// Construct with a custom API factory (tests inject mocks here).
    pub fn with_api_factory(
        config: ClientConfig,
        store: Arc<dyn CredentialStore>,
        dispatcher: Arc<CommandDispatcher>,
        api_factory: ApiFactory,
    ) -> Self {
        let (conn_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (auth_tx, _) = watch::channel(AuthState::Idle);
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        Self {
            config,
            store,
            dispatcher,
            api_factory,
            conn_tx,
            auth_tx,
            status_tx,
            status_rx: Mutex::new(Some(status_rx)),
            auth_gate: Mutex::new(()),
            auth_cancel: Mutex::new(CancellationToken::new()),
            session: Mutex::new(None),
        }
    }

    /// Observe connection-state transitions.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.conn_tx.subscribe()
    }

    /// Observe authorization-state transitions.
    pub fn auth_state(&self) -> watch::Receiver<AuthState> {
        self.auth_tx.subscribe()
    }

    /// Take the status-message stream. Yields `None` after the first call.
    pub async fn take_status_messages(&self) -> Option<mpsc::UnboundedReceiver<String>> {
        self.status_rx.lock().await.take()
    }

    /// Run the device authorization flow end to end: request a code, poll
    /// until the user approves, persist the token, then resolve and persist
    /// the bot identity.
    ///
    /// Any in-flight attempt is cancelled and awaited first; cancellation
    /// of this attempt lands back on `AuthState::Idle` without an error.
    pub async fn start_authorization(&self) -> Result<(), ControllerError> {
        let client_id = self.config.resolve_client_id()?;

        let cancel = CancellationToken::new();
        {
            let mut slot = self.auth_cancel.lock().await;
            slot.cancel();
            *slot = cancel.clone();
        }
        let _gate = self.auth_gate.lock().await;
        if cancel.is_cancelled() {
            // Superseded while waiting for the previous attempt to stop.
            return Ok(());
        }

        match self.run_authorization(&client_id, &cancel).await {
            Ok(()) => Ok(()),
            Err(err) => {
                let reason = err.to_string();
                self.auth_tx.send_replace(AuthState::Error(reason.clone()));
                self.emit_status(format!("Authorization failed: {reason}"));
                Err(err)
            }
        }
    }

    async fn run_authorization(
        &self,
        client_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ControllerError> {
        self.auth_tx.send_replace(AuthState::RequestingCode);
        self.emit_status("Requesting device code…");

        let auth = DeviceAuthClient::from_config(client_id, &self.config);
        let session = auth.request_device_code(&self.config.scopes).await?;

        self.auth_tx.send_replace(AuthState::WaitingForAuth {
            user_code: session.user_code.clone(),
            verification_uri: session.verification_uri.clone(),
        });
        self.emit_status(format!(
            "Visit {} and enter code {}",
            session.verification_uri, session.user_code
        ));

        let status_tx = self.status_tx.clone();
        let token = auth
            .poll_for_token(&session, cancel, |status| {
                let _ = status_tx.send(status.to_string());
            })
            .await?;
        let Some(token) = token else {
            // Cancelled mid-poll: treated as a no-op, never an error.
            self.auth_tx.send_replace(AuthState::Idle);
            return Ok(());
        };

        let mut credential = self.store.load()?.unwrap_or_default();
        credential.oauth_token = token.clone();
        self.store.save(&credential)?;

        self.auth_tx.send_replace(AuthState::ResolvingIdentity);
        self.emit_status("Resolving bot identity…");
        let api = (self.api_factory)(&token, client_id);
        let identity = tokio::select! {
            _ = cancel.cancelled() => {
                self.auth_tx.send_replace(AuthState::Idle);
                return Ok(());
            }
            identity = api.fetch_authenticated_identity() => identity?,
        };
        credential.bot_user_id = identity.user_id;
        credential.bot_display_name = identity.display_name.clone();
        self.store.save(&credential)?;

        self.auth_tx.send_replace(AuthState::Idle);
        self.emit_status(format!("Signed in as {}", identity.display_name));
        Ok(())
    }

    /// Cancel any in-flight authorization and wait for it to stop.
    ///
    /// A no-op when nothing is running. Does not touch an established chat
    /// session.
    pub async fn cancel_authorization(&self) {
        self.auth_cancel.lock().await.cancel();
        let _gate = self.auth_gate.lock().await;
        self.auth_tx.send_replace(AuthState::Idle);
    }

    /// Join a channel: resolve identities, open the event stream, and
    /// register the chat subscription.
    ///
    /// Fails with [`ControllerError::AlreadyConnected`] while a session is
    /// live; the existing session is left untouched.
    pub async fn connect_to_channel(
        &self,
        channel_login: &str,
        token: &str,
    ) -> Result<(), ControllerError> {
        let channel = channel_login.trim().to_lowercase();
        if channel.is_empty() || channel.len() > MAX_CHANNEL_NAME_LEN {
            return Err(ControllerError::InvalidChannel(channel));
        }
        let client_id = self.config.resolve_client_id()?;

        let mut session_slot = self.session.lock().await;
        if session_slot.as_ref().is_some_and(ChatSession::is_live) {
            return Err(ControllerError::AlreadyConnected);
        }

        self.conn_tx.send_replace(ConnectionState::Connecting);
        self.emit_status(format!("Connecting to #{channel}…"));

        let api = (self.api_factory)(token, &client_id);
        match self.open_session(&channel, api).await {
            Ok(session) => {
                self.watch_session(&session);
                *session_slot = Some(session);
                self.conn_tx.send_replace(ConnectionState::Connected);
                self.emit_status(format!("Connected to #{channel}"));
                Ok(())
            }
            Err(err) => {
                let reason = err.to_string();
                self.conn_tx
                    .send_replace(ConnectionState::Error(reason.clone()));
                self.emit_status(format!("Connection failed: {reason}"));
                Err(err)
            }
        }
    }

    async fn open_session(
        &self,
        channel: &str,
        api: Arc<dyn ChatApi>,
    ) -> Result<ChatSession, ControllerError> {
        let mut credential = self.store.load()?.unwrap_or_default();

        // Reuse the cached bot identity; resolve and persist it only once.
        if credential.bot_user_id.is_empty() {
            let identity = api.fetch_authenticated_identity().await?;
            credential.bot_user_id = identity.user_id;
            credential.bot_display_name = identity.display_name;
            self.store.save(&credential)?;
        }
        let bot_id = credential.bot_user_id.clone();

        let broadcaster_id = api.resolve_user_id(channel).await?;
        credential.channel_id = broadcaster_id.clone();
        self.store.save(&credential)?;

        let session_config = SessionConfig {
            ws_url: self.config.eventsub_ws_url.clone(),
            broadcaster_id,
            bot_id,
        };
        ChatSession::open(session_config, api, self.dispatcher.clone())
            .await
            .map_err(Into::into)
    }

    /// Mirror session failures into the connection state. The session never
    /// retries by itself; observers decide what to do with the error.
    fn watch_session(&self, session: &ChatSession) {
        let mut state_rx = session.state();
        let conn_tx = self.conn_tx.clone();
        let status_tx = self.status_tx.clone();
        tokio::spawn(async move {
            while state_rx.changed().await.is_ok() {
                let state = state_rx.borrow_and_update().clone();
                if let SessionState::Failed(reason) = state {
                    let _ = status_tx.send(format!("Chat session lost: {reason}"));
                    conn_tx.send_replace(ConnectionState::Error(reason));
                    break;
                }
            }
        });
    }

    /// Close the active session, if any, and report `Disconnected`.
    /// Safe to call when already disconnected.
    pub async fn disconnect(&self) {
        let session = self.session.lock().await.take();
        if let Some(session) = session {
            session.close().await;
        }
        self.conn_tx.send_replace(ConnectionState::Disconnected);
        self.emit_status("Disconnected");
    }

    /// Validate the stored token against the required scopes.
    ///
    /// Used at startup to decide whether to surface a re-authentication
    /// prompt. A missing credential is simply `false`.
    pub async fn validate_stored_token(&self) -> Result<bool, ControllerError> {
        let Some(credential) = self.store.load()? else {
            return Ok(false);
        };
        if !credential.signed_in() {
            return Ok(false);
        }
        let client_id = self.config.resolve_client_id()?;
        let api = (self.api_factory)(&credential.oauth_token, &client_id);
        Ok(api.validate_token(&self.config.scopes).await)
    }

    fn emit_status(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(status = %message);
        let _ = self.status_tx.send(message);
    }
}
