//! Event-stream chat session.
//!
//! One [`ChatSession`] covers one "joined channel" lifetime: the WebSocket
//! connection, the welcome handshake, the chat-message subscription, and
//! the notification read loop. The session never reconnects on its own;
//! retry policy belongs to the controller that owns it.

pub mod frame;

pub use frame::{Badge, ChatMessage, StreamFrame};

use std::sync::Arc;

use futures::StreamExt;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, ChatApi};
use crate::commands::CommandDispatcher;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Errors raised while opening a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Subscription failed: {0}")]
    Subscription(#[source] ApiError),
}

/// Observable lifecycle of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Subscribing,
    Active,
    Closed,
    Failed(String),
}

/// What the session needs to connect and subscribe.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ws_url: String,
    pub broadcaster_id: String,
    pub bot_id: String,
}

/// A live chat session.
///
/// Created through [`ChatSession::open`], which returns only once the
/// subscription is registered and the session is `Active`. Dropping the
/// session aborts the read loop; call [`ChatSession::close`] for a
/// graceful shutdown.
pub struct ChatSession {
    session_id: String,
    state_rx: watch::Receiver<SessionState>,
    cancel: CancellationToken,
    read_task: Mutex<Option<JoinHandle<()>>>,
}

impl ChatSession {
    /// Open the stream, complete the welcome handshake, and register the
    /// chat-message subscription.
    pub async fn open(
        config: SessionConfig,
        api: Arc<dyn ChatApi>,
        dispatcher: Arc<CommandDispatcher>,
    ) -> Result<Self, SessionError> {
        let (state_tx, state_rx) = watch::channel(SessionState::Connecting);

        let (mut ws, _) = connect_async(&config.ws_url)
            .await
            .map_err(|err| SessionError::Network(format!("connect failed: {err}")))?;

        let session_id = wait_for_welcome(&mut ws).await?;
        tracing::debug!(session_id, "event stream welcome received");
        state_tx.send_replace(SessionState::Subscribing);

        if let Err(err) = api
            .create_chat_subscription(&session_id, &config.broadcaster_id, &config.bot_id)
            .await
        {
            state_tx.send_replace(SessionState::Failed(format!("subscription failed: {err}")));
            let _ = ws.close(None).await;
            return Err(SessionError::Subscription(err));
        }

        state_tx.send_replace(SessionState::Active);
        tracing::info!(
            broadcaster_id = %config.broadcaster_id,
            "chat session active"
        );

        let cancel = CancellationToken::new();
        let read_task = tokio::spawn(read_loop(
            ws,
            config,
            api,
            dispatcher,
            state_tx,
            cancel.clone(),
        ));

        Ok(Self {
            session_id,
            state_rx,
            cancel,
            read_task: Mutex::new(Some(read_task)),
        })
    }

    /// The stream session id from the welcome handshake.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Watch the session lifecycle.
    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    pub fn current_state(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    /// Whether the session still holds the stream (not closed or failed).
    pub fn is_live(&self) -> bool {
        matches!(
            self.current_state(),
            SessionState::Connecting | SessionState::Subscribing | SessionState::Active
        )
    }

    /// Gracefully close the stream and wait for the read loop to stop.
    /// Idempotent; closing twice is a no-op.
    pub async fn close(&self) {
        self.cancel.cancel();
        if let Some(task) = self.read_task.lock().await.take() {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "session read loop did not stop cleanly");
            }
        }
    }
}

/// Read frames until the welcome arrives; anything else before it is
/// dropped.
async fn wait_for_welcome(ws: &mut WsStream) -> Result<String, SessionError> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => match frame::decode_frame(&text) {
                Some(StreamFrame::Welcome { session_id }) => return Ok(session_id),
                Some(_) => {}
                None => tracing::debug!("dropping malformed frame during handshake"),
            },
            Some(Ok(Message::Close(_))) | None => {
                return Err(SessionError::Network(
                    "stream closed before welcome".to_string(),
                ));
            }
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                return Err(SessionError::Network(format!("stream read error: {err}")));
            }
        }
    }
}

async fn read_loop(
    mut ws: WsStream,
    config: SessionConfig,
    api: Arc<dyn ChatApi>,
    dispatcher: Arc<CommandDispatcher>,
    state_tx: watch::Sender<SessionState>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = ws.close(None).await;
                state_tx.send_replace(SessionState::Closed);
                tracing::info!("chat session closed");
                break;
            }
            inbound = ws.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    handle_text_frame(&text, &config, api.as_ref(), &dispatcher).await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    state_tx.send_replace(SessionState::Failed(
                        "stream closed by server".to_string(),
                    ));
                    break;
                }
                Some(Ok(_)) => {} // ping/pong/binary
                Some(Err(err)) => {
                    state_tx.send_replace(SessionState::Failed(format!(
                        "stream read error: {err}"
                    )));
                    break;
                }
            }
        }
    }
}

async fn handle_text_frame(
    text: &str,
    config: &SessionConfig,
    api: &dyn ChatApi,
    dispatcher: &CommandDispatcher,
) {
    match frame::decode_frame(text) {
        Some(StreamFrame::Notification(message)) => {
            let Some(response) = dispatcher.dispatch(&message.text) else {
                return;
            };
            // Reply failures are soft: log and keep the session running.
            if let Err(err) = api
                .send_chat_message(
                    &message.channel_id,
                    &config.bot_id,
                    &response,
                    Some(&message.message_id),
                )
                .await
            {
                tracing::warn!(error = %err, message_id = %message.message_id,
                    "failed to send chat reply");
            }
        }
        Some(StreamFrame::Keepalive) => {}
        Some(StreamFrame::Welcome { session_id }) => {
            tracing::debug!(session_id, "ignoring welcome after handshake");
        }
        None => tracing::debug!("dropping malformed stream frame"),
    }
}
