#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use tunebot::api::{ApiError, ChatApi, Identity};
use tunebot::credentials::{Credential, CredentialError, CredentialStore};

// ---------------------------------------------------------------------------
// Credential store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryCredentialStore {
    credential: Mutex<Option<Credential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, credential: Credential) {
        *self.credential.lock().expect("store lock poisoned") = Some(credential);
    }

    pub fn get(&self) -> Option<Credential> {
        self.credential.lock().expect("store lock poisoned").clone()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn load(&self) -> Result<Option<Credential>, CredentialError> {
        Ok(self.get())
    }

    fn save(&self, credential: &Credential) -> Result<(), CredentialError> {
        *self.credential.lock().expect("store lock poisoned") = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        *self.credential.lock().expect("store lock poisoned") = None;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Recording ChatApi mock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub broadcaster_id: String,
    pub sender_id: String,
    pub text: String,
    pub reply_to_message_id: Option<String>,
}

pub struct MockChatApi {
    identity: Identity,
    user_ids: Mutex<HashMap<String, String>>,
    pub identity_calls: AtomicUsize,
    pub resolve_calls: AtomicUsize,
    pub subscribe_calls: AtomicUsize,
    pub validate_calls: AtomicUsize,
    pub resolved_logins: Mutex<Vec<String>>,
    pub sent: Mutex<Vec<SentMessage>>,
    pub validate_result: AtomicBool,
    pub fail_subscription: AtomicBool,
}

impl MockChatApi {
    pub fn new() -> Self {
        Self {
            identity: Identity {
                user_id: "4242".to_string(),
                login: "melodybot".to_string(),
                display_name: "MelodyBot".to_string(),
            },
            user_ids: Mutex::new(HashMap::new()),
            identity_calls: AtomicUsize::new(0),
            resolve_calls: AtomicUsize::new(0),
            subscribe_calls: AtomicUsize::new(0),
            validate_calls: AtomicUsize::new(0),
            resolved_logins: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            validate_result: AtomicBool::new(true),
            fail_subscription: AtomicBool::new(false),
        }
    }

    pub fn with_user(self, login: &str, id: &str) -> Self {
        self.user_ids
            .lock()
            .expect("mock lock poisoned")
            .insert(login.to_string(), id.to_string());
        self
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().expect("mock lock poisoned").clone()
    }
}

#[async_trait]
impl ChatApi for MockChatApi {
    async fn resolve_user_id(&self, login: &str) -> Result<String, ApiError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.resolved_logins
            .lock()
            .expect("mock lock poisoned")
            .push(login.to_string());
        self.user_ids
            .lock()
            .expect("mock lock poisoned")
            .get(login)
            .cloned()
            .ok_or_else(|| ApiError::InvalidResponse(format!("no user named {login}")))
    }

    async fn fetch_authenticated_identity(&self) -> Result<Identity, ApiError> {
        self.identity_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.identity.clone())
    }

    async fn validate_token(&self, _required_scopes: &[String]) -> bool {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        self.validate_result.load(Ordering::SeqCst)
    }

    async fn send_chat_message(
        &self,
        broadcaster_id: &str,
        sender_id: &str,
        text: &str,
        reply_to_message_id: Option<&str>,
    ) -> Result<bool, ApiError> {
        self.sent.lock().expect("mock lock poisoned").push(SentMessage {
            broadcaster_id: broadcaster_id.to_string(),
            sender_id: sender_id.to_string(),
            text: text.to_string(),
            reply_to_message_id: reply_to_message_id.map(str::to_string),
        });
        Ok(true)
    }

    async fn create_chat_subscription(
        &self,
        _session_id: &str,
        _broadcaster_id: &str,
        _bot_id: &str,
    ) -> Result<(), ApiError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_subscription.load(Ordering::SeqCst) {
            return Err(ApiError::api(403, "subscription rejected"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Local event-stream server
// ---------------------------------------------------------------------------

pub enum WsCommand {
    /// Push a text frame to the connected client.
    Send(String),
    /// Drop the current connection without a close handshake.
    Drop,
}

pub struct WsServer {
    pub url: String,
    commands: mpsc::UnboundedSender<WsCommand>,
}

impl WsServer {
    pub fn send_frame(&self, frame: impl Into<String>) {
        self.commands
            .send(WsCommand::Send(frame.into()))
            .expect("ws server gone");
    }

    pub fn drop_connection(&self) {
        self.commands
            .send(WsCommand::Drop)
            .expect("ws server gone");
    }
}

/// Spawn a WebSocket server on a random local port.
///
/// Accepts connections one at a time and replays queued [`WsCommand`]s to
/// whichever client is connected.
pub async fn spawn_ws_server() -> WsServer {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ws server");
    let addr = listener.local_addr().expect("ws server addr");
    let (tx, mut rx) = mpsc::unbounded_channel::<WsCommand>();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let Ok(mut ws) = accept_async(stream).await else {
                continue;
            };
            loop {
                tokio::select! {
                    command = rx.recv() => match command {
                        Some(WsCommand::Send(text)) => {
                            if ws.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                        Some(WsCommand::Drop) => {
                            drop(ws);
                            break;
                        }
                        None => return,
                    },
                    inbound = ws.next() => match inbound {
                        Some(Ok(_)) => {}
                        // Client closed; go back to accepting.
                        _ => break,
                    },
                }
            }
        }
    });

    WsServer {
        url: format!("ws://{addr}"),
        commands: tx,
    }
}

// ---------------------------------------------------------------------------
// Frame builders and helpers
// ---------------------------------------------------------------------------

pub fn welcome_frame(session_id: &str) -> String {
    serde_json::json!({
        "metadata": { "message_type": "session_welcome" },
        "payload": { "session": { "id": session_id, "status": "connected" } }
    })
    .to_string()
}

pub fn keepalive_frame() -> String {
    serde_json::json!({
        "metadata": { "message_type": "session_keepalive" },
        "payload": {}
    })
    .to_string()
}

pub fn notification_frame(message_id: &str, broadcaster_id: &str, text: &str) -> String {
    serde_json::json!({
        "metadata": { "message_type": "notification" },
        "payload": {
            "subscription": { "type": "channel.chat.message" },
            "event": {
                "message_id": message_id,
                "chatter_user_id": "777",
                "chatter_user_name": "listener",
                "broadcaster_user_id": broadcaster_id,
                "message": { "text": text },
                "badges": []
            }
        }
    })
    .to_string()
}

/// Poll `condition` until it holds or five seconds pass.
pub async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met within timeout");
}

/// A provider with fixed track strings.
pub struct FixedProvider;

impl tunebot::commands::NowPlayingProvider for FixedProvider {
    fn current_track(&self) -> String {
        "Now playing: Daft Punk — Around the World".to_string()
    }

    fn last_track(&self) -> String {
        "Last played: Justice — D.A.N.C.E.".to_string()
    }
}

pub fn dispatcher_with_builtins() -> tunebot::commands::CommandDispatcher {
    let provider: Arc<dyn tunebot::commands::NowPlayingProvider> = Arc::new(FixedProvider);
    let mut dispatcher = tunebot::commands::CommandDispatcher::new();
    dispatcher.register(tunebot::commands::song_command(provider.clone()));
    dispatcher.register(tunebot::commands::last_song_command(provider));
    dispatcher
}
