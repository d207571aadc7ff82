//! EventSub stream frame decoding.

use serde::Deserialize;

/// A chat badge attached to the sender.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Badge {
    pub set_id: String,
    #[serde(default)]
    pub id: String,
}

/// One inbound chat message, normalized from a notification frame.
///
/// Immutable; created per frame and passed by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub message_id: String,
    pub channel_id: String,
    pub sender_user_id: String,
    pub sender_login: String,
    pub text: String,
    pub badges: Vec<Badge>,
    pub reply_parent_message_id: Option<String>,
}

/// Control and data frames the stream can deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// Handshake frame carrying the session id to subscribe with.
    Welcome { session_id: String },
    Notification(ChatMessage),
    Keepalive,
}

/// Decode a raw text frame.
///
/// Malformed or unrecognized frames decode to `None`; the caller drops
/// and logs them without failing the session.
pub fn decode_frame(text: &str) -> Option<StreamFrame> {
    let envelope: Envelope = serde_json::from_str(text).ok()?;
    match envelope.metadata.message_type.as_str() {
        "session_welcome" => {
            let payload: WelcomePayload = serde_json::from_value(envelope.payload).ok()?;
            Some(StreamFrame::Welcome {
                session_id: payload.session.id,
            })
        }
        "session_keepalive" => Some(StreamFrame::Keepalive),
        "notification" => {
            let payload: NotificationPayload = serde_json::from_value(envelope.payload).ok()?;
            let event = payload.event;
            Some(StreamFrame::Notification(ChatMessage {
                message_id: event.message_id,
                channel_id: event.broadcaster_user_id,
                sender_user_id: event.chatter_user_id,
                sender_login: event.chatter_user_name,
                text: event.message.text,
                badges: event.badges,
                reply_parent_message_id: event.reply.map(|reply| reply.parent_message_id),
            }))
        }
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    metadata: Metadata,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    message_type: String,
}

#[derive(Debug, Deserialize)]
struct WelcomePayload {
    session: WelcomeSession,
}

#[derive(Debug, Deserialize)]
struct WelcomeSession {
    id: String,
}

#[derive(Debug, Deserialize)]
struct NotificationPayload {
    event: ChatEvent,
}

#[derive(Debug, Deserialize)]
struct ChatEvent {
    message_id: String,
    chatter_user_id: String,
    chatter_user_name: String,
    broadcaster_user_id: String,
    message: ChatEventMessage,
    #[serde(default)]
    badges: Vec<Badge>,
    #[serde(default)]
    reply: Option<ChatEventReply>,
}

#[derive(Debug, Deserialize)]
struct ChatEventMessage {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ChatEventReply {
    parent_message_id: String,
}
