//! Event payload model.
//!
//! The event source produces raw JSON envelopes of the form
//! `{"type": "...", "object": {...}, "group_id": ...}`. Only `message_new`
//! envelopes carry chat messages; [`RawEvent::message`] decodes them into
//! [`MessageEvent`]s.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EventError, EventResult};

/// Event type of an incoming chat message.
pub const MESSAGE_NEW: &str = "message_new";

/// Peer ids at or above this value denote group chats.
pub const CHAT_PEER_OFFSET: i64 = 2_000_000_000;

/// A raw update envelope as produced by an [`EventSource`](crate::EventSource).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// The event type, e.g. `message_new`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// The event-specific object.
    #[serde(default)]
    pub object: Value,
    /// The community the update belongs to.
    #[serde(default)]
    pub group_id: Option<i64>,
    /// Unique id of the update, when the service provides one.
    #[serde(default)]
    pub event_id: Option<String>,
}

impl RawEvent {
    /// Decodes an envelope from a raw JSON value.
    pub fn from_value(value: Value) -> EventResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Returns `true` if this envelope carries a new chat message.
    pub fn is_message_new(&self) -> bool {
        self.event_type == MESSAGE_NEW
    }

    /// Decodes the carried chat message.
    ///
    /// Accepts both the modern shape, where the message sits under
    /// `object.message` next to `object.client_info`, and the legacy shape,
    /// where `object` is the message itself.
    pub fn message(&self) -> EventResult<MessageEvent> {
        if !self.is_message_new() {
            return Err(EventError::TypeMismatch {
                expected: MESSAGE_NEW,
                got: self.event_type.clone(),
            });
        }
        let object = match self.object.get("message") {
            Some(message) if message.is_object() => message,
            _ => &self.object,
        };
        Ok(MessageEvent::deserialize(object)?)
    }
}

/// A message that is quoted by (replied to) or forwarded into another message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignMessage {
    pub from_id: i64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub date: i64,
    #[serde(default)]
    pub conversation_message_id: Option<i64>,
}

/// An incoming chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub id: i64,
    pub peer_id: i64,
    pub from_id: i64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub date: i64,
    #[serde(default)]
    pub conversation_message_id: Option<i64>,
    #[serde(default)]
    pub reply_message: Option<Box<ForeignMessage>>,
    #[serde(default)]
    pub fwd_messages: Vec<ForeignMessage>,
}

impl MessageEvent {
    /// Creates a plain text message, mostly useful in tests and demos.
    pub fn new(peer_id: i64, from_id: i64, text: impl Into<String>) -> Self {
        Self {
            id: 0,
            peer_id,
            from_id,
            text: text.into(),
            date: 0,
            conversation_message_id: None,
            reply_message: None,
            fwd_messages: Vec::new(),
        }
    }

    /// Attaches a replied-to message.
    pub fn with_reply(mut self, reply: ForeignMessage) -> Self {
        self.reply_message = Some(Box::new(reply));
        self
    }

    /// Attaches a forwarded message.
    pub fn with_forward(mut self, forwarded: ForeignMessage) -> Self {
        self.fwd_messages.push(forwarded);
        self
    }

    /// Returns `true` if the message was sent in a group chat.
    pub fn is_chat(&self) -> bool {
        self.peer_id >= CHAT_PEER_OFFSET
    }

    /// Returns the sender of the replied-to message, or of the first
    /// forwarded message when there is no reply.
    pub fn attached_sender(&self) -> Option<i64> {
        self.reply_message
            .as_ref()
            .map(|reply| reply.from_id)
            .or_else(|| self.fwd_messages.first().map(|fwd| fwd.from_id))
    }
}
