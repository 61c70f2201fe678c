//! Inbound interaction events.
//!
//! An [`Event`] is the normalized record a gateway builds from a chat-platform
//! update (a text message, an inline-button press, a command). It is created
//! upstream and treated as immutable for the duration of one dispatch or one
//! RPC call.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Free-form key/value data carried by events and responses.
pub type Metadata = HashMap<String, Value>;

// ============================================================================
// Event Type Classification
// ============================================================================

/// Classification of an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A plain text message.
    Message,
    /// An inline-button press carrying callback data.
    Callback,
    /// A slash command.
    Command,
}

impl EventType {
    /// Returns the wire name of this event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Callback => "callback",
            Self::Command => "command",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "message" => Ok(Self::Message),
            "callback" => Ok(Self::Callback),
            "command" => Ok(Self::Command),
            other => Err(format!("unknown event type: {other}")),
        }
    }
}

// ============================================================================
// Event
// ============================================================================

/// A normalized inbound interaction record.
///
/// Optional fields are absent-safe on the wire: they may be omitted or `null`
/// and are skipped when serializing `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub user_id: i64,
    pub chat_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub event_type: EventType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: Metadata,
    /// Set by the RPC client when the event travels as a request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl Event {
    /// Creates an event with only the mandatory fields set.
    pub fn new(user_id: i64, chat_id: i64, event_type: EventType) -> Self {
        Self {
            user_id,
            chat_id,
            message_id: None,
            text: None,
            callback_data: None,
            state: None,
            event_type,
            metadata: Metadata::new(),
            correlation_id: None,
        }
    }

    /// Creates a text message event.
    pub fn message(user_id: i64, chat_id: i64, text: impl Into<String>) -> Self {
        Self::new(user_id, chat_id, EventType::Message).with_text(text)
    }

    /// Creates an inline-button callback event.
    pub fn callback(user_id: i64, chat_id: i64, data: impl Into<String>) -> Self {
        Self::new(user_id, chat_id, EventType::Callback).with_callback_data(data)
    }

    pub fn with_message_id(mut self, message_id: i64) -> Self {
        self.message_id = Some(message_id);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_callback_data(mut self, data: impl Into<String>) -> Self {
        self.callback_data = Some(data.into());
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Returns the message text, if any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Returns the callback data, if any.
    pub fn callback_data(&self) -> Option<&str> {
        self.callback_data.as_deref()
    }

    /// Returns the correlation id, if any.
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }
}

/// Deserializes `null` as the type's default value.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
