//! Outbound actions produced by handlers.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{Metadata, null_as_default};

/// Metadata key holding the target message id of an `edit_message` response.
pub const EDIT_MESSAGE_ID_KEY: &str = "edit_msg_id";

/// What a gateway should do with a [`Response`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    SendMessage,
    EditMessage,
    AnswerCallback,
    None,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SendMessage => "send_message",
            Self::EditMessage => "edit_message",
            Self::AnswerCallback => "answer_callback",
            Self::None => "none",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outbound action.
///
/// `markup` is an opaque keyboard description; this crate never inspects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markup: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
}

impl Response {
    /// Creates a response with the given action and nothing else set.
    pub fn new(action: Action) -> Self {
        Self {
            action,
            text: None,
            next_state: None,
            markup: None,
            metadata: Metadata::new(),
            error: None,
            correlation_id: None,
            parse_mode: None,
        }
    }

    /// Creates a `send_message` response with the given text.
    pub fn send_message(text: impl Into<String>) -> Self {
        Self::new(Action::SendMessage).with_text(text)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_correlation_id(mut self, id: Option<String>) -> Self {
        self.correlation_id = id;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Returns the target message id of an edit, if recorded.
    pub fn edit_target(&self) -> Option<i64> {
        self.metadata.get(EDIT_MESSAGE_ID_KEY).and_then(Value::as_i64)
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}
