//! Per-dispatch handler context.
//!
//! A [`Context`] is created by the router for exactly one dispatch and bound
//! to that dispatch's [`ResponseCollector`]. Handlers use it to express
//! intent; emission methods only build [`Response`] values and append them,
//! they never touch the transport. This keeps handlers testable without a
//! live bus:
//!
//! ```rust,ignore
//! let (ctx, collector) = Context::detached(Event::message(1, 1, "/ping"));
//! ping(ctx).await?;
//! assert_eq!(collector.lock().len(), 1);
//! ```
//!
//! Every emitted response carries the originating event's correlation id.

use std::sync::Arc;

use courier_core::{Action, EDIT_MESSAGE_ID_KEY, Event, Metadata, Response};
use parking_lot::Mutex;
use serde_json::Value;

use crate::collector::ResponseCollector;

/// Optional fields for an emitted response.
#[derive(Debug, Clone, Default)]
pub struct MessageOptions {
    /// Opaque keyboard description.
    pub markup: Option<Value>,
    pub parse_mode: Option<String>,
    pub next_state: Option<String>,
    pub metadata: Metadata,
    /// Target message for `edit_message`; overrides the event's `message_id`.
    pub message_id: Option<i64>,
}

impl MessageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markup(mut self, markup: Value) -> Self {
        self.markup = Some(markup);
        self
    }

    pub fn parse_mode(mut self, mode: impl Into<String>) -> Self {
        self.parse_mode = Some(mode.into());
        self
    }

    pub fn next_state(mut self, state: impl Into<String>) -> Self {
        self.next_state = Some(state.into());
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn message_id(mut self, message_id: i64) -> Self {
        self.message_id = Some(message_id);
        self
    }
}

/// The context handed to handlers.
///
/// Cloning is cheap; clones share the same event and collector.
#[derive(Debug, Clone)]
pub struct Context {
    event: Arc<Event>,
    collector: Arc<Mutex<ResponseCollector>>,
}

impl Context {
    /// Binds a context to `event` and `collector`.
    pub fn new(event: Arc<Event>, collector: Arc<Mutex<ResponseCollector>>) -> Self {
        Self { event, collector }
    }

    /// Creates a context with its own empty collector, returning both.
    pub fn detached(event: Event) -> (Self, Arc<Mutex<ResponseCollector>>) {
        let collector = Arc::new(Mutex::new(ResponseCollector::new()));
        (Self::new(Arc::new(event), Arc::clone(&collector)), collector)
    }

    /// Returns the event being handled.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Returns how many responses have been emitted so far.
    pub fn emitted(&self) -> usize {
        self.collector.lock().len()
    }

    /// Emits a `send_message` response.
    pub fn send_message(&self, text: impl Into<String>, options: MessageOptions) {
        self.push(Action::SendMessage, text.into(), options, Metadata::new());
    }

    /// Emits an `edit_message` response.
    ///
    /// The edit target is `options.message_id` when set, otherwise the
    /// originating event's `message_id`.
    pub fn edit_message(&self, text: impl Into<String>, options: MessageOptions) {
        let target = options.message_id.or(self.event.message_id);
        let mut meta = Metadata::new();
        meta.insert(EDIT_MESSAGE_ID_KEY.to_string(), Value::from(target));
        self.push(Action::EditMessage, text.into(), options, meta);
    }

    /// Emits an `answer_callback` response.
    pub fn answer_callback(&self, text: impl Into<String>, options: MessageOptions) {
        self.push(Action::AnswerCallback, text.into(), options, Metadata::new());
    }

    fn push(&self, action: Action, text: String, options: MessageOptions, meta: Metadata) {
        let MessageOptions {
            markup,
            parse_mode,
            next_state,
            mut metadata,
            message_id: _,
        } = options;
        metadata.extend(meta);

        let response = Response {
            action,
            text: Some(text),
            next_state,
            markup,
            metadata,
            error: None,
            correlation_id: self.event.correlation_id.clone(),
            parse_mode,
        };
        self.collector.lock().add(response);
    }
}
