//! Convenience constructors for the stock matchers.
//!
//! ```rust,ignore
//! router.register(on_command("/start"), start);
//! router.register(on_callback("confirm_email"), confirm);
//! router.register(on_message(|ev| ev.text().is_some_and(|t| t.len() > 100)), too_long);
//! ```

use courier_core::{Event, EventType};

use crate::matcher::MatchRule;

/// Matches events whose text equals `command` exactly.
pub fn on_command(command: impl Into<String>) -> MatchRule {
    MatchRule::text(command)
}

/// Matches events whose callback data equals `data` exactly.
pub fn on_callback(data: impl Into<String>) -> MatchRule {
    MatchRule::data(data)
}

/// Matches events accepted by `predicate`.
pub fn on_message<F>(predicate: F) -> MatchRule
where
    F: Fn(&Event) -> bool + Send + Sync + 'static,
{
    MatchRule::predicate(predicate)
}

/// Matches events of the given [`EventType`].
pub fn on_event_type(event_type: EventType) -> MatchRule {
    MatchRule::predicate(move |ev| ev.event_type == event_type)
}
