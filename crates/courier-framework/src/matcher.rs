//! Matcher system.
//!
//! A [`Matcher`] decides whether a route's handler should process an event.
//! Matchers are stateless predicates: they carry no side effects and are
//! reused across every dispatch.
//!
//! The stock variants live in [`MatchRule`]:
//!
//! | Variant | Matches when |
//! |---------|--------------|
//! | [`MatchRule::Text`] | `event.text` equals the value exactly |
//! | [`MatchRule::Data`] | `event.callback_data` equals the value exactly |
//! | [`MatchRule::Predicate`] | the supplied function returns `true` |
//!
//! Custom matchers implement [`Matcher`] directly; the router never looks at
//! the concrete type. [`MatcherExt`] composes matchers:
//!
//! ```rust,ignore
//! let rule = on_command("/start").or(on_command("/help"));
//! let not_admin = on_message(|ev| ev.user_id == ADMIN).not();
//! ```

use std::fmt;
use std::sync::Arc;

use courier_core::Event;

/// Decides whether an event is routed to a handler.
pub trait Matcher: Send + Sync {
    /// Returns `true` if the event matches.
    fn matches(&self, event: &Event) -> bool;
}

impl<M: Matcher + ?Sized> Matcher for Arc<M> {
    fn matches(&self, event: &Event) -> bool {
        (**self).matches(event)
    }
}

impl<M: Matcher + ?Sized> Matcher for Box<M> {
    fn matches(&self, event: &Event) -> bool {
        (**self).matches(event)
    }
}

/// A type-erased predicate over events.
pub type PredicateFn = Arc<dyn Fn(&Event) -> bool + Send + Sync>;

// ============================================================================
// Stock matchers
// ============================================================================

/// The canonical matcher variants.
#[derive(Clone)]
pub enum MatchRule {
    /// Exact match on the message text.
    Text(String),
    /// Exact match on inline-button callback data.
    Data(String),
    /// Arbitrary user-supplied predicate.
    Predicate(PredicateFn),
}

impl MatchRule {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn data(value: impl Into<String>) -> Self {
        Self::Data(value.into())
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }
}

impl Matcher for MatchRule {
    fn matches(&self, event: &Event) -> bool {
        match self {
            Self::Text(value) => event.text() == Some(value.as_str()),
            Self::Data(value) => event.callback_data() == Some(value.as_str()),
            Self::Predicate(f) => f(event),
        }
    }
}

impl fmt::Debug for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => f.debug_tuple("Text").field(value).finish(),
            Self::Data(value) => f.debug_tuple("Data").field(value).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

// ============================================================================
// Combinators
// ============================================================================

/// Matches when both inner matchers match.
#[derive(Debug, Clone)]
pub struct And<A, B>(A, B);

/// Matches when either inner matcher matches.
#[derive(Debug, Clone)]
pub struct Or<A, B>(A, B);

/// Inverts the inner matcher.
#[derive(Debug, Clone)]
pub struct Not<M>(M);

impl<A: Matcher, B: Matcher> Matcher for And<A, B> {
    fn matches(&self, event: &Event) -> bool {
        self.0.matches(event) && self.1.matches(event)
    }
}

impl<A: Matcher, B: Matcher> Matcher for Or<A, B> {
    fn matches(&self, event: &Event) -> bool {
        self.0.matches(event) || self.1.matches(event)
    }
}

impl<M: Matcher> Matcher for Not<M> {
    fn matches(&self, event: &Event) -> bool {
        !self.0.matches(event)
    }
}

/// Combinator methods available on every sized matcher.
pub trait MatcherExt: Matcher + Sized {
    fn and<B: Matcher>(self, other: B) -> And<Self, B> {
        And(self, other)
    }

    fn or<B: Matcher>(self, other: B) -> Or<Self, B> {
        Or(self, other)
    }

    fn not(self) -> Not<Self> {
        Not(self)
    }
}

impl<M: Matcher + Sized> MatcherExt for M {}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::EventType;

    #[test]
    fn test_text_is_exact() {
        let rule = MatchRule::text("/ping");

        assert!(rule.matches(&Event::message(1, 1, "/ping")));
        assert!(!rule.matches(&Event::message(1, 1, "/ping now")));
        assert!(!rule.matches(&Event::new(1, 1, EventType::Message)));
    }

    #[test]
    fn test_data_ignores_text() {
        let rule = MatchRule::data("confirm");

        assert!(rule.matches(&Event::callback(1, 1, "confirm")));
        assert!(!rule.matches(&Event::message(1, 1, "confirm")));
    }

    #[test]
    fn test_predicate() {
        let rule = MatchRule::predicate(|ev| ev.text().is_some_and(|t| t.parse::<u32>().is_ok()));

        assert!(rule.matches(&Event::message(1, 1, "42")));
        assert!(!rule.matches(&Event::message(1, 1, "forty-two")));
    }

    #[test]
    fn test_combinators() {
        let start_or_help = MatchRule::text("/start").or(MatchRule::text("/help"));
        assert!(start_or_help.matches(&Event::message(1, 1, "/help")));
        assert!(!start_or_help.matches(&Event::message(1, 1, "/quit")));

        let admin_start = MatchRule::text("/start").and(MatchRule::predicate(|ev| ev.user_id == 99));
        assert!(admin_start.matches(&Event::message(99, 1, "/start")));
        assert!(!admin_start.matches(&Event::message(1, 1, "/start")));

        let not_start = MatchRule::text("/start").not();
        assert!(not_start.matches(&Event::message(1, 1, "/other")));
    }
}
