//! Cutters: composable parsers for command arguments.
//!
//! A [`Cutter`] looks at the start of a string and either consumes a prefix,
//! producing a [`Value`] and the unconsumed remainder, or fails with a
//! [`BadArgument`]. Cutters are immutable after construction and can be shared
//! freely between commands and tasks.
//!
//! | Kind | Cutters |
//! |------|---------|
//! | Primitive | [`IntegerCutter`], [`FloatCutter`], [`WordCutter`], [`StringCutter`], [`BoolCutter`], [`LiteralCutter`], [`RegexCutter`] |
//! | Combinator | [`OptionalCutter`], [`UnionCutter`], [`GroupCutter`], [`ListCutter`] |
//! | Network-backed | [`EntityCutter`] |
//!
//! Cutters never skip leading whitespace on their own; separating consecutive
//! command arguments is the binder's job.
//!
//! # Example
//!
//! ```rust,ignore
//! use lathe_framework::cutter::{CutContext, Cutter, IntegerCutter, Value};
//!
//! let parsed = IntegerCutter::new().cut(&CutContext::detached(), "123 456").await?;
//! assert_eq!(parsed.value, Value::Int(123));
//! assert_eq!(parsed.remainder, " 456");
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use lathe_core::{BoxedApi, MessageEvent};

use crate::error::{BadArgument, RegistrationResult};

pub mod combinator;
pub mod entity;
pub mod primitive;
pub mod value;

pub use combinator::{
    Collection, GroupCutter, ListCutter, OptionalCutter, UnionCutter, boxed,
};
pub use entity::{EntityCutter, EntityKind};
pub use primitive::{
    BoolCutter, FloatCutter, IntegerCutter, LiteralCutter, MatchFactory, RegexCutter,
    StringCutter, WordCutter,
};
pub use value::{DefaultValue, FromValue, Value};

/// A successful cut: the produced value and the unconsumed suffix of the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<'a> {
    pub value: Value,
    pub remainder: &'a str,
}

impl<'a> Parsed<'a> {
    pub fn new(value: impl Into<Value>, remainder: &'a str) -> Self {
        Self {
            value: value.into(),
            remainder,
        }
    }
}

/// Result of a single cut. `Err` is the "unmatched" outcome and carries no
/// remainder: the caller still holds the original text.
pub type CutResult<'a> = Result<Parsed<'a>, BadArgument>;

/// Environment a cut runs in.
///
/// Only network-backed cutters look at it: they need the API client to
/// resolve ids and the current message to find reply/forward attachments.
#[derive(Clone, Default)]
pub struct CutContext {
    api: Option<BoxedApi>,
    event: Option<Arc<MessageEvent>>,
}

impl CutContext {
    /// Creates a context bound to an API client and the message being parsed.
    pub fn new(api: BoxedApi, event: Arc<MessageEvent>) -> Self {
        Self {
            api: Some(api),
            event: Some(event),
        }
    }

    /// Creates a context with no collaborators, enough for pure cutters.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Returns the API client, if any.
    pub fn api(&self) -> Option<&BoxedApi> {
        self.api.as_ref()
    }

    /// Returns the message being parsed, if any.
    pub fn event(&self) -> Option<&MessageEvent> {
        self.event.as_deref()
    }
}

impl fmt::Debug for CutContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CutContext")
            .field("api", &self.api.is_some())
            .field("event", &self.event)
            .finish()
    }
}

/// A parser that consumes a prefix of its input.
///
/// # Contract
///
/// - On success the returned remainder is a suffix of `text`.
/// - Failure never exposes partial consumption.
/// - Cutting the same text twice gives the same outcome (network-backed
///   cutters only up to the remote service's own consistency).
#[async_trait]
pub trait Cutter: Send + Sync + fmt::Debug {
    /// Parses the start of `text`.
    async fn cut<'a>(&self, ctx: &CutContext, text: &'a str) -> CutResult<'a>;

    /// Describes the accepted input for usage messages, e.g. `"an integer"`.
    fn describe(&self) -> String;
}

/// A shared cutter trait object.
pub type BoxedCutter = Arc<dyn Cutter>;

/// Compiles `pattern` so that it only matches at the start of the input.
pub(crate) fn anchored(pattern: &str, flags: &str) -> RegistrationResult<Regex> {
    let anchored = format!("^(?{flags}:{pattern})");
    Regex::new(&anchored).map_err(|e| crate::error::RegistrationError::invalid_pattern(pattern, e))
}

/// Matches an anchored regex, returning the matched prefix and the remainder.
pub(crate) fn match_prefix<'a>(regex: &Regex, text: &'a str) -> Option<(&'a str, &'a str)> {
    regex
        .find(text)
        .filter(|m| m.start() == 0)
        .map(|m| (m.as_str(), &text[m.end()..]))
}

/// Skips an optional separator at the start of `text`.
pub(crate) fn skip_separator<'a>(separator: &Regex, text: &'a str) -> &'a str {
    match_prefix(separator, text).map_or(text, |(_, rest)| rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchored_only_matches_at_start() {
        let re = anchored("[0-9]+", "").unwrap();
        assert_eq!(match_prefix(&re, "12ab"), Some(("12", "ab")));
        assert_eq!(match_prefix(&re, "ab12"), None);
    }

    #[test]
    fn test_anchored_flags() {
        let re = anchored("yes", "i").unwrap();
        assert_eq!(match_prefix(&re, "YES!"), Some(("YES", "!")));
    }

    #[test]
    fn test_anchored_keeps_alternation_grouped() {
        let re = anchored("a|b", "").unwrap();
        assert!(match_prefix(&re, "xb").is_none());
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(anchored("(", "").is_err());
    }

    #[test]
    fn test_detached_context_has_no_collaborators() {
        let ctx = CutContext::detached();
        assert!(ctx.api().is_none());
        assert!(ctx.event().is_none());
    }

    const INPUTS: &[&str] = &[
        "",
        "   12",
        ",123",
        "123 456",
        "-5x",
        "yes,",
        "1, 2 3",
        "да нет",
        "héllo мир 7",
        "\n\tword",
    ];

    fn pure_cutters() -> Vec<(&'static str, BoxedCutter)> {
        vec![
            ("integer", boxed(IntegerCutter::new().min(-100))),
            ("float", boxed(FloatCutter::new())),
            ("word", boxed(WordCutter::new())),
            ("string", boxed(StringCutter::new())),
            ("bool", boxed(BoolCutter::new())),
            ("literal", boxed(LiteralCutter::new(["да", "yes"]).unwrap())),
            ("regex", boxed(RegexCutter::new("[a-zé]+").unwrap())),
            (
                "optional",
                boxed(OptionalCutter::new(boxed(IntegerCutter::new()))),
            ),
            (
                "union",
                boxed(
                    UnionCutter::new(vec![boxed(IntegerCutter::new()), boxed(WordCutter::new())])
                        .unwrap(),
                ),
            ),
            (
                "group",
                boxed(
                    GroupCutter::new(vec![boxed(IntegerCutter::new()), boxed(IntegerCutter::new())])
                        .unwrap()
                        .item_separated(),
                ),
            ),
            ("list", boxed(ListCutter::new(boxed(IntegerCutter::new())))),
        ]
    }

    #[test]
    fn test_remainder_is_suffix_and_cuts_repeat() {
        let ctx = CutContext::detached();
        for (name, cutter) in pure_cutters() {
            for &input in INPUTS {
                let first = tokio_test::block_on(cutter.cut(&ctx, input));
                if let Ok(parsed) = &first {
                    assert!(
                        input.ends_with(parsed.remainder),
                        "{name} on {input:?} left {:?}",
                        parsed.remainder
                    );
                    assert!(parsed.remainder.len() <= input.len());
                }
                let second = tokio_test::block_on(cutter.cut(&ctx, input));
                assert_eq!(first, second, "{name} on {input:?}");
            }
        }
    }

    #[test]
    fn test_optional_falls_back_without_consuming() {
        let ctx = CutContext::detached();
        for (name, cutter) in pure_cutters() {
            let optional = OptionalCutter::new(Arc::clone(&cutter)).default("fallback");
            for &input in INPUTS {
                let parsed = tokio_test::block_on(optional.cut(&ctx, input))
                    .unwrap_or_else(|err| panic!("optional {name} failed on {input:?}: {err}"));
                if tokio_test::block_on(cutter.cut(&ctx, input)).is_err() {
                    assert_eq!(parsed, Parsed::new("fallback", input), "{name} on {input:?}");
                }
            }
        }
    }
}
