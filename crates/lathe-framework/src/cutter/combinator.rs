//! Cutters built out of other cutters.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use super::{
    BoxedCutter, CutContext, CutResult, Cutter, DefaultValue, Parsed, Value, anchored,
    skip_separator,
};
use crate::error::{BadArgument, RegistrationError, RegistrationResult};

static DEFAULT_ITEM_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\s*,\s*|\s+)").expect("separator pattern is valid")
});

// =============================================================================
// OptionalCutter
// =============================================================================

/// Makes a cutter optional.
///
/// When the inner cutter fails, the default is produced and the input is left
/// untouched, so this cutter never fails.
#[derive(Debug, Clone)]
pub struct OptionalCutter {
    inner: BoxedCutter,
    default: DefaultValue,
}

impl OptionalCutter {
    /// Wraps `inner` with [`Value::None`] as the fallback.
    pub fn new(inner: BoxedCutter) -> Self {
        Self {
            inner,
            default: DefaultValue::default(),
        }
    }

    /// Sets a fixed fallback value.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = DefaultValue::Value(value.into());
        self
    }

    /// Sets a fallback produced on every use.
    pub fn default_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = DefaultValue::factory(factory);
        self
    }

    /// Replaces the fallback.
    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = default;
        self
    }
}

#[async_trait]
impl Cutter for OptionalCutter {
    async fn cut<'a>(&self, ctx: &CutContext, text: &'a str) -> CutResult<'a> {
        match self.inner.cut(ctx, text).await {
            Ok(parsed) => Ok(parsed),
            Err(_) => Ok(Parsed::new(self.default.produce(), text)),
        }
    }

    fn describe(&self) -> String {
        format!("{} (optional)", self.inner.describe())
    }
}

// =============================================================================
// UnionCutter
// =============================================================================

/// Tries each inner cutter from left to right and returns the first success.
///
/// Order matters: `[Integer, Word]` prefers numbers, `[Word, Integer]` never
/// reaches the integer branch.
#[derive(Debug, Clone)]
pub struct UnionCutter {
    inners: Vec<BoxedCutter>,
}

impl UnionCutter {
    pub fn new(inners: Vec<BoxedCutter>) -> RegistrationResult<Self> {
        match inners.len() {
            0 => return Err(RegistrationError::EmptyUnion),
            1 => warn!("union built with a single alternative; it behaves like that cutter"),
            _ => {}
        }
        Ok(Self { inners })
    }
}

#[async_trait]
impl Cutter for UnionCutter {
    async fn cut<'a>(&self, ctx: &CutContext, text: &'a str) -> CutResult<'a> {
        let mut reasons = Vec::with_capacity(self.inners.len());
        for inner in &self.inners {
            match inner.cut(ctx, text).await {
                Ok(parsed) => return Ok(parsed),
                Err(err) => reasons.push(err.reason),
            }
        }
        Err(BadArgument::new(reasons.join("; ")))
    }

    fn describe(&self) -> String {
        self.inners
            .iter()
            .map(|c| c.describe())
            .collect::<Vec<_>>()
            .join(" or ")
    }
}

// =============================================================================
// GroupCutter
// =============================================================================

/// Applies a fixed sequence of cutters and yields their values as a
/// [`Value::Tuple`], one element per inner cutter.
///
/// A failure anywhere fails the whole group and nothing is consumed. Without a
/// separator the inner cutters are chained back to back, so any spacing must be
/// part of the inner grammars.
#[derive(Debug, Clone)]
pub struct GroupCutter {
    inners: Vec<BoxedCutter>,
    separator: Option<Regex>,
}

impl GroupCutter {
    pub fn new(inners: Vec<BoxedCutter>) -> RegistrationResult<Self> {
        if inners.is_empty() {
            return Err(RegistrationError::EmptyGroup);
        }
        Ok(Self {
            inners,
            separator: None,
        })
    }

    /// Skips an optional separator matching `pattern` between elements.
    pub fn separator(mut self, pattern: &str) -> RegistrationResult<Self> {
        self.separator = Some(anchored(pattern, "")?);
        Ok(self)
    }

    /// Skips the list item separator (whitespace, or a comma with optional
    /// whitespace around it) between elements.
    pub fn item_separated(mut self) -> Self {
        self.separator = Some(DEFAULT_ITEM_SEPARATOR.clone());
        self
    }
}

#[async_trait]
impl Cutter for GroupCutter {
    async fn cut<'a>(&self, ctx: &CutContext, text: &'a str) -> CutResult<'a> {
        let mut values = Vec::with_capacity(self.inners.len());
        let mut rest = text;
        for (i, inner) in self.inners.iter().enumerate() {
            if i > 0
                && let Some(separator) = &self.separator
            {
                rest = skip_separator(separator, rest);
            }
            let parsed = inner.cut(ctx, rest).await.map_err(|err| {
                BadArgument::new(format!("element {} of the group: {}", i + 1, err.reason))
            })?;
            values.push(parsed.value);
            rest = parsed.remainder;
        }
        Ok(Parsed::new(Value::Tuple(values), rest))
    }

    fn describe(&self) -> String {
        self.inners
            .iter()
            .map(|c| c.describe())
            .collect::<Vec<_>>()
            .join(", then ")
    }
}

// =============================================================================
// ListCutter
// =============================================================================

/// Shape of the value a [`ListCutter`] produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Collection {
    #[default]
    List,
    Tuple,
    /// Duplicates are dropped, keeping the first occurrence.
    Set,
}

/// Repeats an inner cutter, collecting the parsed values.
///
/// Elements are split by an optional separator (by default a comma or
/// whitespace). Repetition stops at the first element that fails to parse,
/// after `max_length` elements, or when an element consumes nothing. The
/// element count is checked against `min_length` (1 by default) and
/// `max_length` before deduplication.
#[derive(Debug, Clone)]
pub struct ListCutter {
    inner: BoxedCutter,
    collection: Collection,
    min_length: usize,
    max_length: Option<usize>,
    separator: Regex,
}

impl ListCutter {
    pub fn new(inner: BoxedCutter) -> Self {
        Self {
            inner,
            collection: Collection::List,
            min_length: 1,
            max_length: None,
            separator: DEFAULT_ITEM_SEPARATOR.clone(),
        }
    }

    pub fn collection(mut self, collection: Collection) -> Self {
        self.collection = collection;
        self
    }

    /// Minimum number of elements; `0` makes an empty list acceptable.
    pub fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Replaces the element separator.
    pub fn separator(mut self, pattern: &str) -> RegistrationResult<Self> {
        self.separator = anchored(pattern, "")?;
        Ok(self)
    }

    fn finish(&self, values: Vec<Value>) -> Value {
        match self.collection {
            Collection::List => Value::List(values),
            Collection::Tuple => Value::Tuple(values),
            Collection::Set => {
                let mut unique: Vec<Value> = Vec::with_capacity(values.len());
                for value in values {
                    if unique.contains(&value) {
                        debug!(%value, "dropping duplicate set element");
                    } else {
                        unique.push(value);
                    }
                }
                Value::Set(unique)
            }
        }
    }
}

#[async_trait]
impl Cutter for ListCutter {
    async fn cut<'a>(&self, ctx: &CutContext, text: &'a str) -> CutResult<'a> {
        let mut values = Vec::new();
        let mut rest = text;

        loop {
            if self.max_length.is_some_and(|max| values.len() >= max) {
                break;
            }
            let candidate = if values.is_empty() {
                rest
            } else {
                skip_separator(&self.separator, rest)
            };
            let Ok(parsed) = self.inner.cut(ctx, candidate).await else {
                break;
            };
            if parsed.remainder.len() == candidate.len() {
                // Zero-width element; repeating it would never terminate.
                if values.is_empty() {
                    values.push(parsed.value);
                    rest = parsed.remainder;
                }
                break;
            }
            values.push(parsed.value);
            rest = parsed.remainder;
        }

        if values.len() < self.min_length {
            return Err(BadArgument::new(format!(
                "expected at least {} of {}, got {}",
                self.min_length,
                self.inner.describe(),
                values.len()
            )));
        }
        Ok(Parsed::new(self.finish(values), rest))
    }

    fn describe(&self) -> String {
        let what = match self.collection {
            Collection::Set => "distinct values",
            Collection::List | Collection::Tuple => "values",
        };
        match self.max_length {
            Some(max) => format!(
                "{} to {max} {what}, each {}",
                self.min_length,
                self.inner.describe()
            ),
            None => format!(
                "at least {} {what}, each {}",
                self.min_length,
                self.inner.describe()
            ),
        }
    }
}

/// Boxes a cutter into a shareable trait object.
pub fn boxed<C: Cutter + 'static>(cutter: C) -> BoxedCutter {
    Arc::new(cutter)
}
