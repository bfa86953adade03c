//! Primitive cutters, each driven by one anchored regular expression.

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::{Captures, Regex};

use super::{CutContext, CutResult, Cutter, Parsed, Value, anchored, match_prefix};
use crate::error::{BadArgument, RegistrationError, RegistrationResult};

static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?[0-9]+").expect("integer pattern is valid"));

static FLOAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?")
        .expect("float pattern is valid")
});

// Commas delimit list items, so they never belong to a word.
static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s,]+").expect("word pattern is valid"));

static STRING_DOTALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^.+").expect("string pattern is valid"));

static STRING_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.+").expect("string pattern is valid"));

/// Checks a character count against optional inclusive bounds.
fn check_length(
    value: &str,
    min_length: Option<usize>,
    max_length: Option<usize>,
) -> Result<(), BadArgument> {
    let len = value.chars().count();
    if let Some(min) = min_length
        && len < min
    {
        return Err(BadArgument::new(format!(
            "\"{value}\" is shorter than {min} characters"
        )));
    }
    if let Some(max) = max_length
        && len > max
    {
        return Err(BadArgument::new(format!(
            "\"{value}\" is longer than {max} characters"
        )));
    }
    Ok(())
}

fn describe_length(base: &str, min_length: Option<usize>, max_length: Option<usize>) -> String {
    match (min_length, max_length) {
        (None, None) => base.to_string(),
        (Some(min), None) => format!("{base} of at least {min} characters"),
        (None, Some(max)) => format!("{base} of at most {max} characters"),
        (Some(min), Some(max)) => format!("{base} of {min} to {max} characters"),
    }
}

// =============================================================================
// IntegerCutter
// =============================================================================

/// Parses an optionally signed decimal integer.
///
/// Values outside the inclusive `min`/`max` bounds are rejected even though
/// the digits themselves match.
#[derive(Debug, Clone, Default)]
pub struct IntegerCutter {
    min: Option<i64>,
    max: Option<i64>,
}

impl IntegerCutter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the inclusive lower bound.
    pub fn min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    /// Sets the inclusive upper bound.
    pub fn max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }

    /// Sets both bounds from an inclusive range.
    pub fn range(self, range: RangeInclusive<i64>) -> Self {
        let (min, max) = range.into_inner();
        self.min(min).max(max)
    }
}

#[async_trait]
impl Cutter for IntegerCutter {
    async fn cut<'a>(&self, _ctx: &CutContext, text: &'a str) -> CutResult<'a> {
        let (digits, rest) = match_prefix(&INTEGER, text)
            .ok_or_else(|| BadArgument::new("expected an integer"))?;
        let number: i64 = digits
            .parse()
            .map_err(|_| BadArgument::new(format!("{digits} does not fit into an integer")))?;

        if let Some(min) = self.min
            && number < min
        {
            return Err(BadArgument::new(format!("{number} is less than {min}")));
        }
        if let Some(max) = self.max
            && number > max
        {
            return Err(BadArgument::new(format!("{number} is greater than {max}")));
        }
        Ok(Parsed::new(number, rest))
    }

    fn describe(&self) -> String {
        match (self.min, self.max) {
            (None, None) => "an integer".to_string(),
            (Some(min), None) => format!("an integer not less than {min}"),
            (None, Some(max)) => format!("an integer not greater than {max}"),
            (Some(min), Some(max)) => format!("an integer from {min} to {max}"),
        }
    }
}

// =============================================================================
// FloatCutter
// =============================================================================

/// Parses a decimal number such as `1.2`, `.5`, `-3` or `12e-5`.
#[derive(Debug, Clone, Default)]
pub struct FloatCutter;

impl FloatCutter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Cutter for FloatCutter {
    async fn cut<'a>(&self, _ctx: &CutContext, text: &'a str) -> CutResult<'a> {
        let (number, rest) =
            match_prefix(&FLOAT, text).ok_or_else(|| BadArgument::new("expected a number"))?;
        let number: f64 = number
            .parse()
            .map_err(|_| BadArgument::new(format!("{number} is not a number")))?;
        Ok(Parsed::new(number, rest))
    }

    fn describe(&self) -> String {
        "a number".to_string()
    }
}

// =============================================================================
// WordCutter
// =============================================================================

/// Parses a run of characters up to the next whitespace or comma.
#[derive(Debug, Clone, Default)]
pub struct WordCutter {
    min_length: Option<usize>,
    max_length: Option<usize>,
}

impl WordCutter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }
}

#[async_trait]
impl Cutter for WordCutter {
    async fn cut<'a>(&self, _ctx: &CutContext, text: &'a str) -> CutResult<'a> {
        let (word, rest) =
            match_prefix(&WORD, text).ok_or_else(|| BadArgument::new("expected a word"))?;
        check_length(word, self.min_length, self.max_length)?;
        Ok(Parsed::new(word, rest))
    }

    fn describe(&self) -> String {
        describe_length("a single word", self.min_length, self.max_length)
    }
}

// =============================================================================
// StringCutter
// =============================================================================

/// Parses the rest of the text.
///
/// By default newlines are consumed too; with `dotall(false)` the cut stops at
/// the first line break.
#[derive(Debug, Clone)]
pub struct StringCutter {
    dotall: bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
}

impl Default for StringCutter {
    fn default() -> Self {
        Self {
            dotall: true,
            min_length: None,
            max_length: None,
        }
    }
}

impl StringCutter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the text may span several lines.
    pub fn dotall(mut self, dotall: bool) -> Self {
        self.dotall = dotall;
        self
    }

    pub fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }
}

#[async_trait]
impl Cutter for StringCutter {
    async fn cut<'a>(&self, _ctx: &CutContext, text: &'a str) -> CutResult<'a> {
        let regex = if self.dotall {
            &*STRING_DOTALL
        } else {
            &*STRING_LINE
        };
        let (value, rest) =
            match_prefix(regex, text).ok_or_else(|| BadArgument::new("expected some text"))?;
        check_length(value, self.min_length, self.max_length)?;
        Ok(Parsed::new(value, rest))
    }

    fn describe(&self) -> String {
        describe_length("any text", self.min_length, self.max_length)
    }
}

// =============================================================================
// BoolCutter
// =============================================================================

const TRUE_TOKENS: &[&str] = &[
    "true", "1", "yes", "y", "+", "on", "enable", "да", "д", "вкл", "включить", "истина",
];

const FALSE_TOKENS: &[&str] = &[
    "false", "0", "no", "n", "-", "off", "disable", "нет", "н", "выкл", "выключить", "ложь",
];

static TRUE_ALTERNATION: LazyLock<Regex> = LazyLock::new(|| {
    token_alternation(TRUE_TOKENS.iter().copied()).expect("escaped tokens form a valid pattern")
});

static FALSE_ALTERNATION: LazyLock<Regex> = LazyLock::new(|| {
    token_alternation(FALSE_TOKENS.iter().copied()).expect("escaped tokens form a valid pattern")
});

/// Builds a case-insensitive alternation of literal tokens, longest first so
/// that `yes` wins over `y`.
fn token_alternation<'t>(tokens: impl IntoIterator<Item = &'t str>) -> RegistrationResult<Regex> {
    let mut tokens: Vec<&str> = tokens.into_iter().collect();
    tokens.sort_by_key(|t| std::cmp::Reverse(t.chars().count()));
    tokens.dedup();
    let pattern = tokens
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    anchored(&pattern, "i")
}

/// Parses a yes/no flag from a bilingual token set (`yes`/`no`, `on`/`off`,
/// `да`/`нет`, `+`/`-`, ...).
///
/// The truthy alternation is tried first, then the falsy one.
#[derive(Debug, Clone)]
pub struct BoolCutter {
    truthy: Regex,
    falsy: Regex,
}

impl Default for BoolCutter {
    fn default() -> Self {
        Self {
            truthy: TRUE_ALTERNATION.clone(),
            falsy: FALSE_ALTERNATION.clone(),
        }
    }
}

impl BoolCutter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cutter that also accepts the given extra tokens.
    pub fn with_tokens<'t>(
        extra_true: impl IntoIterator<Item = &'t str>,
        extra_false: impl IntoIterator<Item = &'t str>,
    ) -> RegistrationResult<Self> {
        Ok(Self {
            truthy: token_alternation(TRUE_TOKENS.iter().copied().chain(extra_true))?,
            falsy: token_alternation(FALSE_TOKENS.iter().copied().chain(extra_false))?,
        })
    }
}

#[async_trait]
impl Cutter for BoolCutter {
    async fn cut<'a>(&self, _ctx: &CutContext, text: &'a str) -> CutResult<'a> {
        if let Some((_, rest)) = match_prefix(&self.truthy, text) {
            return Ok(Parsed::new(true, rest));
        }
        if let Some((_, rest)) = match_prefix(&self.falsy, text) {
            return Ok(Parsed::new(false, rest));
        }
        Err(BadArgument::new("expected yes or no"))
    }

    fn describe(&self) -> String {
        "yes or no (on/off, +/-, да/нет)".to_string()
    }
}

// =============================================================================
// LiteralCutter
// =============================================================================

/// Matches one of a fixed set of regular-expression fragments and yields the
/// matched text. Fragments are tried in the given order.
#[derive(Debug, Clone)]
pub struct LiteralCutter {
    fragments: Vec<String>,
    regex: Regex,
}

impl LiteralCutter {
    /// Creates a case-sensitive literal cutter.
    pub fn new<I, S>(fragments: I) -> RegistrationResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::build(fragments, "")
    }

    /// Creates a case-insensitive literal cutter.
    pub fn ignore_case<I, S>(fragments: I) -> RegistrationResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::build(fragments, "i")
    }

    fn build<I, S>(fragments: I, flags: &str) -> RegistrationResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fragments: Vec<String> = fragments.into_iter().map(Into::into).collect();
        if fragments.is_empty() {
            return Err(RegistrationError::EmptyLiteral);
        }
        let pattern = fragments
            .iter()
            .map(|f| format!("(?:{f})"))
            .collect::<Vec<_>>()
            .join("|");
        Ok(Self {
            regex: anchored(&pattern, flags)?,
            fragments,
        })
    }
}

#[async_trait]
impl Cutter for LiteralCutter {
    async fn cut<'a>(&self, _ctx: &CutContext, text: &'a str) -> CutResult<'a> {
        let (matched, rest) = match_prefix(&self.regex, text).ok_or_else(|| {
            BadArgument::new(format!("expected one of: {}", self.fragments.join(", ")))
        })?;
        Ok(Parsed::new(matched, rest))
    }

    fn describe(&self) -> String {
        match self.fragments.as_slice() {
            [single] => format!("\"{single}\""),
            many => format!("one of: {}", many.join(", ")),
        }
    }
}

// =============================================================================
// RegexCutter
// =============================================================================

/// Builds a value out of the captures of a [`RegexCutter`] match.
pub type MatchFactory = Arc<dyn Fn(&Captures<'_>) -> Result<Value, BadArgument> + Send + Sync>;

/// Escape hatch for bespoke grammars: a caller-supplied pattern plus a
/// caller-supplied factory applied to the match.
///
/// Without a factory the whole match is returned as a string.
#[derive(Clone)]
pub struct RegexCutter {
    regex: Regex,
    factory: MatchFactory,
    description: String,
}

impl RegexCutter {
    /// Compiles `pattern`, anchored at the start of the input.
    pub fn new(pattern: &str) -> RegistrationResult<Self> {
        Ok(Self::from_regex(anchored(pattern, "")?))
    }

    /// Wraps a precompiled regex. Only matches starting at the first
    /// character of the input count.
    pub fn from_regex(regex: Regex) -> Self {
        let description = format!("text matching /{}/", regex.as_str());
        Self {
            regex,
            factory: Arc::new(|caps: &Captures<'_>| Ok(Value::Str(caps[0].to_string()))),
            description,
        }
    }

    /// Replaces the value factory.
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Captures<'_>) -> Result<Value, BadArgument> + Send + Sync + 'static,
    {
        self.factory = Arc::new(factory);
        self
    }

    /// Replaces the usage description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl fmt::Debug for RegexCutter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegexCutter")
            .field("regex", &self.regex.as_str())
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Cutter for RegexCutter {
    async fn cut<'a>(&self, _ctx: &CutContext, text: &'a str) -> CutResult<'a> {
        let caps = self
            .regex
            .captures(text)
            .filter(|caps| caps.get(0).is_some_and(|m| m.start() == 0))
            .ok_or_else(|| BadArgument::new(format!("expected {}", self.description)))?;
        let end = caps.get(0).map_or(0, |m| m.end());
        let value = (self.factory)(&caps)?;
        Ok(Parsed::new(value, &text[end..]))
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::block_on;

    fn cut<'a>(cutter: &dyn Cutter, text: &'a str) -> CutResult<'a> {
        block_on(cutter.cut(&CutContext::detached(), text))
    }

    #[test]
    fn test_integer_leaves_remainder() {
        let parsed = cut(&IntegerCutter::new(), "123 456").unwrap();
        assert_eq!(parsed, Parsed::new(123_i64, " 456"));
    }

    #[test]
    fn test_integer_signs() {
        assert_eq!(cut(&IntegerCutter::new(), "-7x").unwrap().value, Value::Int(-7));
        assert_eq!(cut(&IntegerCutter::new(), "+7").unwrap().value, Value::Int(7));
        assert!(cut(&IntegerCutter::new(), "x7").is_err());
    }

    #[test]
    fn test_integer_out_of_declared_range() {
        let cutter = IntegerCutter::new().min(0).max(10);
        assert!(cut(&cutter, "15").is_err());
        assert!(cut(&cutter, "-1").is_err());
        assert_eq!(cut(&cutter, "10").unwrap().value, Value::Int(10));
        assert_eq!(cutter.describe(), "an integer from 0 to 10");
    }

    #[test]
    fn test_integer_range_builder() {
        let cutter = IntegerCutter::new().range(1..=3);
        assert!(cut(&cutter, "0").is_err());
        assert!(cut(&cutter, "3").is_ok());
    }

    #[test]
    fn test_integer_overflow_is_unmatched() {
        assert!(cut(&IntegerCutter::new(), "99999999999999999999").is_err());
    }

    #[test]
    fn test_float_forms() {
        let cases = [("1.2 x", 1.2, " x"), (".5", 0.5, ""), ("12e-5", 12e-5, ""), ("-3", -3.0, "")];
        for (text, expected, rest) in cases {
            let parsed = cut(&FloatCutter::new(), text).unwrap();
            assert_eq!(parsed.value, Value::Float(expected), "input {text:?}");
            assert_eq!(parsed.remainder, rest);
        }
        assert!(cut(&FloatCutter::new(), "abc").is_err());
    }

    #[test]
    fn test_word_stops_at_whitespace() {
        assert_eq!(
            cut(&WordCutter::new(), "Bob 30").unwrap(),
            Parsed::new("Bob", " 30")
        );
        assert_eq!(cut(&WordCutter::new(), "a,b").unwrap(), Parsed::new("a", ",b"));
        assert!(cut(&WordCutter::new(), ",123").is_err());
        assert!(cut(&WordCutter::new(), " Bob").is_err());
        assert!(cut(&WordCutter::new(), "").is_err());
    }

    #[test]
    fn test_word_length_bounds() {
        let cutter = WordCutter::new().min_length(2).max_length(3);
        assert!(cut(&cutter, "a").is_err());
        assert!(cut(&cutter, "abcd").is_err());
        assert_eq!(cut(&cutter, "абв").unwrap().value, Value::Str("абв".into()));
    }

    #[test]
    fn test_string_dotall_toggle() {
        let all = cut(&StringCutter::new(), "one\ntwo").unwrap();
        assert_eq!(all, Parsed::new("one\ntwo", ""));

        let line = cut(&StringCutter::new().dotall(false), "one\ntwo").unwrap();
        assert_eq!(line, Parsed::new("one", "\ntwo"));
    }

    #[test]
    fn test_string_length_failure() {
        let cutter = StringCutter::new().max_length(3);
        assert!(cut(&cutter, "long text").is_err());
    }

    #[test]
    fn test_bool_tokens() {
        assert_eq!(cut(&BoolCutter::new(), "yes,").unwrap(), Parsed::new(true, ","));
        assert_eq!(cut(&BoolCutter::new(), "Y").unwrap(), Parsed::new(true, ""));
        assert_eq!(cut(&BoolCutter::new(), "OFF now").unwrap(), Parsed::new(false, " now"));
        assert_eq!(cut(&BoolCutter::new(), "нет").unwrap(), Parsed::new(false, ""));
        assert_eq!(cut(&BoolCutter::new(), "+").unwrap(), Parsed::new(true, ""));
        assert!(cut(&BoolCutter::new(), "maybe").is_err());
    }

    #[test]
    fn test_bool_extra_tokens() {
        let cutter = BoolCutter::with_tokens(["sure"], ["nope"]).unwrap();
        assert_eq!(cut(&cutter, "sure").unwrap().value, Value::Bool(true));
        assert_eq!(cut(&cutter, "NOPE").unwrap().value, Value::Bool(false));
        assert_eq!(cut(&cutter, "yes").unwrap().value, Value::Bool(true));
    }

    #[test]
    fn test_literal_alternatives() {
        let cutter = LiteralCutter::new(["add", "rem(?:ove)?"]).unwrap();
        assert_eq!(cut(&cutter, "remove 1").unwrap(), Parsed::new("remove", " 1"));
        assert_eq!(cut(&cutter, "rem").unwrap(), Parsed::new("rem", ""));
        assert!(cut(&cutter, "ADD").is_err());

        let insensitive = LiteralCutter::ignore_case(["add"]).unwrap();
        assert_eq!(cut(&insensitive, "ADD").unwrap().value, Value::Str("ADD".into()));
    }

    #[test]
    fn test_literal_requires_fragments() {
        assert!(matches!(
            LiteralCutter::new(Vec::<String>::new()),
            Err(RegistrationError::EmptyLiteral)
        ));
    }

    #[test]
    fn test_regex_with_factory() {
        let cutter = RegexCutter::new(r"(\d+)x(\d+)")
            .unwrap()
            .factory(|caps| {
                let w: i64 = caps[1].parse().map_err(|_| BadArgument::new("width"))?;
                let h: i64 = caps[2].parse().map_err(|_| BadArgument::new("height"))?;
                Ok(Value::Tuple(vec![Value::Int(w), Value::Int(h)]))
            })
            .description("a size like 640x480");

        let parsed = cut(&cutter, "640x480 rest").unwrap();
        assert_eq!(
            parsed.value,
            Value::Tuple(vec![Value::Int(640), Value::Int(480)])
        );
        assert_eq!(parsed.remainder, " rest");
        assert_eq!(cutter.describe(), "a size like 640x480");
    }

    #[test]
    fn test_regex_precompiled_must_match_at_start() {
        let cutter = RegexCutter::from_regex(Regex::new("b+").unwrap());
        assert!(cut(&cutter, "abb").is_err());
        assert_eq!(cut(&cutter, "bba").unwrap(), Parsed::new("bb", "a"));
    }

    #[test]
    fn test_failure_is_idempotent() {
        let cutter = IntegerCutter::new();
        assert_eq!(cut(&cutter, "abc"), cut(&cutter, "abc"));
        assert_eq!(cut(&cutter, "42"), cut(&cutter, "42"));
    }
}
