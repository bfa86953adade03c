//! Argument binder: turns declared argument types into cutters at
//! registration time and drives them over the message text at request time.
//!
//! Types are described by [`TypeTag`]s and resolved through a
//! [`CutterRegistry`], so an unknown or malformed declaration fails while the
//! command is being built, never while a message is being handled.
//!
//! ```rust,ignore
//! let registry = CutterRegistry::with_builtins();
//! let age = registry.resolve(&TypeTag::Int, &ArgumentOptions::new().min(0))?;
//! let tags = registry.resolve(&TypeTag::list(TypeTag::Word), &ArgumentOptions::new())?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::cutter::{
    BoolCutter, BoxedCutter, Collection, CutContext, Cutter, DefaultValue, EntityCutter,
    FloatCutter, FromValue, GroupCutter, IntegerCutter, ListCutter, LiteralCutter,
    OptionalCutter, StringCutter, UnionCutter, Value, WordCutter, boxed,
};
use crate::error::{
    CommandError, CommandResult, ExtractError, ExtractResult, RegistrationError,
    RegistrationResult,
};

// =============================================================================
// TypeTag
// =============================================================================

/// Declared type of a command argument.
#[derive(Clone)]
pub enum TypeTag {
    Int,
    Float,
    /// A word for positional arguments, the rest of the text for
    /// [`ArgKind::Rest`] ones.
    Str,
    Word,
    Text,
    Bool,
    User,
    Group,
    /// A user or a community.
    Entity,
    /// A type registered in the [`CutterRegistry`] under this name.
    Named(String),
    /// One of fixed regular-expression fragments.
    Literal(Vec<String>),
    List(Box<TypeTag>),
    /// A fixed-arity sequence, one element per tag.
    Tuple(Vec<TypeTag>),
    /// A variable-length sequence producing a tuple.
    VarTuple(Box<TypeTag>),
    Set(Box<TypeTag>),
    Optional(Box<TypeTag>),
    Union(Vec<TypeTag>),
    /// A ready-made cutter, used as is.
    Cutter(BoxedCutter),
    /// A cutter constructor called with no arguments.
    Factory(fn() -> BoxedCutter),
}

impl TypeTag {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn literal<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Literal(fragments.into_iter().map(Into::into).collect())
    }

    pub fn list(inner: TypeTag) -> Self {
        Self::List(Box::new(inner))
    }

    pub fn tuple(inners: impl IntoIterator<Item = TypeTag>) -> Self {
        Self::Tuple(inners.into_iter().collect())
    }

    pub fn var_tuple(inner: TypeTag) -> Self {
        Self::VarTuple(Box::new(inner))
    }

    pub fn set(inner: TypeTag) -> Self {
        Self::Set(Box::new(inner))
    }

    pub fn optional(inner: TypeTag) -> Self {
        Self::Optional(Box::new(inner))
    }

    pub fn union(inners: impl IntoIterator<Item = TypeTag>) -> Self {
        Self::Union(inners.into_iter().collect())
    }

    pub fn cutter<C: Cutter + 'static>(cutter: C) -> Self {
        Self::Cutter(boxed(cutter))
    }
}

impl From<&str> for TypeTag {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<BoxedCutter> for TypeTag {
    fn from(cutter: BoxedCutter) -> Self {
        Self::Cutter(cutter)
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => f.write_str("Int"),
            Self::Float => f.write_str("Float"),
            Self::Str => f.write_str("Str"),
            Self::Word => f.write_str("Word"),
            Self::Text => f.write_str("Text"),
            Self::Bool => f.write_str("Bool"),
            Self::User => f.write_str("User"),
            Self::Group => f.write_str("Group"),
            Self::Entity => f.write_str("Entity"),
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Literal(fragments) => f.debug_tuple("Literal").field(fragments).finish(),
            Self::List(inner) => f.debug_tuple("List").field(inner).finish(),
            Self::Tuple(inners) => f.debug_tuple("Tuple").field(inners).finish(),
            Self::VarTuple(inner) => f.debug_tuple("VarTuple").field(inner).finish(),
            Self::Set(inner) => f.debug_tuple("Set").field(inner).finish(),
            Self::Optional(inner) => f.debug_tuple("Optional").field(inner).finish(),
            Self::Union(inners) => f.debug_tuple("Union").field(inners).finish(),
            Self::Cutter(cutter) => f.debug_tuple("Cutter").field(cutter).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

// =============================================================================
// ArgumentOptions
// =============================================================================

/// How a plain string argument consumes text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArgKind {
    /// Consumes a single word.
    #[default]
    Positional,
    /// Consumes the rest of the text.
    Rest,
}

/// Cutter-specific bounds applied to the resolved cutter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CutterOverrides {
    /// Inclusive lower bound for integers.
    pub min: Option<i64>,
    /// Inclusive upper bound for integers.
    pub max: Option<i64>,
    /// Minimum character count for strings, element count for collections.
    pub min_length: Option<usize>,
    /// Maximum character count for strings, element count for collections.
    pub max_length: Option<usize>,
}

/// A post-parse check or transformation. `Err` carries the reason shown to
/// the user.
pub type Validator = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

/// Per-argument configuration.
#[derive(Clone, Default)]
pub struct ArgumentOptions {
    pub default: Option<DefaultValue>,
    pub validators: Vec<Validator>,
    pub overrides: CutterOverrides,
    pub kind: ArgKind,
}

impl ArgumentOptions {
    pub fn new() -> Self {
        <Self as Default>::default()
    }

    /// Makes the argument optional with a fixed default.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    /// Makes the argument optional with a default produced on every use.
    pub fn default_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::factory(factory));
        self
    }

    /// Adds a validator, run after the previous ones.
    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn min(mut self, min: i64) -> Self {
        self.overrides.min = Some(min);
        self
    }

    pub fn max(mut self, max: i64) -> Self {
        self.overrides.max = Some(max);
        self
    }

    pub fn min_length(mut self, min_length: usize) -> Self {
        self.overrides.min_length = Some(min_length);
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.overrides.max_length = Some(max_length);
        self
    }

    /// Lets a [`TypeTag::Str`] argument take the rest of the text.
    pub fn rest(mut self) -> Self {
        self.kind = ArgKind::Rest;
        self
    }
}

impl fmt::Debug for ArgumentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentOptions")
            .field("default", &self.default)
            .field("validators", &self.validators.len())
            .field("overrides", &self.overrides)
            .field("kind", &self.kind)
            .finish()
    }
}

// =============================================================================
// CutterRegistry
// =============================================================================

/// Builds a cutter for a named type, honouring the argument's bounds and kind.
pub type CutterFactory =
    Arc<dyn Fn(&CutterOverrides, ArgKind) -> RegistrationResult<BoxedCutter> + Send + Sync>;

/// Maps type names to cutter constructors.
///
/// The built-in names are `int`, `float`, `str`, `word`, `text`, `bool`,
/// `user`, `group` and `entity`.
#[derive(Clone)]
pub struct CutterRegistry {
    factories: HashMap<String, CutterFactory>,
}

impl Default for CutterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl CutterRegistry {
    /// Creates a registry with no names at all.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Creates a registry with the built-in names.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("int", |o, _| Ok(boxed(integer(o))));
        registry.register("float", |_, _| Ok(boxed(FloatCutter::new())));
        registry.register("str", |o, kind| Ok(string(o, kind)));
        registry.register("word", |o, _| Ok(boxed(word(o))));
        registry.register("text", |o, _| Ok(boxed(text(o))));
        registry.register("bool", |_, _| Ok(boxed(BoolCutter::new())));
        registry.register("user", |_, _| Ok(boxed(EntityCutter::user())));
        registry.register("group", |_, _| Ok(boxed(EntityCutter::group())));
        registry.register("entity", |_, _| Ok(boxed(EntityCutter::any())));
        registry
    }

    /// Registers (or replaces) a named type.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&CutterOverrides, ArgKind) -> RegistrationResult<BoxedCutter> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Resolves a declared type into a cutter.
    ///
    /// Integer bounds reach the innermost integer cutters; length bounds apply
    /// to the outermost string or collection.
    pub fn resolve(&self, tag: &TypeTag, options: &ArgumentOptions) -> RegistrationResult<BoxedCutter> {
        self.resolve_with(tag, options.kind, &options.overrides)
    }

    fn resolve_with(
        &self,
        tag: &TypeTag,
        kind: ArgKind,
        overrides: &CutterOverrides,
    ) -> RegistrationResult<BoxedCutter> {
        let cutter = match tag {
            TypeTag::Int => boxed(integer(overrides)),
            TypeTag::Float => boxed(FloatCutter::new()),
            TypeTag::Str => string(overrides, kind),
            TypeTag::Word => boxed(word(overrides)),
            TypeTag::Text => boxed(text(overrides)),
            TypeTag::Bool => boxed(BoolCutter::new()),
            TypeTag::User => boxed(EntityCutter::user()),
            TypeTag::Group => boxed(EntityCutter::group()),
            TypeTag::Entity => boxed(EntityCutter::any()),
            TypeTag::Named(name) => {
                let factory = self
                    .factories
                    .get(name)
                    .ok_or_else(|| RegistrationError::UnknownType(name.clone()))?;
                factory(overrides, kind)?
            }
            TypeTag::Literal(fragments) => boxed(LiteralCutter::new(fragments.iter().cloned())?),
            TypeTag::List(inner) => boxed(self.sequence(inner, overrides, Collection::List)?),
            TypeTag::VarTuple(inner) => boxed(self.sequence(inner, overrides, Collection::Tuple)?),
            TypeTag::Set(inner) => boxed(self.sequence(inner, overrides, Collection::Set)?),
            TypeTag::Tuple(inners) => {
                let element = element_overrides(overrides);
                let cutters = inners
                    .iter()
                    .map(|inner| self.resolve_with(inner, ArgKind::Positional, &element))
                    .collect::<RegistrationResult<Vec<_>>>()?;
                boxed(GroupCutter::new(cutters)?.item_separated())
            }
            TypeTag::Optional(inner) => {
                boxed(OptionalCutter::new(self.resolve_with(inner, kind, overrides)?))
            }
            TypeTag::Union(inners) => {
                let cutters = inners
                    .iter()
                    .map(|inner| self.resolve_with(inner, kind, overrides))
                    .collect::<RegistrationResult<Vec<_>>>()?;
                boxed(UnionCutter::new(cutters)?)
            }
            TypeTag::Cutter(cutter) => Arc::clone(cutter),
            TypeTag::Factory(factory) => factory(),
        };
        trace!(?tag, cutter = ?cutter, "resolved argument type");
        Ok(cutter)
    }

    fn sequence(
        &self,
        inner: &TypeTag,
        overrides: &CutterOverrides,
        collection: Collection,
    ) -> RegistrationResult<ListCutter> {
        let element = self.resolve_with(inner, ArgKind::Positional, &element_overrides(overrides))?;
        let mut list = ListCutter::new(element).collection(collection);
        if let Some(min) = overrides.min_length {
            list = list.min_length(min);
        }
        if let Some(max) = overrides.max_length {
            list = list.max_length(max);
        }
        Ok(list)
    }
}

impl fmt::Debug for CutterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("CutterRegistry").field("names", &names).finish()
    }
}

fn element_overrides(overrides: &CutterOverrides) -> CutterOverrides {
    CutterOverrides {
        min_length: None,
        max_length: None,
        ..*overrides
    }
}

fn integer(overrides: &CutterOverrides) -> IntegerCutter {
    let mut cutter = IntegerCutter::new();
    if let Some(min) = overrides.min {
        cutter = cutter.min(min);
    }
    if let Some(max) = overrides.max {
        cutter = cutter.max(max);
    }
    cutter
}

fn word(overrides: &CutterOverrides) -> WordCutter {
    let mut cutter = WordCutter::new();
    if let Some(min) = overrides.min_length {
        cutter = cutter.min_length(min);
    }
    if let Some(max) = overrides.max_length {
        cutter = cutter.max_length(max);
    }
    cutter
}

/// `str` is one word for positional arguments and the rest of the text otherwise.
fn string(overrides: &CutterOverrides, kind: ArgKind) -> BoxedCutter {
    match kind {
        ArgKind::Positional => boxed(word(overrides)),
        ArgKind::Rest => boxed(text(overrides)),
    }
}

fn text(overrides: &CutterOverrides) -> StringCutter {
    let mut cutter = StringCutter::new();
    if let Some(min) = overrides.min_length {
        cutter = cutter.min_length(min);
    }
    if let Some(max) = overrides.max_length {
        cutter = cutter.max_length(max);
    }
    cutter
}

// =============================================================================
// CommandTextArgument
// =============================================================================

/// One declared argument of a command: its name, its cutter and its options.
#[derive(Debug, Clone)]
pub struct CommandTextArgument {
    name: String,
    cutter: BoxedCutter,
    options: ArgumentOptions,
}

impl CommandTextArgument {
    /// Binds `name` to `cutter`. A default in `options` makes the argument
    /// optional.
    pub fn new(name: impl Into<String>, cutter: BoxedCutter, options: ArgumentOptions) -> Self {
        let cutter = match &options.default {
            Some(default) => boxed(OptionalCutter::new(cutter).with_default(default.clone())),
            None => cutter,
        };
        Self {
            name: name.into(),
            cutter,
            options,
        }
    }

    /// Resolves `tag` through `registry` and binds the result to `name`.
    pub fn resolve(
        name: impl Into<String>,
        tag: &TypeTag,
        options: ArgumentOptions,
        registry: &CutterRegistry,
    ) -> RegistrationResult<Self> {
        let cutter = registry.resolve(tag, &options)?;
        Ok(Self::new(name, cutter, options))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cutter(&self) -> &BoxedCutter {
        &self.cutter
    }

    pub fn options(&self) -> &ArgumentOptions {
        &self.options
    }

    /// `<name: description>` for required arguments, `[name: description]`
    /// for ones with a default.
    pub fn usage(&self) -> String {
        if self.options.default.is_some() {
            format!("[{}: {}]", self.name, self.cutter.describe())
        } else {
            format!("<{}: {}>", self.name, self.cutter.describe())
        }
    }

    fn validate(&self, value: Value) -> Result<Value, String> {
        self.options
            .validators
            .iter()
            .try_fold(value, |value, validator| validator(value))
    }
}

// =============================================================================
// Arguments
// =============================================================================

/// Bound argument values in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Vec<(String, Value)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.push((name.into(), value));
    }

    /// Returns the raw value of an argument.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(arg, _)| arg == name)
            .map(|(_, value)| value)
    }

    /// Returns an argument converted to `T`.
    pub fn get<T: FromValue>(&self, name: &str) -> ExtractResult<T> {
        let value = self
            .value(name)
            .ok_or_else(|| ExtractError::MissingArgument(name.to_string()))?;
        T::from_value(value.clone()).ok_or_else(|| ExtractError::ArgumentTypeMismatch {
            name: name.to_string(),
            expected: T::EXPECTED,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consumes the arguments into a name to value map.
    pub fn into_map(self) -> HashMap<String, Value> {
        self.values.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a Arguments {
    type Item = (&'a str, &'a Value);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a Value)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

// =============================================================================
// Binding
// =============================================================================

/// Binds `text` (the part of the message after the command head) to the
/// declared arguments.
///
/// Leading whitespace is skipped before each argument. Any non-whitespace
/// text left after the last argument is an [`CommandError::UnexpectedArgument`].
pub async fn bind_arguments(
    arguments: &[CommandTextArgument],
    ctx: &CutContext,
    text: &str,
) -> CommandResult<Arguments> {
    let mut bound = Arguments::new();
    let mut rest = text;

    for argument in arguments {
        let input = rest.trim_start();
        trace!(argument = %argument.name, input, "cutting argument");

        let parsed = match argument.cutter.cut(ctx, input).await {
            Ok(parsed) => parsed,
            Err(err) if input.is_empty() => {
                debug!(argument = %argument.name, reason = %err, "argument missing");
                return Err(CommandError::MissedArgument {
                    name: argument.name.clone(),
                    expected: argument.cutter.describe(),
                });
            }
            Err(err) => {
                debug!(argument = %argument.name, reason = %err, "argument did not match");
                return Err(CommandError::IncorrectArgument {
                    name: argument.name.clone(),
                    expected: argument.cutter.describe(),
                    text: input.to_string(),
                    reason: err.reason,
                });
            }
        };

        let value = argument.validate(parsed.value).map_err(|reason| {
            debug!(argument = %argument.name, %reason, "argument rejected by validator");
            CommandError::IncorrectArgument {
                name: argument.name.clone(),
                expected: argument.cutter.describe(),
                text: input.to_string(),
                reason,
            }
        })?;
        bound.insert(argument.name.clone(), value);
        rest = parsed.remainder;
    }

    let tail = rest.trim();
    if !tail.is_empty() {
        debug!(tail, "unexpected text after arguments");
        return Err(CommandError::UnexpectedArgument {
            text: tail.to_string(),
        });
    }
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::block_on;

    fn arg(name: &str, tag: TypeTag, options: ArgumentOptions) -> CommandTextArgument {
        CommandTextArgument::resolve(name, &tag, options, &CutterRegistry::with_builtins()).unwrap()
    }

    fn bind(arguments: &[CommandTextArgument], text: &str) -> CommandResult<Arguments> {
        block_on(bind_arguments(arguments, &CutContext::detached(), text))
    }

    #[test]
    fn test_bind_name_and_age() {
        let args = [
            arg("name", TypeTag::Word, ArgumentOptions::new()),
            arg("age", TypeTag::Int, ArgumentOptions::new()),
        ];
        let bound = bind(&args, " Bob 30").unwrap();
        assert_eq!(bound.get::<String>("name").unwrap(), "Bob");
        assert_eq!(bound.get::<i64>("age").unwrap(), 30);
        assert_eq!(bound.len(), 2);
    }

    #[test]
    fn test_missed_argument() {
        let args = [
            arg("name", TypeTag::Word, ArgumentOptions::new()),
            arg("age", TypeTag::Int, ArgumentOptions::new()),
        ];
        let err = bind(&args, " Bob   ").unwrap_err();
        assert_eq!(
            err,
            CommandError::MissedArgument {
                name: "age".into(),
                expected: "an integer".into(),
            }
        );
    }

    #[test]
    fn test_incorrect_argument_carries_text() {
        let args = [arg("age", TypeTag::Int, ArgumentOptions::new())];
        let CommandError::IncorrectArgument { name, text, .. } = bind(&args, " old").unwrap_err()
        else {
            panic!("expected an incorrect argument");
        };
        assert_eq!(name, "age");
        assert_eq!(text, "old");
    }

    #[test]
    fn test_unexpected_trailing_text() {
        let args = [arg("age", TypeTag::Int, ArgumentOptions::new())];
        assert_eq!(
            bind(&args, "30 years").unwrap_err(),
            CommandError::UnexpectedArgument {
                text: "years".into()
            }
        );
        assert!(bind(&args, "30   ").is_ok());
    }

    #[test]
    fn test_no_arguments_accepts_only_whitespace() {
        assert!(bind(&[], "  ").unwrap().is_empty());
        assert!(bind(&[], " x").is_err());
    }

    #[test]
    fn test_str_kind_selects_cutter() {
        let word = arg("who", TypeTag::Str, ArgumentOptions::new());
        assert!(bind(std::slice::from_ref(&word), "hello world").is_err());

        let rest = arg("what", TypeTag::Str, ArgumentOptions::new().rest());
        let bound = bind(&[rest], "hello world").unwrap();
        assert_eq!(bound.get::<String>("what").unwrap(), "hello world");
    }

    #[test]
    fn test_named_str_follows_kind() {
        let word = arg("who", "str".into(), ArgumentOptions::new());
        assert!(matches!(
            bind(std::slice::from_ref(&word), "hello world"),
            Err(CommandError::UnexpectedArgument { .. })
        ));

        let rest = arg("what", "str".into(), ArgumentOptions::new().rest().min_length(3));
        let bound = bind(&[rest], "hello world").unwrap();
        assert_eq!(bound.get::<String>("what").unwrap(), "hello world");
    }

    #[test]
    fn test_options_new_is_empty() {
        let options = ArgumentOptions::new();
        assert!(options.default.is_none());
        assert!(options.validators.is_empty());
        assert_eq!(options.kind, ArgKind::Positional);
        assert!(ArgumentOptions::new().default(3_i64).default.is_some());
    }

    #[test]
    fn test_default_makes_argument_optional() {
        let args = [
            arg("count", TypeTag::Int, ArgumentOptions::new().default(1_i64)),
            arg("what", TypeTag::Text, ArgumentOptions::new()),
        ];
        let bound = bind(&args, " apples").unwrap();
        assert_eq!(bound.get::<i64>("count").unwrap(), 1);
        assert_eq!(bound.get::<String>("what").unwrap(), "apples");
        assert!(args[0].usage().starts_with("[count:"));
        assert!(args[1].usage().starts_with("<what:"));
    }

    #[test]
    fn test_optional_tag_binds_none() {
        let args = [arg("n", TypeTag::optional(TypeTag::Int), ArgumentOptions::new())];
        let bound = bind(&args, "").unwrap();
        assert_eq!(bound.get::<Option<i64>>("n").unwrap(), None);
    }

    #[test]
    fn test_overrides_reach_integer() {
        let args = [arg("n", TypeTag::Int, ArgumentOptions::new().min(0).max(10))];
        assert!(matches!(
            bind(&args, "15"),
            Err(CommandError::IncorrectArgument { .. })
        ));
    }

    #[test]
    fn test_list_and_set_tags() {
        let list = [arg("xs", TypeTag::list(TypeTag::Int), ArgumentOptions::new())];
        assert_eq!(bind(&list, "1 2 3").unwrap().get::<Vec<i64>>("xs").unwrap(), vec![1, 2, 3]);

        let set = [arg("xs", TypeTag::set(TypeTag::Int), ArgumentOptions::new())];
        assert_eq!(bind(&set, "2, 2, 1").unwrap().get::<Vec<i64>>("xs").unwrap(), vec![2, 1]);

        let bounded = [arg(
            "xs",
            TypeTag::list(TypeTag::Int),
            ArgumentOptions::new().max_length(2),
        )];
        assert!(matches!(
            bind(&bounded, "1 2 3"),
            Err(CommandError::UnexpectedArgument { .. })
        ));
    }

    #[test]
    fn test_tuple_tag() {
        let args = [arg(
            "pair",
            TypeTag::tuple([TypeTag::Word, TypeTag::Int]),
            ArgumentOptions::new(),
        )];
        let bound = bind(&args, "x 5").unwrap();
        assert_eq!(
            bound.get::<(String, i64)>("pair").unwrap(),
            ("x".to_string(), 5)
        );
    }

    #[test]
    fn test_union_tag_prefers_first() {
        let args = [arg(
            "v",
            TypeTag::union([TypeTag::Int, TypeTag::Word]),
            ArgumentOptions::new(),
        )];
        assert_eq!(bind(&args, "7").unwrap().value("v"), Some(&Value::Int(7)));
        assert_eq!(
            bind(&args, "seven").unwrap().value("v"),
            Some(&Value::Str("seven".into()))
        );
    }

    #[test]
    fn test_validator_transforms_and_rejects() {
        let options = ArgumentOptions::new().validator(|value| match value {
            Value::Int(n) if n % 2 == 0 => Ok(Value::Int(n / 2)),
            _ => Err("must be even".to_string()),
        });
        let args = [arg("n", TypeTag::Int, options)];
        assert_eq!(bind(&args, "8").unwrap().get::<i64>("n").unwrap(), 4);

        let CommandError::IncorrectArgument { reason, .. } = bind(&args, "3").unwrap_err() else {
            panic!("expected an incorrect argument");
        };
        assert_eq!(reason, "must be even");
    }

    #[test]
    fn test_unknown_named_type_fails_at_registration() {
        let registry = CutterRegistry::with_builtins();
        let err = registry
            .resolve(&TypeTag::named("color"), &ArgumentOptions::new())
            .unwrap_err();
        assert!(matches!(err, RegistrationError::UnknownType(name) if name == "color"));
    }

    #[test]
    fn test_custom_registered_type() {
        let mut registry = CutterRegistry::with_builtins();
        registry.register("color", |_, _| {
            Ok(boxed(LiteralCutter::ignore_case(["red", "green", "blue"])?))
        });
        let arg =
            CommandTextArgument::resolve("c", &"color".into(), ArgumentOptions::new(), &registry)
                .unwrap();
        let bound = block_on(bind_arguments(&[arg], &CutContext::detached(), "Red")).unwrap();
        assert_eq!(bound.get::<String>("c").unwrap(), "Red");
    }

    #[test]
    fn test_empty_union_fails_at_registration() {
        let registry = CutterRegistry::with_builtins();
        assert!(matches!(
            registry.resolve(&TypeTag::Union(Vec::new()), &ArgumentOptions::new()),
            Err(RegistrationError::EmptyUnion)
        ));
    }

    #[test]
    fn test_factory_and_ready_cutters() {
        let registry = CutterRegistry::with_builtins();
        let from_factory = registry
            .resolve(&TypeTag::Factory(|| boxed(FloatCutter::new())), &ArgumentOptions::new())
            .unwrap();
        assert_eq!(from_factory.describe(), "a number");

        let ready = registry
            .resolve(&TypeTag::cutter(BoolCutter::new()), &ArgumentOptions::new())
            .unwrap();
        assert_eq!(ready.describe(), BoolCutter::new().describe());
    }

    #[test]
    fn test_get_type_mismatch() {
        let mut arguments = Arguments::new();
        arguments.insert("n", Value::Int(1));
        assert!(matches!(
            arguments.get::<String>("n"),
            Err(ExtractError::ArgumentTypeMismatch { .. })
        ));
        assert!(matches!(
            arguments.get::<i64>("m"),
            Err(ExtractError::MissingArgument(_))
        ));
    }
}
