//! Values produced by cutters and typed access to them.

use std::fmt;
use std::sync::Arc;

use lathe_core::{Entity, Group, User};

/// A parsed argument value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absence of a value, e.g. an optional argument that was not given.
    #[default]
    None,
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    /// An ordered, mutable-by-convention collection.
    List(Vec<Value>),
    /// A fixed positional sequence (groups) or an immutable collection.
    Tuple(Vec<Value>),
    /// A collection without duplicates, in first-seen order.
    Set(Vec<Value>),
    User(User),
    Group(Group),
}

impl Value {
    /// Returns `true` for [`Value::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns the string slice of a [`Value::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the items of any collection value.
    pub fn as_items(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) | Self::Tuple(items) | Self::Set(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        }

        match self {
            Self::None => f.write_str("none"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Str(s) => f.write_str(s),
            Self::List(items) => {
                f.write_str("[")?;
                join(f, items)?;
                f.write_str("]")
            }
            Self::Tuple(items) => {
                f.write_str("(")?;
                join(f, items)?;
                f.write_str(")")
            }
            Self::Set(items) => {
                f.write_str("{")?;
                join(f, items)?;
                f.write_str("}")
            }
            Self::User(user) => f.write_str(&user.mention()),
            Self::Group(group) => f.write_str(&group.mention()),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<User> for Value {
    fn from(user: User) -> Self {
        Self::User(user)
    }
}

impl From<Group> for Value {
    fn from(group: Group) -> Self {
        Self::Group(group)
    }
}

impl From<Entity> for Value {
    fn from(entity: Entity) -> Self {
        match entity {
            Entity::User(user) => Self::User(user),
            Entity::Group(group) => Self::Group(group),
        }
    }
}

/// Default value of an optional argument: fixed, or produced on demand.
#[derive(Clone)]
pub enum DefaultValue {
    Value(Value),
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    /// Creates a default produced by calling `f` on every use.
    pub fn factory<F>(f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(f))
    }

    /// Produces the default value.
    pub fn produce(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Factory(f) => f(),
        }
    }
}

impl Default for DefaultValue {
    fn default() -> Self {
        Self::Value(Value::None)
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

// =============================================================================
// FromValue
// =============================================================================

/// Conversion from a parsed [`Value`] into a concrete Rust type.
pub trait FromValue: Sized {
    /// Short description of the accepted value, for error messages.
    const EXPECTED: &'static str;

    /// Converts the value, returning `None` on a type mismatch.
    fn from_value(value: Value) -> Option<Self>;
}

impl FromValue for Value {
    const EXPECTED: &'static str = "a value";

    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "an integer";

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Int(n) => Some(n),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "a number";

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Float(x) => Some(x),
            Value::Int(n) => Some(n as f64),
            _ => None,
        }
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "a boolean";

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "a string";

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl FromValue for User {
    const EXPECTED: &'static str = "a user";

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::User(user) => Some(user),
            _ => None,
        }
    }
}

impl FromValue for Group {
    const EXPECTED: &'static str = "a community";

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Group(group) => Some(group),
            _ => None,
        }
    }
}

impl FromValue for Entity {
    const EXPECTED: &'static str = "a user or community";

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::User(user) => Some(Entity::User(user)),
            Value::Group(group) => Some(Entity::Group(group)),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::None => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    const EXPECTED: &'static str = "a list";

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => {
                items.into_iter().map(T::from_value).collect()
            }
            _ => None,
        }
    }
}

impl<A: FromValue, B: FromValue> FromValue for (A, B) {
    const EXPECTED: &'static str = "a pair";

    fn from_value(value: Value) -> Option<Self> {
        let Value::Tuple(items) = value else {
            return None;
        };
        let [a, b]: [Value; 2] = items.try_into().ok()?;
        Some((A::from_value(a)?, B::from_value(b)?))
    }
}

impl<A: FromValue, B: FromValue, C: FromValue> FromValue for (A, B, C) {
    const EXPECTED: &'static str = "a triple";

    fn from_value(value: Value) -> Option<Self> {
        let Value::Tuple(items) = value else {
            return None;
        };
        let [a, b, c]: [Value; 3] = items.try_into().ok()?;
        Some((A::from_value(a)?, B::from_value(b)?, C::from_value(c)?))
    }
}
