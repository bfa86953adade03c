//! Error types for the Lathe framework.

use thiserror::Error;

/// Returned by a service when an event is **not** addressed to it.
///
/// The dispatcher recognises this error and silently moves on to the next
/// service without logging anything. All other errors are treated as genuine
/// failures.
#[derive(Debug, Clone, Error)]
#[error("message not addressed to this service")]
pub struct EventSkipped;

/// Errors that can occur during context extraction.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// No bound command arguments are stored in the context.
    #[error("no command arguments in context; use on_command() to route the handler")]
    NotACommand,

    /// The command has no argument with this name.
    #[error("command has no argument named '{0}'")]
    MissingArgument(String),

    /// The bound value has a different type than requested.
    #[error("argument '{name}' is not {expected}")]
    ArgumentTypeMismatch {
        /// Argument name.
        name: String,
        /// Expected type description.
        expected: &'static str,
    },

    /// Custom extraction error.
    #[error("{0}")]
    Custom(String),
}

impl ExtractError {
    /// Creates a custom extraction error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

/// Failure of a single cutter to parse the start of its input.
///
/// This is the `Unmatched` outcome of a cut. It never escapes the command
/// layer: the binder converts it into a [`CommandError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct BadArgument {
    /// Human-readable diagnostic.
    pub reason: String,
}

impl BadArgument {
    /// Creates a new failure with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Outcome of routing a message to a command when it did not end up bound.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The message does not start with any prefix + name of the command.
    #[error("message is not addressed to this command")]
    NotRouted,

    /// The text ran out before a required argument could be parsed.
    #[error("missing argument '{name}': expected {expected}")]
    MissedArgument {
        /// Argument name.
        name: String,
        /// Description of the expected input.
        expected: String,
    },

    /// Text was present but did not match the argument's cutter.
    #[error("invalid argument '{name}': expected {expected}, got \"{text}\"")]
    IncorrectArgument {
        /// Argument name.
        name: String,
        /// Description of the expected input.
        expected: String,
        /// The text the cutter failed against.
        text: String,
        /// The cutter's or validator's diagnostic.
        reason: String,
    },

    /// Every argument was bound but non-whitespace text remained.
    #[error("unexpected text after the last argument: \"{text}\"")]
    UnexpectedArgument {
        /// The unconsumed text, trimmed.
        text: String,
    },
}

impl CommandError {
    /// Returns `true` for failures that happen after the command was routed.
    pub fn is_routed(&self) -> bool {
        !matches!(self, Self::NotRouted)
    }
}

/// Errors raised while building a command; they never occur at request time.
#[derive(Debug, Clone, Error)]
pub enum RegistrationError {
    /// No cutter is registered under this type name.
    #[error("unknown argument type '{0}'")]
    UnknownType(String),

    /// A union was built without alternatives.
    #[error("a union needs at least one cutter")]
    EmptyUnion,

    /// A group was built without elements.
    #[error("a group needs at least one cutter")]
    EmptyGroup,

    /// A literal cutter was built without fragments.
    #[error("a literal needs at least one fragment")]
    EmptyLiteral,

    /// A regular expression failed to compile.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },

    /// Two arguments of one command share a name.
    #[error("argument '{0}' is declared more than once")]
    DuplicateArgument(String),

    /// A command was built with neither prefixes nor names.
    #[error("a command needs at least one prefix or name")]
    NoRoute,
}

impl RegistrationError {
    pub(crate) fn invalid_pattern(pattern: impl Into<String>, err: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: err.to_string(),
        }
    }
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Result type for command routing and binding.
pub type CommandResult<T> = Result<T, CommandError>;

/// Result type for command registration.
pub type RegistrationResult<T> = Result<T, RegistrationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_display() {
        let err = CommandError::IncorrectArgument {
            name: "age".into(),
            expected: "an integer".into(),
            text: "abc".into(),
            reason: "not a number".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid argument 'age': expected an integer, got \"abc\""
        );
        assert!(err.is_routed());
        assert!(!CommandError::NotRouted.is_routed());
    }
}
