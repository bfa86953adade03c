//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating a [`LatheConfig`](super::LatheConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("configuration file {} does not exist", .0.display())]
    FileNotFound(PathBuf),

    /// The file extension has no enabled format behind it.
    #[error("unsupported configuration format `.{0}`")]
    UnsupportedFormat(String),

    /// A source could not be read or did not match the schema.
    #[error(transparent)]
    Extract(Box<figment::Error>),

    /// A required value is absent.
    #[error("`{field}` is required")]
    MissingField { field: &'static str },

    /// A value is present but unusable.
    #[error("`{field}` {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn missing(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Extract(Box::new(err))
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
