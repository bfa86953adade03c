//! Runtime error types.

use thiserror::Error;

pub use crate::config::{ConfigError, ConfigResult};

/// Errors that can occur while building or running a [`LatheRuntime`](crate::LatheRuntime).
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No API client was supplied and none could be built from configuration.
    #[error("No API client configured")]
    MissingApiClient,

    /// The configured API client could not be constructed.
    #[error("Failed to build API client: {0}")]
    ApiClient(#[from] lathe_core::ApiError),

    /// The runtime is already consuming an event source.
    #[error("Runtime is already running")]
    AlreadyRunning,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
