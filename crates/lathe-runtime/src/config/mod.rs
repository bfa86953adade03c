//! Configuration module for the Lathe runtime.
//!
//! This module provides figment-based loading and validation of logging,
//! API and event loop settings.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    ApiConfig, LatheConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig,
    RuntimeConfig, SpanEventConfig,
};
pub use validation::validate_config;
