//! Lathe Runtime - configuration, logging and the event loop.
//!
//! This crate provides:
//! - Layered configuration (`lathe.toml`, `LATHE_*` environment variables)
//! - Logging setup on top of `tracing-subscriber`
//! - [`LatheRuntime`], which feeds an [`EventSource`](lathe_core::EventSource)
//!   into a [`Dispatcher`](lathe_framework::Dispatcher)
//!
//! ```ignore
//! use lathe_runtime::LatheRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = LatheRuntime::builder()
//!         .service(on_command(add_spec).handler(add))
//!         .build()?;
//!
//!     runtime.run(long_poll_source).await?;
//!     Ok(())
//! }
//! ```
//!
//! With the `http-client` feature and no explicit `api(...)`, the builder
//! creates an HTTP API client from the `[api]` section.

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, LatheConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{LatheRuntime, RuntimeBuilder, RuntimeStats};

pub use tracing;
pub use tracing_subscriber;

/// Logging macros for bot code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
