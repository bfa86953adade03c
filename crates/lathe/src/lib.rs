//! # Lathe
//!
//! Declarative command routing and argument parsing for chat bots.
//!
//! ## Overview
//!
//! A message such as `/add Bob 30` is matched against a command's routing
//! head (`/add`), and the remaining text is cut into typed arguments by
//! composable parsers called *cutters*. Handlers receive the bound arguments
//! by injection and reply by returning a value.
//!
//! ```text
//! ┌─────────────┐     ┌────────────┐     ┌───────────────────────────────┐
//! │ EventSource │────▶│  Runtime   │────▶│ Dispatcher                    │
//! └─────────────┘     │ (task per  │     │  ├─ on_command("/add") ──▶ fn │
//!                     │  message)  │     │  ├─ on_command("/ban") ──▶ fn │
//!                     └────────────┘     │  └─ fallback service ────▶ fn │
//!                                        └───────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lathe::prelude::*;
//!
//! async fn add(args: Arguments) -> Result<String, BoxError> {
//!     let name: String = args.get("name")?;
//!     let age: i64 = args.get("age")?;
//!     Ok(format!("{name} is {age}"))
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let spec = CommandSpec::builder()
//!         .prefix("/")
//!         .name("add")
//!         .arg("name", TypeTag::Word)
//!         .arg("age", TypeTag::Int)
//!         .build()?;
//!
//!     let runtime = LatheRuntime::builder()
//!         .service(on_command(spec).handler(add))
//!         .build()?;
//!     runtime.run(source).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` (default): load `lathe.toml`
//! - `json-log`: JSON log output
//! - `http-client`: build an HTTP API client from the `[api]` section

pub use lathe_core as core;
pub use lathe_framework as framework;
pub use lathe_runtime as runtime;
pub use lathe_transport as transport;

/// Commonly used types for building bots.
///
/// ```rust,ignore
/// use lathe::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use lathe_runtime::{LatheConfig, LatheRuntime, RuntimeStats};

    // Commands and argument declarations
    pub use lathe_framework::{
        ArgumentOptions, Arguments, CommandName, CommandSpec, CutterRegistry, TypeTag, on_command,
    };

    // Cutters for hand-built argument grammars
    pub use lathe_framework::cutter::{
        BoolCutter, Collection, EntityCutter, FloatCutter, GroupCutter, IntegerCutter,
        ListCutter, LiteralCutter, OptionalCutter, RegexCutter, StringCutter, UnionCutter,
        WordCutter, boxed,
    };
    pub use lathe_framework::{BoxedCutter, Cutter, FromValue, Value};

    // Handlers and extractors
    pub use lathe_framework::{
        Api, BoxError, Dispatcher, Event, FromContext, LatheContext, ServiceBuilder,
        ServiceBuilderExt,
    };

    // Errors
    pub use lathe_framework::{CommandError, RegistrationError};

    // Collaborator contracts
    pub use lathe_core::{
        ApiClient, ApiClientExt, BoxedApi, ChannelEventSource, EventSource, Group, MessageEvent,
        User,
    };
}
