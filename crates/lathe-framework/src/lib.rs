//! # Lathe Framework
//!
//! Command routing and argument parsing for chat bots.
//!
//! This layer provides:
//! - [`cutter`]: composable parsers ("cutters") that consume a prefix of a
//!   message and produce typed [`Value`]s
//! - [`binder`]: resolution of declared argument types into cutters and the
//!   binding of message text to named arguments
//! - [`command`]: command specs, their routing grammar and the
//!   [`on_command`] tower layer
//! - Axum-style handler injection ([`FromContext`], [`handler`]) and the
//!   sequential [`Dispatcher`]

pub mod binder;
pub mod command;
pub mod context;
pub mod cutter;
pub mod dispatcher;
pub mod error;
pub mod extractor;
pub mod handler;

#[cfg(test)]
pub(crate) mod testing;

pub use binder::{
    ArgKind, ArgumentOptions, Arguments, CommandTextArgument, CutterOverrides, CutterRegistry,
    TypeTag, Validator, bind_arguments,
};
pub use command::{
    BoundCommand, CommandBuilder, CommandLayer, CommandName, CommandService, CommandSpec,
    on_command,
};
pub use context::LatheContext;
pub use cutter::{BoxedCutter, CutContext, CutResult, Cutter, FromValue, Parsed, Value};
pub use dispatcher::{BoxedService, Dispatcher};
pub use error::{
    BadArgument, CommandError, CommandResult, EventSkipped, ExtractError, ExtractResult,
    RegistrationError, RegistrationResult,
};
pub use extractor::{Api, Event, FromContext};
pub use handler::{FromCtxFn, HandlerResponse, HandlerService, ServiceBuilderExt};

pub use tower::{BoxError, Layer, Service, ServiceBuilder};
