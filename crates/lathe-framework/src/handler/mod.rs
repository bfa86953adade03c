//! Handler functions as tower services.
//!
//! - [`FromCtxFn`] is implemented for async functions and closures whose
//!   parameters all implement [`FromContext`](crate::FromContext).
//! - [`HandlerService`] wraps such a function into a
//!   `tower::Service<Arc<LatheContext>>` and turns its return value into a
//!   reply through [`HandlerResponse`].
//! - [`ServiceBuilderExt`] adds `.handler(f)` to `tower::ServiceBuilder`.
//!
//! ```text
//! on_command(spec)          ← CommandLayer
//!     .handler(my_handler)  ← CommandService<HandlerService<..>>
//! ```

pub mod builder;
pub mod service;
pub mod traits;

pub use builder::ServiceBuilderExt;
pub use service::{HandlerResponse, HandlerService};
pub use traits::FromCtxFn;
