//! Parameter injection for handlers.
//!
//! Any type implementing [`FromContext`] can appear as a handler parameter;
//! the framework extracts it from the [`LatheContext`] before the call. If an
//! extraction fails the handler is skipped. [`Option<T>`] never fails.
//!
//! ```rust,ignore
//! async fn whoami(event: Event, api: Api) -> String {
//!     match api.fetch_user(&event.from_id.to_string()).await {
//!         Ok(Some(user)) => user.full_name(),
//!         _ => "nobody".into(),
//!     }
//! }
//! ```

use std::ops::Deref;
use std::sync::Arc;

use lathe_core::{BoxedApi, MessageEvent};

use crate::context::LatheContext;
use crate::error::ExtractResult;

/// A type that can be extracted from a [`LatheContext`].
pub trait FromContext: Sized {
    fn from_context(ctx: &LatheContext) -> ExtractResult<Self>;
}

/// The message being handled.
#[derive(Debug, Clone)]
pub struct Event(pub Arc<MessageEvent>);

impl Deref for Event {
    type Target = MessageEvent;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromContext for Event {
    fn from_context(ctx: &LatheContext) -> ExtractResult<Self> {
        Ok(Event(Arc::clone(ctx.event())))
    }
}

/// The API client, for handlers that make calls of their own.
#[derive(Clone)]
pub struct Api(pub BoxedApi);

impl Deref for Api {
    type Target = BoxedApi;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromContext for Api {
    fn from_context(ctx: &LatheContext) -> ExtractResult<Self> {
        Ok(Api(Arc::clone(ctx.api())))
    }
}

impl FromContext for BoxedApi {
    fn from_context(ctx: &LatheContext) -> ExtractResult<Self> {
        Ok(Arc::clone(ctx.api()))
    }
}

impl<T: FromContext> FromContext for Option<T> {
    fn from_context(ctx: &LatheContext) -> ExtractResult<Self> {
        Ok(T::from_context(ctx).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::Arguments;
    use crate::testing::{MockApi, context};

    #[test]
    fn test_event_extraction() {
        let ctx = context(&MockApi::new(), "/ping");
        let event = Event::from_context(&ctx).unwrap();
        assert_eq!(event.text, "/ping");
    }

    #[test]
    fn test_optional_never_fails() {
        let ctx = context(&MockApi::new(), "/ping");
        assert!(Option::<Arguments>::from_context(&ctx).unwrap().is_none());
        assert!(Option::<Api>::from_context(&ctx).unwrap().is_some());
    }
}
