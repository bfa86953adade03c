//! The innermost service of every stack: one handler plus the conversion of
//! its return value into a reply. Routing happens in the
//! [`CommandLayer`](crate::CommandLayer) wrapped around it.

use std::marker::PhantomData;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use tower::{BoxError, Service};
use tracing::debug;

use super::traits::FromCtxFn;
use crate::context::LatheContext;

/// What a handler's return value turns into.
///
/// Text is sent to the message's conversation as a reply. An `Err`, whether
/// returned by the handler or raised by `messages.send`, goes up to the
/// dispatcher.
#[async_trait]
pub trait HandlerResponse: Send + 'static {
    async fn respond(self, ctx: &LatheContext) -> Result<(), BoxError>;
}

#[async_trait]
impl HandlerResponse for () {
    async fn respond(self, _ctx: &LatheContext) -> Result<(), BoxError> {
        Ok(())
    }
}

#[async_trait]
impl HandlerResponse for String {
    async fn respond(self, ctx: &LatheContext) -> Result<(), BoxError> {
        ctx.reply(&self).await?;
        Ok(())
    }
}

#[async_trait]
impl HandlerResponse for &'static str {
    async fn respond(self, ctx: &LatheContext) -> Result<(), BoxError> {
        ctx.reply(self).await?;
        Ok(())
    }
}

/// `None` sends nothing.
#[async_trait]
impl<T: HandlerResponse> HandlerResponse for Option<T> {
    async fn respond(self, ctx: &LatheContext) -> Result<(), BoxError> {
        match self {
            Some(t) => t.respond(ctx).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<T, E> HandlerResponse for Result<T, E>
where
    T: HandlerResponse,
    E: Into<BoxError> + Send + 'static,
{
    async fn respond(self, ctx: &LatheContext) -> Result<(), BoxError> {
        match self {
            Ok(t) => t.respond(ctx).await,
            Err(e) => Err(e.into()),
        }
    }
}

/// Adapts one handler function to `Service<Arc<LatheContext>>`.
///
/// Parameters that fail to extract make the call a logged no-op, so a handler
/// asking for [`Arguments`](crate::Arguments) outside a command stays silent.
pub struct HandlerService<F, R, T> {
    handler: F,
    _marker: PhantomData<fn() -> (R, T)>,
}

impl<F, R, T> HandlerService<F, R, T> {
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

impl<F: Clone, R, T> Clone for HandlerService<F, R, T> {
    fn clone(&self) -> Self {
        Self::new(self.handler.clone())
    }
}

impl<F, R, T> Service<Arc<LatheContext>> for HandlerService<F, R, T>
where
    F: FromCtxFn<R, T>,
    R: HandlerResponse,
{
    type Response = ();
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<(), Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, ctx: Arc<LatheContext>) -> Self::Future {
        let handler = self.handler.clone();
        async move {
            let Ok(response) = handler
                .call(Arc::clone(&ctx))
                .await
                .inspect_err(|err| debug!(error = %err, "handler parameters not extracted"))
            else {
                return Ok(());
            };
            response.respond(&ctx).await
        }
        .boxed()
    }
}
