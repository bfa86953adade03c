use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use tower::{BoxError, Layer, Service, ServiceBuilder, ServiceExt};
use tower_layer::{Identity, Stack};
use tracing::{debug, error};

use super::CommandSpec;
use super::extractor::BoundCommand;
use crate::context::LatheContext;
use crate::error::EventSkipped;
use crate::handler::{FromCtxFn, HandlerResponse, HandlerService, ServiceBuilderExt};

/// Creates a tower [`Layer`] that routes messages to `spec` and binds its
/// arguments before calling the inner service.
///
/// # Example
///
/// ```rust,ignore
/// dispatcher.add(on_command(add_spec).handler(add));
///
/// dispatcher.add(
///     on_command(echo_spec)
///         .reply_error(false)
///         .block(false)
///         .handler(echo),
/// );
/// ```
pub fn on_command(spec: CommandSpec) -> CommandLayer {
    CommandLayer::new(spec)
}

/// A tower [`Layer`] that routes and binds a command.
///
/// Once the head of a message matches, the command owns the message: later
/// services are not tried even if binding fails (unless `block(false)`).
#[derive(Debug, Clone)]
pub struct CommandLayer {
    spec: Arc<CommandSpec>,
    reply_error: bool,
    block: bool,
}

impl CommandLayer {
    /// Creates a layer with error replies and blocking enabled.
    pub fn new(spec: CommandSpec) -> Self {
        Self {
            spec: Arc::new(spec),
            reply_error: true,
            block: true,
        }
    }

    /// Enable/disable the usage reply on binding failures (default: `true`).
    pub fn reply_error(mut self, enabled: bool) -> Self {
        self.reply_error = enabled;
        self
    }

    /// Enable/disable propagation blocking on a routing match (default: `true`).
    pub fn block(mut self, enabled: bool) -> Self {
        self.block = enabled;
        self
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    /// Convert to a [`ServiceBuilder`] for stacking further layers.
    pub fn build(self) -> ServiceBuilder<Stack<CommandLayer, Identity>> {
        ServiceBuilder::new().layer(self)
    }

    /// Wrap a handler function with this command layer.
    pub fn handler<F, R, T>(self, handler: F) -> CommandService<HandlerService<F, R, T>>
    where
        F: FromCtxFn<R, T>,
        R: HandlerResponse,
    {
        self.build().handler(handler)
    }
}

impl<S> Layer<S> for CommandLayer {
    type Service = CommandService<S>;

    fn layer(&self, inner: S) -> CommandService<S> {
        CommandService {
            spec: Arc::clone(&self.spec),
            reply_error: self.reply_error,
            block: self.block,
            inner,
        }
    }
}

/// The [`Service`] produced by [`CommandLayer`].
///
/// A message whose head does not match is rejected with [`EventSkipped`]. A
/// matching message has its arguments bound; on success they are stored in
/// the context as a [`BoundCommand`] and the inner service is called,
/// otherwise a usage reply is sent (if enabled) and the call completes.
#[derive(Debug, Clone)]
pub struct CommandService<S> {
    spec: Arc<CommandSpec>,
    reply_error: bool,
    block: bool,
    inner: S,
}

impl<S> Service<Arc<LatheContext>> for CommandService<S>
where
    S: Service<Arc<LatheContext>, Response = (), Error = BoxError> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = ();
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<(), Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, ctx: Arc<LatheContext>) -> Self::Future {
        let spec = Arc::clone(&self.spec);
        let reply_error = self.reply_error;
        let block = self.block;
        let inner = self.inner.clone();

        async move {
            let Some(remainder) = spec.match_head(&ctx.event().text) else {
                return Err(Box::new(EventSkipped) as BoxError);
            };
            let command = spec.display_name();
            debug!(%command, "command routed");

            if block {
                ctx.stop_propagation();
            }

            let result = spec.bind(&ctx.cut_context(), remainder).await;
            match result {
                Ok(arguments) => {
                    ctx.set_bound(BoundCommand {
                        name: command,
                        arguments,
                    });
                    inner.oneshot(ctx).await
                }
                Err(err) => {
                    debug!(%command, error = %err, "command arguments not bound");
                    if reply_error {
                        let message = format!("{err}\nUsage: {}", spec.usage());
                        if let Err(e) = ctx.reply(&message).await {
                            error!(%command, "Failed to send usage reply: {e}");
                        }
                    }
                    Ok(())
                }
            }
        }
        .boxed()
    }
}
