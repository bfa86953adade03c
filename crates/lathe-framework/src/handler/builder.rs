//! `.handler(f)` for tower's [`ServiceBuilder`].

use tower::{Layer, ServiceBuilder};

use super::service::{HandlerResponse, HandlerService};
use super::traits::FromCtxFn;

/// Finishes a [`ServiceBuilder`] stack with a handler function.
///
/// ```rust,ignore
/// let catch_all = ServiceBuilder::new().handler(|| async { "Unknown command" });
/// let add = on_command(spec).handler(add);
/// ```
pub trait ServiceBuilderExt<L> {
    fn handler<F, R, T>(self, handler: F) -> L::Service
    where
        F: FromCtxFn<R, T>,
        R: HandlerResponse,
        L: Layer<HandlerService<F, R, T>>;
}

impl<L> ServiceBuilderExt<L> for ServiceBuilder<L> {
    fn handler<F, R, T>(self, handler: F) -> L::Service
    where
        F: FromCtxFn<R, T>,
        R: HandlerResponse,
        L: Layer<HandlerService<F, R, T>>,
    {
        self.service(HandlerService::new(handler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandSpec;
    use crate::testing::{MockApi, context};
    use crate::{CommandLayer, LatheContext};
    use std::sync::Arc;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_plain_builder_runs_handler_for_every_message() {
        let api = MockApi::new();
        let svc = ServiceBuilder::new().handler(|| async { "seen" });
        svc.oneshot(context(&api, "anything")).await.unwrap();
        assert_eq!(api.sent_messages(), vec!["seen".to_string()]);
    }

    #[tokio::test]
    async fn test_handler_under_command_layer() {
        let api = MockApi::new();
        let spec = CommandSpec::builder().prefix("/").name("ping").build().unwrap();
        let svc = ServiceBuilder::new()
            .layer(CommandLayer::new(spec))
            .handler(|| async { "pong" });

        let ctx: Arc<LatheContext> = context(&api, "/ping");
        svc.oneshot(Arc::clone(&ctx)).await.unwrap();
        assert_eq!(api.sent_messages(), vec!["pong".to_string()]);
        assert!(!ctx.is_propagating());
    }
}
