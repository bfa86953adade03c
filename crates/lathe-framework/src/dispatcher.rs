//! Sequential message dispatcher.
//!
//! Services are offered each message in registration order. A service that is
//! not interested answers with [`EventSkipped`]; any other outcome counts as
//! handled. Once a service stops propagation (a command layer does so as soon
//! as its head matches) later services are not tried, so registration order is
//! the only tie-break between commands with overlapping routes.
//!
//! ```rust,ignore
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.add(on_command(add_spec).handler(add));
//! dispatcher.add(ServiceBuilder::new().handler(fallback));
//!
//! dispatcher.dispatch(Arc::new(event), api).await;
//! ```

use std::fmt;
use std::sync::Arc;

use tower::util::BoxCloneSyncService;
use tower::{BoxError, Service, ServiceExt};
use tracing::{Instrument, debug, debug_span, error};

use lathe_core::{BoxedApi, MessageEvent};

use crate::context::LatheContext;
use crate::error::EventSkipped;

/// A type-erased service the dispatcher can hold.
pub type BoxedService = BoxCloneSyncService<Arc<LatheContext>, (), BoxError>;

/// Offers messages to registered services in order.
#[derive(Clone, Default)]
pub struct Dispatcher {
    services: Vec<BoxedService>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a service; services are tried in the order they are added.
    pub fn add<S>(&mut self, service: S)
    where
        S: Service<Arc<LatheContext>, Response = (), Error = BoxError>
            + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        self.services.push(BoxCloneSyncService::new(service));
    }

    /// Adds a service (builder pattern).
    pub fn with<S>(mut self, service: S) -> Self
    where
        S: Service<Arc<LatheContext>, Response = (), Error = BoxError>
            + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        self.add(service);
        self
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Dispatches one message.
    ///
    /// Returns `true` if any service handled it. Handler errors are logged
    /// and do not stop later services.
    pub async fn dispatch(&self, event: Arc<MessageEvent>, api: BoxedApi) -> bool {
        let span = debug_span!("dispatch", peer_id = event.peer_id, from_id = event.from_id);
        self.dispatch_inner(event, api).instrument(span).await
    }

    async fn dispatch_inner(&self, event: Arc<MessageEvent>, api: BoxedApi) -> bool {
        let ctx = Arc::new(LatheContext::new(event, api));
        let mut handled = false;

        for (index, service) in self.services.iter().enumerate() {
            if !ctx.is_propagating() {
                debug!(index, "propagation stopped");
                break;
            }
            match service.clone().oneshot(Arc::clone(&ctx)).await {
                Ok(()) => handled = true,
                Err(err) if err.is::<EventSkipped>() => {}
                Err(err) => {
                    handled = true;
                    error!(index, "Handler error: {err}");
                }
            }
        }

        handled
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("services", &self.services.len())
            .finish()
    }
}
