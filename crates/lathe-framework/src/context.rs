//! Per-message context handed through the service stack.
//!
//! The dispatcher creates one [`LatheContext`] per message and offers the
//! same `Arc` to every service in turn. Besides the message and the API
//! client it holds the propagation flag and the slot where the command layer
//! leaves the bound arguments for the handler.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::Value as Json;

use lathe_core::{ApiClientExt, ApiResult, BoxedApi, MessageEvent};

use crate::command::BoundCommand;
use crate::cutter::CutContext;

pub struct LatheContext {
    event: Arc<MessageEvent>,
    api: BoxedApi,
    propagating: AtomicBool,
    bound: Mutex<Option<BoundCommand>>,
}

impl LatheContext {
    pub fn new(event: Arc<MessageEvent>, api: BoxedApi) -> Self {
        Self {
            event,
            api,
            propagating: AtomicBool::new(true),
            bound: Mutex::new(None),
        }
    }

    pub fn event(&self) -> &Arc<MessageEvent> {
        &self.event
    }

    pub fn api(&self) -> &BoxedApi {
        &self.api
    }

    /// Later services in the dispatcher will not see this message.
    pub fn stop_propagation(&self) {
        self.propagating.store(false, Ordering::SeqCst);
    }

    pub fn is_propagating(&self) -> bool {
        self.propagating.load(Ordering::SeqCst)
    }

    /// Records the command this message was bound to, replacing any earlier one.
    pub fn set_bound(&self, command: BoundCommand) {
        *self.bound.lock() = Some(command);
    }

    /// The command the message was last bound to, if any.
    pub fn bound(&self) -> Option<BoundCommand> {
        self.bound.lock().clone()
    }

    /// The environment cutters of this message run in.
    pub fn cut_context(&self) -> CutContext {
        CutContext::new(Arc::clone(&self.api), Arc::clone(&self.event))
    }

    /// Sends `text` back to the conversation the message came from.
    pub async fn reply(&self, text: &str) -> ApiResult<Json> {
        self.api.send_message(self.event.peer_id, text).await
    }
}

impl fmt::Debug for LatheContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LatheContext")
            .field("peer_id", &self.event.peer_id)
            .field("text", &self.event.text)
            .field("propagating", &self.is_propagating())
            .field("bound", &*self.bound.lock())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::Arguments;
    use crate::testing::{MockApi, context};

    #[test]
    fn test_bound_slot_is_replaced() {
        let ctx = context(&MockApi::new(), "/x");
        assert!(ctx.bound().is_none());

        for name in ["/x", "/y"] {
            ctx.set_bound(BoundCommand {
                name: name.to_string(),
                arguments: Arguments::new(),
            });
        }
        assert_eq!(ctx.bound().map(|b| b.name).as_deref(), Some("/y"));
    }

    #[test]
    fn test_stop_propagation() {
        let ctx = context(&MockApi::new(), "hi");
        assert!(ctx.is_propagating());
        ctx.stop_propagation();
        assert!(!ctx.is_propagating());
    }

    #[tokio::test]
    async fn test_reply_targets_peer() {
        let api = MockApi::new();
        let ctx = LatheContext::new(
            Arc::new(MessageEvent::new(2_000_000_003, 7, "/x")),
            api.boxed(),
        );
        ctx.reply("pong").await.unwrap();

        let calls = api.calls();
        assert_eq!(calls[0].0, "messages.send");
        assert_eq!(calls[0].1["peer_id"], serde_json::json!(2_000_000_003));
        assert_eq!(api.sent_messages(), vec!["pong".to_string()]);
    }

    #[test]
    fn test_cut_context_carries_collaborators() {
        let ctx = context(&MockApi::new(), "hi");
        let cut = ctx.cut_context();
        assert!(cut.api().is_some());
        assert_eq!(cut.event().map(|e| e.text.as_str()), Some("hi"));
    }
}
