//! Event sources.
//!
//! An [`EventSource`] yields a lazy, unbounded and non-restartable stream of
//! raw event payloads. How the payloads are obtained (long polling, a
//! callback server, a test channel) is the source's own business.

use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::Value;
use tokio::sync::mpsc;

/// A boxed stream of raw event payloads.
pub type EventStream = BoxStream<'static, Value>;

/// Producer of raw event payloads.
///
/// Consuming `self` makes the sequence non-restartable: once turned into a
/// stream, the source is gone.
pub trait EventSource: Send + 'static {
    /// Turns the source into its stream of payloads.
    fn into_stream(self) -> EventStream;
}

impl EventSource for EventStream {
    fn into_stream(self) -> EventStream {
        self
    }
}

/// An [`EventSource`] fed through a tokio channel.
///
/// The stream ends once every [`EventSender`] has been dropped.
pub struct ChannelEventSource {
    rx: mpsc::Receiver<Value>,
}

/// The sending half of a [`ChannelEventSource`].
pub type EventSender = mpsc::Sender<Value>;

impl ChannelEventSource {
    /// Creates a channel-backed source with the given buffer size.
    pub fn new(buffer: usize) -> (EventSender, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self { rx })
    }
}

impl EventSource for ChannelEventSource {
    fn into_stream(self) -> EventStream {
        futures::stream::unfold(self.rx, |mut rx| async move {
            rx.recv().await.map(|value| (value, rx))
        })
        .boxed()
    }
}
