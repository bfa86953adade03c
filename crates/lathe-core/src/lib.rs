//! # Lathe Core
//!
//! Collaborator contracts and data model shared by every Lathe crate.
//!
//! - **API access**: the [`ApiClient`] trait and its typed [`ApiClientExt`]
//!   helpers. Transport, retries and rate limiting belong to implementors.
//! - **Events**: [`RawEvent`] envelopes and the [`MessageEvent`] they carry.
//! - **Event sources**: the [`EventSource`] contract and a channel-backed
//!   [`ChannelEventSource`].
//! - **Entities**: [`User`], [`Group`] and [`Entity`] wrappers returned by
//!   mention resolution.
//!
//! ```text
//! ┌─────────────┐  raw payloads  ┌──────────┐  MessageEvent  ┌────────────┐
//! │ EventSource │───────────────▶│ Runtime  │───────────────▶│ Dispatcher │
//! └─────────────┘                └──────────┘                └─────┬──────┘
//!                                                                  │ replies
//!                                                           ┌──────▼──────┐
//!                                                           │  ApiClient  │
//!                                                           └─────────────┘
//! ```

pub mod api;
pub mod entity;
pub mod error;
pub mod event;
pub mod source;

pub use api::{ApiClient, ApiClientExt, BoxedApi, next_random_id};
pub use entity::{Entity, Group, User};
pub use error::{ApiError, ApiResult, EventError, EventResult};
pub use event::{CHAT_PEER_OFFSET, ForeignMessage, MESSAGE_NEW, MessageEvent, RawEvent};
pub use source::{ChannelEventSource, EventSender, EventSource, EventStream};
