//! # Lathe Transport
//!
//! Network implementations of the [`ApiClient`](lathe_core::ApiClient)
//! contract.
//!
//! ## Features
//!
//! - `http-client`: [`HttpApiClient`], which calls methods over HTTPS with
//!   `reqwest`
//!
//! Envelope decoding ([`unwrap_envelope`]) is always available so other
//! clients can share it.
//!
//! ```rust,ignore
//! use lathe_transport::HttpApiClient;
//!
//! let api = HttpApiClient::builder("https://api.vk.com")
//!     .access_token(token)
//!     .build()?;
//! let users = api.call("users.get", json!({"user_ids": "durov"})).await?;
//! ```

pub mod envelope;

#[cfg(feature = "http-client")]
pub mod http;

pub use envelope::unwrap_envelope;

#[cfg(feature = "http-client")]
pub use http::{DEFAULT_VERSION, HttpApiClient, HttpApiClientBuilder};
