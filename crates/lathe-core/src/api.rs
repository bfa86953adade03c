//! The API client contract.
//!
//! Lathe never talks to the network itself. Everything that needs the remote
//! service (resolving mentions, sending replies) goes through an
//! [`ApiClient`], which owns transport, retry and rate-limit concerns.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::entity::{Group, User, first_of};
use crate::error::ApiResult;

/// A client capable of invoking remote API methods.
///
/// # API Design
///
/// - `call`: Raw method call with a method name and JSON parameters
///
/// Typed helpers are provided on top of `call` by [`ApiClientExt`], which is
/// implemented for every client.
#[async_trait]
pub trait ApiClient: Send + Sync + 'static {
    /// Calls a raw API method with the given parameters.
    ///
    /// # Arguments
    ///
    /// * `method` - The method name (e.g., `"messages.send"`)
    /// * `params` - A JSON object containing the parameters
    ///
    /// # Returns
    ///
    /// The unwrapped `response` payload of the call.
    async fn call(&self, method: &str, params: Value) -> ApiResult<Value>;
}

/// A shared API client trait object.
pub type BoxedApi = Arc<dyn ApiClient>;

/// Strongly-typed helpers built on [`ApiClient::call`].
#[async_trait]
pub trait ApiClientExt: ApiClient {
    /// Sends a text message to a peer and returns the new message id.
    async fn send_message(&self, peer_id: i64, text: &str) -> ApiResult<Value> {
        debug!(peer_id, "Sending message");
        self.call(
            "messages.send",
            json!({
                "peer_id": peer_id,
                "message": text,
                "random_id": next_random_id(),
            }),
        )
        .await
    }

    /// Fetches a single user by numeric id or screen name.
    ///
    /// Returns `Ok(None)` when the service knows no such user.
    async fn fetch_user(&self, id_or_screen_name: &str) -> ApiResult<Option<User>> {
        let response = self
            .call(
                "users.get",
                json!({ "user_ids": id_or_screen_name, "fields": "screen_name" }),
            )
            .await?;
        first_of(response, "users")
    }

    /// Fetches a single community by numeric id or screen name.
    async fn fetch_group(&self, id_or_screen_name: &str) -> ApiResult<Option<Group>> {
        let response = self
            .call("groups.getById", json!({ "group_id": id_or_screen_name }))
            .await?;
        first_of(response, "groups")
    }
}

impl<T: ApiClient + ?Sized> ApiClientExt for T {}

/// Generates a `random_id` for `messages.send`.
///
/// The service uses it to deduplicate retried sends, so it only has to be
/// unique per process lifetime; a time seed mixed with a counter is enough.
pub fn next_random_id() -> i32 {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    (seed.wrapping_add(n.wrapping_mul(2_654_435_761)) & 0x7fff_ffff) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingApi {
        calls: Mutex<Vec<(String, Value)>>,
        response: Value,
    }

    #[async_trait]
    impl ApiClient for RecordingApi {
        async fn call(&self, method: &str, params: Value) -> ApiResult<Value> {
            self.calls
                .lock()
                .unwrap()
                .push((method.to_string(), params));
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn test_send_message_params() {
        let api = RecordingApi {
            calls: Mutex::new(Vec::new()),
            response: json!(17),
        };
        let id = api.send_message(2_000_000_001, "hi").await.unwrap();
        assert_eq!(id, json!(17));

        let calls = api.calls.lock().unwrap();
        assert_eq!(calls[0].0, "messages.send");
        assert_eq!(calls[0].1["peer_id"], json!(2_000_000_001));
        assert_eq!(calls[0].1["message"], json!("hi"));
        assert!(calls[0].1["random_id"].is_i64());
    }

    #[tokio::test]
    async fn test_fetch_user_through_boxed_client() {
        let api: BoxedApi = Arc::new(RecordingApi {
            calls: Mutex::new(Vec::new()),
            response: json!([{"id": 1, "first_name": "Pavel", "screen_name": "durov"}]),
        });
        let user = api.fetch_user("durov").await.unwrap().unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.screen_name.as_deref(), Some("durov"));
    }

    #[test]
    fn test_random_ids_are_positive_and_vary() {
        let a = next_random_id();
        let b = next_random_id();
        assert!(a >= 0 && b >= 0);
        assert_ne!(a, b);
    }
}
