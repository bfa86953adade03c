//! Test doubles shared by the unit tests of this crate.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value as Json;

use lathe_core::{ApiClient, ApiError, ApiResult, BoxedApi, MessageEvent};

use crate::context::LatheContext;

/// An API client answering from canned responses and recording every call.
#[derive(Default)]
pub(crate) struct MockApi {
    responses: Mutex<HashMap<String, Json>>,
    calls: Mutex<Vec<(String, Json)>>,
}

impl MockApi {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answers `method` with `response` from now on.
    pub(crate) fn respond(self: &Arc<Self>, method: &str, response: Json) -> Arc<Self> {
        self.responses.lock().insert(method.to_string(), response);
        Arc::clone(self)
    }

    pub(crate) fn calls(&self) -> Vec<(String, Json)> {
        self.calls.lock().clone()
    }

    /// Texts of all `messages.send` calls, in order.
    pub(crate) fn sent_messages(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|(method, _)| method == "messages.send")
            .filter_map(|(_, params)| params["message"].as_str().map(str::to_string))
            .collect()
    }

    pub(crate) fn boxed(self: &Arc<Self>) -> BoxedApi {
        Arc::clone(self) as BoxedApi
    }
}

#[async_trait]
impl ApiClient for MockApi {
    async fn call(&self, method: &str, params: Json) -> ApiResult<Json> {
        self.calls.lock().push((method.to_string(), params));
        match self.responses.lock().get(method) {
            Some(response) => Ok(response.clone()),
            None if method == "messages.send" => Ok(Json::from(1)),
            None => Err(ApiError::Api {
                code: 100,
                message: format!("no canned response for {method}"),
            }),
        }
    }
}

/// A context for a private message with the given text.
pub(crate) fn context(api: &Arc<MockApi>, text: &str) -> Arc<LatheContext> {
    Arc::new(LatheContext::new(
        Arc::new(MessageEvent::new(1, 1, text)),
        api.boxed(),
    ))
}
