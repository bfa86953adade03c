//! HTTP API client.
//!
//! Methods are invoked as `POST {base_url}/method/{name}` with the parameters,
//! the access token and the API version sent as form fields. The client does
//! not sign, retry or rate-limit requests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use tracing::{debug, trace};

use lathe_core::{ApiClient, ApiError, ApiResult};

use crate::envelope::unwrap_envelope;

/// API version used when none is configured.
pub const DEFAULT_VERSION: &str = "5.199";

/// An [`ApiClient`] speaking the service's HTTP method protocol.
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    client: Client,
    endpoint: String,
    access_token: String,
    version: String,
}

impl HttpApiClient {
    /// Starts building a client for the given service root, e.g. `https://api.vk.com`.
    pub fn builder(base_url: impl Into<String>) -> HttpApiClientBuilder {
        HttpApiClientBuilder {
            base_url: base_url.into(),
            version: DEFAULT_VERSION.to_string(),
            access_token: None,
            timeout: Duration::from_secs(30),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}{method}", self.endpoint)
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn call(&self, method: &str, params: Value) -> ApiResult<Value> {
        let mut form = form_fields(params)?;
        form.push(("access_token".to_string(), self.access_token.clone()));
        form.push(("v".to_string(), self.version.clone()));

        trace!(method, fields = form.len(), "Calling API method");
        let response = self
            .client
            .post(self.method_url(method))
            .form(&form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::Transport(format!(
                "HTTP {} error: {}",
                status.as_u16(),
                text
            )));
        }

        let body: Value = response.json().await.map_err(map_reqwest_error)?;
        let result = unwrap_envelope(body);
        if let Err(err) = &result {
            debug!(method, error = %err, "API method failed");
        }
        result
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else if err.is_decode() {
        ApiError::UnexpectedResponse(err.to_string())
    } else {
        ApiError::Transport(err.to_string())
    }
}

/// Flattens a JSON parameter object into form fields.
///
/// Arrays become comma-separated lists, nested objects are sent as JSON and
/// `null` fields are omitted.
fn form_fields(params: Value) -> ApiResult<Vec<(String, String)>> {
    let params = match params {
        Value::Object(map) => map,
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(ApiError::Encoding(format!(
                "parameters must be an object, got {other}"
            )));
        }
    };

    Ok(params
        .into_iter()
        .filter_map(|(key, value)| form_value(value).map(|v| (key, v)))
        .collect())
}

fn form_value(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(if b { "1" } else { "0" }.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(form_value)
                .collect::<Vec<_>>()
                .join(","),
        ),
        object @ Value::Object(_) => Some(object.to_string()),
    }
}

/// Builder for [`HttpApiClient`].
#[derive(Debug)]
pub struct HttpApiClientBuilder {
    base_url: String,
    version: String,
    access_token: Option<String>,
    timeout: Duration,
}

impl HttpApiClientBuilder {
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> ApiResult<HttpApiClient> {
        let access_token = self
            .access_token
            .ok_or(ApiError::MissingToken)?;
        let client = ClientBuilder::new()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(HttpApiClient {
            client,
            endpoint: format!("{}/method/", self.base_url.trim_end_matches('/')),
            access_token,
            version: self.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_form_fields_flatten_values() {
        let mut fields = form_fields(json!({
            "peer_id": 2000000001,
            "message": "hi",
            "user_ids": [1, "durov"],
            "disable_mentions": true,
            "keyboard": {"buttons": []},
            "reply_to": null
        }))
        .unwrap();
        fields.sort();

        assert_eq!(
            fields,
            vec![
                ("disable_mentions".to_string(), "1".to_string()),
                ("keyboard".to_string(), r#"{"buttons":[]}"#.to_string()),
                ("message".to_string(), "hi".to_string()),
                ("peer_id".to_string(), "2000000001".to_string()),
                ("user_ids".to_string(), "1,durov".to_string()),
            ]
        );
    }

    #[test]
    fn test_form_fields_rejects_non_objects() {
        assert!(form_fields(Value::Null).unwrap().is_empty());
        assert!(matches!(
            form_fields(json!([1])),
            Err(ApiError::Encoding(_))
        ));
    }

    #[test]
    fn test_builder_requires_token_and_normalizes_url() {
        assert!(matches!(
            HttpApiClient::builder("https://api.vk.com").build(),
            Err(ApiError::MissingToken)
        ));

        let client = HttpApiClient::builder("https://api.vk.com/")
            .access_token("secret")
            .version("5.131")
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(
            client.method_url("users.get"),
            "https://api.vk.com/method/users.get"
        );
        assert_eq!(client.version, "5.131");
    }
}
