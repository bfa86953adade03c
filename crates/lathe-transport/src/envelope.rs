//! Response envelope decoding.
//!
//! Every method answers with either `{"response": ...}` or
//! `{"error": {"error_code": ..., "error_msg": ...}}`.

use serde_json::Value;

use lathe_core::{ApiError, ApiResult};

/// Unwraps a method response into its payload or an [`ApiError::Api`].
pub fn unwrap_envelope(body: Value) -> ApiResult<Value> {
    let Value::Object(mut body) = body else {
        return Err(ApiError::UnexpectedResponse(format!(
            "expected an object, got {body}"
        )));
    };

    if let Some(response) = body.remove("response") {
        return Ok(response);
    }

    match body.remove("error") {
        Some(error) => {
            let code = error.get("error_code").and_then(Value::as_i64).unwrap_or(0);
            let message = error
                .get("error_msg")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            Err(ApiError::Api { code, message })
        }
        None => Err(ApiError::UnexpectedResponse(
            "neither `response` nor `error` present".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_is_unwrapped() {
        let payload = unwrap_envelope(json!({"response": [{"id": 1}]})).unwrap();
        assert_eq!(payload, json!([{"id": 1}]));
    }

    #[test]
    fn test_error_object_becomes_api_error() {
        let err = unwrap_envelope(json!({
            "error": {"error_code": 113, "error_msg": "Invalid user id", "request_params": []}
        }))
        .unwrap_err();
        assert_eq!(err.code(), Some(113));
        assert_eq!(err.to_string(), "API error (113): Invalid user id");
    }

    #[test]
    fn test_unexpected_shapes() {
        assert!(matches!(
            unwrap_envelope(json!([1, 2])),
            Err(ApiError::UnexpectedResponse(_))
        ));
        assert!(matches!(
            unwrap_envelope(json!({"ts": 5})),
            Err(ApiError::UnexpectedResponse(_))
        ));
    }
}
