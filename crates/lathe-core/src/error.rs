//! Errors of the collaborator contracts.
//!
//! Argument and extraction errors belong to `lathe-framework`.

use thiserror::Error;

/// Failure of an [`ApiClient`](crate::ApiClient) call.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The remote side answered with an `error` object.
    #[error("API error ({code}): {message}")]
    Api { code: i64, message: String },

    #[error("request timed out")]
    Timeout,

    /// The request never reached the API or the connection broke.
    #[error("transport error: {0}")]
    Transport(String),

    /// Parameters or payloads could not be converted to or from JSON.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A reply arrived but had an unexpected shape.
    #[error("unexpected API response: {0}")]
    UnexpectedResponse(String),

    /// The client was built without an access token.
    #[error("no access token configured")]
    MissingToken,
}

impl ApiError {
    /// The remote error code, for [`ApiError::Api`].
    pub fn code(&self) -> Option<i64> {
        if let Self::Api { code, .. } = self {
            Some(*code)
        } else {
            None
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

/// Failure to decode a raw update.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The update is well-formed but of another `type`.
    #[error("expected a '{expected}' event, got '{got}'")]
    TypeMismatch { expected: &'static str, got: String },
}

pub type ApiResult<T> = Result<T, ApiError>;

pub type EventResult<T> = Result<T, EventError>;
