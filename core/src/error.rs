//! Error taxonomy for the tutoring API client.
//!
//! # Design
//! Every failure is normalized once, in `normalize_response` or in the
//! transport's send path, into an `ApiError`. Callers branch on
//! `ApiError::kind()` (did the server answer or not?) or match the 404/409
//! specializations directly; they never inspect `reqwest` errors.

use crate::http::HttpResponse;
use crate::token::TokenStoreError;

/// Message used when the server rejects a request without a readable
/// `{ "error": ... }` payload.
pub const SERVER_FALLBACK_MESSAGE: &str = "Something went wrong";

/// Message used when a request fails without a response and the underlying
/// cause carries no detail.
pub const TRANSPORT_FALLBACK_MESSAGE: &str = "unknown error";

/// The two normalized failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The server responded and rejected the request.
    Server,
    /// No usable response was received.
    Transport,
}

/// Errors returned by `TutorClient` operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Non-2xx response other than 404/409.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The server returned 404.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// The server returned 409, e.g. a schedule slot that is already booked.
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// No response: connection failure, DNS, timeout or cancellation.
    #[error("transport error: {message}")]
    Transport { message: String, timed_out: bool },

    /// Reading the auth token failed; the request was not sent.
    #[error("token store error: {0}")]
    TokenStore(#[from] TokenStoreError),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A 2xx response body did not match the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Server { .. }
            | ApiError::NotFound { .. }
            | ApiError::Conflict { .. }
            | ApiError::Deserialization(_) => ErrorKind::Server,
            ApiError::Transport { .. } | ApiError::TokenStore(_) | ApiError::Serialization(_) => {
                ErrorKind::Transport
            }
        }
    }

    /// HTTP status of a server rejection, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            ApiError::NotFound { .. } => Some(404),
            ApiError::Conflict { .. } => Some(409),
            _ => None,
        }
    }

    /// Message suitable for surfacing to the caller.
    pub fn message(&self) -> String {
        match self {
            ApiError::Server { message, .. }
            | ApiError::NotFound { message }
            | ApiError::Conflict { message }
            | ApiError::Transport { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Only failures where the server never answered are worth retrying.
    /// This layer never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Transport { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Transport { timed_out: true, .. })
    }

    pub(crate) fn transport(message: impl Into<String>) -> Self {
        let message = message.into();
        ApiError::Transport {
            message: if message.is_empty() {
                TRANSPORT_FALLBACK_MESSAGE.to_string()
            } else {
                message
            },
            timed_out: false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ApiError::Transport {
                message: "request timed out".to_string(),
                timed_out: true,
            };
        }
        ApiError::transport(err.to_string())
    }
}

#[derive(serde::Deserialize)]
struct ErrorPayload {
    error: String,
}

/// Pass 2xx responses through; map everything else to a server-kind error.
///
/// The message comes from a `{ "error": "..." }` body when present.
pub fn normalize_response(response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if response.is_success() {
        return Ok(response);
    }
    let message = serde_json::from_slice::<ErrorPayload>(&response.body)
        .ok()
        .map(|payload| payload.error)
        .filter(|msg| !msg.is_empty())
        .unwrap_or_else(|| SERVER_FALLBACK_MESSAGE.to_string());

    Err(match response.status {
        404 => ApiError::NotFound { message },
        409 => ApiError::Conflict { message },
        status => ApiError::Server { status, message },
    })
}
