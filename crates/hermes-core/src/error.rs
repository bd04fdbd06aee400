//! Error types for Hermes request processing.
//!
//! [`Error`] covers every failure that can happen while a single request is
//! being handled. Configuration failures (bad route sets) and lifecycle
//! failures (bind, shutdown) have their own types in `hermes-router` and
//! `hermes-server`.
//!
//! Errors are `Clone` so a latched condition (see
//! [`ResponseWriter::latch`](crate::ResponseWriter::latch)) can be handed back
//! to every later write attempt. I/O sources are shared through `Arc`.

use std::io;
use std::sync::Arc;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`Error`].
pub type HermesResult<T> = Result<T, Error>;

/// Per-request error taxonomy.
///
/// All of these are funneled through the application's error responder,
/// unless the response head has already been committed, in which case they
/// are only logged.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// No route matched the request path.
    #[error("hermes: not found")]
    NotFound,

    /// A route matched the path but not the request method.
    #[error("hermes: method not allowed")]
    MethodNotAllowed,

    /// A handler panicked with a value other than the silent-abort signal.
    ///
    /// The message is the stringified panic value, so `panic_any(5)` yields
    /// a message of `"5"`.
    #[error("{0}")]
    Panic(String),

    /// The handler did not finish before its deadline.
    #[error("hermes: handler timeout")]
    Timeout,

    /// The request was cancelled from outside (client gone, server closing).
    #[error("hermes: request canceled")]
    Canceled,

    /// The transport sink rejected a body write.
    #[error("hermes: write: {0}")]
    Write(#[source] Arc<io::Error>),

    /// Streaming a source into the transport sink failed.
    #[error("hermes: read from: {0}")]
    ReadFrom(#[source] Arc<io::Error>),

    /// The request id generator failed.
    #[error("hermes: id generate: {0}")]
    IdGenerate(String),
}

impl Error {
    /// Wraps a sink write failure.
    pub fn write(err: io::Error) -> Self {
        Self::Write(Arc::new(err))
    }

    /// Wraps a streaming copy failure.
    pub fn read_from(err: io::Error) -> Self {
        Self::ReadFrom(Arc::new(err))
    }

    /// Creates a panic error from an already stringified panic value.
    pub fn panic(message: impl Into<String>) -> Self {
        Self::Panic(message.into())
    }

    /// Returns the default HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Timeout | Self::Canceled => StatusCode::SERVICE_UNAVAILABLE,
            Self::Panic(_) | Self::Write(_) | Self::ReadFrom(_) | Self::IdGenerate(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns `true` for the deadline-exceeded condition.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` for the external cancellation condition.
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

/// Serializable error envelope written by the default error responder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The request id for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Numeric HTTP status.
    pub status: u16,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorEnvelope {
    /// Builds an envelope for `err` responded with `status`.
    pub fn new(status: StatusCode, err: &Error, request_id: Option<&str>) -> Self {
        Self {
            error: ErrorDetail {
                status: status.as_u16(),
                message: err.to_string(),
            },
            request_id: request_id.map(str::to_owned),
        }
    }
}
