//! Handler and error responder traits.
//!
//! A [`Handler`] consumes a [`Request`] and writes its answer through a
//! [`ResponseWriter`]. An [`ErrorHandler`] is the application's single place
//! for turning an [`Error`] into a response.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;

use crate::error::{Error, ErrorEnvelope};
use crate::request::Request;
use crate::response::ResponseWriter;

/// A boxed future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A request handler.
///
/// Handlers own their inputs so that the timeout supervisor can run them on
/// a separate task.
pub trait Handler: Send + Sync + 'static {
    /// Handles one request.
    fn call(&self, request: Request, response: ResponseWriter) -> BoxFuture<'static, ()>;
}

/// A shared, type-erased handler.
pub type BoxedHandler = Arc<dyn Handler>;

/// A handler backed by an async closure.
pub struct FnHandler<F> {
    func: F,
}

impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Request, ResponseWriter) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call(&self, request: Request, response: ResponseWriter) -> BoxFuture<'static, ()> {
        Box::pin((self.func)(request, response))
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

/// Creates a shared handler from an async closure.
///
/// # Example
///
/// ```
/// use hermes_core::{handler_fn, Request, ResponseWriter};
///
/// let hello = handler_fn(|_req: Request, rw: ResponseWriter| async move {
///     let _ = rw.write("hello").await;
/// });
/// ```
pub fn handler_fn<F, Fut>(func: F) -> BoxedHandler
where
    F: Fn(Request, ResponseWriter) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(FnHandler { func })
}

/// The application's error responder.
///
/// Called with an unguarded writer, so it can respond even after an error
/// has been latched for the handler.
pub trait ErrorHandler: Send + Sync + 'static {
    /// Writes the response for `error` with the chosen `status`.
    fn handle_error(
        &self,
        request: Request,
        response: ResponseWriter,
        status: StatusCode,
        error: Error,
    ) -> BoxFuture<'static, ()>;
}

/// A shared, type-erased error responder.
pub type BoxedErrorHandler = Arc<dyn ErrorHandler>;

/// An error responder backed by an async closure.
pub struct FnErrorHandler<F> {
    func: F,
}

impl<F, Fut> ErrorHandler for FnErrorHandler<F>
where
    F: Fn(Request, ResponseWriter, StatusCode, Error) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn handle_error(
        &self,
        request: Request,
        response: ResponseWriter,
        status: StatusCode,
        error: Error,
    ) -> BoxFuture<'static, ()> {
        Box::pin((self.func)(request, response, status, error))
    }
}

impl<F> fmt::Debug for FnErrorHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnErrorHandler").finish_non_exhaustive()
    }
}

/// Creates a shared error responder from an async closure.
pub fn error_handler_fn<F, Fut>(func: F) -> BoxedErrorHandler
where
    F: Fn(Request, ResponseWriter, StatusCode, Error) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(FnErrorHandler { func })
}

/// Default error responder writing an [`ErrorEnvelope`] as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonErrorHandler;

impl ErrorHandler for JsonErrorHandler {
    fn handle_error(
        &self,
        request: Request,
        response: ResponseWriter,
        status: StatusCode,
        error: Error,
    ) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            let request_id = request.context().request_id().map(|id| id.as_str());
            let envelope = ErrorEnvelope::new(status, &error, request_id);
            let body = match serde_json::to_vec(&envelope) {
                Ok(body) => body,
                Err(err) => {
                    tracing::error!(error = %err, "failed to encode error envelope");
                    Vec::new()
                }
            };

            response
                .set_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .await;
            response.write_header(status).await;
            if let Err(err) = response.write(body).await {
                tracing::debug!(error = %err, "failed to write error response");
            }
        })
    }
}
