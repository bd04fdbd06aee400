//! Core middleware trait and types.
//!
//! This module defines the [`Middleware`] trait that every interceptor
//! implements. An interceptor sees the request on the way in, decides whether
//! to call the rest of the chain through [`Next`], and sees the response state
//! on the way out.
//!
//! # Example
//!
//! ```
//! use hermes_core::{BoxFuture, Request, ResponseWriter};
//! use hermes_middleware::{Middleware, Next};
//! use http::StatusCode;
//!
//! struct RequireJson;
//!
//! impl Middleware for RequireJson {
//!     fn name(&self) -> &'static str {
//!         "require_json"
//!     }
//!
//!     fn process(
//!         &self,
//!         request: Request,
//!         response: ResponseWriter,
//!         next: Next,
//!     ) -> BoxFuture<'static, ()> {
//!         Box::pin(async move {
//!             if request.header("content-type") != Some("application/json") {
//!                 response.write_header(StatusCode::UNSUPPORTED_MEDIA_TYPE).await;
//!                 return;
//!             }
//!             next.run(request, response).await;
//!         })
//!     }
//! }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use hermes_core::{BoxFuture, BoxedHandler, Request, ResponseWriter};

/// A request interceptor.
///
/// # Invariants
///
/// - Call `next.run()` at most once; skipping it short-circuits the chain
/// - Per-request state lives in the request, never in `self`, unless `self`
///   synchronizes it
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this interceptor, used in logs.
    fn name(&self) -> &'static str;

    /// Processes the request, optionally invoking the rest of the chain.
    fn process(
        &self,
        request: Request,
        response: ResponseWriter,
        next: Next,
    ) -> BoxFuture<'static, ()>;
}

/// A shared, type-erased middleware.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The remainder of the chain below an interceptor.
///
/// Consumed by [`Next::run`], so it can be invoked at most once.
#[derive(Clone)]
pub struct Next {
    handler: BoxedHandler,
}

impl Next {
    /// Wraps the inner handler.
    pub fn new(handler: BoxedHandler) -> Self {
        Self { handler }
    }

    /// Invokes the rest of the chain.
    pub fn run(self, request: Request, response: ResponseWriter) -> BoxFuture<'static, ()> {
        self.handler.call(request, response)
    }

    /// Returns the inner handler.
    pub fn into_handler(self) -> BoxedHandler {
        self.handler
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

/// A middleware created from an async function.
///
/// # Example
///
/// ```
/// use hermes_core::{Request, ResponseWriter};
/// use hermes_middleware::{FnMiddleware, Next};
/// use http::header::{HeaderName, HeaderValue};
///
/// let powered_by = FnMiddleware::new("powered_by", |req: Request, rw: ResponseWriter, next: Next| async move {
///     rw.set_header(HeaderName::from_static("x-powered-by"), HeaderValue::from_static("hermes")).await;
///     next.run(req, rw).await;
/// });
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a new function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Request, ResponseWriter, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process(
        &self,
        request: Request,
        response: ResponseWriter,
        next: Next,
    ) -> BoxFuture<'static, ()> {
        Box::pin((self.func)(request, response, next))
    }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::fixtures::{self, ResponseRecorder};
    use hermes_core::handler_fn;
    use http::{Method, StatusCode};

    #[tokio::test]
    async fn test_next_runs_handler() {
        let next = Next::new(handler_fn(|_req: Request, rw: ResponseWriter| async move {
            rw.write_header(StatusCode::ACCEPTED).await;
        }));

        let recorder = ResponseRecorder::new();
        next.run(fixtures::request(Method::GET, "/"), recorder.writer())
            .await;

        assert_eq!(recorder.status(), Some(StatusCode::ACCEPTED));
    }

    #[tokio::test]
    async fn test_fn_middleware_short_circuits() {
        let mw = FnMiddleware::new(
            "deny",
            |_req: Request, rw: ResponseWriter, _next: Next| async move {
                rw.write_header(StatusCode::FORBIDDEN).await;
            },
        );
        assert_eq!(mw.name(), "deny");

        let next = Next::new(handler_fn(|_req: Request, rw: ResponseWriter| async move {
            let _ = rw.write("unreachable").await;
        }));

        let recorder = ResponseRecorder::new();
        mw.process(
            fixtures::request(Method::GET, "/"),
            recorder.writer(),
            next,
        )
        .await;

        assert_eq!(recorder.status(), Some(StatusCode::FORBIDDEN));
        assert_eq!(recorder.body_string(), "");
    }
}
