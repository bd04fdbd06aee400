//! # Hermes Middleware
//!
//! Interceptor composition for the Hermes request-processing core.
//!
//! A route's handler is wrapped in a chain of [`Middleware`] values. The first
//! middleware in the list is the outermost; each one may call [`Next::run`] to
//! continue or return early to short-circuit.
//!
//! ## Per-route chain
//!
//! ```text
//! request_id → route_context → access_log → recover → timeout
//!     → application middlewares → route middlewares → handler
//! ```
//!
//! The panic guard sits outside the timeout supervisor, so a panic the
//! supervisor re-raises from the handler task is still converted into a 500.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use hermes_core::{handler_fn, JsonErrorHandler, Request, ResponseWriter};
//! use hermes_middleware::stages::{RecoverMiddleware, TimeoutMiddleware};
//! use hermes_middleware::MiddlewareChain;
//!
//! let on_error = Arc::new(JsonErrorHandler);
//! let chain = MiddlewareChain::new()
//!     .with(RecoverMiddleware::new(on_error.clone()))
//!     .with(TimeoutMiddleware::new(Duration::from_secs(5), on_error));
//!
//! assert_eq!(chain.names(), vec!["recover", "timeout"]);
//! let handler = chain.then(handler_fn(|_req: Request, rw: ResponseWriter| async move {
//!     let _ = rw.write("ok").await;
//! }));
//! # let _ = handler;
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod middleware;
pub mod stages;

pub use chain::{compose, MiddlewareChain};
pub use middleware::{BoxedMiddleware, FnMiddleware, Middleware, Next};
pub use stages::timeout::Outcome;
