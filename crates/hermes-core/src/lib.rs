//! # Hermes Core
//!
//! Core types shared by every layer of the Hermes request-processing core.
//!
//! This crate provides the foundational types used throughout Hermes:
//!
//! - [`Request`] - An inbound request with its collected body and [`RequestContext`]
//! - [`RequestContext`] - Per-request values (id, route, vars, logger span, cancellation)
//! - [`ResponseWriter`] - The synchronized response state wrapping a [`ResponseSink`]
//! - [`Error`] - The per-request error taxonomy
//! - [`Handler`] / [`ErrorHandler`] - Request handler and error responder traits
//! - [`IdGenerator`] - Injectable request id source
//!
//! ## Example
//!
//! ```
//! use hermes_core::fixtures::{self, ResponseRecorder};
//! use http::{Method, StatusCode};
//!
//! # tokio_test::block_on(async {
//! let recorder = ResponseRecorder::new();
//! let writer = recorder.writer();
//!
//! writer.write_header(StatusCode::CREATED).await;
//! writer.write("created").await.unwrap();
//!
//! assert_eq!(recorder.status(), Some(StatusCode::CREATED));
//! assert_eq!(recorder.body_string(), "created");
//! # let _ = fixtures::request(Method::GET, "/");
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
pub mod fixtures;
mod handler;
mod id;
mod panic;
mod request;
mod response;

pub use context::{PathVars, RequestContext, RequestId, RouteInfo};
pub use error::{Error, ErrorDetail, ErrorEnvelope, HermesResult};
pub use handler::{
    error_handler_fn, handler_fn, BoxFuture, BoxedErrorHandler, BoxedHandler, ErrorHandler,
    FnErrorHandler, FnHandler, Handler, JsonErrorHandler,
};
pub use id::{IdGenerator, UuidV7Generator};
pub use panic::{abort, is_abort, AbortHandler};
pub use request::Request;
pub use response::{ResponseSink, ResponseStats, ResponseWriter};

pub use tokio_util::sync::CancellationToken;
