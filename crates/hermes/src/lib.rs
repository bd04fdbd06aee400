//! # Hermes
//!
//! **HTTP request-processing core with named routes and deadlines**
//!
//! Hermes gives every route:
//!
//! - A **name** and a pattern, so paths can be built back from values
//! - A **deadline**, after which the client gets a 503 and the handler's
//!   late writes are refused
//! - **Panic recovery**, turning a handler panic into a 500
//! - A **request id** and a structured access log
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hermes::prelude::*;
//!
//! struct Hello;
//!
//! impl Application for Hello {
//!     fn routes(&self) -> Vec<Route> {
//!         vec![Route::get("hello", "/hello/{name}").handle(
//!             |req: Request, rw: ResponseWriter| async move {
//!                 let name = req.context().var("name").unwrap_or_default().to_string();
//!                 let _ = rw.write(format!("hello {name}")).await;
//!             },
//!         )]
//!     }
//!
//!     fn error(
//!         &self,
//!         request: Request,
//!         response: ResponseWriter,
//!         status: http::StatusCode,
//!         error: Error,
//!     ) -> BoxFuture<'static, ()> {
//!         JsonErrorHandler.handle_error(request, response, status, error)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::new(ServerConfig::default(), Hello)?;
//!     server.listen_and_serve(hermes::server::shutdown::signal_token()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Every route runs inside a fixed set of interceptors:
//!
//! ```text
//! Request → RequestId → RouteContext → AccessLog → Recover → Timeout
//!         → application middlewares → route middlewares → Handler
//! ```

#![doc(html_root_url = "https://docs.rs/hermes/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use hermes_core as core;

// Re-export middleware types
pub use hermes_middleware as middleware;

// Re-export router types
pub use hermes_router as router;

// Re-export server types
pub use hermes_server as server;

// Re-export telemetry types
pub use hermes_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use hermes::prelude::*;
///
/// let route = Route::get("status", "/status");
/// assert_eq!(route.to_string(), "status GET /status");
/// ```
pub mod prelude {
    pub use hermes_core::{
        abort, error_handler_fn, handler_fn, BoxFuture, BoxedErrorHandler, BoxedHandler,
        CancellationToken, Error, ErrorHandler, Handler, JsonErrorHandler, Request,
        RequestContext, RequestId, ResponseWriter, RouteInfo,
    };

    pub use hermes_middleware::{BoxedMiddleware, FnMiddleware, Middleware, Next};

    pub use hermes_router::{PathError, Route, RouteError};

    pub use hermes_server::{Application, Server, ServerConfig, ServerError};

    pub use hermes_telemetry::{init_logging, LogConfig};
}
