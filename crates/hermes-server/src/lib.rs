//! # Hermes Server
//!
//! HTTP/1.1 server for the Hermes request-processing core.
//!
//! This crate ties the router and the built-in interceptors to a hyper
//! transport:
//!
//! - Listener binding with port discovery
//! - Per-route chain composition with request timeouts
//! - Graceful shutdown with a forced-close deadline
//!
//! ## Example
//!
//! ```rust,no_run
//! use hermes_core::{BoxFuture, Error, ErrorHandler, JsonErrorHandler, Request, ResponseWriter};
//! use hermes_router::Route;
//! use hermes_server::{shutdown, Application, Server, ServerConfig};
//! use http::StatusCode;
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
//!         status: StatusCode,
//!         error: Error,
//!     ) -> BoxFuture<'static, ()> {
//!         JsonErrorHandler.handle_error(request, response, status, error)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::new(ServerConfig::default(), Hello)?;
//!     server.listen_and_serve(shutdown::signal_token()).await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod server;
pub mod shutdown;
mod sink;

pub use config::{
    ServerConfig, ServerConfigBuilder, DEFAULT_HTTP_ADDR, DEFAULT_MAX_BODY_SIZE,
    DEFAULT_READ_HEADER_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use server::{Application, Server, ServerError};
pub use sink::ResponseBody;
