//! # Hermes Router
//!
//! Route definitions, the validated route table, reverse routing and request
//! dispatch for the Hermes request-processing core.
//!
//! ## Pattern grammar
//!
//! ```text
//! /literal/{name}/literal      named variable, no `/` in the value
//! /literal/{name:regex}        named variable, value must fully match regex
//! /literal/{:regex}            anonymous variable, still one positional value
//! /literal/{}                  anonymous unconstrained variable
//! /literal/*                   wildcard, value may contain `/`
//! ```
//!
//! ## Example
//!
//! ```
//! use hermes_core::{Request, ResponseWriter};
//! use hermes_router::{Route, RouteTable, Router};
//!
//! let table = RouteTable::register(vec![
//!     Route::get("show_post", "/user/{user}/post/{post}").handle(
//!         |req: Request, rw: ResponseWriter| async move {
//!             let post = req.context().var("post").unwrap_or_default().to_string();
//!             let _ = rw.write(post).await;
//!         },
//!     ),
//! ])
//! .unwrap();
//!
//! assert_eq!(
//!     table.path("show_post", &["abc123", "77"]).unwrap(),
//!     "/user/abc123/post/77"
//! );
//!
//! let router = Router::builder(table).build(|_route, handler| handler).unwrap();
//! # let _ = router;
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod escape;
mod matcher;
mod path;
pub mod pattern;
mod route;
mod router;
mod table;

pub use error::{PathError, RouteError};
pub use matcher::{PatternMatcher, RouteMatch, RouteMatcher, WILDCARD_VAR};
pub use path::build_path;
pub use route::Route;
pub use router::{Router, RouterBuilder};
pub use table::RouteTable;
