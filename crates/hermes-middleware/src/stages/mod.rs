//! Built-in interceptors.
//!
//! The server wraps every route in these, outermost first:
//!
//! | Stage           | Middleware               | Purpose                                   |
//! |-----------------|--------------------------|-------------------------------------------|
//! | `request_id`    | [`RequestIdMiddleware`]  | Adopt or generate the request id          |
//! | `route_context` | [`RouteContextMiddleware`] | Store the matched route                 |
//! | `access_log`    | [`AccessLogMiddleware`]  | Request span, access log, metrics         |
//! | `recover`       | [`RecoverMiddleware`]    | Turn panics into a 500                    |
//! | `timeout`       | [`TimeoutMiddleware`]    | Enforce the handler deadline, 503 on miss |

pub mod access_log;
pub mod recover;
pub mod request_id;
pub mod route_context;
pub mod timeout;

pub use access_log::AccessLogMiddleware;
pub use recover::RecoverMiddleware;
pub use request_id::RequestIdMiddleware;
pub use route_context::RouteContextMiddleware;
pub use timeout::TimeoutMiddleware;
