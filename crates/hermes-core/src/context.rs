//! Request context types.
//!
//! The [`RequestContext`] carries the per-request values that interceptors
//! inject as a request travels down the chain: the request id, the matched
//! route, decoded path variables, the contextual logger span and the
//! cancellation token. Each value is set once; interceptors replace the
//! context with an updated copy rather than mutating it in place.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::Method;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::Span;

/// A request identifier.
///
/// Ids are either adopted from the `Request-Id` / `X-Request-Id` headers of
/// the incoming request or produced by an [`IdGenerator`](crate::IdGenerator).
///
/// # Example
///
/// ```
/// use hermes_core::RequestId;
///
/// let id = RequestId::new("01890a5d-ac96-774b-bcce-b302099a8057");
/// assert_eq!(id.as_str(), "01890a5d-ac96-774b-bcce-b302099a8057");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Creates a request id from any string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Metadata of the route a request was dispatched to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    name: Arc<str>,
    method: Option<Method>,
    pattern: Arc<str>,
}

impl RouteInfo {
    /// Creates route metadata. A `method` of `None` matches any method.
    #[must_use]
    pub fn new(
        name: impl Into<Arc<str>>,
        method: Option<Method>,
        pattern: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            name: name.into(),
            method,
            pattern: pattern.into(),
        }
    }

    /// Returns the route name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the route method, if it is restricted to one.
    #[must_use]
    pub const fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    /// Returns the route path pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl fmt::Display for RouteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.method {
            Some(method) => write!(f, "{} {} {}", self.name, method, self.pattern),
            None => write!(f, "{} * {}", self.name, self.pattern),
        }
    }
}

/// Decoded path variables extracted by the route matcher.
pub type PathVars = HashMap<String, String>;

/// Per-request context that flows through the interceptor chain.
///
/// # Example
///
/// ```
/// use hermes_core::{RequestContext, RequestId};
///
/// let ctx = RequestContext::new().with_request_id(RequestId::new("abc"));
/// assert_eq!(ctx.request_id().map(|id| id.as_str()), Some("abc"));
/// assert!(ctx.route().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Option<RequestId>,
    started_at: Instant,
    route: Option<RouteInfo>,
    vars: Arc<PathVars>,
    span: Span,
    cancellation: CancellationToken,
}

impl RequestContext {
    /// Creates an empty context with a fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// Creates an empty context bound to the given cancellation token.
    #[must_use]
    pub fn with_token(cancellation: CancellationToken) -> Self {
        Self {
            request_id: None,
            started_at: Instant::now(),
            route: None,
            vars: Arc::default(),
            span: Span::none(),
            cancellation,
        }
    }

    /// Returns the request id, once the id interceptor has run.
    #[must_use]
    pub const fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Returns when the request entered the chain.
    #[must_use]
    pub const fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the time elapsed since the request entered the chain.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Returns the matched route, once routing has happened.
    #[must_use]
    pub const fn route(&self) -> Option<&RouteInfo> {
        self.route.as_ref()
    }

    /// Returns all decoded path variables.
    #[must_use]
    pub fn vars(&self) -> &PathVars {
        &self.vars
    }

    /// Returns one decoded path variable.
    #[must_use]
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Returns the contextual logger span.
    #[must_use]
    pub const fn span(&self) -> &Span {
        &self.span
    }

    /// Returns the cancellation token observed by this request.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns `true` once the request has been cancelled or timed out.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Returns a copy carrying the given request id.
    pub fn with_request_id(mut self, id: RequestId) -> Self {
        self.request_id = Some(id);
        self
    }

    /// Returns a copy carrying the matched route.
    pub fn with_route(mut self, route: RouteInfo) -> Self {
        self.route = Some(route);
        self
    }

    /// Returns a copy carrying the decoded path variables.
    pub fn with_vars(mut self, vars: PathVars) -> Self {
        self.vars = Arc::new(vars);
        self
    }

    /// Returns a copy carrying the contextual logger span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Returns a copy observing a different cancellation token.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
