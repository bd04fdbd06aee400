//! Route definitions.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use hermes_core::{handler_fn, BoxedHandler, Request, ResponseWriter, RouteInfo};
use hermes_middleware::{compose, BoxedMiddleware, Middleware};
use http::Method;

use crate::error::PathError;
use crate::path::build_path;

/// A named endpoint: method, pattern, interceptors and handler.
///
/// Routes are assembled with a builder and become immutable once registered
/// in a [`RouteTable`](crate::RouteTable).
///
/// # Example
///
/// ```
/// use hermes_core::{Request, ResponseWriter};
/// use hermes_router::Route;
///
/// let route = Route::get("show_user", "/user/{user}")
///     .handle(|_req: Request, rw: ResponseWriter| async move {
///         let _ = rw.write("user").await;
///     });
///
/// assert_eq!(route.to_string(), "show_user GET /user/{user}");
/// assert_eq!(route.path(&["ada"]).unwrap(), "/user/ada");
/// ```
#[derive(Clone)]
pub struct Route {
    info: RouteInfo,
    middlewares: Vec<BoxedMiddleware>,
    handler: Option<BoxedHandler>,
    timeout: Option<Duration>,
}

impl Route {
    /// Creates a route. A `method` of `None` matches every method.
    pub fn new(name: impl Into<Arc<str>>, method: Option<Method>, pattern: impl Into<Arc<str>>) -> Self {
        Self {
            info: RouteInfo::new(name, method, pattern),
            middlewares: Vec::new(),
            handler: None,
            timeout: None,
        }
    }

    /// Creates a `GET` route.
    pub fn get(name: impl Into<Arc<str>>, pattern: impl Into<Arc<str>>) -> Self {
        Self::new(name, Some(Method::GET), pattern)
    }

    /// Creates a `POST` route.
    pub fn post(name: impl Into<Arc<str>>, pattern: impl Into<Arc<str>>) -> Self {
        Self::new(name, Some(Method::POST), pattern)
    }

    /// Creates a `PUT` route.
    pub fn put(name: impl Into<Arc<str>>, pattern: impl Into<Arc<str>>) -> Self {
        Self::new(name, Some(Method::PUT), pattern)
    }

    /// Creates a `PATCH` route.
    pub fn patch(name: impl Into<Arc<str>>, pattern: impl Into<Arc<str>>) -> Self {
        Self::new(name, Some(Method::PATCH), pattern)
    }

    /// Creates a `DELETE` route.
    pub fn delete(name: impl Into<Arc<str>>, pattern: impl Into<Arc<str>>) -> Self {
        Self::new(name, Some(Method::DELETE), pattern)
    }

    /// Creates a route matching every method.
    pub fn any(name: impl Into<Arc<str>>, pattern: impl Into<Arc<str>>) -> Self {
        Self::new(name, None, pattern)
    }

    /// Sets the handler.
    #[must_use]
    pub fn handler(mut self, handler: BoxedHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Sets the handler from an async closure.
    #[must_use]
    pub fn handle<F, Fut>(self, func: F) -> Self
    where
        F: Fn(Request, ResponseWriter) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.handler(handler_fn(func))
    }

    /// Appends a route interceptor. Route interceptors run inside the
    /// application-wide ones, in the order they were added.
    #[must_use]
    pub fn middleware<M: Middleware>(self, middleware: M) -> Self {
        self.boxed_middleware(Arc::new(middleware))
    }

    /// Appends an already shared route interceptor.
    #[must_use]
    pub fn boxed_middleware(mut self, middleware: BoxedMiddleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Overrides the server's request timeout for this route.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the route name.
    pub fn name(&self) -> &str {
        self.info.name()
    }

    /// Returns the method, or `None` if the route matches every method.
    pub const fn method(&self) -> Option<&Method> {
        self.info.method()
    }

    /// Returns the path pattern.
    pub fn pattern(&self) -> &str {
        self.info.pattern()
    }

    /// Returns the route interceptors.
    pub fn middlewares(&self) -> &[BoxedMiddleware] {
        &self.middlewares
    }

    /// Returns `true` if a handler is set.
    pub const fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Returns the timeout override, if any.
    pub const fn request_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the metadata injected into the request context.
    pub fn info(&self) -> RouteInfo {
        self.info.clone()
    }

    /// Builds a concrete path for this route. See [`build_path`].
    pub fn path<S: AsRef<str>>(&self, values: &[S]) -> Result<String, PathError> {
        build_path(self.pattern(), values)
    }

    /// Composes `outer`, then the route interceptors, around the handler.
    ///
    /// Returns `None` if no handler is set.
    pub fn compose(&self, outer: &[BoxedMiddleware]) -> Option<BoxedHandler> {
        let handler = self.handler.clone()?;
        let inner = compose(&self.middlewares, handler);
        Some(compose(outer, inner))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.info, f)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.middlewares.iter().map(|m| m.name()).collect();
        f.debug_struct("Route")
            .field("name", &self.name())
            .field("method", &self.method())
            .field("pattern", &self.pattern())
            .field("middlewares", &names)
            .field("has_handler", &self.has_handler())
            .field("timeout", &self.timeout)
            .finish()
    }
}
