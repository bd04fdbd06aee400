//! Middleware composition.
//!
//! [`compose`] folds an ordered list of interceptors around a handler. The
//! first interceptor in the list is the outermost: it runs first on the way
//! in and last on the way out.
//!
//! ```text
//! compose([a, b, c], h)  ==  a(b(c(h)))
//! ```

use std::fmt;
use std::sync::Arc;

use hermes_core::{BoxFuture, BoxedHandler, Handler, Request, ResponseWriter};

use crate::middleware::{BoxedMiddleware, Middleware, Next};

/// One interceptor bound to the handler below it.
struct Layered {
    middleware: BoxedMiddleware,
    next: BoxedHandler,
}

impl Handler for Layered {
    fn call(&self, request: Request, response: ResponseWriter) -> BoxFuture<'static, ()> {
        self.middleware
            .process(request, response, Next::new(Arc::clone(&self.next)))
    }
}

/// Wraps `handler` with `middlewares`, first element outermost.
///
/// An empty list returns `handler` unchanged.
pub fn compose(middlewares: &[BoxedMiddleware], handler: BoxedHandler) -> BoxedHandler {
    middlewares.iter().rev().fold(handler, |next, middleware| {
        Arc::new(Layered {
            middleware: Arc::clone(middleware),
            next,
        })
    })
}

/// An ordered list of interceptors.
///
/// # Example
///
/// ```
/// use hermes_core::{handler_fn, Request, ResponseWriter};
/// use hermes_middleware::{FnMiddleware, MiddlewareChain, Next};
///
/// let chain = MiddlewareChain::new()
///     .with(FnMiddleware::new("outer", |req: Request, rw: ResponseWriter, next: Next| async move {
///         next.run(req, rw).await;
///     }));
///
/// assert_eq!(chain.names(), vec!["outer"]);
/// let handler = chain.then(handler_fn(|_req: Request, _rw: ResponseWriter| async {}));
/// # let _ = handler;
/// ```
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Vec<BoxedMiddleware>,
}

impl MiddlewareChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an interceptor below the ones already in the chain.
    pub fn with<M: Middleware>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Appends a shared interceptor.
    pub fn push(&mut self, middleware: BoxedMiddleware) {
        self.middlewares.push(middleware);
    }

    /// Appends every interceptor of `other`, keeping their order.
    pub fn extend(&mut self, other: impl IntoIterator<Item = BoxedMiddleware>) {
        self.middlewares.extend(other);
    }

    /// Returns the interceptor names, outermost first.
    pub fn names(&self) -> Vec<&'static str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    /// Returns the number of interceptors.
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Returns `true` if the chain holds no interceptors.
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Returns the interceptors, outermost first.
    pub fn as_slice(&self) -> &[BoxedMiddleware] {
        &self.middlewares
    }

    /// Composes the chain around `handler`.
    pub fn then(&self, handler: BoxedHandler) -> BoxedHandler {
        compose(&self.middlewares, handler)
    }
}

impl From<Vec<BoxedMiddleware>> for MiddlewareChain {
    fn from(middlewares: Vec<BoxedMiddleware>) -> Self {
        Self { middlewares }
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("middlewares", &self.names())
            .finish()
    }
}
