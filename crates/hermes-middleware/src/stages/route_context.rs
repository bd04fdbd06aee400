//! Route context middleware.
//!
//! Stores the metadata of the matched route in the request context, so later
//! stages and the handler can tell which route they are serving.

use hermes_core::{BoxFuture, Request, ResponseWriter, RouteInfo};

use crate::middleware::{Middleware, Next};

/// Injects a fixed [`RouteInfo`] into every request it sees.
#[derive(Debug, Clone)]
pub struct RouteContextMiddleware {
    route: RouteInfo,
}

impl RouteContextMiddleware {
    /// Creates the middleware for one route.
    pub const fn new(route: RouteInfo) -> Self {
        Self { route }
    }
}

impl Middleware for RouteContextMiddleware {
    fn name(&self) -> &'static str {
        "route_context"
    }

    fn process(
        &self,
        request: Request,
        response: ResponseWriter,
        next: Next,
    ) -> BoxFuture<'static, ()> {
        let route = self.route.clone();
        next.run(request.map_context(|ctx| ctx.with_route(route)), response)
    }
}
