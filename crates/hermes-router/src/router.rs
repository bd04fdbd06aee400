//! Request dispatch.

use std::fmt;
use std::sync::Arc;

use hermes_core::{
    BoxFuture, BoxedErrorHandler, BoxedHandler, Error, Handler, JsonErrorHandler, Request,
    ResponseWriter,
};
use hermes_middleware::{compose, BoxedMiddleware};
use http::header::{HeaderValue, ALLOW};
use http::StatusCode;

use crate::error::{PathError, RouteError};
use crate::matcher::{PatternMatcher, RouteMatch, RouteMatcher};
use crate::route::Route;
use crate::table::RouteTable;

/// Answers every request it receives with one routing error.
struct Reject {
    status: StatusCode,
    error: Error,
    on_error: BoxedErrorHandler,
}

impl Handler for Reject {
    fn call(&self, request: Request, response: ResponseWriter) -> BoxFuture<'static, ()> {
        self.on_error
            .handle_error(request, response, self.status, self.error.clone())
    }
}

/// Dispatches requests to the composed handler of the matched route.
///
/// Unmatched paths go to the error responder with `404`; a path registered
/// only for other methods gets `405` and an `Allow` header. Both run through
/// the fallback interceptors first.
pub struct Router {
    table: RouteTable,
    dispatch: Arc<Dispatch>,
}

struct Dispatch {
    matcher: Arc<dyn RouteMatcher>,
    handlers: Vec<BoxedHandler>,
    not_found: BoxedHandler,
    method_not_allowed: BoxedHandler,
}

impl Router {
    /// Starts building a router over `table`.
    pub fn builder(table: RouteTable) -> RouterBuilder {
        RouterBuilder {
            table,
            matcher: None,
            fallback: Vec::new(),
            on_error: Arc::new(JsonErrorHandler),
        }
    }

    /// Returns the route table.
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Looks up a route by name.
    pub fn route(&self, name: &str) -> Option<&Route> {
        self.table.get(name)
    }

    /// Builds a concrete path for the route called `name`.
    pub fn path<S: AsRef<str>>(&self, name: &str, values: &[S]) -> Result<String, PathError> {
        self.table.path(name, values)
    }
}

impl Dispatch {
    async fn run(&self, request: Request, response: ResponseWriter) {
        match self.matcher.find(request.method(), request.path()) {
            RouteMatch::Found { index, vars } => match self.handlers.get(index) {
                Some(handler) => {
                    let request = request.map_context(|ctx| ctx.with_vars(vars));
                    handler.call(request, response).await;
                }
                None => {
                    tracing::error!(index, "matcher returned an unknown route");
                    self.not_found.call(request, response).await;
                }
            },
            RouteMatch::MethodNotAllowed { allowed } => {
                let allow = allowed
                    .iter()
                    .map(http::Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    response.set_header(ALLOW, value).await;
                }
                self.method_not_allowed.call(request, response).await;
            }
            RouteMatch::NotFound => self.not_found.call(request, response).await,
        }
    }
}

impl Handler for Router {
    fn call(&self, request: Request, response: ResponseWriter) -> BoxFuture<'static, ()> {
        let dispatch = Arc::clone(&self.dispatch);
        Box::pin(async move { dispatch.run(request, response).await })
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Router`].
pub struct RouterBuilder {
    table: RouteTable,
    matcher: Option<Arc<dyn RouteMatcher>>,
    fallback: Vec<BoxedMiddleware>,
    on_error: BoxedErrorHandler,
}

impl RouterBuilder {
    /// Replaces the default [`PatternMatcher`].
    ///
    /// Indices returned by the matcher refer to the table's registration
    /// order.
    #[must_use]
    pub fn matcher(mut self, matcher: impl RouteMatcher) -> Self {
        self.matcher = Some(Arc::new(matcher));
        self
    }

    /// Sets the interceptors run before a routing error is reported.
    #[must_use]
    pub fn fallback(mut self, middlewares: Vec<BoxedMiddleware>) -> Self {
        self.fallback = middlewares;
        self
    }

    /// Sets the error responder used for routing errors.
    #[must_use]
    pub fn on_error(mut self, on_error: BoxedErrorHandler) -> Self {
        self.on_error = on_error;
        self
    }

    /// Builds the router.
    ///
    /// `wrap` receives each route together with its own composed handler
    /// (route interceptors around the handler) and returns the handler to
    /// dispatch to, typically with the server's stages wrapped around it.
    pub fn build<F>(self, mut wrap: F) -> Result<Router, RouteError>
    where
        F: FnMut(&Route, BoxedHandler) -> BoxedHandler,
    {
        let matcher = match self.matcher {
            Some(matcher) => matcher,
            None => Arc::new(PatternMatcher::new(&self.table)?),
        };

        let handlers = self
            .table
            .routes()
            .iter()
            .map(|route| {
                route
                    .compose(&[])
                    .map(|inner| wrap(route, inner))
                    .ok_or_else(|| RouteError::MissingHandler(route.name().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let reject = |status: StatusCode, error: Error| -> BoxedHandler {
            compose(
                &self.fallback,
                Arc::new(Reject {
                    status,
                    error,
                    on_error: Arc::clone(&self.on_error),
                }),
            )
        };
        let not_found = reject(StatusCode::NOT_FOUND, Error::NotFound);
        let method_not_allowed = reject(StatusCode::METHOD_NOT_ALLOWED, Error::MethodNotAllowed);

        Ok(Router {
            table: self.table,
            dispatch: Arc::new(Dispatch {
                matcher,
                handlers,
                not_found,
                method_not_allowed,
            }),
        })
    }
}

impl fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder")
            .field("table", &self.table)
            .field("custom_matcher", &self.matcher.is_some())
            .field("fallback", &self.fallback.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::fixtures::{self, ResponseRecorder};
    use hermes_core::{error_handler_fn, PathVars};
    use hermes_middleware::FnMiddleware;
    use hermes_middleware::Next;
    use http::Method;

    fn table() -> RouteTable {
        RouteTable::register(vec![
            Route::get("show_user", "/user/{user}").handle(|req: Request, rw: ResponseWriter| async move {
                let user = req.context().var("user").unwrap_or_default().to_string();
                let _ = rw.write(user).await;
            }),
            Route::put("update_user", "/user/{user}").handle(|_req: Request, rw: ResponseWriter| async move {
                rw.write_header(StatusCode::NO_CONTENT).await;
            }),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_injects_vars() {
        let router = Router::builder(table()).build(|_, handler| handler).unwrap();
        let recorder = ResponseRecorder::new();

        router
            .call(fixtures::request(Method::GET, "/user/ada"), recorder.writer())
            .await;

        assert_eq!(recorder.status(), Some(StatusCode::OK));
        assert_eq!(recorder.body_string(), "ada");
    }

    #[tokio::test]
    async fn test_not_found_reaches_error_responder() {
        let router = Router::builder(table()).build(|_, handler| handler).unwrap();
        let recorder = ResponseRecorder::new();

        router
            .call(fixtures::request(Method::GET, "/nowhere"), recorder.writer())
            .await;

        assert_eq!(recorder.status(), Some(StatusCode::NOT_FOUND));
        assert!(recorder.body_string().contains("hermes: not found"));
    }

    #[tokio::test]
    async fn test_method_not_allowed_sets_allow() {
        let on_error = error_handler_fn(
            |_req: Request, rw: ResponseWriter, status: StatusCode, err: Error| async move {
                rw.write_header(status).await;
                let _ = rw.write(err.to_string()).await;
            },
        );
        let router = Router::builder(table())
            .on_error(on_error)
            .build(|_, handler| handler)
            .unwrap();
        let recorder = ResponseRecorder::new();

        router
            .call(fixtures::request(Method::DELETE, "/user/ada"), recorder.writer())
            .await;

        assert_eq!(recorder.status(), Some(StatusCode::METHOD_NOT_ALLOWED));
        assert_eq!(recorder.header("allow").as_deref(), Some("GET, PUT"));
        assert_eq!(recorder.body_string(), "hermes: method not allowed");
    }

    #[tokio::test]
    async fn test_fallback_runs_before_rejection() {
        let fallback: Vec<BoxedMiddleware> = vec![Arc::new(FnMiddleware::new(
            "fallback",
            |req: Request, rw: ResponseWriter, next: Next| async move {
                rw.set_header(
                    http::header::HeaderName::from_static("x-fallback"),
                    HeaderValue::from_static("yes"),
                )
                .await;
                next.run(req, rw).await;
            },
        ))];
        let router = Router::builder(table())
            .fallback(fallback)
            .build(|_, handler| handler)
            .unwrap();
        let recorder = ResponseRecorder::new();

        router
            .call(fixtures::request(Method::GET, "/"), recorder.writer())
            .await;

        assert_eq!(recorder.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(recorder.header("x-fallback").as_deref(), Some("yes"));
    }

    #[tokio::test]
    async fn test_build_wraps_each_route() {
        let mut wrapped = Vec::new();
        let router = Router::builder(table())
            .build(|route, handler| {
                wrapped.push(route.name().to_string());
                handler
            })
            .unwrap();

        assert_eq!(wrapped, vec!["show_user", "update_user"]);
        assert_eq!(router.route("update_user").map(Route::pattern), Some("/user/{user}"));
        assert_eq!(router.path("show_user", &["ada"]).unwrap(), "/user/ada");
    }

    struct Fixed;

    impl RouteMatcher for Fixed {
        fn find(&self, _method: &Method, _path: &str) -> RouteMatch {
            let mut vars = PathVars::new();
            vars.insert("user".to_string(), "fixed".to_string());
            RouteMatch::Found { index: 0, vars }
        }
    }

    #[tokio::test]
    async fn test_custom_matcher() {
        let router = Router::builder(table())
            .matcher(Fixed)
            .build(|_, handler| handler)
            .unwrap();
        let recorder = ResponseRecorder::new();

        router
            .call(fixtures::request(Method::POST, "/anything"), recorder.writer())
            .await;

        assert_eq!(recorder.body_string(), "fixed");
    }
}
