//! HTTP server lifecycle.
//!
//! A [`Server`] is built from a [`ServerConfig`] and an [`Application`]. Every
//! route is wrapped in the built-in stages, outermost first:
//!
//! ```text
//! request_id → route_context → access_log → recover → timeout
//!     → application middlewares → route middlewares → handler
//! ```
//!
//! and the transport commits `200 OK` once the chain returns if nothing was
//! written. Unmatched requests skip `route_context` and `timeout` and go
//! straight to the application's error responder.
//!
//! # Shutdown
//!
//! Cancelling the token passed to [`Server::listen_and_serve`] stops
//! accepting connections and asks every live connection to finish its
//! in-flight request. If that takes longer than the shutdown timeout the
//! remaining connections are force-closed and [`ServerError::ForcedShutdown`]
//! is returned.
//!
//! Force-closing drops each connection together with its in-flight
//! requests before their contexts are cancelled. A handler that reacts to
//! cancellation therefore writes into a closed response, and the client
//! only ever sees the connection drop.

use std::convert::Infallible;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hermes_core::{
    BoxFuture, BoxedErrorHandler, Error, ErrorHandler, Handler, Request, RequestContext,
    ResponseWriter,
};
use hermes_middleware::stages::{
    AccessLogMiddleware, RecoverMiddleware, RequestIdMiddleware, RouteContextMiddleware,
    TimeoutMiddleware,
};
use hermes_middleware::{compose, BoxedMiddleware};
use hermes_router::{PathError, Route, RouteError, RouteTable, Router};
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Response, StatusCode};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body as _, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::shutdown::{ConnectionToken, ConnectionTracker};
use crate::sink::{empty_body, ChannelSink, ResponseBody};

/// Back-off after the process ran out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Errors returned by [`Server::listen_and_serve`].
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be resolved or bound.
    #[error("hermes: listen: {0}")]
    Bind(#[source] io::Error),

    /// Accepting connections failed.
    #[error("hermes: serve: {0}")]
    Serve(#[source] io::Error),

    /// Draining connections failed.
    #[error("hermes: shutdown: {0}")]
    Shutdown(String),

    /// Connections were still open when the shutdown timeout expired.
    #[error("hermes: forced server shutdown")]
    ForcedShutdown,
}

/// A server application: its routes and request/response behavior.
///
/// # Example
///
/// ```
/// use hermes_core::{BoxFuture, Error, ErrorHandler, JsonErrorHandler, Request, ResponseWriter};
/// use hermes_router::Route;
/// use hermes_server::Application;
/// use http::StatusCode;
///
/// struct Status;
///
/// impl Application for Status {
///     fn routes(&self) -> Vec<Route> {
///         vec![Route::get("status", "/status").handle(|_req: Request, rw: ResponseWriter| async move {
///             let _ = rw.write("ok").await;
///         })]
///     }
///
///     fn error(
///         &self,
///         request: Request,
///         response: ResponseWriter,
///         status: StatusCode,
///         error: Error,
///     ) -> BoxFuture<'static, ()> {
///         JsonErrorHandler.handle_error(request, response, status, error)
///     }
/// }
/// ```
pub trait Application: Send + Sync + 'static {
    /// The routes the application serves.
    fn routes(&self) -> Vec<Route>;

    /// Interceptors run on every route, before the route's own.
    fn middlewares(&self) -> Vec<BoxedMiddleware> {
        Vec::new()
    }

    /// Writes a successful response body.
    ///
    /// The default encodes `body` as JSON with the status already set on
    /// `response`, or `200 OK` if none was.
    fn respond(
        &self,
        _request: &Request,
        response: ResponseWriter,
        body: serde_json::Value,
    ) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            let encoded = match serde_json::to_vec(&body) {
                Ok(encoded) => encoded,
                Err(err) => {
                    tracing::error!(error = %err, "Failed to encode response");
                    return;
                }
            };

            response
                .set_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .await;
            if let Err(err) = response.write(encoded).await {
                if !matches!(err, Error::Timeout | Error::Canceled) {
                    tracing::error!(error = %err, "Failed to write response");
                }
            }
        })
    }

    /// Writes the response for a request that failed.
    ///
    /// `response` is never blocked by a latched timeout, so it can still
    /// answer after the handler missed its deadline.
    fn error(
        &self,
        request: Request,
        response: ResponseWriter,
        status: StatusCode,
        error: Error,
    ) -> BoxFuture<'static, ()>;
}

struct ApplicationErrors<A>(Arc<A>);

impl<A: Application> ErrorHandler for ApplicationErrors<A> {
    fn handle_error(
        &self,
        request: Request,
        response: ResponseWriter,
        status: StatusCode,
        error: Error,
    ) -> BoxFuture<'static, ()> {
        self.0.error(request, response, status, error)
    }
}

/// The Hermes HTTP server.
pub struct Server {
    config: ServerConfig,
    router: Arc<Router>,
    address: watch::Sender<Option<SocketAddr>>,
}

impl Server {
    /// Builds the server and composes every route's chain.
    ///
    /// # Errors
    ///
    /// Fails if a route has no name, a duplicate name, no handler or an
    /// invalid pattern.
    pub fn new<A: Application>(config: ServerConfig, app: A) -> Result<Self, RouteError> {
        let app = Arc::new(app);
        let on_error: BoxedErrorHandler = Arc::new(ApplicationErrors(Arc::clone(&app)));
        let table = RouteTable::register(app.routes())?;
        let app_middlewares = app.middlewares();

        let request_id: BoxedMiddleware = Arc::new(
            RequestIdMiddleware::new(Arc::clone(&on_error))
                .trust_incoming(config.trust_request_id()),
        );
        let access_log: BoxedMiddleware = Arc::new(AccessLogMiddleware::new());
        let recover: BoxedMiddleware = Arc::new(RecoverMiddleware::new(Arc::clone(&on_error)));

        let router = Router::builder(table)
            .on_error(Arc::clone(&on_error))
            .fallback(vec![
                Arc::clone(&request_id),
                Arc::clone(&access_log),
                Arc::clone(&recover),
            ])
            .build(|route, inner| {
                let timeout = route
                    .request_timeout()
                    .unwrap_or_else(|| config.request_timeout());
                let mut stages: Vec<BoxedMiddleware> = vec![
                    Arc::clone(&request_id),
                    Arc::new(RouteContextMiddleware::new(route.info())),
                    Arc::clone(&access_log),
                    Arc::clone(&recover),
                    Arc::new(TimeoutMiddleware::new(timeout, Arc::clone(&on_error))),
                ];
                stages.extend(app_middlewares.iter().cloned());
                compose(&stages, inner)
            })?;

        let (address, _) = watch::channel(None);
        Ok(Self {
            config,
            router: Arc::new(router),
            address,
        })
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the request dispatcher.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Looks up a route by name.
    pub fn route(&self, name: &str) -> Option<&Route> {
        self.router.route(name)
    }

    /// Builds a concrete path for the route called `name`.
    pub fn path<S: AsRef<str>>(&self, name: &str, values: &[S]) -> Result<String, PathError> {
        self.router.path(name, values)
    }

    /// Returns the bound address, waiting until the listener is up.
    ///
    /// Binding to port 0 only resolves the port once listening starts.
    pub async fn address(&self) -> SocketAddr {
        let mut started = self.address.subscribe();
        loop {
            if let Some(address) = *started.borrow_and_update() {
                return address;
            }
            // The sender lives in `self`, so this only fails once `self` is gone.
            let _ = started.changed().await;
        }
    }

    /// Binds the listener and serves until `cancel` fires.
    ///
    /// On cancellation the server drains in-flight requests for up to the
    /// shutdown timeout.
    ///
    /// # Errors
    ///
    /// - [`ServerError::Bind`] if the address cannot be bound
    /// - [`ServerError::Serve`] if accepting fails; live connections are
    ///   closed without draining
    /// - [`ServerError::ForcedShutdown`] if draining exceeds the timeout
    /// - [`ServerError::Shutdown`] if a connection failed while draining
    pub async fn listen_and_serve(&self, cancel: CancellationToken) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.http_addr())
            .await
            .map_err(ServerError::Bind)?;
        let address = listener.local_addr().map_err(ServerError::Bind)?;
        self.address.send_replace(Some(address));
        tracing::info!(%address, "Server started");

        let tracker = ConnectionTracker::new();
        let draining = CancellationToken::new();
        let force_close = CancellationToken::new();
        let requests = CancellationToken::new();

        let served = loop {
            tokio::select! {
                () = cancel.cancelled() => break Ok(()),
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => self.spawn_connection(
                        stream,
                        remote,
                        tracker.acquire(),
                        draining.clone(),
                        force_close.clone(),
                        &requests,
                    ),
                    Err(err) if is_connection_error(&err) => {
                        tracing::debug!(error = %err, "Failed to accept connection");
                    }
                    Err(err) if is_resource_exhausted(&err) => {
                        tracing::warn!(error = %err, "Failed to accept connection, backing off");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                    Err(err) => break Err(err),
                },
            }
        };
        drop(listener);

        if let Err(err) = served {
            tracing::error!(%address, error = %err, "Server stopped accepting connections");
            self.close_connections(&tracker, &force_close, &requests).await;
            return Err(ServerError::Serve(err));
        }

        let shutdown_timeout = self.config.shutdown_timeout();
        tracing::info!(%address, timeout = ?shutdown_timeout, "Server closing");

        let failed_before = tracker.failed_connections();
        draining.cancel();
        let drained = tokio::time::timeout(shutdown_timeout, tracker.wait_for_shutdown()).await;
        let active = tracker.active_connections();
        self.close_connections(&tracker, &force_close, &requests).await;
        tracing::info!(%address, "Server closed");

        if drained.is_err() {
            tracing::warn!(active, "Shutdown timeout reached, connections force-closed");
            return Err(ServerError::ForcedShutdown);
        }
        let failed = tracker.failed_connections().saturating_sub(failed_before);
        if failed > 0 {
            return Err(ServerError::Shutdown(format!(
                "{failed} connection(s) failed while draining"
            )));
        }
        Ok(())
    }

    /// Closes every connection, then cancels the requests they left behind.
    async fn close_connections(
        &self,
        tracker: &ConnectionTracker,
        force_close: &CancellationToken,
        requests: &CancellationToken,
    ) {
        force_close.cancel();
        let closed = tokio::time::timeout(
            self.config.shutdown_timeout(),
            tracker.wait_for_shutdown(),
        )
        .await;
        if closed.is_err() {
            tracing::warn!(
                active = tracker.active_connections(),
                "Connections still open after force-close"
            );
        }
        requests.cancel();
    }

    fn spawn_connection(
        &self,
        stream: TcpStream,
        remote: SocketAddr,
        token: ConnectionToken,
        draining: CancellationToken,
        force_close: CancellationToken,
        requests: &CancellationToken,
    ) {
        let router = Arc::clone(&self.router);
        let body_timeout = self.config.request_timeout();
        let max_body_size = self.config.max_body_size();
        let requests = requests.clone();

        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .header_read_timeout(self.config.read_header_timeout())
            .keep_alive(self.config.keep_alive());

        tokio::spawn(async move {
            let _token = token;
            let service = service_fn(move |request| {
                respond(
                    Arc::clone(&router),
                    request,
                    body_timeout,
                    max_body_size,
                    requests.child_token(),
                )
            });

            let conn = builder.serve_connection(TokioIo::new(stream), service);
            tokio::pin!(conn);

            let result = tokio::select! {
                result = conn.as_mut() => result,
                () = draining.cancelled() => {
                    conn.as_mut().graceful_shutdown();
                    tokio::select! {
                        result = conn.as_mut() => result,
                        () = force_close.cancelled() => {
                            tracing::debug!(%remote, "Connection force-closed");
                            Ok(())
                        }
                    }
                }
            };

            if let Err(err) = result {
                tracing::debug!(%remote, error = %err, "Connection error");
            }
        });
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("routes", &self.router.table().len())
            .finish_non_exhaustive()
    }
}

/// Serves one request: reads the body, runs the chain on its own task and
/// returns once the head is committed.
async fn respond(
    router: Arc<Router>,
    request: http::Request<Incoming>,
    body_timeout: Duration,
    max_body_size: usize,
    cancel: CancellationToken,
) -> Result<Response<ResponseBody>, Infallible> {
    let (parts, body) = request.into_parts();

    let declared = body.size_hint().lower();
    if declared > max_body_size as u64 {
        tracing::debug!(declared, limit = max_body_size, "Request body too large");
        return Ok(bare(StatusCode::PAYLOAD_TOO_LARGE));
    }

    let limited = Limited::new(body, max_body_size);
    let body = match tokio::time::timeout(body_timeout, limited.collect()).await {
        Ok(Ok(collected)) => collected.to_bytes(),
        Ok(Err(err)) if err.is::<LengthLimitError>() => {
            tracing::debug!(limit = max_body_size, "Request body too large");
            return Ok(bare(StatusCode::PAYLOAD_TOO_LARGE));
        }
        Ok(Err(err)) => {
            tracing::debug!(error = %err, "Failed to read request body");
            return Ok(bare(StatusCode::BAD_REQUEST));
        }
        Err(_) => {
            tracing::debug!(timeout = ?body_timeout, "Request body read timed out");
            return Ok(bare(StatusCode::REQUEST_TIMEOUT));
        }
    };

    let (sink, head, response_body) = ChannelSink::channel();
    let writer = ResponseWriter::new(sink);
    let request = Request::from_parts(parts, body, RequestContext::with_token(cancel.clone()));

    // Cancels the request if hyper drops this future before the head is out.
    let guard = cancel.drop_guard();

    tokio::spawn(async move {
        router.call(request, writer.clone()).await;
        writer.finish().await;
    });

    match head.await {
        Ok((status, headers)) => {
            guard.disarm();
            let mut response = Response::new(response_body);
            *response.status_mut() = status;
            *response.headers_mut() = headers;
            Ok(response)
        }
        Err(_) => {
            tracing::error!("Request task ended without a response head");
            Ok(bare(StatusCode::INTERNAL_SERVER_ERROR))
        }
    }
}

fn bare(status: StatusCode) -> Response<ResponseBody> {
    let mut response = Response::new(empty_body());
    *response.status_mut() = status;
    response
}

fn is_connection_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}

// ENFILE and EMFILE.
fn is_resource_exhausted(err: &io::Error) -> bool {
    cfg!(unix) && matches!(err.raw_os_error(), Some(23 | 24))
}
