//! Access log middleware.
//!
//! Opens the per-request `tracing` span that serves as the request-scoped
//! logger, runs the rest of the chain inside it, then emits one access log
//! event and records request metrics.
//!
//! # Log fields
//!
//! The span carries `route`, `id`, `method`, `path` and the decoded path
//! variables. The completion event adds `status`, `length`, `content_type`
//! and `duration_ms`.

use hermes_core::{BoxFuture, Request, ResponseWriter};
use http::header::CONTENT_TYPE;
use tracing::Instrument;

use crate::middleware::{Middleware, Next};

/// Middleware that logs and measures every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessLogMiddleware;

impl AccessLogMiddleware {
    /// Creates the middleware.
    pub const fn new() -> Self {
        Self
    }
}

fn request_span(request: &Request) -> tracing::Span {
    let ctx = request.context();
    let route = ctx.route().map_or("", |r| r.name());
    let id = ctx.request_id().map_or("", |id| id.as_str());

    let mut vars: Vec<_> = ctx.vars().iter().collect();
    vars.sort();
    let vars = vars
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",");

    tracing::info_span!(
        "request",
        route = %route,
        id = %id,
        method = %request.method(),
        path = %request.path(),
        vars = %vars,
    )
}

impl Middleware for AccessLogMiddleware {
    fn name(&self) -> &'static str {
        "access_log"
    }

    fn process(
        &self,
        request: Request,
        response: ResponseWriter,
        next: Next,
    ) -> BoxFuture<'static, ()> {
        let span = request_span(&request);
        let request = request.map_context(|ctx| ctx.with_span(span.clone()));

        Box::pin(
            async move {
                let route = request
                    .context()
                    .route()
                    .map_or_else(String::new, |r| r.name().to_string());
                let started_at = request.context().started_at();

                next.run(request, response.clone()).await;

                let stats = response.stats().await;
                let content_type = response
                    .header(&CONTENT_TYPE)
                    .await
                    .and_then(|v| v.to_str().ok().map(str::to_owned))
                    .unwrap_or_default();
                let duration = started_at.elapsed();
                let status = stats.status.map_or(0, |s| s.as_u16());

                tracing::info!(
                    status,
                    length = stats.bytes_written,
                    content_type = %content_type,
                    duration_ms = duration.as_secs_f64() * 1000.0,
                    "request completed"
                );
                hermes_telemetry::record_request(&route, status, duration);
            }
            .instrument(span),
        )
    }
}
