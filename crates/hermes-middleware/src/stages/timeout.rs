//! Timeout supervisor middleware.
//!
//! Runs the rest of the chain on its own task and races it against a deadline
//! and the request's cancellation token.
//!
//! ```text
//!              ┌── handler returns ───────► Completed
//!              ├── handler aborts ────────► Aborted
//!  Running ────┼── handler panics ────────► (re-raised to the panic guard)
//!              ├── deadline fires ────────► TimedOut
//!              └── request cancelled ─────► Canceled
//! ```
//!
//! When the deadline or the cancellation wins, the error is latched on the
//! response state first. The handler task keeps running detached, but every
//! later write through its guarded writer fails with the latched error, and a
//! late panic in it is never observed. The error responder then gets a 503,
//! unless the handler had already committed a head.

use std::sync::Arc;
use std::time::Duration;

use hermes_core::{is_abort, BoxFuture, BoxedErrorHandler, Error, Request, ResponseWriter};
use http::StatusCode;
use tracing::Instrument;

use crate::middleware::{Middleware, Next};

/// Default handler deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Terminal state of one supervised request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The handler returned before the deadline.
    Completed,
    /// The handler raised the silent-abort signal.
    Aborted,
    /// The deadline fired first.
    TimedOut,
    /// The request was cancelled from outside first.
    Canceled,
}

/// Middleware that enforces a handler deadline.
#[derive(Clone)]
pub struct TimeoutMiddleware {
    timeout: Duration,
    on_error: BoxedErrorHandler,
}

impl TimeoutMiddleware {
    /// Creates the supervisor. `on_error` receives a 503 on timeout.
    pub fn new(timeout: Duration, on_error: BoxedErrorHandler) -> Self {
        Self { timeout, on_error }
    }

    /// Returns the configured deadline.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `next` under the deadline and reports how it ended.
    ///
    /// Non-abort panics of the handler are resumed on the calling task.
    pub async fn supervise(
        &self,
        request: Request,
        response: ResponseWriter,
        next: Next,
    ) -> Outcome {
        supervise(
            self.timeout,
            Arc::clone(&self.on_error),
            request,
            response,
            next,
        )
        .await
    }
}

async fn supervise(
    timeout: Duration,
    on_error: BoxedErrorHandler,
    request: Request,
    response: ResponseWriter,
    next: Next,
) -> Outcome {
    let parent = request.context().cancellation().clone();
    let deadline = parent.child_token();
    let span = request.context().span().clone();

    let inner = request
        .clone()
        .map_context(|ctx| ctx.with_cancellation(deadline.clone()));
    let mut task = tokio::spawn(next.run(inner, response.guarded()).instrument(span.clone()));

    let err = tokio::select! {
        joined = &mut task => match joined {
            Ok(()) => return Outcome::Completed,
            Err(join_err) if join_err.is_panic() => {
                let payload = join_err.into_panic();
                if is_abort(payload.as_ref()) {
                    return Outcome::Aborted;
                }
                std::panic::resume_unwind(payload);
            }
            Err(_) => Error::Canceled,
        },
        () = tokio::time::sleep(timeout) => Error::Timeout,
        () = parent.cancelled() => Error::Canceled,
    };

    deadline.cancel();
    response.latch(err.clone()).await;
    // Dropping the join handle detaches the task.
    drop(task);

    let outcome = if err.is_timeout() {
        Outcome::TimedOut
    } else {
        Outcome::Canceled
    };

    let stats = response.stats().await;
    if stats.header_written {
        tracing::error!(
            parent: &span,
            error = %err,
            status = stats.status.map_or(0, |s| s.as_u16()),
            "handler did not finish in time and the response was already written"
        );
        return outcome;
    }

    tracing::warn!(
        parent: &span,
        error = %err,
        timeout = ?timeout,
        "handler did not finish in time"
    );
    on_error
        .handle_error(
            request,
            response.unguarded(),
            StatusCode::SERVICE_UNAVAILABLE,
            err,
        )
        .await;
    outcome
}

impl Middleware for TimeoutMiddleware {
    fn name(&self) -> &'static str {
        "timeout"
    }

    fn process(
        &self,
        request: Request,
        response: ResponseWriter,
        next: Next,
    ) -> BoxFuture<'static, ()> {
        let timeout = self.timeout;
        let on_error = Arc::clone(&self.on_error);
        Box::pin(async move {
            supervise(timeout, on_error, request, response, next).await;
        })
    }
}
