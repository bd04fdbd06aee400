//! Panic guard middleware.
//!
//! Catches panics raised by the rest of the chain and turns them into an
//! error response. The silent-abort signal ([`hermes_core::abort`]) is
//! swallowed without a response. If the response head was already committed,
//! the panic is only logged since the status can no longer change.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use hermes_core::{is_abort, BoxFuture, BoxedErrorHandler, Error, Request, ResponseWriter};
use http::StatusCode;

use crate::middleware::{Middleware, Next};

macro_rules! display_payload {
    ($payload:expr, $($ty:ty),+ $(,)?) => {
        $(
            if let Some(value) = $payload.downcast_ref::<$ty>() {
                return Error::panic(value.to_string());
            }
        )+
    };
}

/// Converts a caught panic payload into an [`Error`].
///
/// A payload that already is an [`Error`] is returned as is. Strings,
/// boxed errors and primitive values are stringified. Anything else gets a
/// generic message, so this never fails.
///
/// # Example
///
/// ```
/// use hermes_middleware::stages::recover::panic_error;
///
/// let payload = std::panic::catch_unwind(|| std::panic::panic_any(5_i32)).unwrap_err();
/// assert_eq!(panic_error(payload).to_string(), "5");
/// ```
pub fn panic_error(payload: Box<dyn Any + Send>) -> Error {
    let payload = match payload.downcast::<Error>() {
        Ok(err) => return *err,
        Err(payload) => payload,
    };
    if let Some(err) = payload.downcast_ref::<Box<dyn std::error::Error + Send + Sync>>() {
        return Error::panic(err.to_string());
    }
    if let Some(err) = payload.downcast_ref::<std::io::Error>() {
        return Error::panic(err.to_string());
    }
    display_payload!(
        payload, &'static str, String, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128,
        usize, f32, f64, bool, char,
    );
    Error::panic("handler panicked with a non-displayable value")
}

/// Middleware that recovers from panics in the rest of the chain.
#[derive(Clone)]
pub struct RecoverMiddleware {
    on_error: BoxedErrorHandler,
}

impl RecoverMiddleware {
    /// Creates the guard. `on_error` receives a 500 for every recovered panic.
    pub fn new(on_error: BoxedErrorHandler) -> Self {
        Self { on_error }
    }
}

impl Middleware for RecoverMiddleware {
    fn name(&self) -> &'static str {
        "recover"
    }

    fn process(
        &self,
        request: Request,
        response: ResponseWriter,
        next: Next,
    ) -> BoxFuture<'static, ()> {
        let on_error = Arc::clone(&self.on_error);
        Box::pin(async move {
            let outcome = AssertUnwindSafe(next.run(request.clone(), response.clone()))
                .catch_unwind()
                .await;
            let Err(payload) = outcome else {
                return;
            };
            if is_abort(payload.as_ref()) {
                return;
            }

            let err = panic_error(payload);
            let stats = response.stats().await;
            if stats.header_written {
                tracing::error!(
                    parent: request.context().span(),
                    error = %err,
                    status = stats.status.map_or(0, |s| s.as_u16()),
                    "handler panicked after the response was written"
                );
                return;
            }

            tracing::error!(parent: request.context().span(), error = %err, "handler panicked");
            on_error
                .handle_error(
                    request,
                    response.unguarded(),
                    StatusCode::INTERNAL_SERVER_ERROR,
                    err,
                )
                .await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::fixtures::{self, ResponseRecorder};
    use hermes_core::{abort, error_handler_fn, handler_fn};
    use http::Method;
    use parking_lot::Mutex;

    type Reports = Arc<Mutex<Vec<(StatusCode, String)>>>;

    fn reporting(reports: &Reports) -> BoxedErrorHandler {
        let reports = Arc::clone(reports);
        error_handler_fn(
            move |_req: Request, rw: ResponseWriter, status: StatusCode, err: Error| {
                let reports = Arc::clone(&reports);
                async move {
                    reports.lock().push((status, err.to_string()));
                    rw.write_header(status).await;
                }
            },
        )
    }

    async fn run(next: Next, reports: &Reports) -> ResponseRecorder {
        let recorder = ResponseRecorder::new();
        RecoverMiddleware::new(reporting(reports))
            .process(fixtures::request(Method::GET, "/"), recorder.writer(), next)
            .await;
        recorder
    }

    #[tokio::test]
    async fn test_non_error_panic_value_is_stringified() {
        let reports = Reports::default();
        let next = Next::new(handler_fn(|_req: Request, _rw: ResponseWriter| async move {
            std::panic::panic_any(5_i32);
        }));

        let recorder = run(next, &reports).await;

        assert_eq!(
            *reports.lock(),
            vec![(StatusCode::INTERNAL_SERVER_ERROR, "5".to_string())]
        );
        assert_eq!(recorder.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_error_panic_value_is_kept() {
        let reports = Reports::default();
        let next = Next::new(handler_fn(|_req: Request, _rw: ResponseWriter| async move {
            std::panic::panic_any(Error::MethodNotAllowed);
        }));

        run(next, &reports).await;

        assert_eq!(reports.lock()[0].1, "hermes: method not allowed");
    }

    #[tokio::test]
    async fn test_abort_is_silent() {
        let reports = Reports::default();
        let next = Next::new(handler_fn(|_req: Request, _rw: ResponseWriter| async move {
            abort();
        }));

        let recorder = run(next, &reports).await;

        assert!(reports.lock().is_empty());
        assert_eq!(recorder.head_calls(), 0);
    }

    #[tokio::test]
    async fn test_committed_response_is_not_reported() {
        let reports = Reports::default();
        let next = Next::new(handler_fn(|_req: Request, rw: ResponseWriter| async move {
            rw.write_header(StatusCode::ACCEPTED).await;
            panic!("late failure");
        }));

        let recorder = run(next, &reports).await;

        assert!(reports.lock().is_empty());
        assert_eq!(recorder.status(), Some(StatusCode::ACCEPTED));
    }

    #[tokio::test]
    async fn test_normal_return_is_untouched() {
        let reports = Reports::default();
        let next = Next::new(handler_fn(|_req: Request, rw: ResponseWriter| async move {
            let _ = rw.write("fine").await;
        }));

        let recorder = run(next, &reports).await;

        assert!(reports.lock().is_empty());
        assert_eq!(recorder.body_string(), "fine");
    }

    #[test]
    fn test_panic_error_fallbacks() {
        #[derive(Debug)]
        struct Opaque;

        let from = |f: fn()| panic_error(std::panic::catch_unwind(f).unwrap_err());

        assert_eq!(from(|| panic!("static message")).to_string(), "static message");
        assert_eq!(from(|| panic!("formatted {}", 7)).to_string(), "formatted 7");
        assert_eq!(from(|| std::panic::panic_any(2.5_f64)).to_string(), "2.5");
        assert_eq!(from(|| std::panic::panic_any(true)).to_string(), "true");
        assert_eq!(
            from(|| std::panic::panic_any(Opaque)).to_string(),
            "handler panicked with a non-displayable value"
        );
    }
}
