//! Test fixtures for Hermes development and testing.
//!
//! [`ResponseRecorder`] is an in-memory [`ResponseSink`] that records what a
//! handler sent, and [`request`] builds a bare request for a method and path.
//!
//! # Example
//!
//! ```
//! use hermes_core::fixtures::{self, ResponseRecorder};
//! use hermes_core::{handler_fn, Handler, Request, ResponseWriter};
//! use http::{Method, StatusCode};
//!
//! # tokio_test::block_on(async {
//! let handler = handler_fn(|_req: Request, rw: ResponseWriter| async move {
//!     rw.write_header(StatusCode::NO_CONTENT).await;
//! });
//!
//! let recorder = ResponseRecorder::new();
//! handler.call(fixtures::request(Method::DELETE, "/users/1"), recorder.writer()).await;
//! assert_eq!(recorder.status(), Some(StatusCode::NO_CONTENT));
//! # });
//! ```

use std::io;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, Method, StatusCode};
use parking_lot::Mutex;

use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::{ResponseSink, ResponseWriter};

#[derive(Debug, Default)]
struct Recorded {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
    head_calls: usize,
    fail_writes: Option<io::ErrorKind>,
    closed: bool,
}

/// In-memory response sink.
///
/// Clones share the same recording, so a test keeps one handle while the
/// writer owns another.
#[derive(Debug, Clone, Default)]
pub struct ResponseRecorder {
    inner: Arc<Mutex<Recorded>>,
}

impl ResponseRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a recorder whose body writes fail with `kind`.
    #[must_use]
    pub fn failing(kind: io::ErrorKind) -> Self {
        let recorder = Self::default();
        recorder.inner.lock().fail_writes = Some(kind);
        recorder
    }

    /// Returns an unguarded writer over this recorder.
    #[must_use]
    pub fn writer(&self) -> ResponseWriter {
        ResponseWriter::new(self.clone())
    }

    /// Returns the committed status.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.inner.lock().status
    }

    /// Returns the committed headers.
    #[must_use]
    pub fn headers(&self) -> HeaderMap {
        self.inner.lock().headers.clone()
    }

    /// Returns a committed header as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        self.inner
            .lock()
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    }

    /// Returns the recorded body.
    #[must_use]
    pub fn body(&self) -> Bytes {
        Bytes::copy_from_slice(&self.inner.lock().body)
    }

    /// Returns the recorded body as lossy UTF-8.
    #[must_use]
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock().body).into_owned()
    }

    /// Returns how many times the head reached the sink.
    #[must_use]
    pub fn head_calls(&self) -> usize {
        self.inner.lock().head_calls
    }

    /// Returns `true` once the writer has closed the sink.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

impl ResponseSink for ResponseRecorder {
    fn send_head(&mut self, status: StatusCode, headers: HeaderMap) {
        let mut recorded = self.inner.lock();
        recorded.head_calls += 1;
        recorded.status = Some(status);
        recorded.headers = headers;
    }

    fn send_data(&mut self, data: Bytes) -> BoxFuture<'_, io::Result<()>> {
        let result = {
            let mut recorded = self.inner.lock();
            match recorded.fail_writes {
                Some(kind) => Err(io::Error::new(kind, "recorder write failure")),
                None if recorded.closed => Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "response already finished",
                )),
                None => {
                    recorded.body.extend_from_slice(&data);
                    Ok(())
                }
            }
        };
        Box::pin(async move { result })
    }

    fn close(&mut self) {
        self.inner.lock().closed = true;
    }
}

/// Builds a request with an empty body and a fresh context.
///
/// # Panics
///
/// Panics if `path` is not a valid URI.
#[must_use]
pub fn request(method: Method, path: &str) -> Request {
    let request = http::Request::builder()
        .method(method)
        .uri(path)
        .body(Bytes::new())
        .expect("fixture request should be valid");
    Request::new(request)
}
