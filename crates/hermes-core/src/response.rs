//! Synchronized response state.
//!
//! [`ResponseWriter`] wraps a transport [`ResponseSink`] and tracks whether
//! the response head was committed, which status was sent and how many body
//! bytes went out. Every operation takes the same lock, so the handler task
//! and the timeout supervisor can race on one response safely.
//!
//! A writer handle is either *guarded* or not. Guarded handles (the ones given
//! to handlers under a deadline) refuse all writes once an error has been
//! latched with [`ResponseWriter::latch`]. Unguarded handles, used by the
//! error responder and the transport, are never blocked by the latch.

use std::fmt;
use std::io;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Mutex;

use crate::error::Error;
use crate::handler::BoxFuture;

const COPY_CHUNK_SIZE: usize = 8 * 1024;

/// Transport-side destination of a response.
///
/// The head is sent exactly once, before any body chunk.
pub trait ResponseSink: Send + 'static {
    /// Sends the response head.
    fn send_head(&mut self, status: StatusCode, headers: HeaderMap);

    /// Sends one body chunk.
    fn send_data(&mut self, data: Bytes) -> BoxFuture<'_, io::Result<()>>;

    /// Ends the body. Later chunks may be rejected.
    fn close(&mut self) {}
}

/// Snapshot of the response state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseStats {
    /// Whether the response head has been committed.
    pub header_written: bool,
    /// The committed status, if any.
    pub status: Option<StatusCode>,
    /// Body bytes accepted by the sink so far.
    pub bytes_written: u64,
}

struct State {
    sink: Box<dyn ResponseSink>,
    headers: HeaderMap,
    header_written: bool,
    status: Option<StatusCode>,
    bytes_written: u64,
    latched: Option<Error>,
}

impl State {
    fn commit(&mut self, status: StatusCode) {
        if self.header_written {
            return;
        }
        self.header_written = true;
        self.status = Some(status);
        self.sink.send_head(status, self.headers.clone());
    }
}

/// Shared, lock-protected response state.
///
/// # Example
///
/// ```
/// use hermes_core::fixtures::ResponseRecorder;
/// use http::StatusCode;
///
/// # tokio_test::block_on(async {
/// let recorder = ResponseRecorder::new();
/// let writer = recorder.writer();
///
/// writer.write_header(StatusCode::ACCEPTED).await;
/// writer.write_header(StatusCode::NOT_FOUND).await;
///
/// let stats = writer.stats().await;
/// assert_eq!(stats.status, Some(StatusCode::ACCEPTED));
/// # });
/// ```
#[derive(Clone)]
pub struct ResponseWriter {
    state: Arc<Mutex<State>>,
    guarded: bool,
}

impl ResponseWriter {
    /// Creates an unguarded writer over a sink.
    pub fn new(sink: impl ResponseSink) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                sink: Box::new(sink),
                headers: HeaderMap::new(),
                header_written: false,
                status: None,
                bytes_written: 0,
                latched: None,
            })),
            guarded: false,
        }
    }

    /// Returns a handle on the same state that honours a latched error.
    pub fn guarded(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            guarded: true,
        }
    }

    /// Returns a handle on the same state that ignores a latched error.
    pub fn unguarded(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            guarded: false,
        }
    }

    /// Returns `true` if this handle honours a latched error.
    pub const fn is_guarded(&self) -> bool {
        self.guarded
    }

    /// Latches an error. Later writes through guarded handles fail with it.
    ///
    /// Only the first latched error is kept.
    pub async fn latch(&self, err: Error) {
        let mut state = self.state.lock().await;
        if state.latched.is_none() {
            state.latched = Some(err);
        }
    }

    /// Returns the latched error, if any.
    pub async fn latched(&self) -> Option<Error> {
        self.state.lock().await.latched.clone()
    }

    /// Sets a response header. Ignored once the head is committed.
    pub async fn set_header(&self, name: HeaderName, value: HeaderValue) {
        let mut state = self.state.lock().await;
        if !state.header_written {
            state.headers.insert(name, value);
        }
    }

    /// Appends a response header. Ignored once the head is committed.
    pub async fn append_header(&self, name: HeaderName, value: HeaderValue) {
        let mut state = self.state.lock().await;
        if !state.header_written {
            state.headers.append(name, value);
        }
    }

    /// Returns a response header, pending or committed.
    pub async fn header(&self, name: &HeaderName) -> Option<HeaderValue> {
        self.state.lock().await.headers.get(name).cloned()
    }

    /// Commits the response head with `status`.
    ///
    /// Only the first commit reaches the sink; later calls are no-ops. A
    /// guarded handle with a latched error commits nothing.
    pub async fn write_header(&self, status: StatusCode) {
        let mut state = self.state.lock().await;
        if self.guarded && state.latched.is_some() {
            return;
        }
        state.commit(status);
    }

    /// Writes a body chunk, committing `200 OK` first if needed.
    ///
    /// Returns the number of bytes accepted.
    pub async fn write(&self, data: impl Into<Bytes>) -> Result<usize, Error> {
        let data = data.into();
        let mut state = self.state.lock().await;
        if self.guarded {
            if let Some(err) = &state.latched {
                return Err(err.clone());
            }
        }
        state.commit(StatusCode::OK);

        let len = data.len();
        if len == 0 {
            return Ok(0);
        }
        state.sink.send_data(data).await.map_err(Error::write)?;
        state.bytes_written += len as u64;
        Ok(len)
    }

    /// Streams `source` into the response, committing `200 OK` first if needed.
    ///
    /// The lock is held for the whole copy. Bytes that reached the sink are
    /// counted even if the copy fails part way.
    pub async fn copy_from<R>(&self, mut source: R) -> Result<u64, Error>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut state = self.state.lock().await;
        if self.guarded {
            if let Some(err) = &state.latched {
                return Err(err.clone());
            }
        }
        state.commit(StatusCode::OK);

        let mut copied = 0_u64;
        let mut buf = BytesMut::with_capacity(COPY_CHUNK_SIZE);
        loop {
            buf.reserve(COPY_CHUNK_SIZE);
            let n = source.read_buf(&mut buf).await.map_err(Error::read_from)?;
            if n == 0 {
                return Ok(copied);
            }
            state
                .sink
                .send_data(buf.split().freeze())
                .await
                .map_err(Error::read_from)?;
            state.bytes_written += n as u64;
            copied += n as u64;
        }
    }

    /// Returns a snapshot of the response state.
    pub async fn stats(&self) -> ResponseStats {
        let state = self.state.lock().await;
        ResponseStats {
            header_written: state.header_written,
            status: state.status,
            bytes_written: state.bytes_written,
        }
    }

    /// Commits `200 OK` if nothing has been committed yet, then closes the
    /// sink.
    ///
    /// Called by the transport once the chain returns, so a handler that
    /// wrote nothing still produces a response, and a detached handler still
    /// holding a writer cannot keep the body open.
    pub async fn finish(&self) {
        let mut state = self.state.lock().await;
        state.commit(StatusCode::OK);
        state.sink.close();
    }
}

impl fmt::Debug for ResponseWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseWriter")
            .field("guarded", &self.guarded)
            .finish_non_exhaustive()
    }
}
