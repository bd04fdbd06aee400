//! Channel-backed transport sink.
//!
//! The request task writes through a [`ResponseWriter`]; the hyper service
//! waits on the head channel to build the `Response` and streams the body
//! channel into it.

use std::convert::Infallible;
use std::io;

use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use hermes_core::{BoxFuture, ResponseSink};
use http::{HeaderMap, StatusCode};
use http_body_util::StreamBody;
use hyper::body::Frame;
use tokio::sync::{mpsc, oneshot};

/// Body chunks buffered between the request task and the connection.
const BODY_CHANNEL_CAPACITY: usize = 16;

/// Streaming response body handed to hyper.
pub type ResponseBody = StreamBody<BoxStream<'static, Result<Frame<Bytes>, Infallible>>>;

/// Head of a response, as committed by the request task.
pub(crate) type Head = (StatusCode, HeaderMap);

/// Returns a body with no data, for responses built by the transport itself.
pub(crate) fn empty_body() -> ResponseBody {
    StreamBody::new(stream::empty().boxed())
}

/// A [`ResponseSink`] feeding a hyper response.
pub(crate) struct ChannelSink {
    head: Option<oneshot::Sender<Head>>,
    body: Option<mpsc::Sender<Bytes>>,
}

impl ChannelSink {
    /// Creates the sink together with its head receiver and body.
    pub(crate) fn channel() -> (Self, oneshot::Receiver<Head>, ResponseBody) {
        let (head_tx, head_rx) = oneshot::channel();
        let (body_tx, body_rx) = mpsc::channel(BODY_CHANNEL_CAPACITY);

        let frames = stream::unfold(body_rx, |mut rx| async move {
            let data = rx.recv().await?;
            Some((Ok(Frame::data(data)), rx))
        })
        .boxed();

        let sink = Self {
            head: Some(head_tx),
            body: Some(body_tx),
        };
        (sink, head_rx, StreamBody::new(frames))
    }
}

impl ResponseSink for ChannelSink {
    fn send_head(&mut self, status: StatusCode, headers: HeaderMap) {
        if let Some(head) = self.head.take() {
            // The connection may already be gone; the body send reports it.
            let _ = head.send((status, headers));
        }
    }

    fn send_data(&mut self, data: Bytes) -> BoxFuture<'_, io::Result<()>> {
        Box::pin(async move {
            let Some(body) = &self.body else {
                return Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "response already finished",
                ));
            };
            body.send(data).await.map_err(|_| {
                io::Error::new(io::ErrorKind::BrokenPipe, "client connection closed")
            })
        })
    }

    fn close(&mut self) {
        self.body = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::ResponseWriter;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_head_then_body_until_finish() {
        let (sink, head_rx, body) = ChannelSink::channel();
        let writer = ResponseWriter::new(sink);

        let task = tokio::spawn({
            let writer = writer.clone();
            async move {
                writer.write_header(StatusCode::CREATED).await;
                writer.write("hello ").await.unwrap();
                writer.write("world").await.unwrap();
                writer.finish().await;
            }
        });

        let (status, _headers) = head_rx.await.unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let collected = BodyExt::collect(body).await.unwrap().to_bytes();
        assert_eq!(&collected[..], b"hello world");
        task.await.unwrap();

        // A clone that outlives `finish` cannot write any more.
        assert!(writer.write("late").await.is_err());
    }

    #[tokio::test]
    async fn test_dropped_body_fails_writes() {
        let (sink, _head_rx, body) = ChannelSink::channel();
        let writer = ResponseWriter::new(sink);
        drop(body);

        let err = writer.write("data").await.unwrap_err();
        assert!(err.to_string().starts_with("hermes: write: "));
        assert_eq!(writer.stats().await.bytes_written, 0);
    }
}
