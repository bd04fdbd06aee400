//! The inbound request type seen by interceptors and handlers.

use std::sync::Arc;

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Uri};

use crate::context::RequestContext;

/// An inbound request.
///
/// The head is shared, the body is already collected, and the
/// [`RequestContext`] carries the values injected by interceptors. Cloning is
/// cheap; interceptors hand an updated clone to the next stage.
#[derive(Debug, Clone)]
pub struct Request {
    head: Arc<Parts>,
    body: Bytes,
    context: RequestContext,
}

impl Request {
    /// Wraps an `http` request with a fresh context.
    pub fn new(request: http::Request<Bytes>) -> Self {
        let (head, body) = request.into_parts();
        Self::from_parts(head, body, RequestContext::new())
    }

    /// Builds a request from a head, a collected body and a context.
    pub fn from_parts(head: Parts, body: Bytes, context: RequestContext) -> Self {
        Self {
            head: Arc::new(head),
            body,
            context,
        }
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        &self.head.method
    }

    /// Returns the request URI.
    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    /// Returns the raw, still percent-encoded request path.
    pub fn path(&self) -> &str {
        self.head.uri.path()
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// Returns a header value if it is present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the collected request body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the request context.
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Returns this request with its context replaced by `f(context)`.
    ///
    /// # Example
    ///
    /// ```
    /// use hermes_core::{fixtures, RequestId};
    /// use http::Method;
    ///
    /// let req = fixtures::request(Method::GET, "/")
    ///     .map_context(|ctx| ctx.with_request_id(RequestId::new("abc")));
    /// assert_eq!(req.context().request_id().unwrap().as_str(), "abc");
    /// ```
    pub fn map_context(mut self, f: impl FnOnce(RequestContext) -> RequestContext) -> Self {
        self.context = f(self.context);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let request = http::Request::builder()
            .method(Method::POST)
            .uri("/users/a%2Fb?verbose=1")
            .header("content-type", "application/json")
            .body(Bytes::from_static(b"{}"))
            .unwrap();

        let req = Request::new(request);
        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.path(), "/users/a%2Fb");
        assert_eq!(req.uri().query(), Some("verbose=1"));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.body().as_ref(), b"{}");
    }

    #[test]
    fn test_clone_keeps_context_independent() {
        let req = Request::new(http::Request::new(Bytes::new()));
        let cloned = req
            .clone()
            .map_context(|ctx| ctx.with_span(tracing::info_span!("request")));
        assert!(req.context().span().is_none());
        assert!(cloned.context().request_id().is_none());
    }
}
