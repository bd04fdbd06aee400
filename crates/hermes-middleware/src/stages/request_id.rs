//! Request ID middleware.
//!
//! Every request gets an identifier used for log correlation. The id is taken
//! from the inbound `Request-Id` header, then `X-Request-Id`, and otherwise
//! produced by the configured [`IdGenerator`]. It is stored in the request
//! context and echoed in both response headers.

use std::sync::Arc;

use hermes_core::{
    BoxFuture, BoxedErrorHandler, IdGenerator, Request, RequestId, ResponseWriter,
    UuidV7Generator,
};
use http::header::{HeaderName, HeaderValue};
use http::StatusCode;

use crate::middleware::{Middleware, Next};

/// The primary request id header.
pub const REQUEST_ID_HEADER: &str = "request-id";

/// The conventional request id header.
pub const X_REQUEST_ID_HEADER: &str = "x-request-id";

/// Middleware that extracts or generates request ids.
#[derive(Clone)]
pub struct RequestIdMiddleware {
    generator: Arc<dyn IdGenerator>,
    on_error: BoxedErrorHandler,
    trust_incoming: bool,
}

impl RequestIdMiddleware {
    /// Creates the middleware with the UUID v7 generator, trusting inbound ids.
    ///
    /// `on_error` receives a 500 if the generator fails.
    pub fn new(on_error: BoxedErrorHandler) -> Self {
        Self {
            generator: Arc::new(UuidV7Generator),
            on_error,
            trust_incoming: true,
        }
    }

    /// Replaces the id generator.
    pub fn with_generator(mut self, generator: Arc<dyn IdGenerator>) -> Self {
        self.generator = generator;
        self
    }

    /// Sets whether inbound id headers are adopted.
    pub fn trust_incoming(mut self, trust: bool) -> Self {
        self.trust_incoming = trust;
        self
    }

    fn extract(&self, request: &Request) -> Option<RequestId> {
        if !self.trust_incoming {
            return None;
        }
        [REQUEST_ID_HEADER, X_REQUEST_ID_HEADER]
            .into_iter()
            .filter_map(|name| request.header(name))
            .find(|value| !value.is_empty())
            .map(RequestId::from)
    }
}

impl Middleware for RequestIdMiddleware {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn process(
        &self,
        request: Request,
        response: ResponseWriter,
        next: Next,
    ) -> BoxFuture<'static, ()> {
        let id = match self.extract(&request) {
            Some(id) => Ok(id),
            None => self.generator.generate(),
        };
        let on_error = Arc::clone(&self.on_error);

        Box::pin(async move {
            let id = match id {
                Ok(id) => id,
                Err(err) => {
                    tracing::error!(error = %err, "failed to generate request id");
                    on_error
                        .handle_error(request, response, StatusCode::INTERNAL_SERVER_ERROR, err)
                        .await;
                    return;
                }
            };

            if let Ok(value) = HeaderValue::from_str(id.as_str()) {
                response
                    .set_header(HeaderName::from_static(REQUEST_ID_HEADER), value.clone())
                    .await;
                response
                    .set_header(HeaderName::from_static(X_REQUEST_ID_HEADER), value)
                    .await;
            }

            let request = request.map_context(|ctx| ctx.with_request_id(id));
            next.run(request, response).await;
        })
    }
}
