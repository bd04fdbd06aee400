//! End-to-end chain tests.
//!
//! These drive the full per-route stack the server builds, in order:
//!
//! 1. Request ID
//! 2. Route context
//! 3. Access log
//! 4. Panic guard
//! 5. Timeout supervisor
//! 6. Application and route middlewares
//! 7. Handler

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use hermes_core::fixtures::ResponseRecorder;
use hermes_core::{
    abort, handler_fn, BoxedHandler, JsonErrorHandler, Request, ResponseWriter, RouteInfo,
};
use hermes_middleware::stages::{
    AccessLogMiddleware, RecoverMiddleware, RequestIdMiddleware, RouteContextMiddleware,
    TimeoutMiddleware,
};
use hermes_middleware::{BoxedMiddleware, FnMiddleware, MiddlewareChain, Next};
use http::header::{HeaderName, HeaderValue};
use http::{Method, StatusCode};

fn full_stack(timeout: Duration, extra: Vec<BoxedMiddleware>, handler: BoxedHandler) -> BoxedHandler {
    let on_error = Arc::new(JsonErrorHandler);
    let mut chain = MiddlewareChain::new()
        .with(RequestIdMiddleware::new(on_error.clone()))
        .with(RouteContextMiddleware::new(RouteInfo::new(
            "test",
            Some(Method::GET),
            "/test",
        )))
        .with(AccessLogMiddleware::new())
        .with(RecoverMiddleware::new(on_error.clone()))
        .with(TimeoutMiddleware::new(timeout, on_error));
    chain.extend(extra);
    chain.then(handler)
}

fn get(path: &str, request_id: Option<&str>) -> Request {
    let mut builder = http::Request::builder().method(Method::GET).uri(path);
    if let Some(id) = request_id {
        builder = builder.header("request-id", id);
    }
    Request::new(builder.body(Bytes::new()).unwrap())
}

fn json_body(recorder: &ResponseRecorder) -> serde_json::Value {
    serde_json::from_slice(&recorder.body()).unwrap()
}

#[tokio::test]
async fn test_successful_request_flows_through_all_stages() {
    let handler = handler_fn(|req: Request, rw: ResponseWriter| async move {
        let route = req.context().route().map(|r| r.name().to_string());
        let id = req.context().request_id().map(ToString::to_string);
        let _ = rw
            .write(format!("{}:{}", route.unwrap_or_default(), id.unwrap_or_default()))
            .await;
    });
    let stack = full_stack(Duration::from_secs(5), Vec::new(), handler);

    let recorder = ResponseRecorder::new();
    stack.call(get("/test", Some("req-42")), recorder.writer()).await;

    assert_eq!(recorder.status(), Some(StatusCode::OK));
    assert_eq!(recorder.body_string(), "test:req-42");
    assert_eq!(recorder.header("request-id").as_deref(), Some("req-42"));
    assert_eq!(recorder.header("x-request-id").as_deref(), Some("req-42"));
}

#[tokio::test]
async fn test_panic_with_integer_becomes_500() {
    let handler = handler_fn(|_req: Request, _rw: ResponseWriter| async move {
        std::panic::panic_any(5_i32);
    });
    let stack = full_stack(Duration::from_secs(5), Vec::new(), handler);

    let recorder = ResponseRecorder::new();
    stack.call(get("/test", Some("req-5")), recorder.writer()).await;

    assert_eq!(recorder.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    let body = json_body(&recorder);
    assert_eq!(body["error"]["status"], 500);
    assert_eq!(body["error"]["message"], "5");
    assert_eq!(body["request_id"], "req-5");
}

#[tokio::test]
async fn test_slow_handler_becomes_503() {
    let handler = handler_fn(|_req: Request, rw: ResponseWriter| async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let _ = rw.write("too late").await;
    });
    let stack = full_stack(Duration::from_millis(50), Vec::new(), handler);

    let recorder = ResponseRecorder::new();
    stack.call(get("/test", None), recorder.writer()).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(recorder.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    assert_eq!(recorder.head_calls(), 1);
    let body = json_body(&recorder);
    assert_eq!(body["error"]["message"], "hermes: handler timeout");
}

#[tokio::test]
async fn test_abort_produces_no_response() {
    let handler = handler_fn(|_req: Request, _rw: ResponseWriter| async move {
        abort();
    });
    let stack = full_stack(Duration::from_secs(5), Vec::new(), handler);

    let recorder = ResponseRecorder::new();
    let writer = recorder.writer();
    stack.call(get("/test", None), writer.clone()).await;

    assert_eq!(recorder.head_calls(), 0);
    assert!(!writer.stats().await.header_written);
}

#[tokio::test]
async fn test_route_middleware_can_short_circuit() {
    let deny: BoxedMiddleware = Arc::new(FnMiddleware::new(
        "deny",
        |req: Request, rw: ResponseWriter, next: Next| async move {
            if req.header("authorization").is_none() {
                rw.write_header(StatusCode::UNAUTHORIZED).await;
                return;
            }
            next.run(req, rw).await;
        },
    ));
    let handler = handler_fn(|_req: Request, rw: ResponseWriter| async move {
        let _ = rw.write("secret").await;
    });
    let stack = full_stack(Duration::from_secs(5), vec![deny], handler);

    let recorder = ResponseRecorder::new();
    stack.call(get("/test", None), recorder.writer()).await;

    assert_eq!(recorder.status(), Some(StatusCode::UNAUTHORIZED));
    assert_eq!(recorder.body_string(), "");
    assert!(recorder.header("request-id").is_some());
}

#[tokio::test]
async fn test_middleware_headers_survive_to_response() {
    let tag: BoxedMiddleware = Arc::new(FnMiddleware::new(
        "tag",
        |req: Request, rw: ResponseWriter, next: Next| async move {
            rw.set_header(
                HeaderName::from_static("x-served-by"),
                HeaderValue::from_static("hermes"),
            )
            .await;
            next.run(req, rw).await;
        },
    ));
    let handler = handler_fn(|_req: Request, rw: ResponseWriter| async move {
        rw.write_header(StatusCode::NO_CONTENT).await;
    });
    let stack = full_stack(Duration::from_secs(5), vec![tag], handler);

    let recorder = ResponseRecorder::new();
    stack.call(get("/test", None), recorder.writer()).await;

    assert_eq!(recorder.status(), Some(StatusCode::NO_CONTENT));
    assert_eq!(recorder.header("x-served-by").as_deref(), Some("hermes"));
}
