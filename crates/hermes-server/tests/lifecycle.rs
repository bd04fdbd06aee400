//! End-to-end server tests over real TCP connections.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hermes_core::{BoxFuture, Error, ErrorHandler, JsonErrorHandler, Request, ResponseWriter};
use hermes_router::Route;
use hermes_server::{Application, Server, ServerConfig, ServerError};
use http::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct TestApp {
    started: Arc<Notify>,
}

impl Application for TestApp {
    fn routes(&self) -> Vec<Route> {
        let slow = Arc::clone(&self.started);
        let stuck = Arc::clone(&self.started);

        vec![
            Route::get("hello", "/hello/{name}").handle(|req: Request, rw: ResponseWriter| async move {
                let name = req.context().var("name").unwrap_or_default().to_string();
                let _ = rw.write(format!("hello {name}")).await;
            }),
            Route::put("update_user", "/user/{id:[0-9]+}")
                .handle(|_req: Request, rw: ResponseWriter| async move {
                    rw.write_header(StatusCode::NO_CONTENT).await;
                }),
            Route::get("slow", "/slow").handle(move |_req: Request, rw: ResponseWriter| {
                let started = Arc::clone(&slow);
                async move {
                    started.notify_one();
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    let _ = rw.write("done").await;
                }
            }),
            Route::get("stuck", "/stuck")
                .timeout(Duration::from_secs(60))
                .handle(move |_req: Request, rw: ResponseWriter| {
                    let started = Arc::clone(&stuck);
                    async move {
                        started.notify_one();
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        let _ = rw.write("too late").await;
                    }
                }),
            Route::get("late", "/late")
                .timeout(Duration::from_millis(50))
                .handle(|_req: Request, rw: ResponseWriter| async move {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    let _ = rw.write("missed").await;
                }),
            Route::get("boom", "/boom").handle(|_req: Request, _rw: ResponseWriter| async move {
                panic!("handler exploded");
            }),
            Route::get("empty", "/empty").handle(|_req: Request, _rw: ResponseWriter| async {}),
            Route::post("echo", "/echo").handle(|req: Request, rw: ResponseWriter| async move {
                let _ = rw.write(req.body().clone()).await;
            }),
        ]
    }

    fn error(
        &self,
        request: Request,
        response: ResponseWriter,
        status: StatusCode,
        error: Error,
    ) -> BoxFuture<'static, ()> {
        JsonErrorHandler.handle_error(request, response, status, error)
    }
}

struct Running {
    server: Arc<Server>,
    address: SocketAddr,
    started: Arc<Notify>,
    cancel: CancellationToken,
    task: JoinHandle<Result<(), ServerError>>,
}

async fn start(shutdown_timeout: Duration) -> Running {
    start_with(
        ServerConfig::builder()
            .http_addr("127.0.0.1:0")
            .shutdown_timeout(shutdown_timeout)
            .build(),
    )
    .await
}

async fn start_with(config: ServerConfig) -> Running {
    let started = Arc::new(Notify::new());
    let app = TestApp {
        started: Arc::clone(&started),
    };
    let server = Arc::new(Server::new(config, app).unwrap());
    let cancel = CancellationToken::new();

    let task = tokio::spawn({
        let server = Arc::clone(&server);
        let cancel = cancel.clone();
        async move { server.listen_and_serve(cancel).await }
    });

    let address = tokio::time::timeout(Duration::from_secs(5), server.address())
        .await
        .expect("server should start");

    Running {
        server,
        address,
        started,
        cancel,
        task,
    }
}

struct Reply {
    status: u16,
    head: String,
    body: String,
}

impl Reply {
    fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }
}

fn dechunk(mut raw: &str) -> String {
    let mut body = String::new();
    while let Some((size, rest)) = raw.split_once("\r\n") {
        let size = usize::from_str_radix(size.trim(), 16).unwrap_or(0);
        if size == 0 {
            break;
        }
        body.push_str(&rest[..size]);
        raw = rest[size..].trim_start_matches("\r\n");
    }
    body
}

async fn send(address: SocketAddr, request: &str) -> Reply {
    let mut stream = TcpStream::connect(address).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    // A force-closed connection may reset instead of ending cleanly.
    let mut raw = Vec::new();
    let _ = stream.read_to_end(&mut raw).await;
    let raw = String::from_utf8(raw).unwrap();

    let (head, body) = raw.split_once("\r\n\r\n").unwrap_or((raw.as_str(), ""));
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap_or(0);
    let chunked = head
        .to_ascii_lowercase()
        .contains("transfer-encoding: chunked");

    Reply {
        status,
        head: head.to_string(),
        body: if chunked {
            dechunk(body)
        } else {
            body.to_string()
        },
    }
}

async fn request(address: SocketAddr, method: &str, path: &str) -> Reply {
    send(
        address,
        &format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"),
    )
    .await
}

fn envelope_status(body: &str) -> u64 {
    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    json["error"]["status"].as_u64().unwrap()
}

#[tokio::test]
async fn test_serves_route_with_vars() {
    let running = start(Duration::from_secs(5)).await;

    let reply = request(running.address, "GET", "/hello/world").await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, "hello world");

    let id = reply.header("request-id").expect("request id header");
    assert!(!id.is_empty());
    assert_eq!(reply.header("x-request-id"), Some(id));

    running.cancel.cancel();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_trusted_request_id_is_echoed() {
    let running = start(Duration::from_secs(5)).await;

    let reply = send(
        running.address,
        "GET /hello/you HTTP/1.1\r\nHost: localhost\r\nX-Request-Id: abc-123\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert_eq!(reply.header("request-id"), Some("abc-123"));
    assert_eq!(reply.header("x-request-id"), Some("abc-123"));

    running.cancel.cancel();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_empty_handler_commits_ok() {
    let running = start(Duration::from_secs(5)).await;

    let reply = request(running.address, "GET", "/empty").await;
    assert_eq!(reply.status, 200);
    assert!(reply.body.is_empty());

    running.cancel.cancel();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_not_found_uses_error_responder() {
    let running = start(Duration::from_secs(5)).await;

    let reply = request(running.address, "GET", "/nowhere").await;
    assert_eq!(reply.status, 404);
    assert_eq!(reply.header("content-type"), Some("application/json"));
    assert_eq!(envelope_status(&reply.body), 404);
    assert!(reply.header("request-id").is_some());

    running.cancel.cancel();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_method_not_allowed_lists_methods() {
    let running = start(Duration::from_secs(5)).await;

    let reply = request(running.address, "GET", "/user/42").await;
    assert_eq!(reply.status, 405);
    assert_eq!(reply.header("allow"), Some("PUT"));
    assert_eq!(envelope_status(&reply.body), 405);

    let reply = request(running.address, "PUT", "/user/42").await;
    assert_eq!(reply.status, 204);

    running.cancel.cancel();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_handler_timeout_responds_unavailable() {
    let running = start(Duration::from_secs(5)).await;

    let reply = request(running.address, "GET", "/late").await;
    assert_eq!(reply.status, 503);
    assert_eq!(envelope_status(&reply.body), 503);
    assert!(!reply.body.contains("missed"));

    running.cancel.cancel();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_panic_responds_internal_error() {
    let running = start(Duration::from_secs(5)).await;

    let reply = request(running.address, "GET", "/boom").await;
    assert_eq!(reply.status, 500);
    assert_eq!(envelope_status(&reply.body), 500);

    // The server keeps serving after a handler panic.
    let reply = request(running.address, "GET", "/hello/again").await;
    assert_eq!(reply.body, "hello again");

    running.cancel.cancel();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_reverse_routing() {
    let running = start(Duration::from_secs(5)).await;

    let path = running.server.path("hello", &["big world"]).unwrap();
    assert_eq!(path, "/hello/big%20world");

    let reply = request(running.address, "GET", &path).await;
    assert_eq!(reply.body, "hello big world");

    running.cancel.cancel();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_body_within_limit_is_read() {
    let running = start_with(
        ServerConfig::builder()
            .http_addr("127.0.0.1:0")
            .max_body_size(16)
            .build(),
    )
    .await;

    let reply = send(
        running.address,
        "POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
    )
    .await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, "hello");

    running.cancel.cancel();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let running = start_with(
        ServerConfig::builder()
            .http_addr("127.0.0.1:0")
            .max_body_size(16)
            .build(),
    )
    .await;
    let payload = "x".repeat(64);

    let reply = send(
        running.address,
        &format!(
            "POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: 64\r\nConnection: close\r\n\r\n{payload}"
        ),
    )
    .await;
    assert_eq!(reply.status, 413);
    assert!(reply.body.is_empty());

    // Without a declared length the limit applies while reading.
    let reply = send(
        running.address,
        &format!(
            "POST /echo HTTP/1.1\r\nHost: localhost\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n40\r\n{payload}\r\n0\r\n\r\n"
        ),
    )
    .await;
    assert_eq!(reply.status, 413);

    running.cancel.cancel();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_graceful_shutdown_drains_in_flight() {
    let running = start(Duration::from_secs(5)).await;

    let client = tokio::spawn(request(running.address, "GET", "/slow"));
    running.started.notified().await;
    running.cancel.cancel();

    let reply = client.await.unwrap();
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, "done");

    let result = tokio::time::timeout(Duration::from_secs(5), running.task)
        .await
        .expect("server should stop");
    assert!(result.unwrap().is_ok());
}

#[tokio::test]
async fn test_forced_shutdown_after_timeout() {
    let running = start(Duration::from_millis(100)).await;

    let client = tokio::spawn(request(running.address, "GET", "/stuck"));
    running.started.notified().await;
    running.cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), running.task)
        .await
        .expect("server should stop");
    let err = result.unwrap().unwrap_err();
    assert!(matches!(err, ServerError::ForcedShutdown));
    assert_eq!(err.to_string(), "hermes: forced server shutdown");

    // Connections close before request contexts are cancelled, so the
    // timeout stage's 503 never reaches the client.
    let reply = tokio::time::timeout(Duration::from_secs(5), client)
        .await
        .expect("client should be disconnected")
        .unwrap();
    assert_eq!(reply.status, 0);
}

#[tokio::test]
async fn test_refuses_connections_after_shutdown() {
    let running = start(Duration::from_secs(5)).await;

    running.cancel.cancel();
    running.task.await.unwrap().unwrap();

    assert!(TcpStream::connect(running.address).await.is_err());
}
