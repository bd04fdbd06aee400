//! Routes and responses of the user service.

use std::sync::Arc;

use hermes::prelude::*;
use hermes::router::build_path;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use serde::Serialize;
use serde_json::json;

use crate::db::{Db, User};

// =============================================================================
// Route names
// =============================================================================

pub const STATUS: &str = "status";
pub const SHOW_USER: &str = "show_user";
pub const UPDATE_USER: &str = "update_user";

const STATUS_PATTERN: &str = "/status";
const SHOW_USER_PATTERN: &str = "/user/{key:[0-9a-zA-Z]+}";
const UPDATE_USER_PATTERN: &str = "/user/{key:[0-9a-zA-Z]+}/update";

// =============================================================================
// Application
// =============================================================================

#[derive(Clone)]
pub struct UsersApp {
    db: Arc<Db>,
}

impl UsersApp {
    pub fn new(db: Db) -> Self {
        Self { db: Arc::new(db) }
    }
}

impl Application for UsersApp {
    fn routes(&self) -> Vec<Route> {
        let status_app = self.clone();
        let show_app = self.clone();
        let update_app = self.clone();

        vec![
            Route::any(STATUS, STATUS_PATTERN).handle(move |req: Request, rw: ResponseWriter| {
                status_app.respond(&req, rw, json!({ "server": "healthy" }))
            }),
            Route::get(SHOW_USER, SHOW_USER_PATTERN).handle(move |req: Request, rw: ResponseWriter| {
                let app = show_app.clone();
                async move { app.show_user(req, rw).await }
            }),
            Route::post(UPDATE_USER, UPDATE_USER_PATTERN).handle(
                move |req: Request, rw: ResponseWriter| {
                    let app = update_app.clone();
                    async move { app.update_user(req, rw).await }
                },
            ),
        ]
    }

    fn error(
        &self,
        _request: Request,
        response: ResponseWriter,
        status: StatusCode,
        error: Error,
    ) -> BoxFuture<'static, ()> {
        Box::pin(async move { respond_error(&response, status, &error.to_string()).await })
    }
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Serialize)]
struct UserBody {
    user: User,
    links: serde_json::Value,
}

impl UsersApp {
    async fn show_user(&self, req: Request, rw: ResponseWriter) {
        let key = req.context().var("key").unwrap_or_default();

        let Some(user) = self.db.get(key) else {
            respond_error(&rw, StatusCode::NOT_FOUND, "user not found").await;
            return;
        };

        let update_path = match build_path(UPDATE_USER_PATTERN, &[key]) {
            Ok(path) => path,
            Err(err) => {
                respond_error(&rw, StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()).await;
                return;
            }
        };

        let body = UserBody {
            user,
            links: json!({ SHOW_USER: req.path(), UPDATE_USER: update_path }),
        };
        self.respond_with(&req, rw, &body).await;
    }

    async fn update_user(&self, req: Request, rw: ResponseWriter) {
        let key = req.context().var("key").unwrap_or_default();

        let Some(name) = form_value(&req, "name").filter(|name| !name.is_empty()) else {
            respond_error(&rw, StatusCode::BAD_REQUEST, "name is required").await;
            return;
        };

        let user = self.db.update(key, &name);

        let show_path = match build_path(SHOW_USER_PATTERN, &[key]) {
            Ok(path) => path,
            Err(err) => {
                respond_error(&rw, StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()).await;
                return;
            }
        };

        let body = UserBody {
            user,
            links: json!({ SHOW_USER: show_path, UPDATE_USER: req.path() }),
        };
        self.respond_with(&req, rw, &body).await;
    }

    async fn respond_with(&self, req: &Request, rw: ResponseWriter, body: &impl Serialize) {
        match serde_json::to_value(body) {
            Ok(value) => self.respond(req, rw, value).await,
            Err(err) => {
                respond_error(&rw, StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()).await;
            }
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Reads `name` from the urlencoded body, then from the query string.
fn form_value(req: &Request, name: &str) -> Option<String> {
    let body = std::str::from_utf8(req.body()).unwrap_or_default();
    let query = req.uri().query().unwrap_or_default();

    [body, query]
        .into_iter()
        .flat_map(|source| source.split('&'))
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| urlencoding::decode(&value.replace('+', " ")).ok().map(Into::into))
}

async fn respond_error(rw: &ResponseWriter, status: StatusCode, message: &str) {
    let body = json!({
        "error": message,
        "status": status.as_u16(),
        "links": { STATUS: STATUS_PATTERN },
    });

    rw.set_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .await;
    rw.write_header(status).await;
    if let Err(err) = rw.write(body.to_string()).await {
        if !matches!(err, Error::Timeout | Error::Canceled) {
            tracing::error!(error = %err, "Failed to write response");
        }
    }
}
