//! User lookup service.
//!
//! ```text
//! curl localhost:7879/status
//! curl localhost:7879/user/abc123
//! curl -d name=hermes localhost:7879/user/abc123/update
//! ```

mod app;
mod db;

use std::time::Duration;

use anyhow::Context;
use hermes::prelude::*;
use hermes::server::shutdown;

use crate::app::UsersApp;
use crate::db::{Db, User};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(&LogConfig::production()).context("logging")?;

    let config = ServerConfig::builder()
        .http_addr("0.0.0.0:7879")
        .read_header_timeout(Duration::from_secs(1))
        .shutdown_timeout(Duration::from_secs(1))
        .build();

    let db = Db::new([User {
        key: "abc123".to_string(),
        name: "hermes".to_string(),
    }]);

    let server = Server::new(config, UsersApp::new(db)).context("routes")?;
    server
        .listen_and_serve(shutdown::signal_token())
        .await
        .context("serve")?;

    Ok(())
}
