//! Graceful shutdown support.
//!
//! [`signal_token`] turns SIGINT/SIGTERM into a [`CancellationToken`] for
//! [`Server::listen_and_serve`](crate::Server::listen_and_serve).
//! [`ConnectionTracker`] counts live connections so shutdown can wait for them
//! to drain.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Returns a token cancelled on the first SIGINT or SIGTERM.
///
/// Must be called from within a Tokio runtime.
///
/// # Example
///
/// ```rust,no_run
/// # async fn run(server: hermes_server::Server) -> Result<(), hermes_server::ServerError> {
/// let token = hermes_server::shutdown::signal_token();
/// server.listen_and_serve(token).await
/// # }
/// ```
pub fn signal_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        wait_for_os_signal().await;
        trigger.cancel();
    });

    token
}

/// Waits for SIGTERM or SIGINT, or Ctrl+C off Unix.
async fn wait_for_os_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                (Err(err), _) | (_, Err(err)) => {
                    tracing::error!(error = %err, "Failed to register signal handlers");
                    return std::future::pending().await;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to wait for Ctrl+C");
            return std::future::pending().await;
        }
        tracing::info!("Received Ctrl+C, initiating graceful shutdown");
    }
}

#[derive(Debug, Default)]
struct Counters {
    active: AtomicUsize,
    failed: AtomicUsize,
}

/// Counts live connections.
///
/// # Example
///
/// ```rust
/// use hermes_server::shutdown::ConnectionTracker;
///
/// let tracker = ConnectionTracker::new();
///
/// let token = tracker.acquire();
/// assert_eq!(tracker.active_connections(), 1);
///
/// drop(token);
/// assert_eq!(tracker.active_connections(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    counters: Arc<Counters>,
    notify: Arc<Notify>,
}

impl ConnectionTracker {
    /// Creates a new connection tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires a token, to be held for the lifetime of one connection.
    #[must_use]
    pub fn acquire(&self) -> ConnectionToken {
        self.counters.active.fetch_add(1, Ordering::SeqCst);
        ConnectionToken {
            counters: Arc::clone(&self.counters),
            notify: Arc::clone(&self.notify),
        }
    }

    /// Returns the number of live connections.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    /// Returns how many connection tasks ended by panicking.
    #[must_use]
    pub fn failed_connections(&self) -> usize {
        self.counters.failed.load(Ordering::SeqCst)
    }

    /// Waits until every token has been dropped.
    ///
    /// Completes immediately if there are no live connections.
    pub async fn wait_for_shutdown(&self) {
        loop {
            let notified = self.notify.notified();
            if self.active_connections() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// A live connection. Dropping it releases the slot in the tracker.
#[derive(Debug)]
pub struct ConnectionToken {
    counters: Arc<Counters>,
    notify: Arc<Notify>,
}

impl Drop for ConnectionToken {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.counters.failed.fetch_add(1, Ordering::SeqCst);
        }
        if self.counters.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }
}
