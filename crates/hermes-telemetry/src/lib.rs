//! Logging and metrics for Hermes.
//!
//! - **Logging**: [`init_logging`] installs a `tracing-subscriber` formatter
//!   (JSON or pretty) filtered by an `EnvFilter`
//! - **Metrics**: [`record_request`] feeds the `metrics` facade; installing an
//!   exporter is left to the application
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `hermes_requests_total` | Counter | `route`, `status` | Total request count |
//! | `hermes_request_duration_seconds` | Histogram | `route` | Request latency |
//!
//! # Example
//!
//! ```rust,no_run
//! use hermes_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development()).expect("logging");
//! tracing::info!("ready");
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use self::metrics::{describe_metrics, record_request};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
