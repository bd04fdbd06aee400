//! Request metrics.
//!
//! Recorded through the `metrics` facade. Without an installed recorder the
//! calls are no-ops.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Counter of completed requests.
pub const REQUESTS_TOTAL: &str = "hermes_requests_total";

/// Histogram of request durations.
pub const REQUEST_DURATION_SECONDS: &str = "hermes_request_duration_seconds";

/// Registers descriptions for the standard metrics.
///
/// Call once after installing a recorder.
pub fn describe_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Total number of HTTP requests processed");
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "HTTP request duration in seconds"
    );
}

/// Records one completed request.
///
/// `status` is `0` when no response head was committed.
pub fn record_request(route: &str, status: u16, duration: Duration) {
    counter!(
        REQUESTS_TOTAL,
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(REQUEST_DURATION_SECONDS, "route" => route.to_string())
        .record(duration.as_secs_f64());
}
