//! Diagnostic logging to stderr
//!
//! Test output goes to stdout through the reporter; tracing events from the
//! harness itself go to stderr so they never mix with a JSON report.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Level used when neither `--log-level` nor SUBTEST_LOG is set
pub const DEFAULT_FILTER: &str = "warn";

/// Pick the filter directive: flag > environment > default
pub fn filter_directive(flag: Option<&str>, env: Option<&str>) -> String {
    flag.or(env).unwrap_or(DEFAULT_FILTER).to_string()
}

/// Initialize the global subscriber
pub fn init(directive: &str) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(true);

    // A second init (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
