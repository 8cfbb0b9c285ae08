//! Logging setup for the assist client.
//!
//! Everything logs through `tracing`. Binaries call [`init_subscriber`] (or
//! [`init_json_subscriber`]) once at startup; tests install a thread-local
//! capture layer with [`capture_logs`] and assert on what was emitted.
//!
//! `RUST_LOG`, when set, takes precedence over the configured level.

pub mod capture;

pub use capture::{CapturedEvent, CapturedLogs, capture_logs};

use tracing_subscriber::EnvFilter;

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize the global subscriber with compact, human-readable stderr output.
///
/// Call once at startup. Later calls are no-ops.
pub fn init_subscriber(level: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = subscriber.try_init();
}

/// Initialize the global subscriber with one JSON object per line on stderr.
pub fn init_json_subscriber(level: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .json();

    let _ = subscriber.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_subscriber_is_idempotent() {
        init_subscriber("warn");
        init_subscriber("debug");
        init_json_subscriber("info");
    }

    #[test]
    fn invalid_level_falls_back_without_panicking() {
        let _ = filter("not-a-level");
    }
}
