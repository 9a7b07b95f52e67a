//! Logging utilities
//!
//! Provides logging setup and configuration.

use env_logger::Env;

/// Setup logging for the client.
///
/// Diagnostics go to stderr; the level comes from `RUST_LOG` and defaults to
/// `info`. `RUST_LOG=ftps_client=trace` shows the control channel traffic.
pub fn setup_logging() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();
}
