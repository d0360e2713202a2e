//! Default timeout values for backend calls
//!
//! Connect and request timeouts can be overridden through
//! [`ClientConfig`](super::ClientConfig).

use std::time::Duration;

/// Default TCP/TLS connection timeout (10 seconds)
pub const CONNECT_SECS: u64 = 10;

/// Default timeout for a complete single-shot request (120 seconds).
///
/// The backend may chain scraping and generation before it answers.
/// Streaming requests only use the connect timeout.
pub const REQUEST_SECS: u64 = 120;

/// Timeout for the health probe (5 seconds)
pub const HEALTH_SECS: u64 = 5;

/// Get health probe timeout as Duration
pub fn health_timeout() -> Duration {
    Duration::from_secs(HEALTH_SECS)
}
