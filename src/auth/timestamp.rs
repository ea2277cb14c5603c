//! Timestamp generation for Orderly API authentication.
//!
//! Every signed request carries a millisecond timestamp that is part of the
//! signing payload. The server rejects requests whose timestamp falls outside
//! its acceptance window, so the default provider reads the wall clock.

use std::time::{SystemTime, UNIX_EPOCH};

/// Trait for providing timestamps for authenticated requests.
///
/// The default implementation reads the system clock; tests can substitute a
/// fixed provider to make signatures reproducible.
pub trait TimestampProvider: Send + Sync {
    /// Current timestamp in milliseconds since UNIX epoch.
    fn timestamp_ms(&self) -> i64;
}

/// Wall-clock timestamp provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimestamp;

impl TimestampProvider for SystemTimestamp {
    fn timestamp_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }
}
