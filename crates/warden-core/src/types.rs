//! Time helpers shared by every Warden crate.
//!
//! Timestamps are Unix milliseconds stored as `i64`, the same representation
//! the SQLite store writes to disk.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Get current time in milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// The timestamp `duration` from now, saturating instead of overflowing.
pub fn expires_after(duration: Duration) -> i64 {
    let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
    now_millis().saturating_add(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expires_after_is_in_future() {
        let now = now_millis();
        let later = expires_after(Duration::from_secs(60));
        assert!(later >= now + 60_000);
    }

    #[test]
    fn test_expires_after_saturates() {
        assert_eq!(expires_after(Duration::MAX), i64::MAX);
    }
}
