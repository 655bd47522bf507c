//! Time utility functions

use chrono::{DateTime, Utc};

/// Current wall-clock time in milliseconds since Unix epoch
pub fn now_millis() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_else(|_| {
        tracing::error!("System clock is before UNIX epoch");
        0
    })
}

/// Convert microseconds since Unix epoch to milliseconds (truncating)
#[inline]
pub fn micros_to_millis(micros: u64) -> u64 {
    micros / 1000
}

/// Convert milliseconds since Unix epoch to DateTime<Utc>
pub fn millis_to_datetime(millis: u64) -> DateTime<Utc> {
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_else(|| {
            tracing::warn!(millis, "Invalid timestamp, using epoch");
            DateTime::UNIX_EPOCH
        })
}
