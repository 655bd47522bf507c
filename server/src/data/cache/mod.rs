//! Cache module
//!
//! In-process caches backed by moka. Currently holds the delay limiter used
//! to suppress repeated autocomplete writes.

pub mod delay_limiter;

pub use delay_limiter::{DelayLimiter, DelayLimiterBuilder};
