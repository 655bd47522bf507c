//! Index timestamp resolution
//!
//! Picks the millisecond timestamp that decides which daily index a span is
//! written to, and separately the timestamp stored in the document itself.
//!
//! | Span state                        | bucket                 | stored |
//! |-----------------------------------|------------------------|--------|
//! | `timestamp != 0`                  | `timestamp / 1000`     | same   |
//! | `timestamp == 0`, has annotations | first annotation / 1000| 0      |
//! | otherwise                         | current time           | 0      |
//!
//! Any recorded event time is a better guess than ingestion time when
//! choosing a bucket, but only the span's own timestamp is authoritative
//! enough to be stored and searched on.

use crate::domain::spans::Span;
use crate::utils::time::{micros_to_millis, now_millis};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexTimestamps {
    /// Millis used to select the daily index
    pub bucket_millis: u64,
    /// Millis written as `timestamp_millis`, 0 when unknown
    pub stored_millis: u64,
}

impl IndexTimestamps {
    pub fn resolve(span: &Span) -> Self {
        Self::resolve_with(span, now_millis)
    }

    /// Like [`resolve`](Self::resolve) with an explicit clock for the fallback branch
    pub fn resolve_with(span: &Span, now: impl FnOnce() -> u64) -> Self {
        if span.timestamp != 0 {
            let millis = micros_to_millis(span.timestamp);
            return Self {
                bucket_millis: millis,
                stored_millis: millis,
            };
        }

        let guessed = span
            .annotations
            .first()
            .map(|a| micros_to_millis(a.timestamp))
            .unwrap_or(0);

        Self {
            bucket_millis: if guessed != 0 { guessed } else { now() },
            stored_millis: 0,
        }
    }
}
