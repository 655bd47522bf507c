//! Span indexing
//!
//! Turns decoded spans into bulk operations for the daily indices:
//!
//! - `timestamp` - Picks the index bucket and stored timestamp
//! - `document` - Span document with search fields spliced in
//! - `autocomplete` - Whitelisted tag facts and their documents
//! - `batch` - Per-call operation list with limiter compensation
//! - `consumer` - Orchestrates the above and submits one request per call

mod autocomplete;
mod batch;
mod consumer;
mod document;
mod error;
mod timestamp;

pub use autocomplete::{AutocompleteExtractor, AutocompleteFact, AutocompleteKey};
pub use batch::{Compensation, SpanBatch};
pub use consumer::SpanConsumer;
pub use document::{INDEX_CHARS_LIMIT, SpanDocument, SpanDocumentEncoder, merge_json};
pub use error::IndexError;
pub use timestamp::IndexTimestamps;
