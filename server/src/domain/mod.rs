//! Domain logic for span storage
//!
//! - `spans` - Span model and canonical encoding
//! - `traces` - Span indexing into daily indices

pub mod spans;
pub mod traces;

pub use spans::Span;
pub use traces::{IndexError, SpanConsumer};
