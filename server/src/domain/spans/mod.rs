//! Span data model
//!
//! - `model` - Zipkin v2 span, annotation and endpoint types
//! - `codec` - canonical JSON encoding consumed by the indexer

mod codec;
mod model;

pub use codec::{JsonV2Encoder, SpanEncoder};
pub use model::{Annotation, Endpoint, Span, SpanKind};
