//! Canonical span encoding

use super::model::Span;

/// Produces the canonical stored bytes for a span.
///
/// Implementations must be deterministic and side-effect free; the output
/// must be a single JSON object.
pub trait SpanEncoder: Send + Sync {
    fn encode(&self, span: &Span) -> Result<Vec<u8>, serde_json::Error>;
}

/// Zipkin v2 JSON encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonV2Encoder;

impl SpanEncoder for JsonV2Encoder {
    fn encode(&self, span: &Span) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(span)
    }
}
