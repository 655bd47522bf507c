//! Span document encoding
//!
//! When search is enabled, two index-only fields are prepended to the
//! canonical span JSON:
//!
//! - `timestamp_millis` - the span timestamp in millis, so tools like Kibana
//!   can range-query on it without understanding microseconds.
//! - `_q` - valid search terms. Tag keys carry inconsistent dots (`error`,
//!   `error.message`) and cannot be mapped naturally, so each tag
//!   contributes both `key` and `key=value`; annotation values are added
//!   as-is. A tag `error -> 500` yields `"_q":["error","error=500"]`.
//!
//! The fields are spliced in at the byte level rather than by re-encoding:
//! `{"timestamp_millis":1,"_q":[..]}` + `{"traceId":..}` becomes
//! `{"timestamp_millis":1,"_q":[..],"traceId":..}`.

use std::fmt;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::domain::spans::{Span, SpanEncoder};

/// Longest annotation value or `key=value` string included in search fields,
/// in UTF-16 code units
pub const INDEX_CHARS_LIMIT: usize = 256;

const EMPTY_JSON: &[u8] = b"{}";

/// Length as counted against [`INDEX_CHARS_LIMIT`]. Characters outside the
/// Basic Multilingual Plane count as two.
#[inline]
fn index_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Whether a tag fits under [`INDEX_CHARS_LIMIT`] as `key=value`
#[inline]
pub fn tag_within_limit(key: &str, value: &str) -> bool {
    index_len(key) + index_len(value) < INDEX_CHARS_LIMIT
}

/// Bytes to store for a span
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanDocument {
    /// Canonical encoding with search fields spliced in front
    Prefixed(Vec<u8>),
    /// Canonical encoding unchanged
    Canonical(Vec<u8>),
}

impl SpanDocument {
    pub fn is_prefixed(&self) -> bool {
        matches!(self, Self::Prefixed(_))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Prefixed(bytes) | Self::Canonical(bytes) => bytes,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Prefixed(bytes) | Self::Canonical(bytes) => bytes,
        }
    }
}

/// Builds the stored document for each span
#[derive(Clone)]
pub struct SpanDocumentEncoder {
    encoder: Arc<dyn SpanEncoder>,
    search_enabled: bool,
}

impl fmt::Debug for SpanDocumentEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpanDocumentEncoder")
            .field("search_enabled", &self.search_enabled)
            .finish()
    }
}

impl SpanDocumentEncoder {
    pub fn new(encoder: Arc<dyn SpanEncoder>, search_enabled: bool) -> Self {
        Self {
            encoder,
            search_enabled,
        }
    }

    /// Encode `span`, adding search fields when enabled.
    ///
    /// Only a failure of the canonical encoding is an error. If the search
    /// fields cannot be written the canonical encoding is returned instead.
    pub fn encode(
        &self,
        span: &Span,
        timestamp_millis: u64,
    ) -> Result<SpanDocument, serde_json::Error> {
        if !self.search_enabled {
            return Ok(SpanDocument::Canonical(self.encoder.encode(span)?));
        }

        let prefix = match write_search_prefix(span, timestamp_millis) {
            Ok(prefix) => prefix,
            Err(e) => {
                tracing::debug!(
                    error = %e,
                    trace_id = %span.trace_id,
                    span_id = %span.id,
                    "Error indexing query for span"
                );
                return Ok(SpanDocument::Canonical(self.encoder.encode(span)?));
            }
        };

        let document = self.encoder.encode(span)?;
        if prefix == EMPTY_JSON {
            return Ok(SpanDocument::Canonical(document));
        }
        Ok(SpanDocument::Prefixed(merge_json(&prefix, &document)))
    }
}

/// Splice two JSON objects into one without parsing either.
///
/// Drops the closing brace of `prefix` and the opening brace of `suffix`,
/// joining the remainders with a comma. Both inputs must be JSON objects.
pub fn merge_json(prefix: &[u8], suffix: &[u8]) -> Vec<u8> {
    debug_assert!(prefix.first() == Some(&b'{') && prefix.last() == Some(&b'}'));
    debug_assert!(suffix.first() == Some(&b'{') && suffix.last() == Some(&b'}'));

    if suffix.len() <= EMPTY_JSON.len() {
        return prefix.to_vec();
    }
    if prefix.len() <= EMPTY_JSON.len() {
        return suffix.to_vec();
    }

    let mut merged = Vec::with_capacity(prefix.len() + suffix.len() - 1);
    merged.extend_from_slice(&prefix[..prefix.len() - 1]);
    merged.push(b',');
    merged.extend_from_slice(&suffix[1..]);
    merged
}

/// `{"timestamp_millis":..,"_q":[..]}`, each field only when it has content
fn write_search_prefix(span: &Span, timestamp_millis: u64) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::with_capacity(64);
    let mut ser = serde_json::Serializer::new(&mut buf);
    let mut map = ser.serialize_map(None)?;

    if timestamp_millis != 0 {
        map.serialize_entry("timestamp_millis", &timestamp_millis)?;
    }
    if !span.tags.is_empty() || !span.annotations.is_empty() {
        map.serialize_entry("_q", &SearchQueries(span))?;
    }
    SerializeMap::end(map)?;

    Ok(buf)
}

/// Serializes the `_q` array for a span
struct SearchQueries<'a>(&'a Span);

impl Serialize for SearchQueries<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let span = self.0;
        let mut seq = serializer.serialize_seq(None)?;

        for annotation in &span.annotations {
            if index_len(&annotation.value) > INDEX_CHARS_LIMIT {
                continue;
            }
            seq.serialize_element(&annotation.value)?;
        }

        for (key, value) in &span.tags {
            if !tag_within_limit(key, value) {
                continue;
            }
            // search is possible by key alone
            seq.serialize_element(key)?;
            seq.serialize_element(&TagQuery(key, value))?;
        }

        seq.end()
    }
}

/// `key=value` written straight into the serializer
pub(crate) struct TagQuery<'a>(pub &'a str, pub &'a str);

impl fmt::Display for TagQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.0, self.1)
    }
}

impl Serialize for TagQuery<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
