//! Autocomplete fact extraction
//!
//! Whitelisted span tags are indexed separately as `{tagKey, tagValue}`
//! documents so UIs can suggest values for a key. The same fact is written
//! at most once per daily bucket per limiter TTL; the document id repeats
//! the `key=value` form so the index also dedupes server side.

use std::collections::HashSet;

use super::document::{TagQuery, tag_within_limit};
use crate::domain::spans::Span;
use crate::utils::json::{json_escaped_len, write_json_escaped};

const TAG_KEY_OPEN: &[u8] = br#"{"tagKey":""#;
const TAG_VALUE_OPEN: &[u8] = br#"","tagValue":""#;
const CLOSE: &[u8] = br#""}"#;

/// Bytes of `{"tagKey":"","tagValue":""}`
pub const AUTOCOMPLETE_FIXED_BYTES: usize = TAG_KEY_OPEN.len() + TAG_VALUE_OPEN.len() + CLOSE.len();

/// Dedup identity of one autocomplete fact within one index bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AutocompleteKey {
    /// Bucket timestamp in millis
    pub index_timestamp: u64,
    /// `key=value`
    pub id: String,
}

impl AutocompleteKey {
    pub fn new(index_timestamp: u64, id: impl Into<String>) -> Self {
        Self {
            index_timestamp,
            id: id.into(),
        }
    }
}

/// A whitelisted tag that passed the length filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutocompleteFact<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

impl AutocompleteFact<'_> {
    /// `key=value`, same format as the `_q` entry
    pub fn id(&self) -> String {
        TagQuery(self.key, self.value).to_string()
    }

    /// `{"tagKey":"..","tagValue":".."}` written into an exactly-sized buffer
    pub fn to_document(&self) -> Vec<u8> {
        let size =
            AUTOCOMPLETE_FIXED_BYTES + json_escaped_len(self.key) + json_escaped_len(self.value);
        let mut buf = Vec::with_capacity(size);

        buf.extend_from_slice(TAG_KEY_OPEN);
        write_json_escaped(&mut buf, self.key);
        buf.extend_from_slice(TAG_VALUE_OPEN);
        write_json_escaped(&mut buf, self.value);
        buf.extend_from_slice(CLOSE);

        debug_assert_eq!(buf.len(), size);
        buf
    }
}

/// Selects autocomplete facts from span tags
#[derive(Debug, Clone, Default)]
pub struct AutocompleteExtractor {
    keys: HashSet<String>,
}

impl AutocompleteExtractor {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Facts for `span`, in tag order
    pub fn facts<'a>(&'a self, span: &'a Span) -> impl Iterator<Item = AutocompleteFact<'a>> + 'a {
        span.tags
            .iter()
            .filter(|(key, value)| tag_within_limit(key, value))
            .filter(|(key, _)| self.keys.contains(key.as_str()))
            .map(|(key, value)| AutocompleteFact { key, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value as JsonValue, json};

    fn extractor() -> AutocompleteExtractor {
        AutocompleteExtractor::new(["http.method", "environment"])
    }

    #[test]
    fn test_fixed_bytes() {
        assert_eq!(AUTOCOMPLETE_FIXED_BYTES, 27);
    }

    #[test]
    fn test_only_whitelisted_keys() {
        let span = Span::new("a", "b")
            .with_tag("http.method", "GET")
            .with_tag("http.path", "/api")
            .with_tag("environment", "prod");
        let extractor = extractor();
        let facts: Vec<_> = extractor.facts(&span).collect();
        assert_eq!(
            facts,
            vec![
                AutocompleteFact { key: "environment", value: "prod" },
                AutocompleteFact { key: "http.method", value: "GET" },
            ]
        );
    }

    #[test]
    fn test_oversized_tag_skipped() {
        let span = Span::new("a", "b").with_tag("environment", "x".repeat(250));
        assert_eq!(extractor().facts(&span).count(), 0);
    }

    #[test]
    fn test_empty_whitelist_yields_nothing() {
        let extractor = AutocompleteExtractor::default();
        assert!(extractor.is_empty());
        let span = Span::new("a", "b").with_tag("http.method", "GET");
        assert_eq!(extractor.facts(&span).count(), 0);
    }

    #[test]
    fn test_fact_id() {
        let fact = AutocompleteFact { key: "http.method", value: "GET" };
        assert_eq!(fact.id(), "http.method=GET");
    }

    #[test]
    fn test_document_bytes() {
        let fact = AutocompleteFact { key: "http.status_code", value: "500" };
        assert_eq!(
            fact.to_document(),
            br#"{"tagKey":"http.status_code","tagValue":"500"}"#
        );
    }

    #[test]
    fn test_document_escapes_values() {
        let fact = AutocompleteFact { key: "msg", value: "a \"b\"\n\u{2028}" };
        let document = fact.to_document();
        let parsed: JsonValue = serde_json::from_slice(&document).unwrap();
        assert_eq!(parsed, json!({"tagKey": "msg", "tagValue": "a \"b\"\n\u{2028}"}));
    }

    #[test]
    fn test_document_capacity_is_exact() {
        let fact = AutocompleteFact { key: "ключ", value: "\t" };
        let document = fact.to_document();
        assert_eq!(document.len(), document.capacity());
    }

    #[test]
    fn test_key_equality_is_structural() {
        assert_eq!(AutocompleteKey::new(1, "a=b"), AutocompleteKey::new(1, "a=b"));
        assert_ne!(AutocompleteKey::new(1, "a=b"), AutocompleteKey::new(2, "a=b"));
        assert_ne!(AutocompleteKey::new(1, "a=b"), AutocompleteKey::new(1, "a=c"));
    }
}
