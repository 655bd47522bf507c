//! Zipkin v2 span model
//!
//! Field order and naming follow the v2 JSON format, so the derived
//! `Serialize` impl doubles as the canonical encoding. Zero timestamps and
//! durations mean "unset" and are omitted, as are empty collections.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpanKind {
    Client,
    Server,
    Producer,
    Consumer,
}

/// Network context of a node in the service graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// Timestamped event recorded on a span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Epoch microseconds
    pub timestamp: u64,
    pub value: String,
}

impl Annotation {
    pub fn new(timestamp: u64, value: impl Into<String>) -> Self {
        Self {
            timestamp,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub trace_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<SpanKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Epoch microseconds of the start of this span, 0 when unset
    #[serde(default, skip_serializing_if = "is_zero")]
    pub timestamp: u64,
    /// Duration in microseconds, 0 when unset
    #[serde(default, skip_serializing_if = "is_zero")]
    pub duration: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_endpoint: Option<Endpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_endpoint: Option<Endpoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

impl Span {
    pub fn new(trace_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_timestamp(mut self, micros: u64) -> Self {
        self.timestamp = micros;
        self
    }

    pub fn with_annotation(mut self, timestamp: u64, value: impl Into<String>) -> Self {
        self.annotations.push(Annotation::new(timestamp, value));
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Decode a JSON array of v2 spans, e.g. the body of a collector POST
    pub fn decode_list(bytes: &[u8]) -> Result<Vec<Span>, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
