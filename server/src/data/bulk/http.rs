//! Elasticsearch `_bulk` transport over HTTP

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::{BulkError, BulkOperation, BulkTransport};
use crate::core::config::ElasticsearchConfig;
use crate::core::constants::APP_NAME_LOWER;

const NDJSON: &str = "application/x-ndjson";

/// Maximum response body length kept in error messages
const ERROR_BODY_MAX_LEN: usize = 512;

#[derive(Serialize)]
struct IndexAction<'a> {
    index: ActionMeta<'a>,
}

#[derive(Serialize)]
struct ActionMeta<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_type", skip_serializing_if = "Option::is_none")]
    doc_type: Option<&'a str>,
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
}

#[derive(Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<JsonValue>,
}

#[derive(Debug)]
pub struct HttpBulkTransport {
    client: reqwest::Client,
    bulk_url: Url,
    legacy_types: bool,
}

impl HttpBulkTransport {
    pub fn new(config: &ElasticsearchConfig) -> Result<Self, BulkError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("{}/{}", APP_NAME_LOWER, env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BulkError::Config(format!("failed to build HTTP client: {}", e)))?;

        let bulk_url = bulk_url(
            &config.url,
            config.pipeline.as_deref(),
            config.flush_on_writes,
        )?;

        tracing::debug!(
            url = %bulk_url,
            legacy_types = config.legacy_types,
            "HTTP bulk transport initialized"
        );

        Ok(Self {
            client,
            bulk_url,
            legacy_types: config.legacy_types,
        })
    }

    /// NDJSON request body: an action line followed by the document, per operation
    fn encode_body(&self, operations: &[BulkOperation]) -> Result<Vec<u8>, BulkError> {
        let capacity = operations
            .iter()
            .map(|op| op.document.len() + op.index.len() + 64)
            .sum();
        let mut body = Vec::with_capacity(capacity);

        for op in operations {
            let action = IndexAction {
                index: ActionMeta {
                    index: &op.index,
                    doc_type: self.legacy_types.then_some(op.doc_type),
                    id: op.id.as_deref(),
                },
            };
            serde_json::to_writer(&mut body, &action)?;
            body.push(b'\n');
            body.extend_from_slice(&op.document);
            body.push(b'\n');
        }

        Ok(body)
    }
}

#[async_trait]
impl BulkTransport for HttpBulkTransport {
    async fn submit(
        &self,
        tag: &'static str,
        operations: Vec<BulkOperation>,
    ) -> Result<(), BulkError> {
        let count = operations.len();
        let body = self.encode_body(&operations)?;

        tracing::trace!(tag, operations = count, bytes = body.len(), "Submitting bulk request");

        let resp = self
            .client
            .post(self.bulk_url.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static(NDJSON))
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;

        if !status.is_success() {
            return Err(BulkError::Status {
                status: status.as_u16(),
                body: truncate_body(&bytes),
            });
        }

        check_response(&bytes)?;
        tracing::debug!(tag, operations = count, "Bulk request complete");
        Ok(())
    }
}

/// `{base}/_bulk` with percent-encoded `pipeline` and `refresh` parameters
fn bulk_url(
    base: &str,
    pipeline: Option<&str>,
    flush_on_writes: bool,
) -> Result<Url, BulkError> {
    let raw = format!("{}/_bulk", base.trim_end_matches('/'));
    let mut url = Url::parse(&raw)
        .map_err(|e| BulkError::Config(format!("invalid Elasticsearch URL {}: {}", base, e)))?;

    if pipeline.is_some() || flush_on_writes {
        let mut query = url.query_pairs_mut();
        if let Some(pipeline) = pipeline {
            query.append_pair("pipeline", pipeline);
        }
        if flush_on_writes {
            query.append_pair("refresh", "wait_for");
        }
    }
    Ok(url)
}

/// Turn a 2xx bulk response with item failures into an error
fn check_response(bytes: &[u8]) -> Result<(), BulkError> {
    let response: BulkResponse = serde_json::from_slice(bytes)?;
    if !response.errors {
        return Ok(());
    }

    let reason = response
        .items
        .iter()
        .filter_map(|item| item.as_object()?.values().next()?.get("error"))
        .map(|error| match error.get("reason").and_then(JsonValue::as_str) {
            Some(reason) => reason.to_string(),
            None => error.to_string(),
        })
        .next()
        .unwrap_or_else(|| "unknown item failure".to_string());

    Err(BulkError::Rejected(reason))
}

fn truncate_body(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.chars().count() > ERROR_BODY_MAX_LEN {
        format!(
            "{}...",
            text.chars().take(ERROR_BODY_MAX_LEN).collect::<String>()
        )
    } else {
        text.into_owned()
    }
}
