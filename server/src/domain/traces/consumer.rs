//! Span consumer
//!
//! Entry point for storing spans. Each `accept` call:
//!
//! 1. resolves the index bucket for every span (`timestamp`)
//! 2. stages the span document, with search fields when enabled (`document`)
//! 3. stages autocomplete documents for whitelisted tags the limiter lets
//!    through (`autocomplete`)
//! 4. submits everything as one bulk request, releasing the limiter keys
//!    from step 3 if the request fails (`batch`)
//!
//! Steps 1-3 are synchronous; the only suspension point is the submission.
//! Dropping the returned future before it completes does not release keys.

use std::sync::Arc;
use std::time::Duration;

use super::autocomplete::{AutocompleteExtractor, AutocompleteKey};
use super::batch::SpanBatch;
use super::document::SpanDocumentEncoder;
use super::error::IndexError;
use super::timestamp::IndexTimestamps;
use crate::core::config::SearchConfig;
use crate::core::constants::{AUTOCOMPLETE_DOC_TYPE, SPAN_DOC_TYPE};
use crate::data::bulk::BulkTransport;
use crate::data::cache::{DelayLimiter, DelayLimiterBuilder};
use crate::data::index_name::IndexNameFormatter;
use crate::domain::spans::{Span, SpanEncoder};

pub struct SpanConsumer {
    transport: Arc<dyn BulkTransport>,
    documents: SpanDocumentEncoder,
    autocomplete: AutocompleteExtractor,
    index_names: IndexNameFormatter,
    limiter: Arc<DelayLimiter<AutocompleteKey>>,
    search_enabled: bool,
}

impl std::fmt::Debug for SpanConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpanConsumer")
            .field("index", &self.index_names.index())
            .field("search_enabled", &self.search_enabled)
            .field("limiter", &self.limiter)
            .finish()
    }
}

impl SpanConsumer {
    pub fn new(
        transport: Arc<dyn BulkTransport>,
        encoder: Arc<dyn SpanEncoder>,
        index_names: IndexNameFormatter,
        search: &SearchConfig,
    ) -> Self {
        let limiter = DelayLimiterBuilder::new()
            .ttl(Duration::from_secs(search.autocomplete_ttl_secs))
            .cardinality(search.autocomplete_cardinality)
            .build();

        tracing::debug!(
            index = index_names.index(),
            search_enabled = search.enabled,
            autocomplete_keys = search.autocomplete_keys.len(),
            "Span consumer initialized"
        );

        Self {
            transport,
            documents: SpanDocumentEncoder::new(encoder, search.enabled),
            autocomplete: AutocompleteExtractor::new(search.autocomplete_keys.iter().cloned()),
            index_names,
            limiter: Arc::new(limiter),
            search_enabled: search.enabled,
        }
    }

    /// Limiter shared by every batch of this consumer
    pub fn limiter(&self) -> &Arc<DelayLimiter<AutocompleteKey>> {
        &self.limiter
    }

    /// Store `spans` as one bulk request.
    ///
    /// An empty slice succeeds without touching the transport.
    pub async fn accept(&self, spans: &[Span]) -> Result<(), IndexError> {
        if spans.is_empty() {
            return Ok(());
        }

        let batch = self.prepare(spans)?;
        tracing::debug!(
            spans = batch.span_count(),
            autocomplete = batch.autocomplete_count(),
            "Submitting span batch"
        );
        batch.submit(self.transport.as_ref(), &self.limiter).await
    }

    /// Build the batch for `spans` without submitting it.
    ///
    /// Limiter keys are taken as facts are staged. If a span cannot be
    /// encoded the keys taken so far are released and the error returned.
    pub fn prepare(&self, spans: &[Span]) -> Result<SpanBatch, IndexError> {
        let mut batch = SpanBatch::with_capacity(spans.len());

        for span in spans {
            if let Err(e) = self.index_span(&mut batch, span) {
                let (_, compensation) = batch.into_parts();
                compensation.apply(&self.limiter);
                tracing::warn!(
                    error = %e,
                    trace_id = %span.trace_id,
                    span_id = %span.id,
                    released = compensation.len(),
                    "Failed to encode span, batch abandoned"
                );
                return Err(e);
            }
        }

        Ok(batch)
    }

    fn index_span(&self, batch: &mut SpanBatch, span: &Span) -> Result<(), IndexError> {
        let timestamps = IndexTimestamps::resolve(span);

        let index = self
            .index_names
            .format_type_and_timestamp(SPAN_DOC_TYPE, timestamps.bucket_millis);
        let document = self.documents.encode(span, timestamps.stored_millis)?;
        batch.add_span(index, document.into_bytes());

        if self.search_enabled && !span.tags.is_empty() {
            self.add_autocomplete_values(batch, timestamps.bucket_millis, span);
        }
        Ok(())
    }

    fn add_autocomplete_values(&self, batch: &mut SpanBatch, index_timestamp: u64, span: &Span) {
        if self.autocomplete.is_empty() {
            return;
        }

        let index = self
            .index_names
            .format_type_and_timestamp(AUTOCOMPLETE_DOC_TYPE, index_timestamp);

        for fact in self.autocomplete.facts(span) {
            let key = AutocompleteKey::new(index_timestamp, fact.id());
            if !self.limiter.should_invoke(&key) {
                tracing::trace!(id = %key.id, index_timestamp, "Autocomplete value suppressed");
                continue;
            }
            batch.add_autocomplete(index.clone(), key, fact.to_document());
        }
    }
}

#[cfg(test)]
#[path = "consumer_tests.rs"]
mod tests;
