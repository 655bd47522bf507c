//! Per-call span batch
//!
//! A `SpanBatch` is built fresh for every `accept` call and owned by it, so
//! concurrent calls share nothing but the delay limiter. Alongside the bulk
//! operations it records every autocomplete key the limiter accepted while
//! the batch was assembled. Those acceptances are speculative: if the
//! documents never reach the index, the keys must be released again or the
//! facts would stay suppressed until the TTL runs out.

use super::autocomplete::AutocompleteKey;
use super::error::IndexError;
use crate::core::constants::{AUTOCOMPLETE_DOC_TYPE, BULK_TAG_INDEX_SPAN, SPAN_DOC_TYPE};
use crate::data::bulk::{BulkOperation, BulkTransport};
use crate::data::cache::DelayLimiter;

#[derive(Debug, Default)]
pub struct SpanBatch {
    operations: Vec<BulkOperation>,
    pending: Vec<AutocompleteKey>,
    spans: usize,
}

impl SpanBatch {
    pub fn with_capacity(spans: usize) -> Self {
        Self {
            operations: Vec::with_capacity(spans),
            pending: Vec::new(),
            spans: 0,
        }
    }

    /// Stage a span document; the index assigns its id
    pub fn add_span(&mut self, index: String, document: Vec<u8>) {
        self.operations.push(BulkOperation {
            index,
            doc_type: SPAN_DOC_TYPE,
            document,
            id: None,
        });
        self.spans += 1;
    }

    /// Stage an autocomplete document already accepted by the limiter
    pub fn add_autocomplete(&mut self, index: String, key: AutocompleteKey, document: Vec<u8>) {
        self.operations.push(BulkOperation {
            index,
            doc_type: AUTOCOMPLETE_DOC_TYPE,
            document,
            id: Some(key.id.clone()),
        });
        self.pending.push(key);
    }

    pub fn operations(&self) -> &[BulkOperation] {
        &self.operations
    }

    pub fn span_count(&self) -> usize {
        self.spans
    }

    pub fn autocomplete_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Split into the operations to send and the keys to release on failure
    pub fn into_parts(self) -> (Vec<BulkOperation>, Compensation) {
        (self.operations, Compensation(self.pending))
    }

    /// Send the batch. On failure every pending key is released before the
    /// error is returned.
    pub async fn submit(
        self,
        transport: &dyn BulkTransport,
        limiter: &DelayLimiter<AutocompleteKey>,
    ) -> Result<(), IndexError> {
        let (operations, compensation) = self.into_parts();
        let result = transport.submit(BULK_TAG_INDEX_SPAN, operations).await;

        if let Err(e) = result {
            if !compensation.is_empty() {
                tracing::warn!(
                    error = %e,
                    keys = compensation.len(),
                    "Bulk submission failed, releasing autocomplete keys"
                );
                compensation.apply(limiter);
            }
            return Err(e.into());
        }
        Ok(())
    }
}

/// Autocomplete keys to release if the batch is not stored
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Compensation(Vec<AutocompleteKey>);

impl Compensation {
    pub fn keys(&self) -> &[AutocompleteKey] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Make every key eligible again
    pub fn apply(&self, limiter: &DelayLimiter<AutocompleteKey>) {
        for key in &self.0 {
            limiter.invalidate(key);
        }
    }
}
