//! Bulk document transport
//!
//! The indexer stages every document of a batch as a [`BulkOperation`] and
//! hands the whole list to a [`BulkTransport`] in one call. The outcome is
//! all-or-nothing from the caller's point of view: per-document failures
//! inside a successful HTTP exchange surface as a single error.

mod error;
mod http;

use async_trait::async_trait;

pub use error::BulkError;
pub use http::HttpBulkTransport;

/// One add-document operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkOperation {
    /// Target index name
    pub index: String,
    /// Document type (`span`, `autocomplete`)
    pub doc_type: &'static str,
    /// Complete JSON document bytes
    pub document: Vec<u8>,
    /// Explicit document id; `None` lets the index assign one
    pub id: Option<String>,
}

/// Executes a batch of add-document operations
#[async_trait]
pub trait BulkTransport: Send + Sync {
    /// Submit `operations` as one request. `tag` names the caller for logs.
    async fn submit(&self, tag: &'static str, operations: Vec<BulkOperation>)
    -> Result<(), BulkError>;
}
