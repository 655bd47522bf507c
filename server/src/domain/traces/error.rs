//! Indexing error types

use thiserror::Error;

use crate::data::bulk::BulkError;

#[derive(Error, Debug)]
pub enum IndexError {
    /// The canonical span encoding failed; the batch was never submitted
    #[error("Span encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// The bulk submission failed; autocomplete suppression was rolled back
    #[error("Bulk submission failed: {0}")]
    Bulk(#[from] BulkError),
}
