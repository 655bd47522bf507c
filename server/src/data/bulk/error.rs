//! Bulk transport error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BulkError {
    #[error("Bulk transport configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Bulk request returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Bulk request rejected: {0}")]
    Rejected(String),

    #[error("Bulk encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}
