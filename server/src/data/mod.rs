//! Storage layer
//!
//! - `bulk` - Bulk document transport (Elasticsearch `_bulk` over HTTP)
//! - `cache` - In-memory delay limiting for duplicate suppression
//! - `index_name` - Daily index naming

pub mod bulk;
pub mod cache;
pub mod index_name;

pub use bulk::{BulkError, BulkOperation, BulkTransport, HttpBulkTransport};
pub use index_name::IndexNameFormatter;
