// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display)
pub const APP_NAME: &str = "SpanIndexer";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "span-indexer";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".span-indexer";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "span-indexer.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "SPAN_INDEXER_CONFIG";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "SPAN_INDEXER_LOG";

// =============================================================================
// Environment Variables - Elasticsearch
// =============================================================================

pub const ENV_ES_URL: &str = "SPAN_INDEXER_ES_URL";
pub const ENV_ES_INDEX: &str = "SPAN_INDEXER_ES_INDEX";
pub const ENV_ES_DATE_SEPARATOR: &str = "SPAN_INDEXER_ES_DATE_SEPARATOR";
pub const ENV_ES_LEGACY_TYPES: &str = "SPAN_INDEXER_ES_LEGACY_TYPES";
pub const ENV_ES_PIPELINE: &str = "SPAN_INDEXER_ES_PIPELINE";
pub const ENV_ES_FLUSH_ON_WRITES: &str = "SPAN_INDEXER_ES_FLUSH_ON_WRITES";
pub const ENV_ES_TIMEOUT_SECS: &str = "SPAN_INDEXER_ES_TIMEOUT_SECS";

// =============================================================================
// Environment Variables - Search
// =============================================================================

pub const ENV_SEARCH_ENABLED: &str = "SPAN_INDEXER_SEARCH_ENABLED";

/// Comma-separated or JSON array of tag keys
pub const ENV_AUTOCOMPLETE_KEYS: &str = "SPAN_INDEXER_AUTOCOMPLETE_KEYS";
pub const ENV_AUTOCOMPLETE_TTL_SECS: &str = "SPAN_INDEXER_AUTOCOMPLETE_TTL_SECS";
pub const ENV_AUTOCOMPLETE_CARDINALITY: &str = "SPAN_INDEXER_AUTOCOMPLETE_CARDINALITY";

// =============================================================================
// Environment Variables - Ingest
// =============================================================================

pub const ENV_INGEST_BATCH_SIZE: &str = "SPAN_INDEXER_INGEST_BATCH_SIZE";
pub const ENV_INGEST_CONCURRENCY: &str = "SPAN_INDEXER_INGEST_CONCURRENCY";

// =============================================================================
// Elasticsearch Defaults
// =============================================================================

pub const DEFAULT_ES_URL: &str = "http://127.0.0.1:9200";

/// Index name prefix
pub const DEFAULT_INDEX: &str = "zipkin";

/// Separator between year, month and day in index names
pub const DEFAULT_DATE_SEPARATOR: char = '-';

/// HTTP request timeout for bulk submissions
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Search Defaults
// =============================================================================

/// How long an autocomplete fact is suppressed after being written
pub const DEFAULT_AUTOCOMPLETE_TTL_SECS: u64 = 3600;

/// Maximum autocomplete facts remembered at once
pub const DEFAULT_AUTOCOMPLETE_CARDINALITY: u64 = 20_000;

// =============================================================================
// Ingest Defaults
// =============================================================================

/// Spans per bulk request
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Bulk requests in flight at once
pub const DEFAULT_CONCURRENCY: usize = 4;

// =============================================================================
// Document Types
// =============================================================================

pub const SPAN_DOC_TYPE: &str = "span";
pub const AUTOCOMPLETE_DOC_TYPE: &str = "autocomplete";

/// Caller tag for span batches
pub const BULK_TAG_INDEX_SPAN: &str = "index-span";
