use clap::{Parser, Subcommand};

use std::path::PathBuf;

use crate::utils::string::parse_string_array;

use super::constants::{
    ENV_AUTOCOMPLETE_CARDINALITY, ENV_AUTOCOMPLETE_KEYS, ENV_AUTOCOMPLETE_TTL_SECS, ENV_CONFIG,
    ENV_ES_DATE_SEPARATOR, ENV_ES_FLUSH_ON_WRITES, ENV_ES_INDEX, ENV_ES_LEGACY_TYPES,
    ENV_ES_PIPELINE, ENV_ES_TIMEOUT_SECS, ENV_ES_URL, ENV_INGEST_BATCH_SIZE,
    ENV_INGEST_CONCURRENCY, ENV_SEARCH_ENABLED,
};

#[derive(Parser)]
#[command(name = "span-indexer")]
#[command(version, about = "Index Zipkin spans into Elasticsearch", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Elasticsearch base URL
    #[arg(long, global = true, env = ENV_ES_URL)]
    pub es_url: Option<String>,

    /// Index name prefix
    #[arg(long, global = true, env = ENV_ES_INDEX)]
    pub es_index: Option<String>,

    /// Separator between date parts in index names
    #[arg(long, global = true, env = ENV_ES_DATE_SEPARATOR)]
    pub es_date_separator: Option<String>,

    /// Cluster uses mapping types (`:` delimiter and `_type` in bulk actions)
    #[arg(long, global = true, env = ENV_ES_LEGACY_TYPES)]
    pub es_legacy_types: Option<bool>,

    /// Ingest pipeline applied to every bulk request
    #[arg(long, global = true, env = ENV_ES_PIPELINE)]
    pub es_pipeline: Option<String>,

    /// Wait for a refresh before each bulk request returns
    #[arg(long, global = true, env = ENV_ES_FLUSH_ON_WRITES)]
    pub es_flush_on_writes: Option<bool>,

    /// Bulk request timeout in seconds
    #[arg(long, global = true, env = ENV_ES_TIMEOUT_SECS)]
    pub es_timeout_secs: Option<u64>,

    /// Add search fields (`_q`, `timestamp_millis`) and autocomplete documents
    #[arg(long, global = true, env = ENV_SEARCH_ENABLED)]
    pub search_enabled: Option<bool>,

    /// Tag keys indexed for autocomplete (comma-separated or JSON array)
    #[arg(long, global = true, env = ENV_AUTOCOMPLETE_KEYS)]
    pub autocomplete_keys: Option<String>,

    /// Seconds an autocomplete value is suppressed after being written
    #[arg(long, global = true, env = ENV_AUTOCOMPLETE_TTL_SECS)]
    pub autocomplete_ttl_secs: Option<u64>,

    /// Maximum autocomplete values remembered at once
    #[arg(long, global = true, env = ENV_AUTOCOMPLETE_CARDINALITY)]
    pub autocomplete_cardinality: Option<u64>,

    /// Spans per bulk request
    #[arg(long, global = true, env = ENV_INGEST_BATCH_SIZE)]
    pub batch_size: Option<usize>,

    /// Bulk requests in flight at once
    #[arg(long, global = true, env = ENV_INGEST_CONCURRENCY)]
    pub concurrency: Option<usize>,
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Index spans from Zipkin v2 JSON files
    Ingest {
        /// Files containing a JSON array of spans
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the resolved configuration
    Config,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub es_url: Option<String>,
    pub es_index: Option<String>,
    pub es_date_separator: Option<String>,
    pub es_legacy_types: Option<bool>,
    pub es_pipeline: Option<String>,
    pub es_flush_on_writes: Option<bool>,
    pub es_timeout_secs: Option<u64>,
    pub search_enabled: Option<bool>,
    pub autocomplete_keys: Option<Vec<String>>,
    pub autocomplete_ttl_secs: Option<u64>,
    pub autocomplete_cardinality: Option<u64>,
    pub batch_size: Option<usize>,
    pub concurrency: Option<usize>,
}

impl Cli {
    /// Split into layered config values and the command to run
    pub fn into_config(self) -> (CliConfig, Commands) {
        let config = CliConfig {
            config: self.config,
            es_url: self.es_url,
            es_index: self.es_index,
            es_date_separator: self.es_date_separator,
            es_legacy_types: self.es_legacy_types,
            es_pipeline: self.es_pipeline,
            es_flush_on_writes: self.es_flush_on_writes,
            es_timeout_secs: self.es_timeout_secs,
            search_enabled: self.search_enabled,
            autocomplete_keys: self.autocomplete_keys.as_deref().map(parse_string_array),
            autocomplete_ttl_secs: self.autocomplete_ttl_secs,
            autocomplete_cardinality: self.autocomplete_cardinality,
            batch_size: self.batch_size,
            concurrency: self.concurrency,
        };
        (config, self.command)
    }
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Commands) {
    Cli::parse().into_config()
}
