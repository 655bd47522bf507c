use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::index_name::{IndexNameFormatter, LEGACY_TYPE_DELIMITER, TYPELESS_TYPE_DELIMITER};
use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_AUTOCOMPLETE_CARDINALITY,
    DEFAULT_AUTOCOMPLETE_TTL_SECS, DEFAULT_BATCH_SIZE, DEFAULT_CONCURRENCY,
    DEFAULT_DATE_SEPARATOR, DEFAULT_ES_URL, DEFAULT_INDEX, DEFAULT_TIMEOUT_SECS,
};

// =============================================================================
// File Config (all fields optional, merged across files)
// =============================================================================

/// Elasticsearch configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ElasticsearchFileConfig {
    pub url: Option<String>,
    pub index: Option<String>,
    pub date_separator: Option<String>,
    pub legacy_types: Option<bool>,
    pub pipeline: Option<String>,
    pub flush_on_writes: Option<bool>,
    pub timeout_secs: Option<u64>,
}

/// Search configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SearchFileConfig {
    pub enabled: Option<bool>,
    pub autocomplete_keys: Option<Vec<String>>,
    pub autocomplete_ttl_secs: Option<u64>,
    pub autocomplete_cardinality: Option<u64>,
}

/// Ingest configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct IngestFileConfig {
    pub batch_size: Option<usize>,
    pub concurrency: Option<usize>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub elasticsearch: Option<ElasticsearchFileConfig>,
    pub search: Option<SearchFileConfig>,
    pub ingest: Option<IngestFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Names of top-level fields no section claimed
    fn unknown_fields(&self) -> Vec<&str> {
        match &self.extra {
            serde_json::Value::Object(map) => map.keys().map(|k| k.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    fn warn_unknown_fields(&self) {
        let unknown = self.unknown_fields();
        if !unknown.is_empty() {
            tracing::warn!(
                fields = %unknown.join(", "),
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(es) = other.elasticsearch {
            let current = self
                .elasticsearch
                .get_or_insert_with(ElasticsearchFileConfig::default);
            if es.url.is_some() {
                tracing::trace!(url = ?es.url, "Merging elasticsearch.url");
                current.url = es.url;
            }
            if es.index.is_some() {
                tracing::trace!(index = ?es.index, "Merging elasticsearch.index");
                current.index = es.index;
            }
            if es.date_separator.is_some() {
                current.date_separator = es.date_separator;
            }
            if es.legacy_types.is_some() {
                current.legacy_types = es.legacy_types;
            }
            if es.pipeline.is_some() {
                current.pipeline = es.pipeline;
            }
            if es.flush_on_writes.is_some() {
                current.flush_on_writes = es.flush_on_writes;
            }
            if es.timeout_secs.is_some() {
                current.timeout_secs = es.timeout_secs;
            }
        }

        if let Some(search) = other.search {
            let current = self.search.get_or_insert_with(SearchFileConfig::default);
            if search.enabled.is_some() {
                tracing::trace!(enabled = ?search.enabled, "Merging search.enabled");
                current.enabled = search.enabled;
            }
            if search.autocomplete_keys.is_some() {
                tracing::trace!(keys = ?search.autocomplete_keys, "Merging search.autocomplete_keys");
                current.autocomplete_keys = search.autocomplete_keys;
            }
            if search.autocomplete_ttl_secs.is_some() {
                current.autocomplete_ttl_secs = search.autocomplete_ttl_secs;
            }
            if search.autocomplete_cardinality.is_some() {
                current.autocomplete_cardinality = search.autocomplete_cardinality;
            }
        }

        if let Some(ingest) = other.ingest {
            let current = self.ingest.get_or_insert_with(IngestFileConfig::default);
            if ingest.batch_size.is_some() {
                current.batch_size = ingest.batch_size;
            }
            if ingest.concurrency.is_some() {
                current.concurrency = ingest.concurrency;
            }
        }
    }
}

// =============================================================================
// Resolved Config
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElasticsearchConfig {
    pub url: String,
    pub index: String,
    pub date_separator: String,
    /// Typed cluster: `:` type delimiter and `_type` in bulk actions
    pub legacy_types: bool,
    pub pipeline: Option<String>,
    /// Ask the cluster to refresh before acknowledging each bulk request
    pub flush_on_writes: bool,
    pub timeout_secs: u64,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ES_URL.to_string(),
            index: DEFAULT_INDEX.to_string(),
            date_separator: DEFAULT_DATE_SEPARATOR.to_string(),
            legacy_types: true,
            pipeline: None,
            flush_on_writes: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ElasticsearchConfig {
    /// Index naming for this cluster
    pub fn index_name_formatter(&self) -> IndexNameFormatter {
        let date_separator = self
            .date_separator
            .chars()
            .next()
            .unwrap_or(DEFAULT_DATE_SEPARATOR);
        let type_delimiter = if self.legacy_types {
            LEGACY_TYPE_DELIMITER
        } else {
            TYPELESS_TYPE_DELIMITER
        };
        IndexNameFormatter::new(self.index.clone(), date_separator, type_delimiter)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchConfig {
    pub enabled: bool,
    /// Tag keys whose values are written as autocomplete documents
    pub autocomplete_keys: Vec<String>,
    pub autocomplete_ttl_secs: u64,
    pub autocomplete_cardinality: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            autocomplete_keys: Vec::new(),
            autocomplete_ttl_secs: DEFAULT_AUTOCOMPLETE_TTL_SECS,
            autocomplete_cardinality: DEFAULT_AUTOCOMPLETE_CARDINALITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestConfig {
    pub batch_size: usize,
    pub concurrency: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Final merged application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppConfig {
    pub elasticsearch: ElasticsearchConfig,
    pub search: SearchConfig,
    pub ingest: IngestConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.span-indexer/span-indexer.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let config = Self::resolve(cli, file_config);
        config.validate()?;

        tracing::debug!(
            url = %config.elasticsearch.url,
            index = %config.elasticsearch.index,
            search_enabled = config.search.enabled,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Layer defaults -> file config -> CLI/env overrides
    fn resolve(cli: &CliConfig, file_config: FileConfig) -> Self {
        let file_es = file_config.elasticsearch.unwrap_or_default();
        let file_search = file_config.search.unwrap_or_default();
        let file_ingest = file_config.ingest.unwrap_or_default();
        let defaults = Self::default();

        let elasticsearch = ElasticsearchConfig {
            url: cli
                .es_url
                .clone()
                .or(file_es.url)
                .unwrap_or(defaults.elasticsearch.url),
            index: cli
                .es_index
                .clone()
                .or(file_es.index)
                .unwrap_or(defaults.elasticsearch.index),
            date_separator: cli
                .es_date_separator
                .clone()
                .or(file_es.date_separator)
                .unwrap_or(defaults.elasticsearch.date_separator),
            legacy_types: cli
                .es_legacy_types
                .or(file_es.legacy_types)
                .unwrap_or(defaults.elasticsearch.legacy_types),
            pipeline: cli
                .es_pipeline
                .clone()
                .or(file_es.pipeline)
                .filter(|p| !p.is_empty()),
            flush_on_writes: cli
                .es_flush_on_writes
                .or(file_es.flush_on_writes)
                .unwrap_or(defaults.elasticsearch.flush_on_writes),
            timeout_secs: cli
                .es_timeout_secs
                .or(file_es.timeout_secs)
                .unwrap_or(defaults.elasticsearch.timeout_secs),
        };

        let search = SearchConfig {
            enabled: cli
                .search_enabled
                .or(file_search.enabled)
                .unwrap_or(defaults.search.enabled),
            autocomplete_keys: cli
                .autocomplete_keys
                .clone()
                .or(file_search.autocomplete_keys)
                .unwrap_or(defaults.search.autocomplete_keys),
            autocomplete_ttl_secs: cli
                .autocomplete_ttl_secs
                .or(file_search.autocomplete_ttl_secs)
                .unwrap_or(defaults.search.autocomplete_ttl_secs),
            autocomplete_cardinality: cli
                .autocomplete_cardinality
                .or(file_search.autocomplete_cardinality)
                .unwrap_or(defaults.search.autocomplete_cardinality),
        };

        let ingest = IngestConfig {
            batch_size: cli
                .batch_size
                .or(file_ingest.batch_size)
                .unwrap_or(defaults.ingest.batch_size),
            concurrency: cli
                .concurrency
                .or(file_ingest.concurrency)
                .unwrap_or(defaults.ingest.concurrency),
        };

        Self {
            elasticsearch,
            search,
            ingest,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.elasticsearch.url.trim().is_empty() {
            anyhow::bail!("Configuration error: elasticsearch.url must not be empty");
        }
        if self.elasticsearch.index.trim().is_empty() {
            anyhow::bail!("Configuration error: elasticsearch.index must not be empty");
        }
        if self.elasticsearch.date_separator.chars().count() != 1 {
            anyhow::bail!(
                "Configuration error: elasticsearch.date_separator must be a single character, got {:?}",
                self.elasticsearch.date_separator
            );
        }
        if self.search.autocomplete_cardinality == 0 {
            anyhow::bail!("Configuration error: search.autocomplete_cardinality must be greater than 0");
        }
        if self.ingest.batch_size == 0 {
            anyhow::bail!("Configuration error: ingest.batch_size must be greater than 0");
        }
        if self.ingest.concurrency == 0 {
            anyhow::bail!("Configuration error: ingest.concurrency must be greater than 0");
        }

        if self.search.enabled && self.search.autocomplete_keys.is_empty() {
            tracing::debug!("search.autocomplete_keys is empty, no autocomplete documents will be written");
        }
        if self.search.autocomplete_ttl_secs == 0 {
            tracing::warn!("search.autocomplete_ttl_secs is 0, autocomplete values are never suppressed");
        }

        Ok(())
    }
}

/// Get the profile config path (~/.span-indexer/span-indexer.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}
