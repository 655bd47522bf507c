//! Core application

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use futures::StreamExt;

use crate::core::cli::{self, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME, ENV_LOG};
use crate::data::bulk::{BulkTransport, HttpBulkTransport};
use crate::domain::spans::{JsonV2Encoder, Span};
use crate::domain::traces::SpanConsumer;
use crate::utils::file::expand_path;

/// Totals for one `ingest` run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub files: usize,
    pub spans: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub failed_spans: usize,
}

pub struct CoreApp {
    pub config: AppConfig,
    pub consumer: SpanConsumer,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        let config = AppConfig::load(&cli_config)?;

        match command {
            Commands::Config => {
                let rendered = serde_json::to_string_pretty(&config)
                    .context("Failed to render configuration")?;
                println!("{}", rendered);
                Ok(())
            }
            Commands::Ingest { files } => {
                let app = Self::init(config)?;
                let summary = app.ingest_files(&files).await?;
                println!(
                    "{}: indexed {} spans from {} files in {} batches",
                    APP_NAME, summary.spans, summary.files, summary.batches
                );
                if summary.failed_batches > 0 {
                    anyhow::bail!(
                        "{} of {} batches failed ({} spans not indexed)",
                        summary.failed_batches,
                        summary.batches,
                        summary.failed_spans
                    );
                }
                Ok(())
            }
        }
    }

    fn init(config: AppConfig) -> Result<Self> {
        let transport = HttpBulkTransport::new(&config.elasticsearch)
            .context("Failed to initialize bulk transport")?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Wire the application around an existing transport
    pub fn with_transport(config: AppConfig, transport: Arc<dyn BulkTransport>) -> Self {
        let consumer = SpanConsumer::new(
            transport,
            Arc::new(JsonV2Encoder),
            config.elasticsearch.index_name_formatter(),
            &config.search,
        );
        Self { config, consumer }
    }

    /// Index every span in `files`, `ingest.batch_size` spans per request
    /// with up to `ingest.concurrency` requests in flight.
    ///
    /// Unreadable or malformed files fail the run before anything is sent.
    /// Batch failures are logged and counted in the summary.
    pub async fn ingest_files(&self, files: &[PathBuf]) -> Result<IngestSummary> {
        let mut spans = Vec::new();
        for path in files {
            spans.extend(read_spans(&expand_path(&path.to_string_lossy())).await?);
        }

        let started = Instant::now();
        let batch_size = self.config.ingest.batch_size;
        let results: Vec<(usize, bool)> = futures::stream::iter(spans.chunks(batch_size))
            .map(|chunk| async move {
                match self.consumer.accept(chunk).await {
                    Ok(()) => (chunk.len(), true),
                    Err(e) => {
                        tracing::error!(error = %e, spans = chunk.len(), "Batch failed");
                        (chunk.len(), false)
                    }
                }
            })
            .buffer_unordered(self.config.ingest.concurrency)
            .collect()
            .await;

        let mut summary = IngestSummary {
            files: files.len(),
            batches: results.len(),
            ..IngestSummary::default()
        };
        for (count, ok) in results {
            if ok {
                summary.spans += count;
            } else {
                summary.failed_batches += 1;
                summary.failed_spans += count;
            }
        }

        tracing::debug!(
            spans = summary.spans,
            batches = summary.batches,
            failed_batches = summary.failed_batches,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ingest finished"
        );
        Ok(summary)
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", env!("CARGO_CRATE_NAME"));

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }
}

async fn read_spans(path: &Path) -> Result<Vec<Span>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read span file: {}", path.display()))?;
    let spans = Span::decode_list(&bytes)
        .with_context(|| format!("Failed to parse span file: {}", path.display()))?;
    tracing::debug!(path = %path.display(), spans = spans.len(), "Loaded span file");
    Ok(spans)
}
