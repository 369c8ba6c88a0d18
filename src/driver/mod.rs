//! Walks the archive pages and hands every media record to the pipeline.

use anyhow::{bail, Context, Result};
use std::fmt;
use tracing::{error, info, warn};
use url::Url;

pub mod lock;
pub mod source;

pub use lock::InstanceLock;
pub use source::{HttpPageSource, PageSource};

use crate::config::SourceConfig;
use crate::extract::LinkExtractor;
use crate::pipeline::{backfill_chunks, Pipeline, PipelineOutcome};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub records: usize,
    pub completed: usize,
    pub already_done: usize,
    pub failed: usize,
    /// Transcripts that had no chunk files and were chunked after the pages.
    pub chunks_backfilled: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: PipelineOutcome) {
        self.records += 1;
        match outcome {
            PipelineOutcome::Completed => self.completed += 1,
            PipelineOutcome::AlreadyDone => self.already_done += 1,
            PipelineOutcome::Failed(_) => self.failed += 1,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pages fetched ({} failed), {} records: {} completed, {} already done, {} failed; {} transcripts backfilled with chunks",
            self.pages_fetched,
            self.pages_failed,
            self.records,
            self.completed,
            self.already_done,
            self.failed,
            self.chunks_backfilled
        )
    }
}

/// Page URLs `1..=page_count` built from the configured template.
pub fn page_urls(source: &SourceConfig, page_count: u32) -> Vec<String> {
    (1..=page_count).map(|page| source.page_url(page)).collect()
}

pub struct RunDriver {
    source: Box<dyn PageSource>,
    extractor: LinkExtractor,
    pipeline: Pipeline,
    page_urls: Vec<String>,
}

impl RunDriver {
    pub fn new(
        source: Box<dyn PageSource>,
        extractor: LinkExtractor,
        pipeline: Pipeline,
        page_urls: Vec<String>,
    ) -> Self {
        Self {
            source,
            extractor,
            pipeline,
            page_urls,
        }
    }

    /// Process every page in order, one record at a time.
    ///
    /// Page and record failures are logged and skipped. The run only fails
    /// when the storage directories cannot be created or no page could be
    /// fetched at all. Afterwards any transcript still missing its chunk
    /// files (a crash or chunk failure in an earlier run) is chunked.
    pub async fn run(&self) -> Result<RunSummary> {
        self.pipeline
            .state()
            .layout()
            .ensure_dirs()
            .context("Failed to create storage directories")?;

        let mut summary = RunSummary::default();

        for (index, page_url) in self.page_urls.iter().enumerate() {
            info!(
                "Scraping page {}/{}: {}",
                index + 1,
                self.page_urls.len(),
                page_url
            );

            let parsed = match Url::parse(page_url) {
                Ok(url) => url,
                Err(e) => {
                    error!("Invalid page URL {}: {}", page_url, e);
                    summary.pages_failed += 1;
                    continue;
                }
            };

            let html = match self.source.fetch_page(page_url).await {
                Ok(html) => html,
                Err(e) => {
                    error!("Error scraping page {}: {:#}", page_url, e);
                    summary.pages_failed += 1;
                    continue;
                }
            };
            summary.pages_fetched += 1;

            let records = self.extractor.extract(&html, &parsed);
            if records.is_empty() {
                warn!("No media links found on {}", page_url);
                continue;
            }
            info!("Found {} media links on {}", records.len(), page_url);

            for record in &records {
                let outcome = self.pipeline.process(record).await;
                summary.record(outcome);
            }
        }

        if summary.pages_fetched == 0 && summary.pages_failed > 0 {
            bail!(
                "All {} archive pages failed to load; is the source reachable?",
                summary.pages_failed
            );
        }

        let transcript_dir = &self.pipeline.state().layout().transcript_dir;
        match backfill_chunks(transcript_dir, self.pipeline.chunk_size()) {
            Ok(backfill) => {
                if backfill.chunked > 0 || backfill.failed > 0 {
                    info!(
                        "Chunk backfill: {} chunked, {} failed",
                        backfill.chunked, backfill.failed
                    );
                }
                summary.chunks_backfilled = backfill.chunked;
            }
            Err(e) => error!("Chunk backfill of {:?} failed: {:#}", transcript_dir, e),
        }

        info!("Run finished: {}", summary);
        Ok(summary)
    }
}
