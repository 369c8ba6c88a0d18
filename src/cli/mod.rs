//! Command handlers. Each one loads the config, builds its collaborators and
//! hands off to the library; nothing here decides pipeline behaviour.

use anyhow::{bail, Context, Result};
use std::io::{self, IsTerminal};
use tracing::info;
use url::Url;

mod args;

pub use args::{Cli, CliCommand, NameCliArgs, ProcessCliArgs};

use crate::config::Config;
use crate::documents::DocumentMirror;
use crate::download::HttpDownloader;
use crate::driver::{self, HttpPageSource, InstanceLock, RunDriver};
use crate::extract::{LinkExtractor, MediaRecord};
use crate::media::FfmpegDecoder;
use crate::naming;
use crate::pipeline::{self, ArtifactLayout, Pipeline};
use crate::transcription::Transcriber;

/// Settings shared by every command, taken from global flags.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub show_progress: bool,
    pub pages: Option<u32>,
}

impl RunOptions {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            show_progress: !cli.no_progress && io::stderr().is_terminal(),
            pages: cli.pages,
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    Config::load(cli.config.as_deref())
}

fn page_urls(config: &Config, options: &RunOptions) -> Vec<String> {
    let count = options.pages.unwrap_or(config.source.page_count);
    driver::page_urls(&config.source, count)
}

fn build_pipeline(config: &Config, options: &RunOptions) -> Result<Pipeline> {
    let downloader = HttpDownloader::new(config.source.request_timeout(), options.show_progress)?;
    let decoder = FfmpegDecoder::new(
        config.media.ffmpeg_path.as_deref(),
        config.media.audio_bitrate.clone(),
    )?;
    let transcriber = Transcriber::from_config(&config.transcription)?;
    if !transcriber.is_available() {
        bail!(
            "Transcription provider {} is not available; check the [transcription] config",
            transcriber.provider_name()
        );
    }

    Ok(Pipeline::new(
        ArtifactLayout::from(&config.storage),
        Box::new(downloader),
        Box::new(decoder),
        Box::new(transcriber),
        config.chunking.chunk_size,
    ))
}

pub async fn handle_run_command(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let options = RunOptions::from_cli(cli);
    let _lock = InstanceLock::acquire(&config.storage.transcript_dir)?;

    let pipeline = build_pipeline(&config, &options)?;
    let source = HttpPageSource::new(config.source.request_timeout())?;
    let run_driver = RunDriver::new(
        Box::new(source),
        LinkExtractor::new(config.source.media_host.clone()),
        pipeline,
        page_urls(&config, &options),
    );

    let summary = run_driver.run().await?;
    println!("{}", summary);
    Ok(())
}

pub async fn handle_process_command(cli: &Cli, args: &ProcessCliArgs) -> Result<()> {
    Url::parse(&args.url).with_context(|| format!("Not an absolute URL: {}", args.url))?;

    let config = load_config(cli)?;
    let options = RunOptions::from_cli(cli);
    let _lock = InstanceLock::acquire(&config.storage.transcript_dir)?;

    let pipeline = build_pipeline(&config, &options)?;
    pipeline
        .state()
        .layout()
        .ensure_dirs()
        .context("Failed to create storage directories")?;

    let record = MediaRecord::new(args.url.clone(), args.label.clone());
    let outcome = pipeline.process(&record).await;
    println!("{}", outcome);

    if outcome.is_failure() {
        bail!("Processing {} {}", args.url, outcome);
    }
    Ok(())
}

pub fn handle_chunk_command(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let _lock = InstanceLock::acquire(&config.storage.transcript_dir)?;

    let summary =
        pipeline::backfill_chunks(&config.storage.transcript_dir, config.chunking.chunk_size)?;
    info!(
        "Chunking finished: {} chunked, {} already chunked, {} failed",
        summary.chunked, summary.skipped, summary.failed
    );
    println!(
        "{} chunked, {} already chunked, {} failed",
        summary.chunked, summary.skipped, summary.failed
    );
    Ok(())
}

pub async fn handle_documents_command(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let options = RunOptions::from_cli(cli);

    let source = HttpPageSource::new(config.source.request_timeout())?;
    let mirror = DocumentMirror::new(
        Box::new(source),
        config.storage.documents_dir.clone(),
        config.storage.combined_documents_file.clone(),
        config.source.page_url_template.clone(),
    );

    let summary = mirror.run(&page_urls(&config, &options)).await?;
    println!(
        "{} links: {} saved, {} already saved, {} failed; {} files combined into {}",
        summary.links,
        summary.saved,
        summary.existing,
        summary.failed,
        summary.combined,
        config.storage.combined_documents_file.display()
    );
    Ok(())
}

pub fn handle_name_command(args: &NameCliArgs) {
    println!("{}", naming::normalize(args.label.as_deref(), &args.url));
}
