//! In-process collaborators for driving the pipeline without network,
//! FFmpeg or a speech model.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use meeting_archive::config::StorageConfig;
use meeting_archive::download::Downloader;
use meeting_archive::driver::PageSource;
use meeting_archive::media::{ExtractOutcome, MediaDecoder};
use meeting_archive::pipeline::{ArtifactLayout, Pipeline};
use meeting_archive::transcription::TranscriptionEngine;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Clone, Default)]
pub struct Calls(Arc<AtomicUsize>);

impl Calls {
    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Writes a fixed body to the destination, or fails for URLs containing `fail_on`.
pub struct FakeDownloader {
    pub calls: Calls,
    pub fail_on: Option<String>,
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        self.calls.bump();
        if self.fail_on.as_deref().is_some_and(|s| url.contains(s)) {
            return Err(anyhow!("HTTP 404 for {}", url));
        }
        std::fs::write(dest, b"fake video")?;
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum DecoderMode {
    Extract,
    NoAudio,
    Fail,
}

pub struct FakeDecoder {
    pub calls: Calls,
    pub mode: DecoderMode,
    /// Extra file written during extraction, standing in for another process.
    pub also_writes: Option<PathBuf>,
}

#[async_trait]
impl MediaDecoder for FakeDecoder {
    async fn extract_audio(&self, video: &Path, audio: &Path) -> Result<ExtractOutcome> {
        self.calls.bump();
        assert!(video.is_file(), "decoder called without a video file");
        if let Some(path) = &self.also_writes {
            std::fs::write(path, "written elsewhere")?;
        }
        match self.mode {
            DecoderMode::Extract => {
                std::fs::write(audio, b"fake audio")?;
                Ok(ExtractOutcome::Extracted)
            }
            DecoderMode::NoAudio => Ok(ExtractOutcome::NoAudioTrack),
            DecoderMode::Fail => Err(anyhow!("ffmpeg exited with status 1")),
        }
    }
}

/// Returns `text` for every file, except paths containing `fail_on`.
pub struct FakeTranscriber {
    pub calls: Calls,
    pub text: String,
    pub fail_on: Option<String>,
}

#[async_trait]
impl TranscriptionEngine for FakeTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        self.calls.bump();
        let path = audio_path.to_string_lossy();
        if self.fail_on.as_deref().is_some_and(|s| path.contains(s)) {
            return Err(anyhow!("model crashed on {}", path));
        }
        Ok(self.text.clone())
    }
}

/// Serves canned pages; unknown URLs fail.
#[derive(Default)]
pub struct FakePageSource {
    pub pages: HashMap<String, String>,
    pub requested: Arc<Mutex<Vec<String>>>,
}

impl FakePageSource {
    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }
}

#[async_trait]
impl PageSource for FakePageSource {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        self.requested.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("connection refused: {}", url))
    }
}

/// Counters shared with the fakes handed to a pipeline.
#[derive(Clone, Default)]
pub struct Counters {
    pub downloads: Calls,
    pub extracts: Calls,
    pub transcribes: Calls,
}

pub struct Harness {
    pub dir: TempDir,
    pub layout: ArtifactLayout,
    pub counters: Counters,
    pub download_fail_on: Option<String>,
    pub decoder_mode: DecoderMode,
    pub decoder_also_writes: Option<PathBuf>,
    pub transcribe_fail_on: Option<String>,
    pub text: String,
    pub chunk_size: NonZeroUsize,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::from(&StorageConfig::rooted_at(dir.path()));
        layout.ensure_dirs().unwrap();
        Self {
            dir,
            layout,
            counters: Counters::default(),
            download_fail_on: None,
            decoder_mode: DecoderMode::Extract,
            decoder_also_writes: None,
            transcribe_fail_on: None,
            text: "the meeting was called to order".to_string(),
            chunk_size: NonZeroUsize::new(2).unwrap(),
        }
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(
            self.layout.clone(),
            Box::new(FakeDownloader {
                calls: self.counters.downloads.clone(),
                fail_on: self.download_fail_on.clone(),
            }),
            Box::new(FakeDecoder {
                calls: self.counters.extracts.clone(),
                mode: self.decoder_mode,
                also_writes: self.decoder_also_writes.clone(),
            }),
            Box::new(FakeTranscriber {
                calls: self.counters.transcribes.clone(),
                text: self.text.clone(),
                fail_on: self.transcribe_fail_on.clone(),
            }),
            self.chunk_size,
        )
    }

    pub fn file_names(&self, dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
