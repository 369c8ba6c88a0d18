//! Per-record processing: download, extract audio, transcribe, chunk.
//!
//! Every stage writes its artifact atomically and is skipped when that artifact
//! is already on disk, so an interrupted run resumes where it stopped.

use std::num::NonZeroUsize;
use std::path::Path;
use tracing::{debug, error, info, warn};

pub mod artifacts;
pub mod chunks;
pub mod outcome;
pub mod state;

pub use artifacts::{ArtifactKind, ArtifactLayout, ArtifactPaths};
pub use chunks::{backfill_chunks, persist_chunks, BackfillSummary, ChunkWrite};
pub use outcome::{PipelineOutcome, Stage};
pub use state::PipelineState;

use crate::download::Downloader;
use crate::extract::MediaRecord;
use crate::media::{ExtractOutcome, MediaDecoder};
use crate::naming::{self, CanonicalId};
use crate::transcription::TranscriptionEngine;

pub struct Pipeline {
    state: PipelineState,
    downloader: Box<dyn Downloader>,
    decoder: Box<dyn MediaDecoder>,
    transcriber: Box<dyn TranscriptionEngine>,
    chunk_size: NonZeroUsize,
}

impl Pipeline {
    pub fn new(
        layout: ArtifactLayout,
        downloader: Box<dyn Downloader>,
        decoder: Box<dyn MediaDecoder>,
        transcriber: Box<dyn TranscriptionEngine>,
        chunk_size: NonZeroUsize,
    ) -> Self {
        Self {
            state: PipelineState::new(layout),
            downloader,
            decoder,
            transcriber,
            chunk_size,
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn chunk_size(&self) -> NonZeroUsize {
        self.chunk_size
    }

    /// Drive one record to a transcript. Never returns an error: every stage
    /// failure is logged and folded into the outcome.
    pub async fn process(&self, record: &MediaRecord) -> PipelineOutcome {
        let id = naming::normalize(record.raw_label.as_deref(), &record.source_url);
        info!("Processing {} ({})", id, record.source_url);

        let paths = self.state.layout().paths(&id);

        if self.state.artifact_exists(ArtifactKind::Transcript, &id) {
            info!("[{}] Transcript already exists, skipping", id);
            // A run that crashed after transcribing can leave its video behind.
            remove_media(&id, &paths.media_path);
            return PipelineOutcome::AlreadyDone;
        }

        let outcome = self.run_stages(record, &id, &paths).await;

        remove_media(&id, &paths.media_path);

        match outcome {
            PipelineOutcome::Failed(stage) => {
                warn!("[{}] Failed at {} stage ({})", id, stage, record.source_url)
            }
            other => info!("[{}] Finished: {}", id, other),
        }
        outcome
    }

    async fn run_stages(
        &self,
        record: &MediaRecord,
        id: &CanonicalId,
        paths: &ArtifactPaths,
    ) -> PipelineOutcome {
        let url = record.source_url.as_str();
        let mut first_failure: Option<Stage> = None;

        let have_audio = self.state.artifact_exists(ArtifactKind::Audio, id);
        let have_media = self.state.artifact_exists(ArtifactKind::Media, id);

        if !have_audio && !have_media {
            info!("[{}] Downloading {}", id, url);
            if let Err(e) = self.downloader.download(url, &paths.media_path).await {
                error!("[{}] download stage failed for {}: {:#}", id, url, e);
                first_failure.get_or_insert(Stage::Download);
            }
        } else {
            debug!("[{}] Media or audio already present, skipping download", id);
        }

        if self.state.artifact_exists(ArtifactKind::Media, id) {
            if self.state.artifact_exists(ArtifactKind::Audio, id) {
                info!("[{}] Audio already extracted, skipping extraction", id);
            } else {
                info!("[{}] Extracting audio", id);
                match self
                    .decoder
                    .extract_audio(&paths.media_path, &paths.audio_path)
                    .await
                {
                    Ok(ExtractOutcome::Extracted) => {
                        debug!("[{}] Audio written to {:?}", id, paths.audio_path)
                    }
                    Ok(ExtractOutcome::NoAudioTrack) => {
                        warn!("[{}] extract stage: {} has no audio track", id, url);
                        first_failure.get_or_insert(Stage::Extract);
                    }
                    Err(e) => {
                        error!("[{}] extract stage failed for {}: {:#}", id, url, e);
                        first_failure.get_or_insert(Stage::Extract);
                    }
                }
            }
        }

        if !self.state.artifact_exists(ArtifactKind::Audio, id) {
            let stage = first_failure.unwrap_or(Stage::Transcribe);
            warn!("[{}] No audio available for {}, cannot transcribe", id, url);
            return PipelineOutcome::Failed(stage);
        }

        // Another process may have finished this record while we were downloading.
        if self.state.artifact_exists(ArtifactKind::Transcript, id) {
            info!("[{}] Transcript appeared during processing, skipping", id);
            return PipelineOutcome::AlreadyDone;
        }

        info!("[{}] Transcribing", id);
        let text = match self.transcriber.transcribe(&paths.audio_path).await {
            Ok(text) => text,
            Err(e) => {
                error!("[{}] transcribe stage failed for {}: {:#}", id, url, e);
                return PipelineOutcome::Failed(Stage::Transcribe);
            }
        };

        if let Err(e) = artifacts::write_atomic(&paths.transcript_path, text.as_bytes()) {
            error!("[{}] transcribe stage could not save transcript: {:#}", id, e);
            return PipelineOutcome::Failed(Stage::Transcribe);
        }
        info!("[{}] Saved transcript to {:?}", id, paths.transcript_path);

        match persist_chunks(&paths.transcript_path, &text, self.chunk_size) {
            Ok(ChunkWrite::Written(n)) => info!("[{}] Wrote {} chunks", id, n),
            Ok(ChunkWrite::AlreadyChunked(n)) => {
                info!("[{}] Chunks already exist ({}), skipping chunking", id, n)
            }
            Err(e) => {
                error!("[{}] chunk stage failed: {:#}", id, e);
                return PipelineOutcome::Failed(Stage::Chunk);
            }
        }

        PipelineOutcome::Completed
    }
}

/// The video is only an intermediate; drop it whatever the outcome.
fn remove_media(id: &CanonicalId, media_path: &Path) {
    if !media_path.exists() {
        return;
    }
    match std::fs::remove_file(media_path) {
        Ok(()) => info!("[{}] Removed video file {:?}", id, media_path),
        Err(e) => warn!("[{}] Failed to remove video file {:?}: {}", id, media_path, e),
    }
}
