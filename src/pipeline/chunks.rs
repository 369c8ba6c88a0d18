//! Chunk files next to transcripts, and backfilling them for old transcripts.

use anyhow::{Context, Result};
use std::num::NonZeroUsize;
use std::path::Path;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use super::artifacts::{chunk_base, chunk_path_for, write_atomic};
use super::state::count_chunks;
use crate::chunking::chunk_text;

/// What happened when chunks were requested for a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkWrite {
    /// Chunk files were already present; nothing was written.
    AlreadyChunked(usize),
    /// This many chunk files were written (zero for an empty transcript).
    Written(usize),
}

/// Split `text` and write `<base>_chunk_<n>.txt` files beside `transcript_path`,
/// unless chunk files for it already exist.
pub fn persist_chunks(
    transcript_path: &Path,
    text: &str,
    chunk_size: NonZeroUsize,
) -> Result<ChunkWrite> {
    let existing = count_chunks(transcript_path);
    if existing > 0 {
        return Ok(ChunkWrite::AlreadyChunked(existing));
    }

    let chunks = chunk_text(text, chunk_size);
    for (i, chunk) in chunks.iter().enumerate() {
        let path = chunk_path_for(transcript_path, i + 1);
        write_atomic(&path, chunk.as_bytes())?;
    }

    Ok(ChunkWrite::Written(chunks.len()))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillSummary {
    pub chunked: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Chunk every transcript in `transcript_dir` that has no chunk files yet.
///
/// Errors on individual files are logged and counted; only an unreadable
/// directory fails the whole call.
pub fn backfill_chunks(transcript_dir: &Path, chunk_size: NonZeroUsize) -> Result<BackfillSummary> {
    if !transcript_dir.is_dir() {
        anyhow::bail!(
            "Transcript directory {} does not exist",
            transcript_dir.display()
        );
    }

    let mut transcripts = Vec::new();
    for entry in WalkDir::new(transcript_dir).min_depth(1).max_depth(1) {
        let entry = entry
            .with_context(|| format!("Failed to read {}", transcript_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !name.ends_with(".txt") {
            continue;
        }
        // An id may itself end in `_chunk_<n>`; it is only a chunk file
        // when the transcript it would belong to is present.
        let is_chunk = chunk_base(&name)
            .is_some_and(|base| transcript_dir.join(format!("{base}.txt")).is_file());
        if !is_chunk {
            transcripts.push(entry.into_path());
        }
    }
    transcripts.sort();

    let mut summary = BackfillSummary::default();
    for path in transcripts {
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                error!("Error reading {:?}: {}", path, e);
                summary.failed += 1;
                continue;
            }
        };

        match persist_chunks(&path, &text, chunk_size) {
            Ok(ChunkWrite::AlreadyChunked(n)) => {
                info!("Chunks already exist for {:?} ({}). Skipping chunking.", path, n);
                summary.skipped += 1;
            }
            Ok(ChunkWrite::Written(n)) => {
                if n == 0 {
                    warn!("Transcript {:?} is empty, no chunks written", path);
                } else {
                    info!("Wrote {} chunks for {:?}", n, path);
                }
                summary.chunked += 1;
            }
            Err(e) => {
                error!("Error chunking {:?}: {:#}", path, e);
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}
