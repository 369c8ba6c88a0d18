//! Artifact locations and atomic artifact writes.

use anyhow::{Context, Result};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::config::StorageConfig;
use crate::naming::CanonicalId;

/// Kind of per-recording artifact, each with its own directory and extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Media,
    Audio,
    Transcript,
}

impl ArtifactKind {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Media => "mp4",
            Self::Audio => "mp3",
            Self::Transcript => "txt",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Media => "media",
            Self::Audio => "audio",
            Self::Transcript => "transcript",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three stage directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    pub media_dir: PathBuf,
    pub audio_dir: PathBuf,
    pub transcript_dir: PathBuf,
}

impl ArtifactLayout {
    pub fn new(
        media_dir: impl Into<PathBuf>,
        audio_dir: impl Into<PathBuf>,
        transcript_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            media_dir: media_dir.into(),
            audio_dir: audio_dir.into(),
            transcript_dir: transcript_dir.into(),
        }
    }

    pub fn dir(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::Media => &self.media_dir,
            ArtifactKind::Audio => &self.audio_dir,
            ArtifactKind::Transcript => &self.transcript_dir,
        }
    }

    pub fn path(&self, kind: ArtifactKind, id: &CanonicalId) -> PathBuf {
        self.dir(kind)
            .join(format!("{}.{}", id.as_str(), kind.extension()))
    }

    /// `{transcript_dir}/{id}_chunk_{index}.txt`, 1-based.
    pub fn chunk_path(&self, id: &CanonicalId, index: usize) -> PathBuf {
        chunk_path_for(&self.path(ArtifactKind::Transcript, id), index)
    }

    pub fn paths(&self, id: &CanonicalId) -> ArtifactPaths {
        ArtifactPaths {
            media_path: self.path(ArtifactKind::Media, id),
            audio_path: self.path(ArtifactKind::Audio, id),
            transcript_path: self.path(ArtifactKind::Transcript, id),
        }
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for kind in [
            ArtifactKind::Media,
            ArtifactKind::Audio,
            ArtifactKind::Transcript,
        ] {
            let dir = self.dir(kind);
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {} directory {}", kind, dir.display()))?;
        }
        Ok(())
    }
}

impl From<&StorageConfig> for ArtifactLayout {
    fn from(storage: &StorageConfig) -> Self {
        Self::new(
            storage.media_dir.clone(),
            storage.audio_dir.clone(),
            storage.transcript_dir.clone(),
        )
    }
}

/// Derived file locations of one recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub media_path: PathBuf,
    pub audio_path: PathBuf,
    pub transcript_path: PathBuf,
}

/// Chunk file `index` (1-based) next to `transcript_path`.
pub fn chunk_path_for(transcript_path: &Path, index: usize) -> PathBuf {
    let stem = transcript_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    transcript_path.with_file_name(format!("{}_chunk_{}.txt", stem, index))
}

/// The transcript stem of a `<base>_chunk_<n>.txt` name, or `None` if the
/// name does not have that shape.
pub fn chunk_base(file_name: &str) -> Option<&str> {
    let stem = file_name.strip_suffix(".txt")?;
    let (base, index) = stem.rsplit_once("_chunk_")?;
    let numbered = !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit());
    (!base.is_empty() && numbered).then_some(base)
}

/// Sibling path used while an artifact is being written, e.g. `x.mp4.part`.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

/// Write `contents` so that `path` either holds all of it or does not change.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("Failed to sync {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("Failed to persist {}", path.display()))?;
    Ok(())
}
