//! Pipeline progress read back from the filesystem.
//!
//! There is no separate state store: an artifact's presence on disk is the
//! only record that its stage completed.

use std::path::Path;

use super::artifacts::{chunk_path_for, ArtifactKind, ArtifactLayout};
use crate::naming::CanonicalId;

#[derive(Debug, Clone)]
pub struct PipelineState {
    layout: ArtifactLayout,
}

impl PipelineState {
    pub fn new(layout: ArtifactLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    pub fn artifact_exists(&self, kind: ArtifactKind, id: &CanonicalId) -> bool {
        self.layout.path(kind, id).is_file()
    }

    /// Number of consecutive chunk files starting at `_chunk_1`.
    pub fn chunk_count(&self, id: &CanonicalId) -> usize {
        count_chunks(&self.layout.path(ArtifactKind::Transcript, id))
    }
}

/// Probe `<base>_chunk_1.txt`, `<base>_chunk_2.txt`, ... until the first gap.
pub fn count_chunks(transcript_path: &Path) -> usize {
    let mut count = 0;
    while chunk_path_for(transcript_path, count + 1).is_file() {
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::normalize;
    use std::fs;
    use tempfile::TempDir;

    fn state(dir: &TempDir) -> PipelineState {
        let layout = ArtifactLayout::new(
            dir.path().join("media"),
            dir.path().join("audio"),
            dir.path().join("text"),
        );
        layout.ensure_dirs().unwrap();
        PipelineState::new(layout)
    }

    #[test]
    fn test_artifact_exists() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);
        let id = normalize(None, "https://example.com/meeting.mp4");

        assert!(!state.artifact_exists(ArtifactKind::Audio, &id));
        fs::write(state.layout().path(ArtifactKind::Audio, &id), b"mp3").unwrap();
        assert!(state.artifact_exists(ArtifactKind::Audio, &id));
        assert!(!state.artifact_exists(ArtifactKind::Media, &id));
        assert!(!state.artifact_exists(ArtifactKind::Transcript, &id));
    }

    #[test]
    fn test_directory_is_not_an_artifact() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);
        let id = normalize(None, "https://example.com/meeting.mp4");

        fs::create_dir(state.layout().path(ArtifactKind::Transcript, &id)).unwrap();
        assert!(!state.artifact_exists(ArtifactKind::Transcript, &id));
    }

    #[test]
    fn test_chunk_count_stops_at_first_gap() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);
        let id = normalize(None, "https://example.com/meeting.mp4");

        assert_eq!(state.chunk_count(&id), 0);

        for i in [1, 2, 4] {
            fs::write(state.layout().chunk_path(&id, i), "words").unwrap();
        }
        assert_eq!(state.chunk_count(&id), 2);
    }

    #[test]
    fn test_chunk_count_needs_first_chunk() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);
        let id = normalize(None, "https://example.com/meeting.mp4");

        fs::write(state.layout().chunk_path(&id, 2), "words").unwrap();
        assert_eq!(state.chunk_count(&id), 0);
    }
}
