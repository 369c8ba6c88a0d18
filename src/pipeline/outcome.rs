use serde::{Deserialize, Serialize};
use std::fmt;

/// A pipeline step whose completion is evidenced by its output artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Download,
    Extract,
    Transcribe,
    Chunk,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Extract => "extract",
            Self::Transcribe => "transcribe",
            Self::Chunk => "chunk",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of processing one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "stage", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// A new transcript was produced.
    Completed,
    /// The transcript already existed; nothing was done.
    AlreadyDone,
    /// Processing stopped because of the given stage.
    Failed(Stage),
}

impl PipelineOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for PipelineOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::AlreadyDone => f.write_str("already done"),
            Self::Failed(stage) => write!(f, "failed at {}", stage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_as_str() {
        assert_eq!(Stage::Download.as_str(), "download");
        assert_eq!(Stage::Extract.as_str(), "extract");
        assert_eq!(Stage::Transcribe.as_str(), "transcribe");
        assert_eq!(Stage::Chunk.as_str(), "chunk");
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(PipelineOutcome::Completed.to_string(), "completed");
        assert_eq!(PipelineOutcome::AlreadyDone.to_string(), "already done");
        assert_eq!(
            PipelineOutcome::Failed(Stage::Extract).to_string(),
            "failed at extract"
        );
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&PipelineOutcome::Failed(Stage::Transcribe)).unwrap();
        assert_eq!(json, r#"{"outcome":"failed","stage":"transcribe"}"#);

        let parsed: PipelineOutcome = serde_json::from_str(r#"{"outcome":"completed"}"#).unwrap();
        assert_eq!(parsed, PipelineOutcome::Completed);
    }
}
