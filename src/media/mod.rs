//! Audio extraction from downloaded recordings.
//!
//! Uses FFmpeg to drop the video stream and encode the audio track as MP3 at
//! a fixed bitrate, which is what the transcription stage consumes.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::pipeline::artifacts::partial_path;

/// Result of a successful decoder run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// The audio file was written.
    Extracted,
    /// The source has no audio stream; nothing was written.
    NoAudioTrack,
}

/// Turns a video file into an audio file.
#[async_trait]
pub trait MediaDecoder: Send + Sync {
    async fn extract_audio(&self, video: &Path, audio: &Path) -> Result<ExtractOutcome>;
}

/// FFmpeg stderr fragments that mean "there was no audio to map".
const NO_AUDIO_MARKERS: &[&str] = &["does not contain any stream", "matches no streams"];

/// Check if FFmpeg is available on the system.
pub fn check_ffmpeg_available(program: &str) -> bool {
    std::process::Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub struct FfmpegDecoder {
    program: PathBuf,
    bitrate: String,
}

impl FfmpegDecoder {
    /// Locate FFmpeg (explicit path or `ffmpeg` on `PATH`).
    pub fn new(ffmpeg_path: Option<&str>, bitrate: impl Into<String>) -> Result<Self> {
        let program = match ffmpeg_path {
            Some(path) => {
                if !check_ffmpeg_available(path) {
                    bail!("FFmpeg at {} could not be run (media.ffmpeg_path)", path);
                }
                PathBuf::from(path)
            }
            None => which::which("ffmpeg").context(
                "FFmpeg is required to extract audio but was not found.\n\
                 Install FFmpeg:\n\
                 - macOS: brew install ffmpeg\n\
                 - Ubuntu/Debian: sudo apt install ffmpeg\n\
                 - Arch: sudo pacman -S ffmpeg\n\
                 - Windows: winget install ffmpeg",
            )?,
        };

        info!("Using FFmpeg at {:?}", program);

        Ok(Self {
            program,
            bitrate: bitrate.into(),
        })
    }

    fn command(&self, video: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-hide_banner")
            .arg("-nostdin")
            .arg("-i")
            .arg(video)
            .args(["-map", "0:a:0"])
            .arg("-vn")
            .args(["-codec:a", "libmp3lame"])
            .args(["-b:a", self.bitrate.as_str()])
            .args(["-f", "mp3"])
            .arg("-y")
            .arg(output)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl MediaDecoder for FfmpegDecoder {
    async fn extract_audio(&self, video: &Path, audio: &Path) -> Result<ExtractOutcome> {
        let part = partial_path(audio);
        debug!("Running FFmpeg on {:?} -> {:?}", video, part);

        let output = self
            .command(video, &part)
            .output()
            .await
            .context("Failed to run FFmpeg")?;

        if !output.status.success() {
            let _ = tokio::fs::remove_file(&part).await;
            let stderr = String::from_utf8_lossy(&output.stderr);
            if reports_no_audio(&stderr) {
                return Ok(ExtractOutcome::NoAudioTrack);
            }
            bail!("FFmpeg audio extraction failed: {}", last_lines(&stderr, 5));
        }

        if !part.exists() {
            bail!("FFmpeg did not produce output file");
        }

        tokio::fs::rename(&part, audio)
            .await
            .with_context(|| format!("Failed to move audio into place at {}", audio.display()))?;

        Ok(ExtractOutcome::Extracted)
    }
}

fn reports_no_audio(stderr: &str) -> bool {
    NO_AUDIO_MARKERS.iter().any(|marker| stderr.contains(marker))
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}
