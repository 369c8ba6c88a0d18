use anyhow::{bail, Context, Result};
use regex::Regex;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};
use which::which;

use super::TranscriptionProvider;

/// whisper.cpp command line (`whisper-cli`), printing the transcript to stdout.
pub struct WhisperCppProvider {
    command: PathBuf,
    model_path: PathBuf,
    timestamp_regex: Regex,
}

impl WhisperCppProvider {
    pub fn new(command_path: Option<String>, model_path: Option<String>) -> Result<Self> {
        let command = match command_path {
            Some(path) => PathBuf::from(path),
            None => which("whisper-cli").context(
                "whisper-cli not found on PATH. Build whisper.cpp or set transcription.command_path",
            )?,
        };
        let model_path = model_path
            .map(PathBuf::from)
            .context("transcription.model_path is required for whisper-cpp")?;

        // Matches timestamps like [00:00:00.000 --> 00:00:03.280] or [00:00:00:000 --> 00:00:03:280]
        let timestamp_regex =
            Regex::new(r"\[\d{2}:\d{2}:\d{2}[:.]\d{3}\s*-->\s*\d{2}:\d{2}:\d{2}[:.]\d{3}\]\s*")?;

        info!(
            "Initialized whisper.cpp provider: {:?} (model: {:?})",
            command, model_path
        );

        Ok(Self {
            command,
            model_path,
            timestamp_regex,
        })
    }

    /// Strip segment timestamps and join the remaining lines with spaces.
    fn clean_output(&self, raw_output: &str) -> String {
        let mut cleaned = String::new();

        for line in raw_output.lines() {
            let line_cleaned = self.timestamp_regex.replace_all(line, "");
            let line_trimmed = line_cleaned.trim();

            if !line_trimmed.is_empty() {
                if !cleaned.is_empty() {
                    cleaned.push(' ');
                }
                cleaned.push_str(line_trimmed);
            }
        }

        cleaned
    }
}

impl TranscriptionProvider for WhisperCppProvider {
    fn name(&self) -> &'static str {
        "whisper.cpp"
    }

    fn is_available(&self) -> bool {
        (self.command.exists() || which(&self.command).is_ok()) && self.model_path.exists()
    }

    fn transcribe<'a>(
        &'a self,
        audio_path: &'a Path,
        language: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let mut cmd = Command::new(&self.command);
            cmd.arg("-m")
                .arg(&self.model_path)
                .arg("-f")
                .arg(audio_path)
                .arg("-nt");
            if !language.is_empty() {
                cmd.args(["-l", language]);
            }

            debug!("Running {:?} on {:?}", self.command, audio_path);

            let output = cmd
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output()
                .await
                .context("Failed to run whisper.cpp")?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                bail!("whisper.cpp exited with {}: {}", output.status, stderr.trim());
            }

            let raw = String::from_utf8_lossy(&output.stdout);
            let text = self.clean_output(&raw);
            debug!("Normalized {} chars to {} chars", raw.len(), text.len());
            info!("Transcription complete: {} chars", text.len());

            Ok(text)
        })
    }
}
