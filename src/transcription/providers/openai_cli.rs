use anyhow::{bail, Context, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};
use which::which;

use super::TranscriptionProvider;

/// Local `whisper` command from the openai-whisper Python package.
pub struct OpenAIWhisperCliProvider {
    command: PathBuf,
    model: String,
}

impl OpenAIWhisperCliProvider {
    pub fn new(command_path: Option<String>, model: String) -> Result<Self> {
        let command = match command_path {
            Some(path) => PathBuf::from(path),
            None => which("whisper").context(
                "whisper command not found on PATH. Install it with `pip install openai-whisper` \
                 or set transcription.command_path",
            )?,
        };

        info!(
            "Initialized whisper CLI provider: {:?} (model: {})",
            command, model
        );

        Ok(Self { command, model })
    }

    fn command(&self, audio_path: &Path, language: &str, output_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.arg(audio_path)
            .args(["--model", self.model.as_str()])
            .args(["--output_format", "txt"])
            .arg("--output_dir")
            .arg(output_dir)
            .args(["--fp16", "False"])
            .args(["--verbose", "False"]);
        if !language.is_empty() && language != "auto" {
            cmd.args(["--language", language]);
        }
        cmd.stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }
}

impl TranscriptionProvider for OpenAIWhisperCliProvider {
    fn name(&self) -> &'static str {
        "OpenAI Whisper CLI"
    }

    fn is_available(&self) -> bool {
        self.command.exists() || which(&self.command).is_ok()
    }

    fn transcribe<'a>(
        &'a self,
        audio_path: &'a Path,
        language: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let output_dir =
                tempfile::TempDir::new().context("Failed to create whisper output directory")?;

            debug!("Running {:?} on {:?}", self.command, audio_path);

            let output = self
                .command(audio_path, language, output_dir.path())
                .output()
                .await
                .context("Failed to run whisper")?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                bail!("whisper exited with {}: {}", output.status, stderr.trim());
            }

            let stem = audio_path
                .file_stem()
                .context("Audio path has no file name")?;
            let transcript_file = output_dir
                .path()
                .join(format!("{}.txt", stem.to_string_lossy()));

            let text = tokio::fs::read_to_string(&transcript_file)
                .await
                .with_context(|| format!("whisper produced no transcript at {:?}", transcript_file))?;

            let text = text.trim().to_string();
            info!("Transcription complete: {} chars", text.len());
            Ok(text)
        })
    }
}
