use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tracing::info;

use crate::config::TranscriptionConfig;

pub mod providers;

pub use providers::{
    OpenAIProvider, OpenAIWhisperCliProvider, TranscriptionProvider, WhisperCppProvider,
};

/// Names accepted by `transcription.provider`.
pub const SUPPORTED_PROVIDERS: &[&str] = &["openai-cli", "whisper-cpp", "openai-api"];

/// Maps an audio file to its full transcript text.
#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<String>;
}

pub struct Transcriber {
    provider: Box<dyn TranscriptionProvider>,
    language: String,
}

impl Transcriber {
    pub fn with_provider(provider_name: &str, config: ProviderConfig) -> Result<Self> {
        let language = config.language.clone().unwrap_or_else(|| "en".to_string());

        let provider: Box<dyn TranscriptionProvider> = match provider_name {
            "openai-cli" => {
                let model = config.model.unwrap_or_else(|| "base".to_string());
                Box::new(OpenAIWhisperCliProvider::new(config.command_path, model)?)
            }
            "whisper-cpp" => Box::new(WhisperCppProvider::new(
                config.command_path,
                config.model_path,
            )?),
            "openai-api" => {
                let api_key = config
                    .api_key
                    .context("api_key is required for OpenAI API provider")?;

                let model = config.model.unwrap_or_else(|| "whisper-1".to_string());
                Box::new(OpenAIProvider::new(api_key, config.api_endpoint, model)?)
            }
            _ => bail!(
                "Unknown transcription provider '{}'. Supported providers: {}",
                provider_name,
                SUPPORTED_PROVIDERS.join(", ")
            ),
        };

        info!("Using {} for transcription", provider.name());

        Ok(Self { provider, language })
    }

    pub fn from_config(config: &TranscriptionConfig) -> Result<Self> {
        if let Some(error) = validate_provider_config(config) {
            bail!("Invalid transcription config: {}", error);
        }
        Self::with_provider(&config.provider, ProviderConfig::from(config))
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_available()
    }
}

#[async_trait]
impl TranscriptionEngine for Transcriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        info!(
            "Transcribing audio file: {:?} with {}",
            audio_path,
            self.provider.name()
        );
        self.provider.transcribe(audio_path, &self.language).await
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub model: Option<String>,
    pub model_path: Option<String>,
    pub language: Option<String>,
    pub command_path: Option<String>,
    pub api_endpoint: Option<String>,
    pub api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: None,
            model_path: None,
            language: Some("en".to_string()),
            command_path: None,
            api_endpoint: None,
            api_key: None,
        }
    }
}

impl From<&TranscriptionConfig> for ProviderConfig {
    fn from(config: &TranscriptionConfig) -> Self {
        Self {
            model: config.model.clone(),
            model_path: config.model_path.clone(),
            language: config.language.clone(),
            command_path: config.command_path.clone(),
            api_endpoint: config.api_endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

/// Validate provider configuration and return an error message if invalid.
pub fn validate_provider_config(config: &TranscriptionConfig) -> Option<String> {
    match config.provider.as_str() {
        "openai-cli" => None,
        "whisper-cpp" => {
            if config.model_path.is_none() {
                Some("Model path required for whisper.cpp".to_string())
            } else {
                None
            }
        }
        "openai-api" => {
            if config.api_key.as_deref().map_or(true, str::is_empty) {
                Some("API key required for OpenAI API".to_string())
            } else {
                None
            }
        }
        other => Some(format!("Unknown provider: {}", other)),
    }
}
