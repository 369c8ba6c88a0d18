use crate::chunking::DEFAULT_CHUNK_SIZE;
use crate::global;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Placeholder in `page_url_template` replaced by the 1-based page number.
pub const PAGE_PLACEHOLDER: &str = "{page}";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub storage: StorageConfig,
    pub media: MediaConfig,
    pub transcription: TranscriptionConfig,
    pub chunking: ChunkingConfig,
}

/// Where the meeting archive lives and how to recognise media links on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Archive page URL with a `{page}` placeholder for the page number.
    pub page_url_template: String,
    /// Number of archive pages to walk. Pages are not discovered.
    pub page_count: u32,
    /// Substring an anchor's `href` must contain to count as a recording.
    pub media_host: String,
    /// Per-request timeout for page fetches and downloads.
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub media_dir: PathBuf,
    pub audio_dir: PathBuf,
    pub transcript_dir: PathBuf,
    pub documents_dir: PathBuf,
    pub combined_documents_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub ffmpeg_path: Option<String>,
    pub audio_bitrate: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub provider: String,
    pub model: Option<String>,
    pub language: Option<String>,
    pub command_path: Option<String>,
    pub model_path: Option<String>,
    pub api_endpoint: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Words per chunk file. Zero is rejected when the config is parsed.
    pub chunk_size: NonZeroUsize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            page_url_template: "https://meetings.municode.com/PublishPage?cid=YOUNGSVILA&ppid=5d44059a-1e19-4452-a226-babc4b369c18&p={page}".to_string(),
            page_count: 5,
            media_host: "storage.sheenomo.live".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            media_dir: PathBuf::from("mp4_downloads"),
            audio_dir: PathBuf::from("audio_extracts"),
            transcript_dir: PathBuf::from("transcriptions"),
            documents_dir: PathBuf::from("scraped_content"),
            combined_documents_file: PathBuf::from("notebooklm_source.txt"),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            audio_bitrate: "64k".to_string(),
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            provider: "openai-cli".to_string(),
            model: Some("base".to_string()),
            language: Some("en".to_string()),
            command_path: None,
            model_path: None,
            api_endpoint: None,
            api_key: None,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl SourceConfig {
    pub fn page_url(&self, page: u32) -> String {
        self.page_url_template
            .replace(PAGE_PLACEHOLDER, &page.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl StorageConfig {
    /// Point every directory at `root`, keeping the default leaf names.
    pub fn rooted_at(root: &Path) -> Self {
        let defaults = Self::default();
        Self {
            media_dir: root.join(defaults.media_dir),
            audio_dir: root.join(defaults.audio_dir),
            transcript_dir: root.join(defaults.transcript_dir),
            documents_dir: root.join(defaults.documents_dir),
            combined_documents_file: root.join(defaults.combined_documents_file),
        }
    }
}

impl Config {
    /// Load from an explicit path, or from the default location when `path` is `None`.
    ///
    /// A missing default config file is created with defaults. A missing explicit
    /// file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {}", path.display());
                }
                Self::read(path)?
            }
            None => {
                let config_path = global::config_file()?;
                if !config_path.exists() {
                    info!(
                        "Config file not found, creating default at {:?}",
                        config_path
                    );
                    let config = Self::default();
                    config.save(&config_path)?;
                    return Ok(config);
                }
                Self::read(&config_path)?
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.source.page_url_template.contains(PAGE_PLACEHOLDER) {
            bail!(
                "source.page_url_template must contain the {} placeholder",
                PAGE_PLACEHOLDER
            );
        }
        if self.source.media_host.trim().is_empty() {
            bail!("source.media_host must not be empty");
        }

        let storage = &self.storage;
        let stage_dirs = [
            &storage.media_dir,
            &storage.audio_dir,
            &storage.transcript_dir,
        ];
        for (i, a) in stage_dirs.iter().enumerate() {
            for b in &stage_dirs[i + 1..] {
                if a == b {
                    bail!(
                        "storage directories must be distinct, {} is used twice",
                        a.display()
                    );
                }
            }
        }

        Ok(())
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }
}
