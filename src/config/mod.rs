use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::segmenter::SegmentLimits;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default transcript language
    pub language: String,

    /// Word resegmentation thresholds
    pub segmentation: SegmentLimits,

    /// YouTube caption API settings
    pub youtube_api: YoutubeApiConfig,

    /// yt-dlp subtitle download settings
    pub subtitles: SubtitleConfig,

    /// Deepgram speech recognition settings
    pub deepgram: DeepgramConfig,

    /// External media tools
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeApiConfig {
    /// Base URL of the YouTube web endpoints
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleConfig {
    /// yt-dlp executable
    pub yt_dlp_path: String,

    /// Limit for one subtitle download, in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeepgramConfig {
    /// Base URL of the Deepgram API
    pub base_url: String,

    /// Recognition model
    pub model: String,

    /// Pause length in seconds that splits utterances
    pub utterance_split: f64,

    /// Limit for one transcription request, in seconds
    pub timeout_secs: u64,

    /// Environment variable holding the API key
    pub api_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// ffmpeg executable used for audio extraction
    pub ffmpeg_path: String,

    /// Limit for one audio extraction, in seconds
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            segmentation: SegmentLimits::default(),
            youtube_api: YoutubeApiConfig::default(),
            subtitles: SubtitleConfig::default(),
            deepgram: DeepgramConfig::default(),
            media: MediaConfig::default(),
        }
    }
}

impl Default for YoutubeApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.youtube.com".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            timeout_secs: 120,
        }
    }
}

impl Default for DeepgramConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepgram.com".to_string(),
            model: "nova-2".to_string(),
            utterance_split: 0.8,
            timeout_secs: 300,
            api_key_env: "DEEPGRAM_API_KEY".to_string(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            timeout_secs: 600,
        }
    }
}

impl YoutubeApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SubtitleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DeepgramConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl MediaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let config_path = match explicit_path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config: Config = serde_yaml::from_str(&content)
                .context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save(&config_path).await?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        Ok(Self::config_dir()?.join("config.yaml"))
    }

    /// Per-user configuration directory
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("transcript-resolver"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.language.trim().is_empty() {
            anyhow::bail!("Default language must not be empty");
        }

        if self.segmentation.max_words == 0 {
            anyhow::bail!("segmentation.max_words must be at least 1");
        }

        if !(self.segmentation.max_duration > 0.0) {
            anyhow::bail!("segmentation.max_duration_secs must be positive");
        }

        if self.youtube_api.timeout_secs == 0
            || self.subtitles.timeout_secs == 0
            || self.deepgram.timeout_secs == 0
            || self.media.timeout_secs == 0
        {
            anyhow::bail!("Timeouts must be at least one second");
        }

        if !(self.deepgram.utterance_split > 0.0) {
            anyhow::bail!("deepgram.utterance_split must be positive");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Language: {}", self.language);
        println!(
            "  Segmentation: {} words / {}s",
            self.segmentation.max_words, self.segmentation.max_duration
        );
        println!("  YouTube API: {}", self.youtube_api.base_url);
        println!(
            "  yt-dlp: {} (timeout {}s)",
            self.subtitles.yt_dlp_path, self.subtitles.timeout_secs
        );
        println!(
            "  Deepgram: {} model {} (timeout {}s, key from ${})",
            self.deepgram.base_url,
            self.deepgram.model,
            self.deepgram.timeout_secs,
            self.deepgram.api_key_env
        );
        println!(
            "  ffmpeg: {} (timeout {}s)",
            self.media.ffmpeg_path, self.media.timeout_secs
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.segmentation.max_words, 12);
        assert_eq!(config.segmentation.max_duration, 5.0);
        assert_eq!(config.deepgram.model, "nova-2");
    }

    #[test]
    fn test_partial_yaml_falls_back_to_defaults() {
        let yaml = "language: ja\nsegmentation:\n  max_words: 8\n  max_duration_secs: 4.0\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.language, "ja");
        assert_eq!(config.segmentation.max_words, 8);
        assert_eq!(config.subtitles.yt_dlp_path, "yt-dlp");
        assert_eq!(config.deepgram.api_key_env, "DEEPGRAM_API_KEY");
    }

    #[test]
    fn test_validate_rejects_bad_limits() {
        let mut config = Config::default();
        config.segmentation.max_words = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.segmentation.max_duration = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.subtitles.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_load_writes_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let config = Config::load(Some(&path)).await.unwrap();
        assert_eq!(config.language, "en");
        assert!(path.exists());

        let reloaded = Config::load(Some(&path)).await.unwrap();
        assert_eq!(reloaded.deepgram.base_url, config.deepgram.base_url);
    }
}
