use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

pub mod deepgram;
pub mod youtube_api;
pub mod ytdlp;

use crate::transcribe::TranscriptResult;
use crate::TranscriptError;

/// An 11-character YouTube video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Accept a bare identifier or a watch/embed/shorts/youtu.be URL
    pub fn parse(input: &str) -> Result<Self, TranscriptError> {
        let input = input.trim();

        if is_video_id(input) {
            return Ok(Self(input.to_string()));
        }

        let url = Url::parse(input)
            .map_err(|_| TranscriptError::InvalidInput(format!("invalid video URL or ID: {}", input)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(TranscriptError::InvalidInput(
                "URL must use HTTP or HTTPS protocol".to_string(),
            ));
        }

        id_from_url(&url)
            .map(Self)
            .ok_or_else(|| {
                TranscriptError::InvalidInput(format!("cannot extract video ID from URL: {}", input))
            })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn id_from_url(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let host = host.strip_prefix("m.").unwrap_or(host);

    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    let candidate = match host {
        "youtu.be" => segments.next()?.to_string(),
        "youtube.com" | "youtube-nocookie.com" => match segments.next()? {
            "watch" => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned())?,
            "embed" | "shorts" | "v" | "live" => segments.next()?.to_string(),
            _ => return None,
        },
        _ => return None,
    };

    is_video_id(&candidate).then_some(candidate)
}

/// Inputs for one transcript resolution
#[derive(Debug, Clone, Default)]
pub struct TranscriptRequest {
    pub video_id: Option<VideoId>,
    pub language: String,
    /// Already downloaded timed-text track
    pub subtitle_file: Option<PathBuf>,
    /// Audio to send straight to speech recognition
    pub audio_file: Option<PathBuf>,
    /// Downloaded video to extract audio from
    pub video_path: Option<PathBuf>,
}

impl TranscriptRequest {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            ..Default::default()
        }
    }

    pub fn with_video_id(mut self, video_id: VideoId) -> Self {
        self.video_id = Some(video_id);
        self
    }

    pub fn with_subtitle_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.subtitle_file = Some(path.into());
        self
    }

    pub fn with_audio_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.audio_file = Some(path.into());
        self
    }

    pub fn with_video_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.video_path = Some(path.into());
        self
    }

    /// Video path, if one was given and it exists on disk
    pub fn existing_video_path(&self) -> Option<&Path> {
        self.video_path.as_deref().filter(|path| path.exists())
    }

    pub fn has_any_input(&self) -> bool {
        self.video_id.is_some()
            || self.subtitle_file.is_some()
            || self.audio_file.is_some()
            || self.video_path.is_some()
    }
}

/// Result of a source's capability check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Ready,
    Unavailable(String),
}

/// Why a source returned no transcript. Never escapes the pipeline.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceFailure {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("no result: {0}")]
    NoResult(String),
}

impl SourceFailure {
    /// Build a `NoResult` from an internal error, masking `secret` if present
    pub fn from_error(error: &anyhow::Error, secret: Option<&str>) -> Self {
        let message = format!("{:#}", error);
        SourceFailure::NoResult(crate::utils::redact_secret(&message, secret))
    }
}

/// A producer of uniform transcripts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Check credentials and external tools before any work is done
    async fn availability(&self, request: &TranscriptRequest) -> Availability;

    /// Produce a transcript for the request
    async fn resolve(&self, request: &TranscriptRequest) -> Result<TranscriptResult, SourceFailure>;
}
