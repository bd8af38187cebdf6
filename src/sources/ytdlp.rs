use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;

use super::{Availability, SourceFailure, TranscriptRequest, TranscriptSource, VideoId};
use crate::config::SubtitleConfig;
use crate::subtitles::parse_vtt;
use crate::transcribe::{SourceKind, TranscriptResult};
use crate::utils::check_command_available;

/// Subtitle track source: a local VTT file, or one downloaded with yt-dlp
pub struct SubtitleTrackSource {
    yt_dlp_path: String,
    timeout: Duration,
}

impl SubtitleTrackSource {
    pub fn new(config: &SubtitleConfig) -> Self {
        Self {
            yt_dlp_path: config.yt_dlp_path.clone(),
            timeout: config.timeout(),
        }
    }

    /// Read and parse a subtitle file into a transcript
    pub async fn parse_file(&self, path: &Path, language: &str) -> Result<TranscriptResult> {
        tracing::info!("Parsing subtitle file: {}", path.display());

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read subtitle file {}", path.display()))?;

        let segments = parse_vtt(&content);
        if segments.is_empty() {
            anyhow::bail!("No cues found in {}", path.display());
        }

        Ok(TranscriptResult::new(SourceKind::SubtitleTrack, segments, language))
    }

    /// Download subtitles for `video_id` and parse the best matching track
    async fn download_and_parse(&self, video_id: &VideoId, language: &str) -> Result<TranscriptResult> {
        let temp_dir = TempDir::new().context("Failed to create temporary directory")?;

        self.download_subtitles(video_id, language, temp_dir.path()).await?;

        let tracks = list_vtt_files(temp_dir.path())?;
        let track = select_track(&tracks, language)
            .context("yt-dlp did not download any subtitle track")?;

        self.parse_file(track, language).await
    }

    async fn download_subtitles(&self, video_id: &VideoId, language: &str, out_dir: &Path) -> Result<()> {
        let args = download_args(video_id, language, out_dir);
        tracing::debug!("Running {} {}", self.yt_dlp_path, args.join(" "));

        let child = Command::new(&self.yt_dlp_path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| anyhow::anyhow!("yt-dlp timed out after {}s", self.timeout.as_secs()))?
            .with_context(|| format!("Failed to run {}", self.yt_dlp_path))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed: {}", error.trim());
        }

        Ok(())
    }
}

#[async_trait]
impl TranscriptSource for SubtitleTrackSource {
    async fn availability(&self, request: &TranscriptRequest) -> Availability {
        if request.subtitle_file.is_some() {
            return Availability::Ready;
        }

        if check_command_available(&self.yt_dlp_path).await {
            Availability::Ready
        } else {
            Availability::Unavailable(format!("{} not installed", self.yt_dlp_path))
        }
    }

    async fn resolve(&self, request: &TranscriptRequest) -> Result<TranscriptResult, SourceFailure> {
        let outcome = match (&request.subtitle_file, &request.video_id) {
            (Some(path), _) => self.parse_file(path, &request.language).await,
            (None, Some(video_id)) => self.download_and_parse(video_id, &request.language).await,
            (None, None) => {
                return Err(SourceFailure::NoResult(
                    "no subtitle file or video identifier".to_string(),
                ))
            }
        };

        outcome.map_err(|e| SourceFailure::from_error(&e, None))
    }
}

fn download_args(video_id: &VideoId, language: &str, out_dir: &Path) -> Vec<String> {
    // The requested language plus English as a generic fallback
    let languages = if language == "en" {
        "en".to_string()
    } else {
        format!("{},en", language)
    };

    vec![
        "--write-subs".to_string(),
        "--write-auto-subs".to_string(),
        "--sub-langs".to_string(),
        languages,
        "--sub-format".to_string(),
        "vtt".to_string(),
        "--skip-download".to_string(),
        "--no-playlist".to_string(),
        "--quiet".to_string(),
        "--no-warnings".to_string(),
        "--output".to_string(),
        out_dir.join("%(id)s.%(ext)s").to_string_lossy().into_owned(),
        video_id.watch_url(),
    ]
}

fn list_vtt_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs_err::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "vtt"))
        .collect();
    files.sort();
    Ok(files)
}

/// Prefer the track tagged with `language` (`<id>.<lang>.vtt`), else the first one
fn select_track<'a>(tracks: &'a [PathBuf], language: &str) -> Option<&'a PathBuf> {
    let marker = format!(".{}.", language);
    tracks
        .iter()
        .find(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.contains(&marker))
        })
        .or_else(|| tracks.first())
}
