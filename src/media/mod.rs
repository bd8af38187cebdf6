use anyhow::{Context, Result};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::config::MediaConfig;

/// Audio containers accepted by the speech recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    M4a,
    Wav,
    Flac,
    Ogg,
    Webm,
}

impl AudioFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "m4a" | "aac" | "mp4" => Some(AudioFormat::M4a),
            "wav" => Some(AudioFormat::Wav),
            "flac" => Some(AudioFormat::Flac),
            "ogg" | "opus" => Some(AudioFormat::Ogg),
            "webm" => Some(AudioFormat::Webm),
            _ => None,
        }
    }

    /// Detect the format from a file name, defaulting to WAV
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .unwrap_or(AudioFormat::Wav)
    }

    /// Get MIME type for the format
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::M4a => "audio/mp4",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::Webm => "audio/webm",
        }
    }
}

/// Extracts recognizer-ready audio from video files using ffmpeg
#[derive(Debug, Clone)]
pub struct AudioExtractor {
    ffmpeg_path: String,
    timeout: Duration,
}

impl AudioExtractor {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            timeout: config.timeout(),
        }
    }

    /// Write the audio track of `video_path` to `output_path` as 16 kHz mono PCM WAV
    pub async fn extract_wav(&self, video_path: &Path, output_path: &Path) -> Result<()> {
        if !video_path.is_file() {
            anyhow::bail!("Video file does not exist: {}", video_path.display());
        }

        tracing::debug!(
            "Extracting audio {} -> {}",
            video_path.display(),
            output_path.display()
        );

        let child = Command::new(&self.ffmpeg_path)
            .args(extract_args(video_path, output_path))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| anyhow::anyhow!("ffmpeg timed out after {}s", self.timeout.as_secs()))?
            .with_context(|| format!("Failed to run {}", self.ffmpeg_path))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to extract audio with ffmpeg: {}", error.trim());
        }

        Ok(())
    }
}

fn extract_args(video_path: &Path, output_path: &Path) -> Vec<String> {
    vec![
        "-i".to_string(),
        video_path.to_string_lossy().into_owned(),
        "-vn".to_string(), // No video
        "-acodec".to_string(),
        "pcm_s16le".to_string(),
        "-ar".to_string(),
        "16000".to_string(),
        "-ac".to_string(),
        "1".to_string(),
        "-y".to_string(), // Overwrite output file
        output_path.to_string_lossy().into_owned(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(AudioFormat::from_path(Path::new("talk.MP3")), AudioFormat::Mp3);
        assert_eq!(AudioFormat::from_path(Path::new("talk.m4a")), AudioFormat::M4a);
        assert_eq!(AudioFormat::from_path(Path::new("talk")), AudioFormat::Wav);
        assert_eq!(AudioFormat::from_path(Path::new("talk.xyz")), AudioFormat::Wav);
        assert_eq!(AudioFormat::Flac.mime_type(), "audio/flac");
    }

    #[test]
    fn test_extract_args_request_mono_16k() {
        let args = extract_args(Path::new("in.mp4"), Path::new("out.wav"));
        let joined = args.join(" ");
        assert!(joined.starts_with("-i in.mp4 -vn"));
        assert!(joined.contains("-ar 16000"));
        assert!(joined.contains("-ac 1"));
        assert!(joined.ends_with("out.wav"));
    }

    #[tokio::test]
    async fn test_missing_video_is_an_error() {
        let extractor = AudioExtractor::new(&MediaConfig::default());
        let err = extractor
            .extract_wav(Path::new("/no/such/video.mp4"), Path::new("/tmp/out.wav"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
