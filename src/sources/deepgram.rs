use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

use super::{Availability, SourceFailure, TranscriptRequest, TranscriptSource};
use crate::config::{DeepgramConfig, MediaConfig};
use crate::media::{AudioExtractor, AudioFormat};
use crate::segmenter::{resegment, SegmentLimits};
use crate::timecode::round_millis;
use crate::transcribe::{SourceKind, TimedSegment, TranscriptResult, WordRecord};
use crate::utils::format_file_size;

/// Pre-recorded transcription response, narrowed to the fields we use
#[derive(Debug, Deserialize)]
struct ListenResponse {
    results: ListenResults,
}

#[derive(Debug, Default, Deserialize)]
struct ListenResults {
    #[serde(default)]
    utterances: Vec<Utterance>,
    #[serde(default)]
    channels: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
struct Utterance {
    start: f64,
    end: f64,
    transcript: String,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    words: Vec<Word>,
}

#[derive(Debug, Deserialize)]
struct Word {
    word: String,
    start: f64,
    end: f64,
    punctuated_word: Option<String>,
}

/// Speech recognition source backed by Deepgram
pub struct DeepgramSource {
    client: Client,
    base_url: String,
    model: String,
    utterance_split: f64,
    timeout: Duration,
    limits: SegmentLimits,
    extractor: AudioExtractor,
    api_key: Option<String>,
}

impl DeepgramSource {
    pub fn new(
        config: &DeepgramConfig,
        media: &MediaConfig,
        limits: &SegmentLimits,
        api_key: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            utterance_split: config.utterance_split,
            timeout: config.timeout(),
            limits: *limits,
            extractor: AudioExtractor::new(media),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    async fn transcribe_request(&self, request: &TranscriptRequest, api_key: &str) -> Result<Vec<TimedSegment>> {
        if let Some(audio) = &request.audio_file {
            return self.transcribe_file(audio, &request.language, api_key).await;
        }

        let video = request
            .existing_video_path()
            .context("No audio or video file to transcribe")?;

        // The extracted WAV lives in a temp dir that is removed on every exit path
        let temp_dir = TempDir::new().context("Failed to create temporary directory")?;
        let wav_path = temp_dir.path().join(wav_name(video));

        tracing::info!("Extracting 16kHz mono audio from {}", video.display());
        self.extractor.extract_wav(video, &wav_path).await?;

        self.transcribe_file(&wav_path, &request.language, api_key).await
    }

    /// Send one audio file to Deepgram and map the response onto segments
    pub async fn transcribe_file(&self, audio_path: &Path, language: &str, api_key: &str) -> Result<Vec<TimedSegment>> {
        let audio = tokio::fs::read(audio_path)
            .await
            .with_context(|| format!("Failed to read audio file {}", audio_path.display()))?;

        tracing::info!(
            "Transcribing {} ({}) with Deepgram {}",
            audio_path.display(),
            format_file_size(audio.len() as u64),
            self.model
        );

        let format = AudioFormat::from_path(audio_path);

        // Dropping the exchange on timeout discards the in-flight audio buffer
        let parsed = tokio::time::timeout(
            self.timeout,
            self.post_audio(audio, format, language, api_key),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Deepgram timed out after {}s", self.timeout.as_secs()))??;

        Ok(response_to_segments(parsed.results, &self.limits))
    }

    async fn post_audio(
        &self,
        audio: Vec<u8>,
        format: AudioFormat,
        language: &str,
        api_key: &str,
    ) -> Result<ListenResponse> {
        let utterance_split = self.utterance_split.to_string();

        let response = self
            .client
            .post(format!("{}/v1/listen", self.base_url))
            .query(&[
                ("model", self.model.as_str()),
                ("language", language),
                ("smart_format", "true"),
                ("punctuate", "true"),
                ("paragraphs", "true"),
                ("utterances", "true"),
                ("utt_split", utterance_split.as_str()),
            ])
            .header(AUTHORIZATION, format!("Token {}", api_key))
            .header(CONTENT_TYPE, format.mime_type())
            .body(audio)
            .send()
            .await
            .context("Failed to reach Deepgram")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Deepgram returned HTTP {}: {}", status, body.trim());
        }

        response
            .json::<ListenResponse>()
            .await
            .context("Failed to parse Deepgram response")
    }
}

#[async_trait]
impl TranscriptSource for DeepgramSource {
    async fn availability(&self, _request: &TranscriptRequest) -> Availability {
        if self.api_key.is_none() {
            return Availability::Unavailable("no credential".to_string());
        }
        Availability::Ready
    }

    async fn resolve(&self, request: &TranscriptRequest) -> Result<TranscriptResult, SourceFailure> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SourceFailure::Unavailable("no credential".to_string()))?;

        let segments = self
            .transcribe_request(request, api_key)
            .await
            .map_err(|e| SourceFailure::from_error(&e, Some(api_key)))?;

        if segments.is_empty() {
            return Err(SourceFailure::NoResult("recognizer returned no speech".to_string()));
        }

        Ok(TranscriptResult::new(
            SourceKind::SpeechRecognition,
            segments,
            request.language.clone(),
        ))
    }
}

fn wav_name(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");
    PathBuf::from(format!("{}.wav", stem))
}

/// Prefer utterances; fall back to resegmenting raw words
fn response_to_segments(results: ListenResults, limits: &SegmentLimits) -> Vec<TimedSegment> {
    if !results.utterances.is_empty() {
        return results
            .utterances
            .into_iter()
            .filter_map(|utt| {
                let text = utt.transcript.trim();
                (!text.is_empty()).then(|| {
                    TimedSegment::new(round_millis(utt.start), round_millis(utt.end), text)
                })
            })
            .collect();
    }

    let words: Vec<WordRecord> = results
        .channels
        .into_iter()
        .next()
        .and_then(|channel| channel.alternatives.into_iter().next())
        .map(|alternative| {
            alternative
                .words
                .into_iter()
                .map(|w| WordRecord::new(w.start, w.end, w.punctuated_word.unwrap_or(w.word)))
                .collect()
        })
        .unwrap_or_default();

    resegment(&words, limits)
}
