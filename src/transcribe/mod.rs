use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::Config;
use crate::sources::deepgram::DeepgramSource;
use crate::sources::youtube_api::YoutubeApiSource;
use crate::sources::ytdlp::SubtitleTrackSource;
use crate::sources::{Availability, SourceFailure, TranscriptRequest, TranscriptSource};
use crate::timecode::round_millis;
use crate::TranscriptError;

pub mod fallback;

use fallback::{Attempt, AttemptOutcome, FallbackState};

/// Individual transcript segment with timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSegment {
    /// Start time in seconds
    pub start: f64,

    /// End time in seconds
    pub end: f64,

    /// Segment text, trimmed and never empty
    pub text: String,
}

impl TimedSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Word-level timing as reported by a recognizer
#[derive(Debug, Clone, PartialEq)]
pub struct WordRecord {
    pub start: f64,
    pub end: f64,
    pub token: String,
}

impl WordRecord {
    pub fn new(start: f64, end: f64, token: impl Into<String>) -> Self {
        Self {
            start,
            end,
            token: token.into(),
        }
    }
}

/// Where a transcript came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    StructuredApi,
    SubtitleTrack,
    SpeechRecognition,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::StructuredApi => "structured-api",
            SourceKind::SubtitleTrack => "subtitle-track",
            SourceKind::SpeechRecognition => "speech-recognition",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform transcript produced by every source.
///
/// Serializes as `{source, subtitles, subtitle_count, total_duration, language}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptResult {
    source: SourceKind,
    #[serde(rename = "subtitles")]
    segments: Vec<TimedSegment>,
    #[serde(rename = "subtitle_count")]
    segment_count: usize,
    total_duration: f64,
    language: String,
}

impl TranscriptResult {
    pub fn new(source: SourceKind, segments: Vec<TimedSegment>, language: impl Into<String>) -> Self {
        let total_duration = segments.last().map(|s| round_millis(s.end)).unwrap_or(0.0);
        Self {
            source,
            segment_count: segments.len(),
            segments,
            total_duration,
            language: language.into(),
        }
    }

    pub fn source(&self) -> SourceKind {
        self.source
    }

    pub fn segments(&self) -> &[TimedSegment] {
        &self.segments
    }

    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Main transcript pipeline: walks the fallback chain until a source answers
pub struct TranscriptionPipeline {
    structured: Box<dyn TranscriptSource>,
    subtitle_track: Box<dyn TranscriptSource>,
    speech: Box<dyn TranscriptSource>,
}

impl TranscriptionPipeline {
    /// Create a pipeline wired to the real YouTube, yt-dlp and Deepgram sources
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let api_key = crate::utils::lookup_api_key(&config.deepgram.api_key_env);

        Ok(Self::new(
            Box::new(YoutubeApiSource::new(&config.youtube_api)?),
            Box::new(SubtitleTrackSource::new(&config.subtitles)),
            Box::new(DeepgramSource::new(
                &config.deepgram,
                &config.media,
                &config.segmentation,
                api_key,
            )?),
        ))
    }

    pub fn new(
        structured: Box<dyn TranscriptSource>,
        subtitle_track: Box<dyn TranscriptSource>,
        speech: Box<dyn TranscriptSource>,
    ) -> Self {
        Self {
            structured,
            subtitle_track,
            speech,
        }
    }

    /// Resolve a transcript, trying each applicable source in order
    pub async fn resolve(
        &self,
        request: &TranscriptRequest,
    ) -> Result<TranscriptResult, TranscriptError> {
        let never = AtomicBool::new(false);
        self.resolve_with_cancel(request, &never).await
    }

    /// Like [`resolve`](Self::resolve), but stops before the next attempt once `cancel` is set
    pub async fn resolve_with_cancel(
        &self,
        request: &TranscriptRequest,
        cancel: &AtomicBool,
    ) -> Result<TranscriptResult, TranscriptError> {
        if !request.has_any_input() {
            return Err(TranscriptError::InvalidInput(
                "no video identifier, subtitle file, audio file or video file provided".to_string(),
            ));
        }

        let span = tracing::info_span!("resolve", id = %Uuid::new_v4());
        self.run_chain(request, cancel).instrument(span).await
    }

    async fn run_chain(
        &self,
        request: &TranscriptRequest,
        cancel: &AtomicBool,
    ) -> Result<TranscriptResult, TranscriptError> {
        let mut attempts = Vec::new();
        let mut resolved = None;
        let mut state = FallbackState::START;

        while let Some(kind) = state.source_kind() {
            if cancel.load(Ordering::SeqCst) {
                tracing::info!("Resolution cancelled before {}", kind);
                return Err(TranscriptError::Cancelled);
            }

            match self.attempt(state, kind, request).await {
                Ok(result) => {
                    tracing::info!(
                        "Resolved transcript from {}: {} segments",
                        kind,
                        result.segment_count()
                    );
                    resolved = Some(result);
                    state = state.on_result();
                }
                Err(outcome) => {
                    attempts.push(Attempt::new(kind, outcome));
                    state = state.on_no_result();
                }
            }
        }

        match (state, resolved) {
            (FallbackState::Resolved, Some(result)) => Ok(result),
            _ => {
                tracing::warn!("All transcript sources exhausted");
                Err(TranscriptError::AllSourcesExhausted { attempts })
            }
        }
    }

    async fn attempt(
        &self,
        state: FallbackState,
        kind: SourceKind,
        request: &TranscriptRequest,
    ) -> Result<TranscriptResult, AttemptOutcome> {
        if let Some(missing) = state.unmet_precondition(request) {
            tracing::debug!("Skipping {}: {}", kind, missing);
            return Err(AttemptOutcome::Skipped(missing.to_string()));
        }

        let source = self.source_for(kind);
        if let Availability::Unavailable(reason) = source.availability(request).await {
            tracing::warn!("Skipping {}: {}", kind, reason);
            return Err(AttemptOutcome::Unavailable(reason));
        }

        tracing::info!("Trying {}", kind);
        match source.resolve(request).await {
            Ok(result) if !result.is_empty() => Ok(result),
            Ok(_) => {
                tracing::warn!("{} returned no segments", kind);
                Err(AttemptOutcome::NoResult("no segments".to_string()))
            }
            Err(SourceFailure::Unavailable(reason)) => {
                tracing::warn!("{} unavailable: {}", kind, reason);
                Err(AttemptOutcome::Unavailable(reason))
            }
            Err(SourceFailure::NoResult(reason)) => {
                tracing::warn!("{} produced no result: {}", kind, reason);
                Err(AttemptOutcome::NoResult(reason))
            }
        }
    }

    fn source_for(&self, kind: SourceKind) -> &dyn TranscriptSource {
        match kind {
            SourceKind::StructuredApi => self.structured.as_ref(),
            SourceKind::SubtitleTrack => self.subtitle_track.as_ref(),
            SourceKind::SpeechRecognition => self.speech.as_ref(),
        }
    }
}
