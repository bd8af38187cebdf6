use std::fmt;

use super::SourceKind;
use crate::sources::TranscriptRequest;

/// States of the fallback chain.
///
/// `Structured -> SubtitleTrack -> SpeechRecognition -> Exhausted`, with any
/// source state jumping to `Resolved` as soon as its source produces a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackState {
    Structured,
    SubtitleTrack,
    SpeechRecognition,
    Resolved,
    Exhausted,
}

impl FallbackState {
    pub const START: FallbackState = FallbackState::Structured;

    /// Source tried in this state, `None` for terminal states
    pub fn source_kind(&self) -> Option<SourceKind> {
        match self {
            FallbackState::Structured => Some(SourceKind::StructuredApi),
            FallbackState::SubtitleTrack => Some(SourceKind::SubtitleTrack),
            FallbackState::SpeechRecognition => Some(SourceKind::SpeechRecognition),
            FallbackState::Resolved | FallbackState::Exhausted => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.source_kind().is_none()
    }

    pub fn on_result(self) -> FallbackState {
        if self.is_terminal() {
            self
        } else {
            FallbackState::Resolved
        }
    }

    pub fn on_no_result(self) -> FallbackState {
        match self {
            FallbackState::Structured => FallbackState::SubtitleTrack,
            FallbackState::SubtitleTrack => FallbackState::SpeechRecognition,
            FallbackState::SpeechRecognition => FallbackState::Exhausted,
            terminal => terminal,
        }
    }

    /// Input this state needs but the request lacks
    pub fn unmet_precondition(&self, request: &TranscriptRequest) -> Option<&'static str> {
        match self {
            FallbackState::Structured if request.video_id.is_none() => Some("no video identifier"),
            FallbackState::SubtitleTrack
                if request.subtitle_file.is_none() && request.video_id.is_none() =>
            {
                Some("no subtitle file or video identifier")
            }
            FallbackState::SpeechRecognition
                if request.audio_file.is_none() && request.existing_video_path().is_none() =>
            {
                Some("no audio or video file")
            }
            _ => None,
        }
    }
}

/// Why a source did not produce a transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The request lacked the inputs this source needs
    Skipped(String),
    /// Missing credential or tool
    Unavailable(String),
    /// The source ran but produced nothing usable
    NoResult(String),
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Skipped(reason) => write!(f, "skipped ({})", reason),
            AttemptOutcome::Unavailable(reason) => write!(f, "unavailable ({})", reason),
            AttemptOutcome::NoResult(reason) => write!(f, "no result ({})", reason),
        }
    }
}

/// Diagnostic record for one step of the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub source: SourceKind,
    pub outcome: AttemptOutcome,
}

impl Attempt {
    pub fn new(source: SourceKind, outcome: AttemptOutcome) -> Self {
        Self { source, outcome }
    }
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.outcome)
    }
}

pub(crate) fn format_attempts(attempts: &[Attempt]) -> String {
    attempts
        .iter()
        .map(|attempt| format!("\n  • {}", attempt))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::VideoId;
    use std::path::PathBuf;

    #[test]
    fn test_transition_order() {
        let mut state = FallbackState::START;
        let mut visited = Vec::new();
        while let Some(kind) = state.source_kind() {
            visited.push(kind);
            state = state.on_no_result();
        }

        assert_eq!(
            visited,
            vec![
                SourceKind::StructuredApi,
                SourceKind::SubtitleTrack,
                SourceKind::SpeechRecognition
            ]
        );
        assert_eq!(state, FallbackState::Exhausted);
    }

    #[test]
    fn test_success_is_terminal() {
        assert_eq!(
            FallbackState::SubtitleTrack.on_result(),
            FallbackState::Resolved
        );
        assert_eq!(FallbackState::Resolved.on_no_result(), FallbackState::Resolved);
        assert_eq!(FallbackState::Exhausted.on_result(), FallbackState::Exhausted);
    }

    #[test]
    fn test_preconditions() {
        let id_only =
            TranscriptRequest::new("en").with_video_id(VideoId::parse("dQw4w9WgXcQ").unwrap());
        assert_eq!(FallbackState::Structured.unmet_precondition(&id_only), None);
        assert_eq!(FallbackState::SubtitleTrack.unmet_precondition(&id_only), None);
        assert!(FallbackState::SpeechRecognition
            .unmet_precondition(&id_only)
            .is_some());

        let file_only =
            TranscriptRequest::new("en").with_subtitle_file(PathBuf::from("talk.en.vtt"));
        assert!(FallbackState::Structured.unmet_precondition(&file_only).is_some());
        assert_eq!(FallbackState::SubtitleTrack.unmet_precondition(&file_only), None);

        let missing_video = TranscriptRequest::new("en")
            .with_video_path(PathBuf::from("/definitely/not/here.mp4"));
        assert!(FallbackState::SpeechRecognition
            .unmet_precondition(&missing_video)
            .is_some());
    }

    #[test]
    fn test_attempt_display() {
        let attempt = Attempt::new(
            SourceKind::SpeechRecognition,
            AttemptOutcome::Unavailable("no credential".to_string()),
        );
        assert_eq!(
            attempt.to_string(),
            "speech-recognition: unavailable (no credential)"
        );
    }
}
