//! Transcript Resolver - A Rust CLI tool for retrieving time-aligned video transcripts
//!
//! This library resolves a transcript for a video by trying, in order, YouTube's caption
//! API, a yt-dlp subtitle download and Deepgram speech recognition, and normalizes
//! whichever source answers first into one uniform transcript shape.

pub mod cli;
pub mod config;
pub mod media;
pub mod output;
pub mod segmenter;
pub mod sources;
pub mod subtitles;
pub mod timecode;
pub mod transcribe;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use sources::{SourceFailure, TranscriptRequest, TranscriptSource, VideoId};
pub use transcribe::fallback::{Attempt, AttemptOutcome, FallbackState};
pub use transcribe::{
    SourceKind, TimedSegment, TranscriptResult, TranscriptionPipeline, WordRecord,
};

/// Result type used throughout the application code
pub type Result<T> = anyhow::Result<T>;

/// Errors that escape a transcript resolution
#[derive(thiserror::Error, Debug)]
pub enum TranscriptError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),

    #[error("All transcript sources exhausted:{}", transcribe::fallback::format_attempts(.attempts))]
    AllSourcesExhausted { attempts: Vec<Attempt> },

    #[error("Transcript resolution cancelled")]
    Cancelled,
}
