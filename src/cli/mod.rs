use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "transcript",
    about = "Transcript Resolver - Fetch time-aligned video transcripts from YouTube captions, subtitles or Deepgram",
    version,
    long_about = "Resolves a transcript for a video by trying YouTube's caption API first, then a yt-dlp subtitle download, then Deepgram speech recognition on a local audio or video file. Every source is normalized into the same JSON shape."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (defaults to ./config.yaml or the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a transcript for a video
    Fetch {
        /// YouTube URL or 11-character video ID
        #[arg(value_name = "URL_OR_ID", required_unless_present_any = ["subtitle_file", "audio_file", "video_path"])]
        video: Option<String>,

        /// Transcript language (defaults to the configured language)
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,

        /// Already downloaded subtitle file to parse
        #[arg(long, value_name = "FILE")]
        subtitle_file: Option<PathBuf>,

        /// Audio file to send straight to speech recognition
        #[arg(long, value_name = "FILE")]
        audio_file: Option<PathBuf>,

        /// Downloaded video to extract audio from when other sources fail
        #[arg(long, value_name = "FILE")]
        video_path: Option<PathBuf>,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Show or locate the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// Check for yt-dlp, ffmpeg and the Deepgram credential
    Doctor,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// JSON transcript record
    Json,
    /// Timestamped plain text
    Text,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Text => write!(f, "text"),
        }
    }
}
