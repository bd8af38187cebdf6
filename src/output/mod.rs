use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::OutputFormat;
use crate::timecode::{format_timestamp, FractionSeparator};
use crate::transcribe::TranscriptResult;

/// Render a transcript in the requested format
pub fn render(result: &TranscriptResult, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => format_as_json(result),
        OutputFormat::Text => format_as_text(result),
    }
}

/// Pretty-printed JSON in the `{source, subtitles, subtitle_count, total_duration, language}` shape
pub fn format_as_json(result: &TranscriptResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("Failed to serialize transcript")
}

/// One `[start --> end] text` line per segment
pub fn format_as_text(result: &TranscriptResult) -> Result<String> {
    let mut lines = Vec::with_capacity(result.segment_count());
    for segment in result.segments() {
        lines.push(format!(
            "[{} --> {}] {}",
            format_timestamp(segment.start, true, FractionSeparator::Dot)?,
            format_timestamp(segment.end, true, FractionSeparator::Dot)?,
            segment.text
        ));
    }
    Ok(lines.join("\n"))
}

/// Save transcript to file
pub async fn save_to_file(result: &TranscriptResult, path: &Path, format: &OutputFormat) -> Result<()> {
    let content = render(result, format)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs_err::create_dir_all(parent)?;
    }
    fs_err::write(path, content)?;
    Ok(())
}

/// Print transcript to console
pub fn print_to_console(result: &TranscriptResult, format: &OutputFormat) -> Result<()> {
    let content = render(result, format)?;
    println!("{}", content);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcribe::{SourceKind, TimedSegment};

    fn sample() -> TranscriptResult {
        TranscriptResult::new(
            SourceKind::SpeechRecognition,
            vec![
                TimedSegment::new(1.0, 3.0, "Hello"),
                TimedSegment::new(3725.5, 3727.25, "World"),
            ],
            "en",
        )
    }

    #[test]
    fn test_text_output() {
        let text = format_as_text(&sample()).unwrap();
        assert_eq!(
            text,
            "[00:00:01.000 --> 00:00:03.000] Hello\n[01:02:05.500 --> 01:02:07.250] World"
        );
    }

    #[test]
    fn test_json_output_shape() {
        let json: serde_json::Value =
            serde_json::from_str(&format_as_json(&sample()).unwrap()).unwrap();

        assert_eq!(json["source"], "speech-recognition");
        assert_eq!(json["subtitle_count"], 2);
        assert_eq!(json["total_duration"], 3727.25);
        assert_eq!(json["subtitles"][0]["end"], 3.0);
        assert_eq!(json.as_object().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("transcript.json");

        save_to_file(&sample(), &path, &OutputFormat::Json).await.unwrap();

        let saved: TranscriptResult =
            serde_json::from_str(&fs_err::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved, sample());
    }
}
