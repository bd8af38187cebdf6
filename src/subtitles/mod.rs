//! WebVTT-style timed-text parsing.
//!
//! Only the cue timing line and its text lines matter here. Header blocks,
//! cue identifiers, NOTE and STYLE blocks are skipped because they never
//! follow a timing line.

use regex::Regex;
use std::sync::OnceLock;

use crate::timecode::{parse_timestamp, round_millis};
use crate::transcribe::TimedSegment;

fn timing_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(\d{1,2}(?::\d{2}){1,2}\.\d{1,3})\s*-->\s*(\d{1,2}(?::\d{2}){1,2}\.\d{1,3})",
        )
        .expect("timing pattern is valid")
    })
}

fn markup_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]+>").expect("markup pattern is valid"))
}

/// Parse a timed-text body into segments.
///
/// A cue is kept when its text is non-empty and differs from the cue parsed
/// just before it. An empty cue in between breaks a duplicate run.
/// Unparsable or backwards timing lines are skipped, as is any cue starting
/// before the last emitted one, so output starts never decrease.
pub fn parse_vtt(content: &str) -> Vec<TimedSegment> {
    let lines: Vec<&str> = content.lines().map(str::trim).collect();
    let mut segments: Vec<TimedSegment> = Vec::new();
    let mut previous_cue = String::new();
    let mut i = 0;

    while i < lines.len() {
        let Some((start, end)) = parse_timing_line(lines[i]) else {
            i += 1;
            continue;
        };
        i += 1;

        let mut text_lines = Vec::new();
        while i < lines.len() && !lines[i].is_empty() && !is_timing_line(lines[i]) {
            let stripped = strip_markup(lines[i]);
            let stripped = stripped.trim();
            if !stripped.is_empty() {
                text_lines.push(stripped.to_string());
            }
            i += 1;
        }

        let text = text_lines.join(" ").trim().to_string();
        if text.is_empty() {
            previous_cue.clear();
            continue;
        }
        if text == previous_cue {
            tracing::trace!("Dropping adjacent duplicate cue at {:.3}s", start);
            continue;
        }
        if segments.last().is_some_and(|last| round_millis(start) < last.start) {
            tracing::debug!("Skipping out-of-order cue at {:.3}s", start);
            continue;
        }

        previous_cue.clone_from(&text);
        segments.push(TimedSegment::new(round_millis(start), round_millis(end), text));
    }

    segments
}

/// Remove inline markup such as `<b>`, `<c.colorE5E5E5>` or `<00:00:01.000>`
pub fn strip_markup(line: &str) -> String {
    markup_pattern().replace_all(line, "").into_owned()
}

fn is_timing_line(line: &str) -> bool {
    timing_pattern().is_match(line)
}

fn parse_timing_line(line: &str) -> Option<(f64, f64)> {
    let captures = timing_pattern().captures(line)?;
    let start = parse_timestamp(&captures[1]).ok()?;
    let end = parse_timestamp(&captures[2]).ok()?;
    (end >= start).then_some((start, end))
}
