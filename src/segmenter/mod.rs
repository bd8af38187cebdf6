//! Greedy grouping of word-level timings into caption-sized segments.

use serde::{Deserialize, Serialize};

use crate::timecode::round_millis;
use crate::transcribe::{TimedSegment, WordRecord};

/// Marks that end a sentence, including full-width CJK forms
const SENTENCE_ENDINGS: &[char] = &['.', '?', '!', '。', '？', '！'];

/// Closing quotes and brackets that may trail a sentence ending
const TRAILING_CLOSERS: &[char] = &['"', '\'', ')', '>', ']', '”', '’', '」', '』'];

/// Bounds on a single segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentLimits {
    /// Close a segment once it holds this many words
    pub max_words: usize,

    /// Close a segment once it spans this many seconds
    #[serde(rename = "max_duration_secs")]
    pub max_duration: f64,
}

impl Default for SegmentLimits {
    fn default() -> Self {
        Self {
            max_words: 12,
            max_duration: 5.0,
        }
    }
}

/// Group words into segments in a single pass.
///
/// A segment closes after the word that reaches `max_words`, reaches
/// `max_duration` from the segment start, or ends a sentence. Leftover words
/// always form a final segment.
pub fn resegment(words: &[WordRecord], limits: &SegmentLimits) -> Vec<TimedSegment> {
    let mut segments = Vec::new();
    let mut pending = PendingSegment::default();

    for word in words {
        let token = word.token.trim();
        if token.is_empty() {
            continue;
        }

        pending.push(word.start, word.end, token);

        let too_many = pending.word_count >= limits.max_words;
        let too_long = pending.duration() >= limits.max_duration;
        if too_many || too_long || ends_sentence(token) {
            segments.extend(pending.take());
        }
    }

    segments.extend(pending.take());
    segments
}

/// Whether a token closes a sentence, ignoring trailing quotes and brackets
pub fn ends_sentence(token: &str) -> bool {
    token
        .trim_end_matches(TRAILING_CLOSERS)
        .ends_with(SENTENCE_ENDINGS)
}

#[derive(Debug, Default)]
struct PendingSegment {
    start: Option<f64>,
    end: f64,
    text: String,
    word_count: usize,
}

impl PendingSegment {
    fn push(&mut self, start: f64, end: f64, token: &str) {
        if self.start.is_none() {
            self.start = Some(start);
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(token);
        self.end = end;
        self.word_count += 1;
    }

    fn duration(&self) -> f64 {
        self.start.map(|start| self.end - start).unwrap_or(0.0)
    }

    fn take(&mut self) -> Option<TimedSegment> {
        let pending = std::mem::take(self);
        let start = pending.start?;
        Some(TimedSegment::new(
            round_millis(start),
            round_millis(pending.end),
            pending.text,
        ))
    }
}
