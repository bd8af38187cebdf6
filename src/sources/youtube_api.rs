use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{Availability, SourceFailure, TranscriptRequest, TranscriptSource, VideoId};
use crate::config::YoutubeApiConfig;
use crate::timecode::round_millis;
use crate::transcribe::{SourceKind, TimedSegment, TranscriptResult};

const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

/// One caption cue as served by the caption API
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub start: f64,
    pub duration: f64,
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct PlayerResponse {
    #[serde(rename = "playabilityStatus")]
    playability_status: Option<PlayabilityStatus>,
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Captions {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    tracklist: Option<Tracklist>,
}

#[derive(Debug, Deserialize)]
struct Tracklist {
    #[serde(rename = "captionTracks", default)]
    caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Clone, Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
    /// `asr` for auto-generated tracks
    kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

#[derive(Debug, Deserialize)]
struct TimedTextJson {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Debug, Deserialize)]
struct TimedTextEvent {
    #[serde(rename = "tStartMs", default)]
    start_ms: f64,
    #[serde(rename = "dDurationMs", default)]
    duration_ms: f64,
    #[serde(default)]
    segs: Vec<TimedTextSeg>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSeg {
    #[serde(default)]
    utf8: String,
}

/// Transcript source backed by YouTube's caption API
pub struct YoutubeApiSource {
    client: Client,
    base_url: String,
}

impl YoutubeApiSource {
    pub fn new(config: &YoutubeApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_transcript(&self, video_id: &VideoId, language: &str) -> Result<Vec<Cue>> {
        let tracks = self.fetch_caption_tracks(video_id).await?;
        let track = select_track(&tracks, language).with_context(|| {
            let available: Vec<&str> = tracks.iter().map(|t| t.language_code.as_str()).collect();
            format!(
                "No transcript in language {} (available: {})",
                language,
                if available.is_empty() {
                    "none".to_string()
                } else {
                    available.join(", ")
                }
            )
        })?;

        tracing::debug!(
            "Using caption track {} (generated: {})",
            track.language_code,
            track.is_generated()
        );
        self.fetch_cues(track).await
    }

    async fn fetch_caption_tracks(&self, video_id: &VideoId) -> Result<Vec<CaptionTrack>> {
        let url = format!("{}/youtubei/v1/player?prettyPrint=false", self.base_url);
        let body = json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION,
                }
            },
            "videoId": video_id.as_str(),
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to query video player endpoint")?;

        if !response.status().is_success() {
            anyhow::bail!("Player endpoint returned HTTP {}", response.status());
        }

        let player: PlayerResponse = response
            .json()
            .await
            .context("Failed to parse player response")?;

        if let Some(status) = &player.playability_status {
            if status.status.as_deref().is_some_and(|s| s != "OK") {
                anyhow::bail!(
                    "Video is not playable: {}",
                    status.reason.as_deref().unwrap_or("unknown reason")
                );
            }
        }

        let tracks = player
            .captions
            .and_then(|c| c.tracklist)
            .map(|t| t.caption_tracks)
            .unwrap_or_default();

        if tracks.is_empty() {
            anyhow::bail!("Transcripts are disabled for this video");
        }

        Ok(tracks)
    }

    async fn fetch_cues(&self, track: &CaptionTrack) -> Result<Vec<Cue>> {
        let mut url = Url::parse(&self.base_url)
            .and_then(|base| base.join(&track.base_url))
            .context("Invalid caption track URL")?;

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != "fmt")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(pairs)
            .append_pair("fmt", "json3");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to download caption track")?;

        if !response.status().is_success() {
            anyhow::bail!("Caption track returned HTTP {}", response.status());
        }

        let timed_text: TimedTextJson = response
            .json()
            .await
            .context("Failed to parse caption track")?;

        Ok(events_to_cues(timed_text.events))
    }
}

#[async_trait]
impl TranscriptSource for YoutubeApiSource {
    async fn availability(&self, _request: &TranscriptRequest) -> Availability {
        Availability::Ready
    }

    async fn resolve(&self, request: &TranscriptRequest) -> Result<TranscriptResult, SourceFailure> {
        let video_id = request
            .video_id
            .as_ref()
            .ok_or_else(|| SourceFailure::NoResult("no video identifier".to_string()))?;

        let cues = self
            .fetch_transcript(video_id, &request.language)
            .await
            .map_err(|e| SourceFailure::from_error(&e, None))?;

        let segments = cues_to_segments(&cues);
        if segments.is_empty() {
            return Err(SourceFailure::NoResult("caption track is empty".to_string()));
        }

        Ok(TranscriptResult::new(
            SourceKind::StructuredApi,
            segments,
            request.language.clone(),
        ))
    }
}

/// Pick the caption track for `language`.
///
/// Exact tags win over primary-subtag matches, and manual tracks win over
/// auto-generated ones at the same level.
fn select_track<'a>(tracks: &'a [CaptionTrack], language: &str) -> Option<&'a CaptionTrack> {
    let wanted = language.to_lowercase();
    let primary = |tag: &str| tag.split(['-', '_']).next().unwrap_or("").to_lowercase();

    let exact = |t: &&CaptionTrack| t.language_code.to_lowercase() == wanted;
    let loose = |t: &&CaptionTrack| primary(&t.language_code) == primary(&wanted);

    tracks
        .iter()
        .filter(exact)
        .find(|t| !t.is_generated())
        .or_else(|| tracks.iter().find(exact))
        .or_else(|| tracks.iter().filter(loose).find(|t| !t.is_generated()))
        .or_else(|| tracks.iter().find(loose))
}

fn events_to_cues(events: Vec<TimedTextEvent>) -> Vec<Cue> {
    events
        .into_iter()
        .filter(|event| !event.segs.is_empty())
        .map(|event| {
            let text: String = event.segs.iter().map(|seg| seg.utf8.as_str()).collect();
            Cue {
                start: event.start_ms / 1000.0,
                duration: event.duration_ms / 1000.0,
                text: text.replace('\n', " "),
            }
        })
        .collect()
}

/// Map caption cues onto segments, dropping cues without text
pub fn cues_to_segments(cues: &[Cue]) -> Vec<TimedSegment> {
    cues.iter()
        .filter_map(|cue| {
            let text = cue.text.trim();
            if text.is_empty() {
                return None;
            }
            Some(TimedSegment::new(
                round_millis(cue.start),
                round_millis(cue.start + cue.duration),
                text,
            ))
        })
        .collect()
}
