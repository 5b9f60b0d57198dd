//! # Watch Page Parser
//!
//! This module extracts caption metadata from a YouTube watch page and turns the
//! timed-text payload of a caption track into transcript segments.

use std::{ops::Deref, sync::LazyLock};

use regex::{Captures, Regex};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use crate::{error::TranscriptError, yt::TranscriptSegment};

static YT_PLAYER_RESPONSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)ytInitialPlayerResponse\s*=\s*(\{.+?\})\s*;\s*(?:var\s|</script>)").unwrap()
});

static TIMED_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<text\s+start="([^"]*)"(?:\s+dur="([^"]*)")?[^>]*>(.*?)</text>"#).unwrap()
});

static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").unwrap());

/// A caption track advertised by the player response
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    /// `Some("asr")` for automatically generated captions
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// Reads the caption tracks out of the `ytInitialPlayerResponse` JSON.
///
/// # Returns
/// * `Ok(Vec<CaptionTrack>)` with at least one track.
/// * `Err(TranscriptError::Unavailable)` if the video is not playable or has no captions.
/// * `Err(TranscriptError::ParseError)` if the track list has an unexpected shape.
#[tracing::instrument(skip(player))]
pub fn parse_caption_tracks(player: &Value) -> Result<Vec<CaptionTrack>, TranscriptError> {
    let playability = &player["playabilityStatus"];
    if let Some(status) = playability["status"].as_str() {
        if status != "OK" {
            let reason = playability["reason"].as_str().unwrap_or(status);
            return Err(TranscriptError::Unavailable(format!(
                "video is not playable: {reason}"
            )));
        }
    }

    let tracks = player["captions"]["playerCaptionsTracklistRenderer"]["captionTracks"].clone();
    if tracks.is_null() {
        return Err(TranscriptError::Unavailable(
            "no captions are available for this video".into(),
        ));
    }

    let tracks = serde_json::from_value::<Vec<CaptionTrack>>(tracks).map_err(|_| {
        TranscriptError::ParseError(
            "Failed to read ['captions']['playerCaptionsTracklistRenderer']['captionTracks']",
        )
    })?;

    if tracks.is_empty() {
        return Err(TranscriptError::Unavailable(
            "no captions are available for this video".into(),
        ));
    }

    Ok(tracks)
}

/// Picks the track to transcribe from.
///
/// Manually created tracks in a preferred language win, then generated tracks in a
/// preferred language, then whatever track comes first.
pub fn select_caption_track<'a>(
    tracks: &'a [CaptionTrack],
    languages: &[String],
) -> Option<&'a CaptionTrack> {
    let in_language = move |generated: bool| {
        languages.iter().find_map(|lang| {
            tracks
                .iter()
                .find(|t| t.is_generated() == generated && t.language_code == *lang)
        })
    };

    in_language(false)
        .or_else(|| in_language(true))
        .or_else(|| tracks.first())
}

/// Parses a timed-text XML document into ordered segments, dropping blank ones.
pub fn parse_timed_text(xml: &str) -> Vec<TranscriptSegment> {
    TIMED_TEXT_RE
        .captures_iter(xml)
        .filter_map(|caps| {
            let start = caps[1].parse::<f64>().unwrap_or_default();
            let duration = caps
                .get(2)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .unwrap_or_default();
            // timedtext payloads escape entities twice
            let text = unescape_entities(&unescape_entities(&caps[3]));
            let text = text.trim();

            (!text.is_empty()).then(|| TranscriptSegment {
                text: text.to_string(),
                start,
                duration,
            })
        })
        .collect()
}

fn unescape_entities(raw: &str) -> String {
    let decoded = NUMERIC_ENTITY_RE.replace_all(raw, |caps: &Captures| {
        let code = &caps[1];
        let value = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        value
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    decoded
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

pub struct WatchPageDocument(String);

impl Deref for WatchPageDocument {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl WatchPageDocument {
    pub fn new(doc: String) -> Self {
        WatchPageDocument(doc)
    }

    /// Extracts and deserializes the `ytInitialPlayerResponse` script data
    pub fn to_json<T>(&self) -> Result<T, TranscriptError>
    where
        T: DeserializeOwned,
    {
        YT_PLAYER_RESPONSE_RE
            .captures(self)
            .and_then(|cap| cap.get(1))
            .and_then(|m| serde_json::from_str(m.as_str()).ok())
            .ok_or(TranscriptError::ParseError(
                "Failed to extract ytInitialPlayerResponse from the page's script tag",
            ))
    }
}

impl From<String> for WatchPageDocument {
    fn from(value: String) -> Self {
        WatchPageDocument(value)
    }
}
