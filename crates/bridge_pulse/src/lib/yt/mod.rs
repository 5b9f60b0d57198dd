pub mod transcript;

use std::{fmt, future::Future, sync::LazyLock};

use itertools::Itertools;
use regex::Regex;

use crate::error::TranscriptError;

static WATCH_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[?&]v=([A-Za-z0-9_-]{11})(?:[&#]|$)").unwrap()
});

static SHORT_LINK_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?youtu\.be/([A-Za-z0-9_-]{11})(?:[?#/]|$)").unwrap()
});

pub trait TranscriptFetcher {
    /// Fetches the transcript of a single video. One call is one network attempt;
    /// retrying is left to the caller.
    fn fetch(
        &self,
        video_id: &VideoId,
    ) -> impl Future<Output = Result<Transcript, TranscriptError>>;
}

/// An 11 character YouTube video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Extracts the video identifier from a recording URL.
    ///
    /// Accepts `...watch?v=<id>` (other query parameters allowed) and `youtu.be/<id>`.
    /// Returns `None` when no well-formed identifier is present.
    pub fn from_locator(locator: &str) -> Option<Self> {
        let locator = locator.trim();

        WATCH_ID_RE
            .captures(locator)
            .or_else(|| SHORT_LINK_ID_RE.captures(locator))
            .and_then(|caps| caps.get(1))
            .map(|m| VideoId(m.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub text: String,
    /// Offset from the start of the video, in seconds
    pub start: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    pub fn new(segments: Vec<TranscriptSegment>) -> Self {
        Transcript { segments }
    }

    /// Segment texts joined with single spaces
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|s| s.text.trim().is_empty())
    }
}

impl From<&str> for Transcript {
    fn from(value: &str) -> Self {
        Transcript::new(vec![TranscriptSegment {
            text: value.to_string(),
            start: 0.0,
            duration: 0.0,
        }])
    }
}
