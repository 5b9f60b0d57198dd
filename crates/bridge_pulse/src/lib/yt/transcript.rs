use serde_json::Value;

use crate::{
    error::TranscriptError,
    parser::{parse_caption_tracks, parse_timed_text, select_caption_track, CaptionTrack, WatchPageDocument},
    yt::{Transcript, TranscriptFetcher, VideoId},
};

/// Fetches captions straight from the public watch page
#[derive(Debug, Clone)]
pub struct YtTranscriptClient {
    client: reqwest::Client,
    languages: Vec<String>,
}

impl Default for YtTranscriptClient {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl YtTranscriptClient {
    const WATCH_URL: &str = "https://www.youtube.com/watch";

    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            languages: vec!["en".to_string()],
        }
    }

    /// Preferred caption languages, most preferred first
    pub fn with_languages(mut self, languages: Vec<String>) -> Self {
        self.languages = languages;
        self
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_watch_page(&self, video_id: &VideoId) -> Result<WatchPageDocument, TranscriptError> {
        let html = self
            .client
            .get(Self::WATCH_URL)
            .query(&[("v", video_id.as_str())])
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to load watch page"))?
            .error_for_status()?
            .text()
            .await?;

        Ok(html.into())
    }

    #[tracing::instrument(skip_all, fields(language = %track.language_code))]
    async fn fetch_timed_text(&self, track: &CaptionTrack) -> Result<String, TranscriptError> {
        // srv3 carries word-level markup we do not parse
        let url = track.base_url.replace("&fmt=srv3", "");

        let xml = self
            .client
            .get(url)
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to load timed text"))?
            .error_for_status()?
            .text()
            .await?;

        Ok(xml)
    }
}

impl TranscriptFetcher for YtTranscriptClient {
    async fn fetch(&self, video_id: &VideoId) -> Result<Transcript, TranscriptError> {
        let doc = self.fetch_watch_page(video_id).await?;
        let player = doc.to_json::<Value>()?;
        let tracks = parse_caption_tracks(&player)?;

        let track = select_caption_track(&tracks, &self.languages).ok_or_else(|| {
            TranscriptError::Unavailable("no caption track could be selected".into())
        })?;

        let xml = self.fetch_timed_text(track).await?;
        let transcript = Transcript::new(parse_timed_text(&xml));

        if transcript.is_empty() {
            return Err(TranscriptError::Unavailable(format!(
                "caption track '{}' is empty",
                track.language_code
            )));
        }

        tracing::debug!(
            video_id = %video_id,
            segments = transcript.segments.len(),
            "Fetched transcript"
        );
        Ok(transcript)
    }
}
