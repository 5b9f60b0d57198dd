pub mod builder;

use std::{
    any::Any, collections::HashMap, fmt, panic::AssertUnwindSafe, path::PathBuf, time::Duration,
};

use bridge_datastore::{TaskSource, WorkItem};
use futures::FutureExt;
use itertools::Itertools;

use crate::{
    clock::Clock,
    docs::{PublishedDocument, Publisher},
    error::{Error, GenerationError, TranscriptError},
    llm::prompt::PromptTemplate,
    retry::RetryPolicy,
    yt::{Transcript, TranscriptFetcher, VideoId},
    Summarizer,
};

pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_PACING_INTERVAL: Duration = Duration::from_secs(30);

/// Per-item pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStage {
    Fetching,
    Summarizing,
    Publishing,
    WritingBack,
}

impl fmt::Display for ItemStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemStage::Fetching => "fetching",
            ItemStage::Summarizing => "summarizing",
            ItemStage::Publishing => "publishing",
            ItemStage::WritingBack => "writing_back",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Published and linked back to the source record
    Processed { url: String },
    /// A stage failed before anything was published
    Skipped { stage: ItemStage, reason: String },
    /// Published, but the link could not be written back
    Unrecorded { url: String },
    /// Published earlier by this process without a recorded link; not republished
    AlreadyPublished { url: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub listed: usize,
    pub processed: usize,
    pub skipped: usize,
    pub unrecorded: usize,
}

impl CycleReport {
    fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Processed { .. } => self.processed += 1,
            ItemOutcome::Skipped { .. } | ItemOutcome::AlreadyPublished { .. } => self.skipped += 1,
            ItemOutcome::Unrecorded { .. } => self.unrecorded += 1,
        }
    }
}

/// Drives ready work items through fetch, summarize, publish and write-back.
///
/// A cycle goes `Idle -> Listing -> (Fetching -> Summarizing -> Publishing -> WritingBack)* -> Idle`.
/// Items are handled one at a time. A failing stage skips its item; only an
/// authorization failure aborts the cycle. Every sleep goes through the clock.
#[derive(Debug)]
pub struct BridgeProcessor<D, T, S, P, C>
where
    D: TaskSource,
    T: TranscriptFetcher,
    S: Summarizer,
    P: Publisher,
    C: Clock,
{
    source: D,
    fetcher: T,
    summarizer: S,
    publisher: P,
    clock: C,
    prompt_path: PathBuf,
    idle_interval: Duration,
    pacing_interval: Duration,
    fetch_retry: RetryPolicy,
    /// item id -> URL of documents published without a recorded link
    unrecorded: HashMap<String, String>,
    /// Stage of the item in flight, reported when processing panics
    stage: ItemStage,
}

impl<D, T, S, P, C> BridgeProcessor<D, T, S, P, C>
where
    D: TaskSource,
    T: TranscriptFetcher,
    S: Summarizer,
    P: Publisher,
    C: Clock,
{
    /// Lists ready items. Listing failures are treated as an empty queue.
    ///
    /// Unrecorded entries whose items are no longer listed are forgotten, so a
    /// record reconciled by hand and queued again is processed afresh.
    #[tracing::instrument(skip(self))]
    async fn list_items(&mut self) -> Vec<WorkItem> {
        let items = match self.source.list_ready().await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = ?e, "Failed to list ready items, treating queue as empty");
                return Vec::new();
            }
        };

        let items = items
            .into_iter()
            .filter(|item| {
                if !item.is_pending() {
                    tracing::debug!(item_id = %item.id, status = %item.status, "Ignoring item that is not pending");
                }
                item.is_pending()
            })
            .unique_by(|item| item.id.clone())
            .collect::<Vec<_>>();

        self.unrecorded.retain(|id, url| {
            let listed = items.iter().any(|item| item.id == *id);
            if !listed {
                tracing::info!(item_id = %id, %url, "Forgetting unrecorded item that left the queue");
            }
            listed
        });

        items
    }

    /// Malformed locators fail without a network attempt; everything else is retried
    #[tracing::instrument(skip_all, fields(item_id = %item.id))]
    async fn fetch_transcript(&self, item: &WorkItem) -> Result<Transcript, Error> {
        let video_id = VideoId::from_locator(&item.recording_url)
            .ok_or_else(|| TranscriptError::MalformedLocator(item.recording_url.clone()))?;

        let transcript = self
            .fetch_retry
            .run(&self.clock, |attempt| {
                tracing::debug!(attempt, %video_id, "Fetching transcript");
                self.fetcher.fetch(&video_id)
            })
            .await?;

        Ok(transcript)
    }

    #[tracing::instrument(skip_all, fields(item_id = %item.id))]
    async fn summarize(&self, item: &WorkItem, transcript: &Transcript) -> Result<String, Error> {
        let template = PromptTemplate::load(&self.prompt_path)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to load prompt template"))?;
        let prompt = template.render(&transcript.text());

        // ~4 characters per token
        let estimated_tokens = prompt.len() / 4;
        if estimated_tokens > S::CONTEXT_WINDOW_LIMIT {
            tracing::warn!(
                estimated_tokens,
                limit = S::CONTEXT_WINDOW_LIMIT,
                "Prompt likely exceeds the model context window"
            );
        }

        let response = self
            .summarizer
            .summarize(&prompt)
            .await
            .map_err(|e| GenerationError::Backend(e.to_string()))?;

        let summary = response.summary.trim();
        if summary.is_empty() {
            return Err(GenerationError::Backend("empty summary".into()).into());
        }

        Ok(summary.to_string())
    }

    #[tracing::instrument(skip_all, fields(item_id = %item.id))]
    async fn publish(&self, item: &WorkItem, summary: &str) -> Result<PublishedDocument, Error> {
        let document = self.publisher.publish(&item.title, summary).await?;
        tracing::info!(url = %document.url, "Published summary");
        Ok(document)
    }

    #[tracing::instrument(skip_all, fields(item_id = %item.id))]
    async fn write_back(&self, item: &WorkItem, document: &PublishedDocument) -> Result<(), Error> {
        self.source.mark_processed(item, &document.url).await?;
        Ok(())
    }

    fn skip(&self, item: &WorkItem, stage: ItemStage, error: Error) -> Result<ItemOutcome, Error> {
        if error.is_fatal() {
            tracing::error!(item_id = %item.id, %stage, error = %error, "Fatal pipeline error");
            return Err(error);
        }

        tracing::warn!(
            item_id = %item.id,
            %stage,
            kind = ?error.kind(),
            error = %error,
            "Skipping item"
        );
        Ok(ItemOutcome::Skipped {
            stage,
            reason: error.to_string(),
        })
    }

    /// Runs every stage for one item. Only fatal errors are returned as `Err`.
    pub async fn process_item(&mut self, item: &WorkItem) -> Result<ItemOutcome, Error> {
        if let Some(url) = self.unrecorded.get(&item.id) {
            tracing::warn!(
                item_id = %item.id,
                %url,
                "Item was already published without a recorded link, not republishing"
            );
            return Ok(ItemOutcome::AlreadyPublished { url: url.clone() });
        }

        self.stage = ItemStage::Fetching;
        let transcript = match self.fetch_transcript(item).await {
            Ok(transcript) => transcript,
            Err(e) => return self.skip(item, ItemStage::Fetching, e),
        };

        self.stage = ItemStage::Summarizing;
        let summary = match self.summarize(item, &transcript).await {
            Ok(summary) => summary,
            Err(e) => return self.skip(item, ItemStage::Summarizing, e),
        };

        self.stage = ItemStage::Publishing;
        let document = match self.publish(item, &summary).await {
            Ok(document) => document,
            Err(e) => return self.skip(item, ItemStage::Publishing, e),
        };

        self.stage = ItemStage::WritingBack;
        match self.write_back(item, &document).await {
            Ok(()) => Ok(ItemOutcome::Processed { url: document.url }),
            Err(e) => {
                tracing::error!(
                    item_id = %item.id,
                    url = %document.url,
                    error = %e,
                    "Published document could not be linked back to its record"
                );
                self.unrecorded.insert(item.id.clone(), document.url.clone());
                Ok(ItemOutcome::Unrecorded { url: document.url })
            }
        }
    }

    /// Runs `process_item`, turning a panic into a skip of that item
    async fn process_item_isolated(&mut self, item: &WorkItem) -> Result<ItemOutcome, Error> {
        let result = AssertUnwindSafe(self.process_item(item)).catch_unwind().await;
        match result {
            Ok(outcome) => outcome,
            Err(payload) => {
                let reason = format!("panicked: {}", panic_message(payload.as_ref()));
                tracing::error!(item_id = %item.id, stage = %self.stage, %reason, "Item processing panicked");
                Ok(ItemOutcome::Skipped {
                    stage: self.stage,
                    reason,
                })
            }
        }
    }

    async fn cycle(&mut self, trailing_sleeps: bool) -> Result<CycleReport, Error> {
        let items = self.list_items().await;
        let mut report = CycleReport {
            listed: items.len(),
            ..Default::default()
        };

        if items.is_empty() {
            tracing::info!(
                idle_secs = self.idle_interval.as_secs(),
                "No items to process at this time"
            );
            if trailing_sleeps {
                self.clock.sleep(self.idle_interval).await;
            }
            return Ok(report);
        }

        tracing::info!(count = items.len(), "Processing ready items");
        for (position, item) in items.iter().enumerate() {
            let outcome = self.process_item_isolated(item).await?;
            report.record(&outcome);

            if trailing_sleeps || position + 1 < items.len() {
                self.clock.sleep(self.pacing_interval).await;
            }
        }

        tracing::info!(
            listed = report.listed,
            processed = report.processed,
            skipped = report.skipped,
            unrecorded = report.unrecorded,
            "Cycle complete"
        );
        Ok(report)
    }

    /// Runs a single polling cycle, including its trailing idle or pacing sleeps
    #[tracing::instrument(skip(self))]
    pub async fn run_cycle(&mut self) -> Result<CycleReport, Error> {
        self.cycle(true).await
    }

    /// Runs a single cycle for one-shot use: items are still paced against each
    /// other, but nothing is slept after the last one or on an empty queue.
    #[tracing::instrument(skip(self))]
    pub async fn run_once(&mut self) -> Result<CycleReport, Error> {
        self.cycle(false).await
    }

    /// Polls forever. Returns only on a fatal error.
    pub async fn run(mut self) -> Result<(), Error> {
        loop {
            self.run_cycle().await?;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|msg| msg.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_reads_str_and_string_payloads() {
        let literal: Box<dyn Any + Send> = Box::new("index out of bounds");
        let formatted: Box<dyn Any + Send> = Box::new(format!("bad item {}", 7));
        let opaque: Box<dyn Any + Send> = Box::new(42_u8);

        assert_eq!(panic_message(literal.as_ref()), "index out of bounds");
        assert_eq!(panic_message(formatted.as_ref()), "bad item 7");
        assert_eq!(panic_message(opaque.as_ref()), "unknown panic payload");
    }
}
