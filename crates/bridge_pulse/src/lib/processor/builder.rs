use std::{path::PathBuf, time::Duration};

use bridge_datastore::TaskSource;

use crate::{
    clock::{Clock, TokioClock},
    docs::Publisher,
    processor::{DEFAULT_IDLE_INTERVAL, DEFAULT_PACING_INTERVAL},
    retry::RetryPolicy,
    yt::TranscriptFetcher,
    BridgeProcessor, ItemStage, Summarizer,
};

pub struct BridgeProcessorBuilder<D = (), T = (), S = (), P = (), C = TokioClock> {
    prompt_path: PathBuf,
    source: D,
    fetcher: T,
    summarizer: S,
    publisher: P,
    clock: C,
    idle_interval: Duration,
    pacing_interval: Duration,
    fetch_retry: RetryPolicy,
}

impl BridgeProcessorBuilder {
    pub fn new(prompt_path: impl Into<PathBuf>) -> Self {
        Self {
            prompt_path: prompt_path.into(),
            source: (),
            fetcher: (),
            summarizer: (),
            publisher: (),
            clock: TokioClock,
            idle_interval: DEFAULT_IDLE_INTERVAL,
            pacing_interval: DEFAULT_PACING_INTERVAL,
            fetch_retry: RetryPolicy::default(),
        }
    }
}

impl<D, T, S, P, C> BridgeProcessorBuilder<D, T, S, P, C> {
    pub fn source<D2: TaskSource>(self, source: D2) -> BridgeProcessorBuilder<D2, T, S, P, C> {
        BridgeProcessorBuilder {
            prompt_path: self.prompt_path,
            source,
            fetcher: self.fetcher,
            summarizer: self.summarizer,
            publisher: self.publisher,
            clock: self.clock,
            idle_interval: self.idle_interval,
            pacing_interval: self.pacing_interval,
            fetch_retry: self.fetch_retry,
        }
    }

    pub fn fetcher<T2: TranscriptFetcher>(self, fetcher: T2) -> BridgeProcessorBuilder<D, T2, S, P, C> {
        BridgeProcessorBuilder {
            prompt_path: self.prompt_path,
            source: self.source,
            fetcher,
            summarizer: self.summarizer,
            publisher: self.publisher,
            clock: self.clock,
            idle_interval: self.idle_interval,
            pacing_interval: self.pacing_interval,
            fetch_retry: self.fetch_retry,
        }
    }

    pub fn summarizer<S2: Summarizer>(self, summarizer: S2) -> BridgeProcessorBuilder<D, T, S2, P, C> {
        BridgeProcessorBuilder {
            prompt_path: self.prompt_path,
            source: self.source,
            fetcher: self.fetcher,
            summarizer,
            publisher: self.publisher,
            clock: self.clock,
            idle_interval: self.idle_interval,
            pacing_interval: self.pacing_interval,
            fetch_retry: self.fetch_retry,
        }
    }

    pub fn publisher<P2: Publisher>(self, publisher: P2) -> BridgeProcessorBuilder<D, T, S, P2, C> {
        BridgeProcessorBuilder {
            prompt_path: self.prompt_path,
            source: self.source,
            fetcher: self.fetcher,
            summarizer: self.summarizer,
            publisher,
            clock: self.clock,
            idle_interval: self.idle_interval,
            pacing_interval: self.pacing_interval,
            fetch_retry: self.fetch_retry,
        }
    }

    pub fn clock<C2: Clock>(self, clock: C2) -> BridgeProcessorBuilder<D, T, S, P, C2> {
        BridgeProcessorBuilder {
            prompt_path: self.prompt_path,
            source: self.source,
            fetcher: self.fetcher,
            summarizer: self.summarizer,
            publisher: self.publisher,
            clock,
            idle_interval: self.idle_interval,
            pacing_interval: self.pacing_interval,
            fetch_retry: self.fetch_retry,
        }
    }

    /// Sleep after a listing that returned nothing
    pub fn idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }

    /// Sleep after every processed or skipped item
    pub fn pacing_interval(mut self, interval: Duration) -> Self {
        self.pacing_interval = interval;
        self
    }

    pub fn fetch_retry(mut self, policy: RetryPolicy) -> Self {
        self.fetch_retry = policy;
        self
    }
}

impl<D, T, S, P, C> BridgeProcessorBuilder<D, T, S, P, C>
where
    D: TaskSource,
    T: TranscriptFetcher,
    S: Summarizer,
    P: Publisher,
    C: Clock,
{
    pub fn build(self) -> BridgeProcessor<D, T, S, P, C> {
        BridgeProcessor {
            source: self.source,
            fetcher: self.fetcher,
            summarizer: self.summarizer,
            publisher: self.publisher,
            clock: self.clock,
            prompt_path: self.prompt_path,
            idle_interval: self.idle_interval,
            pacing_interval: self.pacing_interval,
            fetch_retry: self.fetch_retry,
            unrecorded: Default::default(),
            stage: ItemStage::Fetching,
        }
    }
}
