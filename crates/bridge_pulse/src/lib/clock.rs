use std::{future::Future, time::Duration};

/// Source of every suspension point in the pipeline.
///
/// Production code sleeps on the tokio timer; tests substitute a recording clock
/// so idle, pacing and retry delays can be asserted without waiting.
pub trait Clock {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await
    }
}
