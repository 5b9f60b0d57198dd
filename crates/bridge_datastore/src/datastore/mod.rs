use std::future::Future;

use crate::WorkItem;

pub mod notion;

pub trait TaskSource {
    /// Lists every record currently marked ready for processing
    fn list_ready(&self) -> impl Future<Output = anyhow::Result<Vec<WorkItem>>> + Send;

    /// Marks `item` as processed and attaches the published document URL
    fn mark_processed(
        &self,
        item: &WorkItem,
        output_url: &str,
    ) -> impl Future<Output = Result<(), WriteBackError>> + Send;
}

impl<T: TaskSource + Send + Sync> TaskSource for &T {
    async fn list_ready(&self) -> anyhow::Result<Vec<WorkItem>> {
        (**self).list_ready().await
    }

    async fn mark_processed(&self, item: &WorkItem, output_url: &str) -> Result<(), WriteBackError> {
        (**self).mark_processed(item, output_url).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WriteBackError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Update rejected for {item_id}: {status} - {message}")]
    Rejected {
        item_id: String,
        status: u16,
        message: String,
    },
}
