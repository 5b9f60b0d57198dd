use std::{fmt, str::FromStr};

/// Lifecycle of a record in the task database as seen by the pipeline.
///
/// Skipped or failed items are never written upstream; they simply stay `Pending`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum WorkItemStatus {
    #[default]
    Pending,
    Processed,
}

impl WorkItemStatus {
    /// The select option name used for this status in the task database
    pub fn label(&self) -> &'static str {
        match self {
            WorkItemStatus::Pending => "Ready for Analysis",
            WorkItemStatus::Processed => "Processed",
        }
    }
}

impl fmt::Display for WorkItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for WorkItemStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ready for Analysis" => Ok(WorkItemStatus::Pending),
            "Processed" => Ok(WorkItemStatus::Processed),
            other => anyhow::bail!("Unknown work item status: {other}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkItem {
    pub id: String,
    pub status: WorkItemStatus,
    /// Recording URL carrying the video identifier
    pub recording_url: String,
    pub title: String,
    pub output_url: Option<String>,
}

impl WorkItem {
    pub fn is_pending(&self) -> bool {
        self.status == WorkItemStatus::Pending
    }
}
