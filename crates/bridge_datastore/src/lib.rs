//! # DataStore Module
//!
//! This module provides access to the task database that feeds the pipeline:
//! a Notion database whose pages describe recordings waiting to be summarized.
//!
//! The module exposes the [`TaskSource`] abstraction used by the processor to list
//! ready work items and to write the published document link back to them.

mod datastore;
mod domain;

pub use datastore::notion::NotionDataStore;
pub use datastore::{TaskSource, WriteBackError};
pub use domain::{WorkItem, WorkItemStatus};
