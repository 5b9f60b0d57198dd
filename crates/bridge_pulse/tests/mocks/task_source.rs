use std::sync::{Arc, Mutex};

use bridge_datastore::{TaskSource, WorkItem, WorkItemStatus, WriteBackError};

use super::EventLog;

/// In-memory task database honouring the ready-status filter
#[derive(Clone)]
pub struct MockTaskSource {
    pub items: Arc<Mutex<Vec<WorkItem>>>,
    pub list_calls: Arc<Mutex<usize>>,
    pub marked: Arc<Mutex<Vec<(String, String)>>>,
    pub events: EventLog,
    pub fail_list_with: Arc<Mutex<Option<String>>>,
    pub fail_write_back_with: Option<String>,
    /// Returns every stored item regardless of status
    pub ignore_filter: bool,
}

impl MockTaskSource {
    pub fn new(items: Vec<WorkItem>, events: EventLog) -> Self {
        Self {
            items: Arc::new(Mutex::new(items)),
            list_calls: Arc::new(Mutex::new(0)),
            marked: Arc::new(Mutex::new(Vec::new())),
            events,
            fail_list_with: Arc::new(Mutex::new(None)),
            fail_write_back_with: None,
            ignore_filter: false,
        }
    }

    pub fn failing_list(msg: &str, events: EventLog) -> Self {
        let source = Self::new(Vec::new(), events);
        source.fail_listing(Some(msg));
        source
    }

    pub fn failing_write_back(items: Vec<WorkItem>, msg: &str, events: EventLog) -> Self {
        Self {
            fail_write_back_with: Some(msg.to_string()),
            ..Self::new(items, events)
        }
    }

    pub fn fail_listing(&self, msg: Option<&str>) {
        *self.fail_list_with.lock().unwrap() = msg.map(str::to_string);
    }

    /// Changes a stored record the way an operator editing the database would
    pub fn set_status(&self, id: &str, status: WorkItemStatus) {
        if let Some(item) = self.items.lock().unwrap().iter_mut().find(|item| item.id == id) {
            item.status = status;
        }
    }

    pub fn status_of(&self, id: &str) -> Option<WorkItemStatus> {
        self.items
            .lock()
            .unwrap()
            .iter()
            .find(|item| item.id == id)
            .map(|item| item.status)
    }
}

impl TaskSource for MockTaskSource {
    async fn list_ready(&self) -> anyhow::Result<Vec<WorkItem>> {
        *self.list_calls.lock().unwrap() += 1;
        self.events.lock().unwrap().push("list-ready".to_string());

        if let Some(msg) = self.fail_list_with.lock().unwrap().clone() {
            return Err(anyhow::anyhow!("{}", msg));
        }

        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| self.ignore_filter || item.status == WorkItemStatus::Pending)
            .cloned()
            .collect())
    }

    async fn mark_processed(&self, item: &WorkItem, output_url: &str) -> Result<(), WriteBackError> {
        self.events
            .lock()
            .unwrap()
            .push(format!("mark-processed:{}:{}", item.id, output_url));
        self.marked
            .lock()
            .unwrap()
            .push((item.id.clone(), output_url.to_string()));

        if let Some(ref msg) = self.fail_write_back_with {
            return Err(WriteBackError::Rejected {
                item_id: item.id.clone(),
                status: 409,
                message: msg.clone(),
            });
        }

        if let Some(stored) = self
            .items
            .lock()
            .unwrap()
            .iter_mut()
            .find(|stored| stored.id == item.id)
        {
            stored.status = WorkItemStatus::Processed;
            stored.output_url = Some(output_url.to_string());
        }
        Ok(())
    }
}
