use std::future::Future;

use anyhow::Context;
use itertools::Itertools;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    datastore::{TaskSource, WriteBackError},
    WorkItem, WorkItemStatus,
};

const STATUS_PROPERTY: &str = "Status";
const RECORDING_PROPERTY: &str = "Recording";
const TITLE_PROPERTY: &str = "Name";
const OUTPUT_PROPERTY: &str = "Auto-Outputs";

#[derive(Debug, Clone)]
pub struct NotionDataStore {
    client: reqwest::Client,
    api_key: String,
    database_id: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

impl NotionDataStore {
    const NOTION_VERSION: &str = "2022-06-28";
    const PAGE_SIZE: u32 = 100;

    pub fn new(api_key: impl Into<String>, database_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            database_id: database_id.into(),
            base_url: "https://api.notion.com/v1".into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Fetches a single page of ready records starting at `cursor`
    async fn query_ready_page(&self, cursor: Option<&str>) -> anyhow::Result<QueryResponse> {
        let resp = self
            .client
            .post(format!(
                "{}/databases/{}/query",
                self.base_url, self.database_id
            ))
            .bearer_auth(&self.api_key)
            .header("Notion-Version", Self::NOTION_VERSION)
            .json(&ready_query_body(cursor, Self::PAGE_SIZE))
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to query task database"))
            .context("Failed to query task database")?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            anyhow::bail!("Task database query rejected: {status} - {message}");
        }

        resp.json::<QueryResponse>()
            .await
            .context("Failed to decode task database query response")
    }
}

impl TaskSource for NotionDataStore {
    #[tracing::instrument(skip(self))]
    async fn list_ready(&self) -> anyhow::Result<Vec<WorkItem>> {
        let items = collect_ready_pages(|cursor| async move {
            self.query_ready_page(cursor.as_deref()).await
        })
        .await?;

        tracing::debug!(count = items.len(), "Listed ready task records");
        Ok(items)
    }

    #[tracing::instrument(skip(self, item), fields(item_id = %item.id))]
    async fn mark_processed(&self, item: &WorkItem, output_url: &str) -> Result<(), WriteBackError> {
        let resp = self
            .client
            .patch(format!("{}/pages/{}", self.base_url, item.id))
            .bearer_auth(&self.api_key)
            .header("Notion-Version", Self::NOTION_VERSION)
            .json(&processed_update_body(output_url))
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to update task record"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(WriteBackError::Rejected {
                item_id: item.id.clone(),
                status,
                message,
            });
        }

        Ok(())
    }
}

/// Walks the query pages from the first one until Notion reports no more.
///
/// `fetch_page` receives the cursor of the page to load, `None` for the first.
/// A failure on any page fails the whole listing.
async fn collect_ready_pages<F, Fut>(mut fetch_page: F) -> anyhow::Result<Vec<WorkItem>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = anyhow::Result<QueryResponse>>,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = fetch_page(cursor.take()).await?;

        for record in &page.results {
            match parse_page(record) {
                Ok(item) => items.push(item),
                Err(e) => tracing::warn!(
                    error = %e,
                    page_id = record["id"].as_str().unwrap_or_default(),
                    "Skipping malformed task record"
                ),
            }
        }

        match page.next_cursor {
            Some(next) if page.has_more => cursor = Some(next),
            _ => break,
        }
    }

    Ok(items)
}

fn ready_query_body(cursor: Option<&str>, page_size: u32) -> Value {
    let mut body = json!({
        "filter": {
            "property": STATUS_PROPERTY,
            "select": {
                "equals": WorkItemStatus::Pending.label()
            }
        },
        "page_size": page_size
    });
    if let Some(cursor) = cursor {
        body["start_cursor"] = Value::String(cursor.to_string());
    }
    body
}

fn processed_update_body(output_url: &str) -> Value {
    json!({
        "properties": {
            STATUS_PROPERTY: {
                "select": {
                    "name": WorkItemStatus::Processed.label()
                }
            },
            OUTPUT_PROPERTY: {
                "url": output_url
            }
        }
    })
}

/// Converts a Notion page object into a [`WorkItem`].
///
/// A record without an id or recording URL cannot be processed and is rejected.
/// A missing title falls back to `"Untitled"`.
fn parse_page(page: &Value) -> anyhow::Result<WorkItem> {
    let id = page["id"]
        .as_str()
        .context("Record has no 'id'")?
        .to_string();
    let properties = &page["properties"];

    let recording_url = properties[RECORDING_PROPERTY]["url"]
        .as_str()
        .filter(|url| !url.trim().is_empty())
        .with_context(|| format!("Record {id} has no '{RECORDING_PROPERTY}' url"))?
        .trim()
        .to_string();

    let title = properties[TITLE_PROPERTY]["title"]
        .as_array()
        .map(|runs| {
            runs.iter()
                .filter_map(|run| {
                    run["plain_text"]
                        .as_str()
                        .or_else(|| run["text"]["content"].as_str())
                })
                .join("")
        })
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| "Untitled".to_string());

    let status = properties[STATUS_PROPERTY]["select"]["name"]
        .as_str()
        .and_then(|name| name.parse::<WorkItemStatus>().ok())
        .unwrap_or_default();

    let output_url = properties[OUTPUT_PROPERTY]["url"]
        .as_str()
        .map(str::to_string);

    Ok(WorkItem {
        id,
        status,
        recording_url,
        title,
        output_url,
    })
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };

    use super::*;

    fn page_fixture() -> Value {
        json!({
            "object": "page",
            "id": "8a2f1c3e-0000-4000-8000-000000000001",
            "properties": {
                "Status": { "type": "select", "select": { "name": "Ready for Analysis" } },
                "Recording": { "type": "url", "url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ" },
                "Name": {
                    "type": "title",
                    "title": [
                        { "type": "text", "text": { "content": "Weekly sync" }, "plain_text": "Weekly sync" },
                        { "type": "text", "text": { "content": " #12" }, "plain_text": " #12" }
                    ]
                },
                "Auto-Outputs": { "type": "url", "url": null }
            }
        })
    }

    fn page_with_id(id: &str) -> Value {
        let mut page = page_fixture();
        page["id"] = Value::String(id.to_string());
        page
    }

    fn query_page(ids: &[&str], has_more: bool, next_cursor: Option<&str>) -> QueryResponse {
        QueryResponse {
            results: ids.iter().map(|id| page_with_id(id)).collect(),
            has_more,
            next_cursor: next_cursor.map(str::to_string),
        }
    }

    /// Accepts one connection, answers it with `status_line` and returns the raw request
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];

            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);

                if let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    let headers = String::from_utf8_lossy(&request[..end]).to_lowercase();
                    let content_length = headers
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|value| value.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });

        (base_url, handle)
    }

    fn local_store(base_url: String) -> NotionDataStore {
        NotionDataStore {
            client: reqwest::Client::builder().no_proxy().build().unwrap(),
            ..NotionDataStore::new("secret", "db-1").with_base_url(base_url)
        }
    }

    fn ready_item() -> WorkItem {
        WorkItem {
            id: "page-1".into(),
            status: WorkItemStatus::Pending,
            recording_url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".into(),
            title: "Weekly sync".into(),
            output_url: None,
        }
    }

    #[test]
    fn test_parse_page_extracts_work_item() {
        let item = parse_page(&page_fixture()).expect("fixture should parse");

        assert_eq!(item.id, "8a2f1c3e-0000-4000-8000-000000000001");
        assert_eq!(item.status, WorkItemStatus::Pending);
        assert_eq!(
            item.recording_url,
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
        assert_eq!(item.title, "Weekly sync #12");
        assert_eq!(item.output_url, None);
    }

    #[test]
    fn test_parse_page_without_recording_is_rejected() {
        let mut page = page_fixture();
        page["properties"]["Recording"]["url"] = Value::Null;

        let err = parse_page(&page).unwrap_err();
        assert!(err.to_string().contains("Recording"), "got: {err}");
    }

    #[test]
    fn test_parse_page_falls_back_to_untitled() {
        let mut page = page_fixture();
        page["properties"]["Name"]["title"] = json!([]);

        let item = parse_page(&page).unwrap();
        assert_eq!(item.title, "Untitled");
    }

    #[test]
    fn test_parse_page_uses_text_content_without_plain_text() {
        let mut page = page_fixture();
        page["properties"]["Name"]["title"] = json!([{ "text": { "content": "Design review" } }]);

        let item = parse_page(&page).unwrap();
        assert_eq!(item.title, "Design review");
    }

    #[test]
    fn test_ready_query_filters_on_ready_status() {
        let body = ready_query_body(None, 100);

        assert_eq!(body["filter"]["property"], "Status");
        assert_eq!(body["filter"]["select"]["equals"], "Ready for Analysis");
        assert_eq!(body["page_size"], 100);
        assert!(body.get("start_cursor").is_none());

        let body = ready_query_body(Some("cursor-2"), 100);
        assert_eq!(body["start_cursor"], "cursor-2");
    }

    #[test]
    fn test_processed_update_sets_status_and_output_url() {
        let body = processed_update_body("https://docs.google.com/document/d/abc/edit");

        assert_eq!(body["properties"]["Status"]["select"]["name"], "Processed");
        assert_eq!(
            body["properties"]["Auto-Outputs"]["url"],
            "https://docs.google.com/document/d/abc/edit"
        );
    }

    #[tokio::test]
    async fn test_pages_are_followed_until_has_more_is_false() {
        let mut pages = vec![
            Ok(query_page(&["page-1", "page-2"], true, Some("cursor-2"))),
            Ok(query_page(&["page-3"], true, Some("cursor-3"))),
            Ok(query_page(&["page-4"], false, None)),
        ];
        let mut cursors = Vec::new();

        let items = collect_ready_pages(|cursor| {
            cursors.push(cursor);
            std::future::ready(pages.remove(0))
        })
        .await
        .unwrap();

        assert_eq!(
            items.iter().map(|item| item.id.as_str()).collect::<Vec<_>>(),
            vec!["page-1", "page-2", "page-3", "page-4"]
        );
        assert_eq!(
            cursors,
            vec![None, Some("cursor-2".to_string()), Some("cursor-3".to_string())]
        );
    }

    #[tokio::test]
    async fn test_cursor_is_ignored_when_has_more_is_false() {
        let mut calls = 0;

        let items = collect_ready_pages(|_| {
            calls += 1;
            std::future::ready(Ok(query_page(&["page-1"], false, Some("stale-cursor"))))
        })
        .await
        .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_failure_on_a_later_page_fails_the_listing() {
        let mut pages = vec![
            Ok(query_page(&["page-1"], true, Some("cursor-2"))),
            Err(anyhow::anyhow!("Task database query rejected: 502 - bad gateway")),
        ];

        let err = collect_ready_pages(|_| std::future::ready(pages.remove(0)))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("502"), "got: {err}");
    }

    #[tokio::test]
    async fn test_malformed_records_are_skipped_within_a_page() {
        let mut broken = page_with_id("page-2");
        broken["properties"]["Recording"]["url"] = Value::Null;
        let page = QueryResponse {
            results: vec![page_with_id("page-1"), broken, page_with_id("page-3")],
            has_more: false,
            next_cursor: None,
        };
        let mut pages = vec![Ok(page)];

        let items = collect_ready_pages(|_| std::future::ready(pages.remove(0)))
            .await
            .unwrap();

        assert_eq!(
            items.iter().map(|item| item.id.as_str()).collect::<Vec<_>>(),
            vec!["page-1", "page-3"]
        );
    }

    #[tokio::test]
    async fn test_mark_processed_patches_the_page() {
        let (base_url, server) = serve_once("200 OK", "{}").await;
        let store = local_store(base_url);

        store
            .mark_processed(&ready_item(), "https://docs.google.com/document/d/abc/edit")
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("PATCH /pages/page-1 "), "got: {request}");
        assert!(request.contains("\"Processed\""), "got: {request}");
        assert!(request.contains("https://docs.google.com/document/d/abc/edit"));
    }

    #[tokio::test]
    async fn test_rejected_update_is_a_write_back_error() {
        let (base_url, server) =
            serve_once("409 Conflict", r#"{"object":"error","code":"conflict_error"}"#).await;
        let store = local_store(base_url);

        let err = store
            .mark_processed(&ready_item(), "https://docs.google.com/document/d/abc/edit")
            .await
            .unwrap_err();
        server.await.unwrap();

        match err {
            WriteBackError::Rejected {
                item_id,
                status,
                message,
            } => {
                assert_eq!(item_id, "page-1");
                assert_eq!(status, 409);
                assert!(message.contains("conflict_error"), "got: {message}");
            }
            other => panic!("Expected Rejected, got {other:?}"),
        }
    }
}
