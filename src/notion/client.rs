//! HTTP client for the www.notion.so `api/v3` endpoints.
//!
//! `fetch_table` maps a collection page to the shared `SiteContext`;
//! `fetch_tree` pages through `loadPageChunk` and hands the raw record map
//! to the parser. Authentication is a `token_v2` cookie when a token is
//! present; public tables work without one.

use std::collections::HashMap;

use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::build::context::SiteContext;
use crate::build::tree::ContentNode;
use crate::logger::Logger;
use crate::util::{is_notion_id, to_dash_id};

use super::parse;

const API_BASE: &str = "https://www.notion.so/api/v3";

/// Blocks requested per `loadPageChunk` call.
const CHUNK_LIMIT: u64 = 100;

#[derive(thiserror::Error, Debug)]
pub enum NotionError {
    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),

    #[error("request to {0} failed: {1}")]
    Request(String, reqwest::Error),

    #[error("unexpected status {status} from {endpoint}")]
    Status { endpoint: String, status: StatusCode },

    #[error("cannot find a page id in table URL {0}")]
    BadTableUrl(String),

    #[error("page {0} has no collection")]
    NoCollection(String),

    #[error("unexpected response shape from {endpoint}: {message}")]
    Shape { endpoint: String, message: String },
}

impl NotionError {
    pub(super) fn shape(endpoint: &str, message: impl Into<String>) -> Self {
        Self::Shape {
            endpoint: endpoint.to_string(),
            message: message.into(),
        }
    }
}

pub struct NotionClient {
    client: reqwest::Client,
    token: Option<String>,
    base: String,
    logger: Logger,
}

impl NotionClient {
    pub fn new(token: Option<String>, logger: Logger) -> Result<Self, NotionError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(NotionError::Client)?;
        Ok(Self {
            client,
            token,
            base: API_BASE.to_string(),
            logger,
        })
    }

    #[cfg(test)]
    fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    /// Fetch the site table and derive the shared site context.
    pub async fn fetch_table(&self, table_url: &str) -> Result<SiteContext, NotionError> {
        let page_id = page_id_from_url(table_url)?;
        self.logger
            .debug(format!("Table page id: {page_id}"));

        let chunk = self.load_page_chunk(&page_id, 0, None).await?;
        let (collection_id, view_id) = find_collection(&chunk["recordMap"], &page_id)
            .ok_or_else(|| NotionError::NoCollection(page_id.clone()))?;
        self.logger.debug(format!(
            "Query collection {collection_id} with view {view_id}"
        ));

        let response = self
            .post(
                "queryCollection",
                json!({
                    "collection": { "id": collection_id },
                    "collectionView": { "id": view_id },
                    "loader": {
                        "type": "reducer",
                        "reducers": {
                            "collection_group_results": {
                                "type": "results",
                                "limit": 999
                            }
                        }
                    }
                }),
            )
            .await?;

        parse::parse_table(&response, &collection_id)
    }

    /// Fetch one page's full block tree.
    pub async fn fetch_tree(&self, page_id: &str) -> Result<ContentNode, NotionError> {
        let page_id = to_dash_id(page_id);
        let mut blocks: HashMap<String, Value> = HashMap::new();
        let mut cursor: Option<Value> = None;
        let mut chunk_number = 0;

        loop {
            let response = self
                .load_page_chunk(&page_id, chunk_number, cursor.take())
                .await?;

            if let Some(map) = response["recordMap"]["block"].as_object() {
                for (id, record) in map {
                    blocks.insert(id.clone(), parse::record_value(record).clone());
                }
            }

            let next = &response["cursor"];
            let exhausted = next["stack"]
                .as_array()
                .map(|stack| stack.is_empty())
                .unwrap_or(true);
            if exhausted {
                break;
            }
            cursor = Some(next.clone());
            chunk_number += 1;
        }

        parse::parse_tree(&page_id, &blocks)
    }

    async fn load_page_chunk(
        &self,
        page_id: &str,
        chunk_number: u64,
        cursor: Option<Value>,
    ) -> Result<Value, NotionError> {
        self.post(
            "loadPageChunk",
            json!({
                "pageId": page_id,
                "limit": CHUNK_LIMIT,
                "cursor": cursor.unwrap_or_else(|| json!({ "stack": [] })),
                "chunkNumber": chunk_number,
                "verticalColumns": false
            }),
        )
        .await
    }

    async fn post(&self, endpoint: &str, body: Value) -> Result<Value, NotionError> {
        let url = format!("{}/{}", self.base, endpoint);
        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = &self.token {
            request = request.header(reqwest::header::COOKIE, format!("token_v2={token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotionError::Request(endpoint.to_string(), e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotionError::Status {
                endpoint: endpoint.to_string(),
                status,
            });
        }
        response
            .json()
            .await
            .map_err(|e| NotionError::Request(endpoint.to_string(), e))
    }
}

/// Extract the dashed page id from a Notion table URL.
///
/// Accepts both "pretty" URLs (`.../My-Table-<id>?v=...`) and bare ids.
fn page_id_from_url(url: &str) -> Result<String, NotionError> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    let candidate = segment.rsplit('-').next().unwrap_or(segment);
    if is_notion_id(candidate) {
        return Ok(to_dash_id(candidate));
    }
    if is_notion_id(segment) {
        return Ok(to_dash_id(segment));
    }
    Err(NotionError::BadTableUrl(url.to_string()))
}

/// Locate the collection behind a table page in a record map.
fn find_collection(record_map: &Value, page_id: &str) -> Option<(String, String)> {
    let blocks = record_map["block"].as_object()?;

    let collection_of = |value: &Value| -> Option<(String, String)> {
        let kind = value["type"].as_str()?;
        if kind != "collection_view_page" && kind != "collection_view" {
            return None;
        }
        let collection_id = value["collection_id"].as_str()?.to_string();
        let view_id = value["view_ids"].as_array()?.first()?.as_str()?.to_string();
        Some((collection_id, view_id))
    };

    // The table page itself, or any collection view block inside it.
    if let Some(record) = blocks.get(page_id)
        && let Some(found) = collection_of(parse::record_value(record))
    {
        return Some(found);
    }
    blocks
        .values()
        .find_map(|record| collection_of(parse::record_value(record)))
}
