use std::collections::HashMap;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use crate::config::WpConfig;
use crate::prelude::*;

/// Maximum page size the WordPress REST API accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination query parameters. Zero-valued entries are omitted from the
/// request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub per_page: u32,
    pub page: u32,
    pub offset: u32,
}

impl PageQuery {
    pub fn per_page(per_page: u32) -> Self {
        Self {
            per_page,
            ..Self::default()
        }
    }

    /// Query tuples for reqwest; only parameters greater than zero are sent.
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if self.per_page > 0 {
            params.push(("per_page", self.per_page.to_string()));
        }
        if self.page > 0 {
            params.push(("page", self.page.to_string()));
        }
        if self.offset > 0 {
            params.push(("offset", self.offset.to_string()));
        }
        params
    }
}

/// GET transport against the WordPress REST API with per-process
/// memoization.
///
/// Identical (endpoint, query) requests are served from memory after the
/// first call. This is correctness-relevant, not just a speedup: it keeps
/// the reference-resolution recursion from re-fetching a shared collection
/// endpoint once per referencing entity.
pub struct Transport {
    client: reqwest::Client,
    api_url: String,
    memo: HashMap<String, Value>,
}

impl Transport {
    /// Build a client; credentials from the config, when present, are sent
    /// as a Basic auth header on every request.
    pub fn new(config: &WpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(auth) = config.auth_header() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth).map_err(|e| eyre!("Invalid header value: {}", e))?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            memo: HashMap::new(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// GET an endpoint path relative to the API root and decode the JSON
    /// body. Non-success statuses and undecodable bodies are errors.
    pub async fn get(&mut self, endpoint: &str, query: PageQuery) -> Result<Value> {
        let key = memo_key(endpoint, &query);
        if let Some(value) = self.memo.get(&key) {
            log::debug!("serving {key} from request memo");
            return Ok(value.clone());
        }

        let url = format!("{}{}", self.api_url, endpoint);
        log::debug!("requesting {url}");
        let response = self
            .client
            .get(&url)
            .query(&query.params())
            .send()
            .await
            .map_err(|e| eyre!("Failed to request {}: {}", url, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(eyre!("WordPress API error [{}] for {}: {}", status, url, body));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| eyre!("Failed to parse response from {}: {}", url, e))?;
        self.memo.insert(key, value.clone());
        Ok(value)
    }

    /// Fetch every entity of a collection endpoint, paging through it in
    /// pages of [`MAX_PAGE_SIZE`] until a short page marks the end.
    pub async fn fetch_all(&mut self, endpoint: &str) -> Result<Vec<Value>> {
        let mut entries = Vec::new();
        let mut page = 1;
        loop {
            let batch = self
                .get(
                    endpoint,
                    PageQuery {
                        per_page: MAX_PAGE_SIZE,
                        page,
                        offset: 0,
                    },
                )
                .await?;
            let batch = batch
                .as_array()
                .cloned()
                .ok_or_else(|| eyre!("expected an array from the {} endpoint", endpoint))?;
            let len = batch.len();
            entries.extend(batch);
            if len < MAX_PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }
        Ok(entries)
    }
}

fn memo_key(endpoint: &str, query: &PageQuery) -> String {
    format!(
        "{endpoint}?per_page={}&page={}&offset={}",
        query.per_page, query.page, query.offset
    )
}
