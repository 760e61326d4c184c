//! Serper provider (Google results through google.serper.dev)

use crate::{
    error::{SearchError, SearchResult},
    types::{SearchOptions, SearchProvider, SearchResult as SearchResultType},
    utils::http::HttpClient,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DEFAULT_BASE_URL: &str = "https://google.serper.dev/search";

#[derive(Debug, Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    num: u32,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperOrganicResult>,
}

#[derive(Debug, Deserialize)]
struct SerperOrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    snippet: Option<String>,
    position: Option<u32>,
    date: Option<String>,
}

/// Serper search provider
#[derive(Debug, Clone)]
pub struct SerperProvider {
    api_key: String,
    base_url: String,
    client: HttpClient,
}

impl SerperProvider {
    pub fn new(api_key: &str) -> SearchResult<Self> {
        if api_key.trim().is_empty() {
            return Err(SearchError::ConfigError(
                "Serper API key is required".to_string(),
            ));
        }

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: HttpClient::new()?,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> SearchResult<Self> {
        self.client = HttpClient::with_timeout(timeout_ms)?;
        Ok(self)
    }
}

#[async_trait::async_trait]
impl SearchProvider for SerperProvider {
    fn name(&self) -> &str {
        "serper"
    }

    async fn search(&self, options: &SearchOptions) -> SearchResult<Vec<SearchResultType>> {
        if options.query.trim().is_empty() {
            return Err(SearchError::InvalidInput(
                "Query cannot be empty".to_string(),
            ));
        }

        let body = SerperRequest {
            q: &options.query,
            num: options.max_results.unwrap_or(10),
        };

        let response: SerperResponse = self
            .client
            .post_json(&self.base_url, &body, &[("X-API-KEY", self.api_key.as_str())])
            .await?;

        log::debug!("Serper returned {} organic results", response.organic.len());

        let results = response
            .organic
            .into_iter()
            .filter(|item| !item.link.is_empty())
            .map(|item| {
                let mut result = SearchResultType::new(item.title, item.link, "serper")
                    .with_published_date(item.date);
                if let Some(snippet) = item.snippet {
                    result = result.with_snippet(snippet);
                }
                if let Some(position) = item.position {
                    result = result.with_raw(serde_json::json!({ "position": position }));
                }
                result
            })
            .collect();

        Ok(results)
    }

    fn config(&self) -> HashMap<String, String> {
        let mut config = HashMap::new();
        config.insert("api_key".to_string(), "***".to_string());
        config.insert("base_url".to_string(), self.base_url.clone());
        config
    }
}
