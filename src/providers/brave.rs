//! Brave Search API provider

use crate::{
    error::{SearchError, SearchResult},
    types::{SearchOptions, SearchProvider, SearchResult as SearchResultType},
    utils::http::HttpClient,
};
use serde::Deserialize;
use std::collections::HashMap;

const DEFAULT_BASE_URL: &str = "https://api.search.brave.com/res/v1/web/search";

/// Brave caps `count` at 20 per request
const MAX_COUNT: u32 = 20;

#[derive(Debug, Deserialize)]
struct BraveResponse {
    web: Option<BraveWebResults>,
}

#[derive(Debug, Deserialize)]
struct BraveWebResults {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    description: Option<String>,
    page_age: Option<String>,
}

/// Brave Search provider
#[derive(Debug, Clone)]
pub struct BraveProvider {
    api_key: String,
    base_url: String,
    client: HttpClient,
}

impl BraveProvider {
    pub fn new(api_key: &str) -> SearchResult<Self> {
        if api_key.trim().is_empty() {
            return Err(SearchError::ConfigError(
                "Brave API key is required".to_string(),
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
impl SearchProvider for BraveProvider {
    fn name(&self) -> &str {
        "brave"
    }

    async fn search(&self, options: &SearchOptions) -> SearchResult<Vec<SearchResultType>> {
        if options.query.trim().is_empty() {
            return Err(SearchError::InvalidInput(
                "Query cannot be empty".to_string(),
            ));
        }

        let count = options.max_results.unwrap_or(10).clamp(1, MAX_COUNT);
        let params = [("q", options.query.clone()), ("count", count.to_string())];
        let headers = [
            ("Accept", "application/json"),
            ("X-Subscription-Token", self.api_key.as_str()),
        ];

        let response: BraveResponse = self
            .client
            .get_json(&self.base_url, &params, &headers)
            .await?;

        let results = response
            .web
            .map(|web| web.results)
            .unwrap_or_default()
            .into_iter()
            .filter(|item| !item.url.is_empty())
            .map(|item| {
                let mut result = SearchResultType::new(item.title, item.url, "brave")
                    .with_published_date(item.page_age);
                if let Some(description) = item.description {
                    result = result.with_snippet(description);
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
