//! Perplexity Search API provider

use crate::{
    error::{SearchError, SearchResult},
    types::{SearchOptions, SearchProvider, SearchResult as SearchResultType},
    utils::http::HttpClient,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai/search";

#[derive(Debug, Serialize)]
struct PerplexityRequest<'a> {
    query: &'a str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct PerplexityResponse {
    #[serde(default)]
    results: Vec<PerplexityResult>,
}

#[derive(Debug, Deserialize)]
struct PerplexityResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    snippet: Option<String>,
    content: Option<String>,
    date: Option<String>,
}

/// Perplexity search provider
#[derive(Debug, Clone)]
pub struct PerplexityProvider {
    api_key: String,
    base_url: String,
    client: HttpClient,
}

impl PerplexityProvider {
    pub fn new(api_key: &str) -> SearchResult<Self> {
        if api_key.trim().is_empty() {
            return Err(SearchError::ConfigError(
                "Perplexity API key is required".to_string(),
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
impl SearchProvider for PerplexityProvider {
    fn name(&self) -> &str {
        "perplexity"
    }

    async fn search(&self, options: &SearchOptions) -> SearchResult<Vec<SearchResultType>> {
        if options.query.trim().is_empty() {
            return Err(SearchError::InvalidInput(
                "Query cannot be empty".to_string(),
            ));
        }

        let body = PerplexityRequest {
            query: &options.query,
            max_results: options.max_results.unwrap_or(10),
        };
        let authorization = format!("Bearer {}", self.api_key);
        let headers = [
            ("Authorization", authorization.as_str()),
            ("Accept", "application/json"),
        ];

        let response: PerplexityResponse =
            self.client.post_json(&self.base_url, &body, &headers).await?;

        let results = response
            .results
            .into_iter()
            .filter(|item| !item.url.is_empty())
            .map(|item| {
                // `snippet` wins over `content` when both are present and non-empty
                let text = item
                    .snippet
                    .filter(|s| !s.is_empty())
                    .or(item.content)
                    .unwrap_or_default();
                SearchResultType::new(item.title, item.url, "perplexity")
                    .with_snippet(text)
                    .with_published_date(item.date)
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
