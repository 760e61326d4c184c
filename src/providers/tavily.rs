//! Tavily Search API provider
//!
//! Tavily is an AI-powered search API optimized for LLM agents. Several keys may be
//! configured; each request picks one at random to spread free-tier quota.

use crate::{
    error::{SearchError, SearchResult},
    providers::KeyRing,
    types::{SearchOptions, SearchProvider, SearchResult as SearchResultType},
    utils::http::HttpClient,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DEFAULT_BASE_URL: &str = "https://api.tavily.com/search";

/// Tavily search result structure
#[derive(Debug, Deserialize)]
struct TavilySearchResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    content: Option<String>,
    score: Option<f64>,
    published_date: Option<String>,
}

/// Tavily API response structure
#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilySearchResult>,
}

/// Tavily search request structure
#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    include_answer: bool,
    include_raw_content: bool,
    max_results: u32,
}

/// Tavily Search API provider
#[derive(Debug, Clone)]
pub struct TavilyProvider {
    keys: KeyRing,
    base_url: String,
    search_depth: String,
    client: HttpClient,
}

impl TavilyProvider {
    /// Create a new Tavily provider with the given API key
    pub fn new(api_key: &str) -> SearchResult<Self> {
        Self::with_keys(vec![api_key.to_string()])
    }

    /// Create a provider that rotates between several API keys
    pub fn with_keys(keys: Vec<String>) -> SearchResult<Self> {
        Ok(Self {
            keys: KeyRing::new("Tavily", keys)?,
            base_url: DEFAULT_BASE_URL.to_string(),
            search_depth: "basic".to_string(),
            client: HttpClient::new()?,
        })
    }

    /// Set search depth ("basic" or "advanced")
    pub fn with_search_depth(mut self, depth: &str) -> SearchResult<Self> {
        if depth != "basic" && depth != "advanced" {
            return Err(SearchError::ConfigError(
                "Search depth must be 'basic' or 'advanced'".to_string(),
            ));
        }
        self.search_depth = depth.to_string();
        Ok(self)
    }

    /// Set custom base URL (for testing or enterprise endpoints)
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
impl SearchProvider for TavilyProvider {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(&self, options: &SearchOptions) -> SearchResult<Vec<SearchResultType>> {
        if options.query.trim().is_empty() {
            return Err(SearchError::InvalidInput(
                "Query cannot be empty".to_string(),
            ));
        }

        let request_body = TavilyRequest {
            api_key: self.keys.pick(),
            query: &options.query,
            search_depth: &self.search_depth,
            include_answer: false,
            include_raw_content: false,
            // Tavily max is 50
            max_results: options.max_results.unwrap_or(10).min(50),
        };

        let response: TavilyResponse = self
            .client
            .post_json(&self.base_url, &request_body, &[])
            .await?;

        let results = response
            .results
            .into_iter()
            .filter(|item| !item.url.is_empty())
            .map(|item| {
                let mut result = SearchResultType::new(item.title, item.url, "tavily")
                    .with_score(item.score)
                    .with_published_date(item.published_date);
                if let Some(content) = item.content {
                    result = result.with_snippet(content);
                }
                result
            })
            .collect();

        Ok(results)
    }

    fn config(&self) -> HashMap<String, String> {
        let mut config = HashMap::new();
        config.insert("api_key".to_string(), "***".to_string());
        config.insert("api_key_count".to_string(), self.keys.len().to_string());
        config.insert("base_url".to_string(), self.base_url.clone());
        config.insert("search_depth".to_string(), self.search_depth.clone());
        config
    }
}
