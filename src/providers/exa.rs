//! Exa search provider (paid REST API)

use crate::{
    error::{SearchError, SearchResult},
    providers::KeyRing,
    types::{SearchOptions, SearchProvider, SearchResult as SearchResultType},
    utils::{http::HttpClient, text::clip_chars},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DEFAULT_BASE_URL: &str = "https://api.exa.ai/search";
const MAX_TEXT_CHARS: usize = 500;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaSearchRequest<'a> {
    query: &'a str,
    num_results: u32,
    #[serde(rename = "type")]
    search_type: &'a str,
    use_autoprompt: bool,
    contents: ExaContents,
}

#[derive(Debug, Serialize)]
struct ExaContents {
    text: ExaTextOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaTextOptions {
    max_characters: usize,
}

#[derive(Debug, Deserialize)]
struct ExaSearchResponse {
    #[serde(default)]
    results: Vec<ExaResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExaResult {
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: String,
    text: Option<String>,
    snippet: Option<String>,
    score: Option<f64>,
    published_date: Option<String>,
    author: Option<String>,
}

/// Exa search provider
#[derive(Debug, Clone)]
pub struct ExaProvider {
    keys: KeyRing,
    base_url: String,
    client: HttpClient,
}

impl ExaProvider {
    pub fn new(api_key: &str) -> SearchResult<Self> {
        Self::with_keys(vec![api_key.to_string()])
    }

    /// Create a provider that rotates between several API keys
    pub fn with_keys(keys: Vec<String>) -> SearchResult<Self> {
        Ok(Self {
            keys: KeyRing::new("Exa", keys)?,
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
impl SearchProvider for ExaProvider {
    fn name(&self) -> &str {
        "exa"
    }

    async fn search(&self, options: &SearchOptions) -> SearchResult<Vec<SearchResultType>> {
        if options.query.trim().is_empty() {
            return Err(SearchError::InvalidInput(
                "Query cannot be empty".to_string(),
            ));
        }

        let request_body = ExaSearchRequest {
            query: &options.query,
            num_results: options.max_results.unwrap_or(10),
            search_type: "auto",
            use_autoprompt: true,
            contents: ExaContents {
                text: ExaTextOptions {
                    max_characters: MAX_TEXT_CHARS,
                },
            },
        };

        let exa_response: ExaSearchResponse = self
            .client
            .post_json(&self.base_url, &request_body, &[("x-api-key", self.keys.pick())])
            .await?;

        let results = exa_response
            .results
            .into_iter()
            .filter(|result| !result.url.is_empty())
            .map(|result| {
                let text = result.text.or(result.snippet).unwrap_or_default();
                let mut item = SearchResultType::new(
                    result.title.unwrap_or_default(),
                    result.url,
                    "exa",
                )
                .with_snippet(clip_chars(&text, MAX_TEXT_CHARS))
                .with_score(result.score)
                .with_published_date(result.published_date);

                if result.id.is_some() || result.author.is_some() {
                    item = item.with_raw(serde_json::json!({
                        "id": result.id,
                        "author": result.author,
                    }));
                }
                item
            })
            .collect();

        Ok(results)
    }

    fn config(&self) -> HashMap<String, String> {
        let mut config = HashMap::new();
        config.insert("api_key".to_string(), "***".to_string());
        config.insert("api_key_count".to_string(), self.keys.len().to_string());
        config.insert("base_url".to_string(), self.base_url.clone());
        config
    }
}
