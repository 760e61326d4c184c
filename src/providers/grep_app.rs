//! grep.app code search across public GitHub repositories

use crate::{
    error::{SearchError, SearchResult},
    types::{Capability, SearchOptions, SearchProvider, SearchResult as SearchResultType},
    utils::http::HttpClient,
};
use serde::Deserialize;
use std::collections::HashMap;

const DEFAULT_BASE_URL: &str = "https://grep.app/api/search";

#[derive(Debug, Deserialize)]
struct GrepAppResponse {
    #[serde(default)]
    hits: GrepAppHits,
}

#[derive(Debug, Default, Deserialize)]
struct GrepAppHits {
    #[serde(default)]
    hits: Vec<GrepAppHit>,
}

#[derive(Debug, Deserialize)]
struct GrepAppHit {
    #[serde(default)]
    repo: String,
    branch: Option<String>,
    #[serde(default)]
    path: String,
    #[serde(default)]
    content: GrepAppContent,
}

#[derive(Debug, Default, Deserialize)]
struct GrepAppContent {
    #[serde(default)]
    snippet: String,
}

/// grep.app provider
#[derive(Debug, Clone)]
pub struct GrepAppProvider {
    base_url: String,
    client: HttpClient,
}

impl GrepAppProvider {
    pub fn new() -> SearchResult<Self> {
        Ok(Self {
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
impl SearchProvider for GrepAppProvider {
    fn name(&self) -> &str {
        "grep_app"
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::Code]
    }

    async fn search_code(&self, options: &SearchOptions) -> SearchResult<Vec<SearchResultType>> {
        if options.query.trim().is_empty() {
            return Err(SearchError::InvalidInput(
                "Query cannot be empty".to_string(),
            ));
        }

        let response: GrepAppResponse = self
            .client
            .get_json(&self.base_url, &[("q", options.query.clone())], &[])
            .await?;

        let repo_filter = options.filters.repo.as_deref();
        let results = response
            .hits
            .hits
            .into_iter()
            .filter(|hit| !hit.repo.is_empty())
            .filter(|hit| repo_filter.map_or(true, |repo| hit.repo.eq_ignore_ascii_case(repo)))
            .take(options.limit())
            .map(|hit| {
                let branch = hit.branch.as_deref().unwrap_or("master");
                let url = format!("https://github.com/{}/blob/{branch}/{}", hit.repo, hit.path);
                let title = format!("{}/{}", hit.repo, hit.path);
                SearchResultType::new(title, url, "grep_app")
                    .with_snippet(hit.content.snippet.trim())
            })
            .collect();

        Ok(results)
    }

    fn config(&self) -> HashMap<String, String> {
        let mut config = HashMap::new();
        config.insert("base_url".to_string(), self.base_url.clone());
        config
    }
}
