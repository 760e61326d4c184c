//! Jina Reader page extraction
//!
//! Works without a key at a reduced rate limit; a key lifts it.

use crate::{
    error::{SearchError, SearchResult},
    types::{Capability, FetchFormat, FetchResponse, SearchProvider},
    utils::http::HttpClient,
};
use std::collections::HashMap;
use std::time::Instant;

const DEFAULT_BASE_URL: &str = "https://r.jina.ai";
/// Page extraction can be slow for heavy pages
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Jina Reader provider
#[derive(Debug, Clone)]
pub struct JinaProvider {
    api_key: Option<String>,
    base_url: String,
    client: HttpClient,
}

impl JinaProvider {
    pub fn new(api_key: Option<&str>) -> SearchResult<Self> {
        Ok(Self {
            api_key: api_key
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_string),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: HttpClient::with_timeout(DEFAULT_TIMEOUT_MS)?,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> SearchResult<Self> {
        self.client = HttpClient::with_timeout(timeout_ms)?;
        Ok(self)
    }
}

#[async_trait::async_trait]
impl SearchProvider for JinaProvider {
    fn name(&self) -> &str {
        "jina"
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::Extraction]
    }

    async fn fetch(&self, url: &str, format: FetchFormat) -> SearchResult<FetchResponse> {
        if url.trim().is_empty() {
            return Err(SearchError::InvalidInput("URL cannot be empty".to_string()));
        }

        let started = Instant::now();
        let reader_url = format!("{}/{url}", self.base_url);
        let accept = match format {
            FetchFormat::Markdown => "text/markdown",
            FetchFormat::Text => "text/plain",
        };

        let authorization = self.api_key.as_ref().map(|key| format!("Bearer {key}"));
        let mut headers = vec![("Accept", accept)];
        if let Some(authorization) = authorization.as_deref() {
            headers.push(("Authorization", authorization));
        }

        let content = self.client.get_text(&reader_url, &headers).await?;
        let title = content
            .lines()
            .next()
            .and_then(|line| line.strip_prefix("# "))
            .map(|title| title.trim().to_string())
            .unwrap_or_default();

        Ok(FetchResponse {
            url: url.to_string(),
            title,
            content,
            format,
            provider: "jina".to_string(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn config(&self) -> HashMap<String, String> {
        let mut config = HashMap::new();
        config.insert(
            "api_key".to_string(),
            if self.api_key.is_some() { "***" } else { "none" }.to_string(),
        );
        config.insert("base_url".to_string(), self.base_url.clone());
        config
    }
}
