//! DeepWiki answers questions about one GitHub repository over MCP
//!
//! Each request opens a session with `initialize`, then calls `ask_question` with
//! the session id the server handed back. Without a repository filter there is
//! nothing to ask about, so the provider returns no results.

use crate::{
    error::{SearchError, SearchResult},
    providers::mcp,
    types::{Capability, SearchOptions, SearchProvider, SearchResult as SearchResultType},
    utils::http::HttpClient,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

const DEFAULT_BASE_URL: &str = "https://mcp.deepwiki.com/mcp";
const SESSION_HEADER: &str = "mcp-session-id";

/// DeepWiki answers can take a while to generate
pub const DEFAULT_TIMEOUT_MS: u64 = 90_000;

/// DeepWiki provider
#[derive(Debug)]
pub struct DeepWikiProvider {
    base_url: String,
    client: HttpClient,
    next_id: AtomicU64,
}

impl DeepWikiProvider {
    pub fn new() -> SearchResult<Self> {
        Ok(Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client: HttpClient::with_timeout(DEFAULT_TIMEOUT_MS)?,
            next_id: AtomicU64::new(2),
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

    async fn open_session(&self) -> SearchResult<String> {
        let (headers, _) = self
            .client
            .post_json_text(
                &self.base_url,
                &mcp::initialize_request(),
                &[("Accept", mcp::ACCEPT)],
            )
            .await?;

        headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                SearchError::ParseError("DeepWiki did not return a session id".to_string())
            })
    }

    /// Ask a question about `repo` (`owner/name`) and return the answer text
    pub async fn ask_question(&self, question: &str, repo: &str) -> SearchResult<String> {
        let session_id = self.open_session().await?;
        log::debug!("DeepWiki session opened for {repo}");

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = mcp::tool_call(
            "ask_question",
            json!({ "repoName": repo, "question": question }),
            json!(id),
        );
        let (_, body) = self
            .client
            .post_json_text(
                &self.base_url,
                &request,
                &[("Accept", mcp::ACCEPT), ("Mcp-Session-Id", session_id.as_str())],
            )
            .await?;

        let answer = mcp::text_blocks(&body).concat();
        if answer.is_empty() {
            if let Some(message) = mcp::error_message(&body) {
                return Err(SearchError::HttpError {
                    message: format!("DeepWiki error: {message}"),
                    status_code: None,
                    response_body: None,
                });
            }
        }
        Ok(answer)
    }
}

#[async_trait::async_trait]
impl SearchProvider for DeepWikiProvider {
    fn name(&self) -> &str {
        "deepwiki"
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::Code]
    }

    async fn search_code(&self, options: &SearchOptions) -> SearchResult<Vec<SearchResultType>> {
        let Some(repo) = options.filters.repo.as_deref() else {
            log::debug!("DeepWiki skipped, no repository filter");
            return Ok(Vec::new());
        };

        let answer = self.ask_question(&options.query, repo).await?;
        if answer.trim().is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![SearchResultType::new(
            format!("DeepWiki: {repo}"),
            format!("https://deepwiki.com/{repo}"),
            "deepwiki",
        )
        .with_snippet(answer)])
    }

    fn config(&self) -> HashMap<String, String> {
        let mut config = HashMap::new();
        config.insert("base_url".to_string(), self.base_url.clone());
        config
    }
}
