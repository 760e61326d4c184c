//! Exa through its free MCP endpoint (no API key)
//!
//! Web search uses the `web_search_exa` tool and code search uses
//! `get_code_context_exa`. Both answer with plain-text blocks that are parsed into
//! results here.

use crate::{
    error::{SearchError, SearchResult},
    providers::mcp,
    types::{Capability, SearchOptions, SearchProvider, SearchResult as SearchResultType},
    utils::{http::HttpClient, text::clip_chars},
};
use serde_json::json;
use std::collections::HashMap;

const DEFAULT_BASE_URL: &str = "https://mcp.exa.ai/mcp";
const MAX_CONTENT_CHARS: usize = 500;
const CODE_CONTEXT_TOKENS: u32 = 50_000;
/// Code context responses take longer than web search
pub const CODE_CONTEXT_TIMEOUT_MS: u64 = 60_000;

/// Exa MCP provider
#[derive(Debug, Clone)]
pub struct ExaMcpProvider {
    base_url: String,
    client: HttpClient,
}

impl ExaMcpProvider {
    pub fn new() -> SearchResult<Self> {
        Ok(Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client: HttpClient::with_timeout(CODE_CONTEXT_TIMEOUT_MS)?,
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

    async fn call_tool(
        &self,
        tool: &str,
        arguments: serde_json::Value,
    ) -> SearchResult<Vec<SearchResultType>> {
        let request = mcp::tool_call(tool, arguments, json!(1));
        let (_, body) = self
            .client
            .post_json_text(&self.base_url, &request, &[("Accept", mcp::ACCEPT)])
            .await?;

        let blocks = mcp::text_blocks(&body);
        if blocks.is_empty() {
            if let Some(message) = mcp::error_message(&body) {
                return Err(SearchError::HttpError {
                    message: format!("Exa MCP error: {message}"),
                    status_code: None,
                    response_body: None,
                });
            }
        }

        let results: Vec<SearchResultType> = blocks
            .iter()
            .flat_map(|block| parse_text_block(block))
            .collect();
        log::debug!("Exa MCP tool {tool} produced {} results", results.len());
        Ok(results)
    }
}

#[async_trait::async_trait]
impl SearchProvider for ExaMcpProvider {
    fn name(&self) -> &str {
        "exa_mcp"
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::Web, Capability::Code]
    }

    async fn search(&self, options: &SearchOptions) -> SearchResult<Vec<SearchResultType>> {
        if options.query.trim().is_empty() {
            return Err(SearchError::InvalidInput(
                "Query cannot be empty".to_string(),
            ));
        }

        let arguments = json!({
            "query": options.query,
            "numResults": options.max_results.unwrap_or(10),
            "type": "auto",
        });
        self.call_tool("web_search_exa", arguments).await
    }

    async fn search_code(&self, options: &SearchOptions) -> SearchResult<Vec<SearchResultType>> {
        if options.query.trim().is_empty() {
            return Err(SearchError::InvalidInput(
                "Query cannot be empty".to_string(),
            ));
        }

        let query = match &options.filters.repo {
            Some(repo) => format!("{} repo:{repo}", options.query),
            None => options.query.clone(),
        };
        let arguments = json!({
            "query": query,
            "tokensNum": CODE_CONTEXT_TOKENS,
        });
        self.call_tool("get_code_context_exa", arguments).await
    }

    fn config(&self) -> HashMap<String, String> {
        let mut config = HashMap::new();
        config.insert("base_url".to_string(), self.base_url.clone());
        config
    }
}

/// Parse one text block, choosing the format from its opening
fn parse_text_block(text: &str) -> Vec<SearchResultType> {
    let opening = clip_chars(text, 100);
    if opening.starts_with("##") || opening.contains("\n## ") {
        parse_code_sections(text)
    } else {
        parse_records(text)
    }
}

/// `Title:` / `URL:` / `Text:` records; continuation lines extend the text
fn parse_records(text: &str) -> Vec<SearchResultType> {
    #[derive(Default)]
    struct Record {
        title: String,
        url: String,
        content: String,
    }

    fn finish(record: Record, results: &mut Vec<SearchResultType>) {
        if !record.url.is_empty() {
            results.push(
                SearchResultType::new(record.title, record.url, "exa_mcp")
                    .with_snippet(clip_chars(&record.content, MAX_CONTENT_CHARS)),
            );
        }
    }

    let mut results = Vec::new();
    let mut current: Option<Record> = None;

    for line in text.lines().map(str::trim) {
        if let Some(title) = line.strip_prefix("Title:") {
            if let Some(record) = current.take() {
                finish(record, &mut results);
            }
            current = Some(Record {
                title: title.trim().to_string(),
                ..Default::default()
            });
            continue;
        }

        let record = current.get_or_insert_with(Record::default);
        if let Some(url) = line.strip_prefix("URL:") {
            record.url = url.trim().to_string();
        } else if let Some(body) = line.strip_prefix("Text:") {
            record.content = body.trim().to_string();
        } else if !record.content.is_empty() && !line.is_empty() {
            record.content.push(' ');
            record.content.push_str(line);
        }
    }

    if let Some(record) = current {
        finish(record, &mut results);
    }
    results
}

/// `## title` sections with a URL line and optional fenced code
fn parse_code_sections(text: &str) -> Vec<SearchResultType> {
    let text = text.trim_start();
    let text = text.strip_prefix("## ").unwrap_or(text);

    text.split("\n## ")
        .filter_map(|section| {
            let mut lines = section.trim().lines();
            let title = lines.next()?.trim_start_matches('#').trim().to_string();

            let mut url = String::new();
            let mut content: Vec<&str> = Vec::new();
            let mut in_code = false;
            for line in lines {
                let stripped = line.trim();
                if stripped.starts_with("http") {
                    url = stripped.to_string();
                } else if stripped.starts_with("```") {
                    in_code = !in_code;
                } else if in_code || !stripped.is_empty() {
                    content.push(line);
                }
            }

            if url.is_empty() || title.is_empty() {
                return None;
            }
            let content = content.join("\n");
            Some(
                SearchResultType::new(title, url, "exa_mcp")
                    .with_snippet(clip_chars(&content, MAX_CONTENT_CHARS)),
            )
        })
        .collect()
}
