//! Core types and traits for the search gateway

use crate::error::{FailureKind, SearchError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Represents a normalized result returned by any provider adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// URL of the result
    pub url: String,
    /// Title of the page, file or answer
    pub title: String,
    /// Snippet or extracted content
    pub snippet: Option<String>,
    /// The source website domain
    pub domain: Option<String>,
    /// When the result was published or last updated
    pub published_date: Option<String>,
    /// The provider that returned this result
    pub provider: String,
    /// Relevance or rank hint reported by the provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Raw response data from the provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, url: impl Into<String>, provider: &str) -> Self {
        let url = url.into();
        Self {
            domain: crate::utils::http::extract_domain(&url),
            url,
            title: title.into(),
            snippet: None,
            published_date: None,
            provider: provider.to_string(),
            score: None,
            raw: None,
        }
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        let snippet = snippet.into();
        self.snippet = if snippet.is_empty() { None } else { Some(snippet) };
        self
    }

    pub fn with_score(mut self, score: Option<f64>) -> Self {
        self.score = score;
        self
    }

    pub fn with_published_date(mut self, date: Option<String>) -> Self {
        self.published_date = date;
        self
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Snippet text, or an empty string when the provider sent none
    pub fn content(&self) -> &str {
        self.snippet.as_deref().unwrap_or("")
    }
}

/// What a provider can be asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Web,
    Code,
    Extraction,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Web => write!(f, "web"),
            Capability::Code => write!(f, "code"),
            Capability::Extraction => write!(f, "extraction"),
        }
    }
}

/// Output format hint for rendered search results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Markdown,
    Json,
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseFormat::Markdown => write!(f, "markdown"),
            ResponseFormat::Json => write!(f, "json"),
        }
    }
}

/// Output format for extracted page content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchFormat {
    #[default]
    Markdown,
    Text,
}

impl fmt::Display for FetchFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFormat::Markdown => write!(f, "markdown"),
            FetchFormat::Text => write!(f, "text"),
        }
    }
}

/// How the caller wants providers chosen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProviderSelection {
    /// Weighted random selection with fallback
    #[default]
    Auto,
    /// Fan out to every enabled provider
    All,
    /// Fan out to exactly these providers, in this order
    Named(Vec<String>),
}

impl ProviderSelection {
    /// Parse a selector string: `auto`, `multi`/`all`, a name, or a comma-separated list
    pub fn parse(selector: &str) -> Self {
        let selector = selector.trim().to_lowercase();
        match selector.as_str() {
            "" | "auto" => ProviderSelection::Auto,
            "multi" | "all" => ProviderSelection::All,
            _ => {
                let names: Vec<String> = selector
                    .split(',')
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty())
                    .collect();
                if names.is_empty() {
                    ProviderSelection::Auto
                } else {
                    ProviderSelection::Named(names)
                }
            }
        }
    }
}

/// Per-tool filters passed through to adapters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    /// `owner/name` repository scope for code search
    pub repo: Option<String>,
}

/// Options for a single gateway request
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// The search query text (or the URL for extraction)
    pub query: String,
    /// Maximum number of results; per provider in fan-out mode
    pub max_results: Option<u32>,
    /// Output format hint
    pub format: ResponseFormat,
    /// Provider selection mode
    pub selection: ProviderSelection,
    /// Tool-specific filters
    pub filters: SearchFilters,
    /// Timeout hint for adapter HTTP clients, in milliseconds
    pub timeout: Option<u64>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            query: String::new(),
            max_results: Some(10),
            format: ResponseFormat::Markdown,
            selection: ProviderSelection::Auto,
            filters: SearchFilters::default(),
            timeout: Some(30_000),
        }
    }
}

impl SearchOptions {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn limit(&self) -> usize {
        self.max_results.unwrap_or(10) as usize
    }
}

/// Content extracted from a single page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub url: String,
    pub title: String,
    pub content: String,
    pub format: FetchFormat,
    pub provider: String,
    pub elapsed_ms: u64,
}

/// Why an attempt failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// One adapter call made while serving a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub provider: String,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<AttemptFailure>,
}

impl AttemptRecord {
    pub fn succeeded(provider: &str, latency: Duration) -> Self {
        Self {
            provider: provider.to_string(),
            latency_ms: latency.as_millis() as u64,
            failure: None,
        }
    }

    pub fn failed(provider: &str, latency: Duration, error: &SearchError) -> Self {
        Self {
            provider: provider.to_string(),
            latency_ms: latency.as_millis() as u64,
            failure: Some(AttemptFailure {
                kind: error.kind(),
                message: error.to_string(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn kind(&self) -> Option<FailureKind> {
        self.failure.as_ref().map(|failure| failure.kind)
    }
}

impl fmt::Display for AttemptRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.failure {
            None => write!(f, "{}: ok ({}ms)", self.provider, self.latency_ms),
            Some(failure) => write!(
                f,
                "{}: {} after {}ms ({})",
                self.provider, failure.kind, self.latency_ms, failure.message
            ),
        }
    }
}

/// The unit returned to the caller for a search request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub query: String,
    pub results: Vec<SearchResult>,
    /// Providers whose results were used, in contribution order
    pub providers_used: Vec<String>,
    pub elapsed_ms: u64,
    /// Every adapter call made for this request, including failures
    pub attempts: Vec<AttemptRecord>,
}

impl SearchOutcome {
    pub fn failed_attempts(&self) -> impl Iterator<Item = &AttemptRecord> {
        self.attempts.iter().filter(|attempt| !attempt.is_success())
    }
}

/// Trait that all provider adapters must satisfy
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync + std::fmt::Debug {
    /// Name of the provider
    fn name(&self) -> &str;

    /// Capabilities the adapter implements
    fn capabilities(&self) -> &[Capability] {
        &[Capability::Web]
    }

    /// Web search
    async fn search(&self, options: &SearchOptions) -> Result<Vec<SearchResult>, SearchError> {
        let _ = options;
        Err(self.unsupported(Capability::Web))
    }

    /// Code search, honouring `options.filters.repo` when set
    async fn search_code(
        &self,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let _ = options;
        Err(self.unsupported(Capability::Code))
    }

    /// Extract the content of one page
    async fn fetch(&self, url: &str, format: FetchFormat) -> Result<FetchResponse, SearchError> {
        let _ = (url, format);
        Err(self.unsupported(Capability::Extraction))
    }

    /// Get provider configuration (for debugging/logging)
    fn config(&self) -> HashMap<String, String> {
        HashMap::new()
    }

    #[doc(hidden)]
    fn unsupported(&self, capability: Capability) -> SearchError {
        SearchError::Unsupported {
            provider: self.name().to_string(),
            capability,
        }
    }
}
