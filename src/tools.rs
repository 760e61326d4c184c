//! Tool-level operations: input validation in front of the engine

use crate::{
    error::{SearchError, SearchResult as Result},
    multi_provider::SearchEngine,
    types::{
        FetchFormat, FetchResponse, ProviderSelection, SearchFilters, SearchOptions,
        SearchOutcome,
    },
};
use url::Url;

pub const MAX_QUERY_CHARS: usize = 500;
pub const MAX_RESULTS_LIMIT: u32 = 50;
pub const DEFAULT_MAX_RESULTS: u32 = 10;

/// Search the web.
///
/// `provider` is a selector string: empty or `auto` for weighted fallback, `multi`
/// or `all` to fan out to every enabled provider, or one or more comma-separated
/// provider names to fan out to exactly those. Fan-out modes deduplicate by URL and
/// apply `max_results` per provider.
pub async fn search_web(
    engine: &SearchEngine,
    query: &str,
    max_results: u32,
    provider: &str,
) -> Result<SearchOutcome> {
    let query = validate_query(query)?;
    validate_max_results(max_results)?;

    let options = SearchOptions {
        max_results: Some(max_results),
        selection: ProviderSelection::parse(provider),
        ..SearchOptions::new(query)
    };

    log::debug!(
        "search_web query={:?} selection={:?} max_results={max_results}",
        options.query,
        options.selection
    );
    engine.search(&options).await
}

/// Search code across every code-capable provider, optionally scoped to one repository
pub async fn search_code(
    engine: &SearchEngine,
    query: &str,
    repo: Option<&str>,
) -> Result<SearchOutcome> {
    let query = validate_query(query)?;
    let repo = match repo.map(str::trim).filter(|r| !r.is_empty()) {
        Some(repo) => Some(parse_repo(repo)?),
        None => None,
    };

    let options = SearchOptions {
        max_results: Some(DEFAULT_MAX_RESULTS),
        filters: SearchFilters { repo },
        ..SearchOptions::new(query)
    };
    engine.search_code(&options).await
}

/// Extract the content of an http(s) page
pub async fn fetch_webpage(
    engine: &SearchEngine,
    url: &str,
    format: FetchFormat,
) -> Result<FetchResponse> {
    let url = url.trim();
    let parsed = Url::parse(url)
        .map_err(|e| SearchError::InvalidInput(format!("Invalid URL '{url}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SearchError::InvalidInput(format!(
            "Only http and https URLs can be fetched, got '{}'",
            parsed.scheme()
        )));
    }

    engine.fetch(url, format).await
}

/// Reduce a repository reference to `owner/name`.
///
/// Accepts `owner/name`, `https://host/owner/name(.git)` and
/// `git@host:owner/name.git`. Local paths are rejected.
pub fn parse_repo(repo: &str) -> Result<String> {
    let repo = repo.trim();
    if repo.starts_with(['/', '~']) || repo.starts_with("./") || repo.starts_with("../") {
        return Err(SearchError::InvalidInput(
            "repo must be a git URL or owner/repo, not a local path".to_string(),
        ));
    }

    let path = if let Some(rest) = repo.strip_prefix("git@") {
        rest.split_once(':')
            .map(|(_, path)| path.to_string())
            .ok_or_else(|| SearchError::InvalidInput(format!("Invalid git remote: {repo}")))?
    } else if repo.starts_with("http://") || repo.starts_with("https://") {
        Url::parse(repo)
            .map_err(|e| SearchError::InvalidInput(format!("Invalid repository URL: {e}")))?
            .path()
            .to_string()
    } else {
        repo.to_string()
    };

    let mut parts = path.trim_matches('/').split('/').filter(|p| !p.is_empty());
    match (parts.next(), parts.next()) {
        (Some(owner), Some(name)) => {
            let name = name.strip_suffix(".git").unwrap_or(name);
            if name.is_empty() {
                return Err(SearchError::InvalidInput(
                    "repo must be in owner/repo format".to_string(),
                ));
            }
            Ok(format!("{owner}/{name}"))
        }
        _ => Err(SearchError::InvalidInput(
            "repo must be in owner/repo format".to_string(),
        )),
    }
}

fn validate_query(query: &str) -> Result<String> {
    let query = query.trim();
    if query.is_empty() {
        return Err(SearchError::InvalidInput(
            "Query cannot be empty".to_string(),
        ));
    }
    let length = query.chars().count();
    if length > MAX_QUERY_CHARS {
        return Err(SearchError::InvalidInput(format!(
            "Query is {length} characters, the limit is {MAX_QUERY_CHARS}"
        )));
    }
    Ok(query.to_string())
}

fn validate_max_results(max_results: u32) -> Result<()> {
    if !(1..=MAX_RESULTS_LIMIT).contains(&max_results) {
        return Err(SearchError::InvalidInput(format!(
            "max_results must be between 1 and {MAX_RESULTS_LIMIT}, got {max_results}"
        )));
    }
    Ok(())
}
