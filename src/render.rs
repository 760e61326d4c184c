//! Rendering outcomes as Markdown or JSON for LLM consumption

use crate::{
    error::{SearchError, SearchResult as Result},
    types::{FetchResponse, SearchOutcome, SearchResult},
    utils::text::truncate_chars,
};
use serde_json::json;

/// Content longer than this is cut and suffixed with `...`
pub const MAX_CONTENT_CHARS: usize = 500;

pub const NO_RESULTS: &str = "No results found.";

/// Numbered Markdown list of results
pub fn markdown(outcome: &SearchOutcome) -> String {
    if outcome.results.is_empty() {
        return NO_RESULTS.to_string();
    }

    let mut lines = Vec::with_capacity(outcome.results.len() * 3);
    for (i, result) in outcome.results.iter().enumerate() {
        lines.push(format!("## {}. {}", i + 1, result.title));
        push_body(&mut lines, result);
    }
    lines.join("\n")
}

/// Markdown grouped into one section per provider, in `providers_used` order
pub fn code_sections(outcome: &SearchOutcome) -> String {
    let mut sections = Vec::new();

    for provider in &outcome.providers_used {
        let results: Vec<&SearchResult> = outcome
            .results
            .iter()
            .filter(|r| &r.provider == provider)
            .collect();
        if results.is_empty() {
            continue;
        }

        let mut lines = vec![format!("## {}", section_title(provider))];
        if provider == "deepwiki" {
            lines.extend(results.iter().map(|r| r.content().to_string()));
        } else {
            for (i, result) in results.iter().enumerate() {
                lines.push(format!("### {}. {}", i + 1, result.title));
                push_body(&mut lines, result);
            }
        }
        sections.push(lines.join("\n").trim().to_string());
    }

    if sections.is_empty() {
        NO_RESULTS.to_string()
    } else {
        sections.join("\n\n")
    }
}

/// `{results, providers_used, elapsed_ms}` as pretty JSON
pub fn json(outcome: &SearchOutcome) -> Result<String> {
    let results: Vec<serde_json::Value> = outcome
        .results
        .iter()
        .map(|r| {
            json!({
                "title": r.title,
                "url": r.url,
                "content": r.content(),
                "source": r.provider,
            })
        })
        .collect();

    let value = json!({
        "results": results,
        "providers_used": outcome.providers_used,
        "elapsed_ms": outcome.elapsed_ms,
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Markdown error message; exhausted fallbacks list every attempt
pub fn error(error: &SearchError) -> String {
    let mut out = match error {
        SearchError::AllProvidersFailed { attempts } => {
            format!("**Error:** All {} provider(s) failed", attempts.len())
        }
        other => format!("**Error:** {other}"),
    };

    for attempt in error.attempts() {
        out.push_str(&format!("\n- {attempt}"));
    }
    out
}

/// Extracted page, with its title as a heading when known
pub fn fetched(page: &FetchResponse) -> String {
    if page.title.is_empty() || page.content.trim_start().starts_with("# ") {
        page.content.clone()
    } else {
        format!("# {}\n\n{}", page.title, page.content)
    }
}

fn push_body(lines: &mut Vec<String>, result: &SearchResult) {
    lines.push(format!("**URL:** {}", result.url));
    let content = result.content();
    if content.is_empty() {
        lines.push(String::new());
    } else {
        lines.push(format!("\n{}\n", truncate_chars(content, MAX_CONTENT_CHARS)));
    }
}

fn section_title(provider: &str) -> &str {
    match provider {
        "exa_mcp" => "Exa Code Context",
        "grep_app" => "grep.app",
        "deepwiki" => "DeepWiki",
        other => other,
    }
}
