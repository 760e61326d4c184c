//! Merging per-provider result lists into one outcome

use crate::types::{SearchOutcome, SearchResult};
use std::collections::HashSet;
use url::{form_urlencoded, Url};

/// Tracking parameters stripped before comparing URLs. Entries ending in `*` match by prefix.
pub const DEFAULT_TRACKING_PARAMS: &[&str] = &[
    "utm_*",
    "gclid",
    "gclsrc",
    "dclid",
    "fbclid",
    "msclkid",
    "twclid",
    "yclid",
    "igshid",
    "mc_cid",
    "mc_eid",
    "_hsenc",
    "_hsmi",
    "__hstc",
    "__hsfp",
    "ref_src",
];

/// Reduces URLs to a comparison key for duplicate detection
#[derive(Debug, Clone)]
pub struct UrlNormalizer {
    exact: HashSet<String>,
    prefixes: Vec<String>,
}

impl Default for UrlNormalizer {
    fn default() -> Self {
        Self::from_denylist(DEFAULT_TRACKING_PARAMS)
    }
}

impl UrlNormalizer {
    pub fn from_denylist<S: AsRef<str>>(params: &[S]) -> Self {
        let mut exact = HashSet::new();
        let mut prefixes = Vec::new();

        for param in params {
            let param = param.as_ref().trim().to_lowercase();
            if param.is_empty() {
                continue;
            }
            match param.strip_suffix('*') {
                Some(prefix) => prefixes.push(prefix.to_string()),
                None => {
                    exact.insert(param);
                }
            }
        }

        Self { exact, prefixes }
    }

    fn is_tracking_param(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.exact.contains(&name) || self.prefixes.iter().any(|p| name.starts_with(p))
    }

    /// Lowercase scheme and host, drop the fragment, tracking parameters and any
    /// trailing slash. Unparseable input is only trimmed.
    pub fn normalize(&self, url: &str) -> String {
        let url = url.trim();
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(_) => return url.trim_end_matches('/').to_string(),
        };

        let host = parsed.host_str().unwrap_or_default().to_lowercase();
        let port = parsed.port().map(|p| format!(":{p}")).unwrap_or_default();
        let path = parsed.path().trim_end_matches('/');

        let mut key = format!("{}://{host}{port}{path}", parsed.scheme().to_lowercase());

        let mut query = form_urlencoded::Serializer::new(String::new());
        let mut kept = 0;
        for (name, value) in parsed.query_pairs() {
            if !self.is_tracking_param(&name) {
                query.append_pair(&name, &value);
                kept += 1;
            }
        }

        if kept > 0 {
            key.push('?');
            key.push_str(&query.finish());
        }

        key
    }
}

/// Concatenates provider batches and optionally removes duplicate URLs
#[derive(Debug, Clone, Default)]
pub struct ResultMerger {
    normalizer: UrlNormalizer,
}

impl ResultMerger {
    pub fn new(normalizer: UrlNormalizer) -> Self {
        Self { normalizer }
    }

    pub fn normalizer(&self) -> &UrlNormalizer {
        &self.normalizer
    }

    /// Merge `(provider, results)` batches in the order given.
    ///
    /// Each provider's ranking is preserved. With `dedupe`, the first result for a
    /// normalized URL wins and later ones are dropped. Every batch's provider is listed
    /// in `providers_used`, even when all its results were duplicates. Query, timing
    /// and attempts are left for the caller to fill in.
    pub fn merge(&self, batches: Vec<(String, Vec<SearchResult>)>, dedupe: bool) -> SearchOutcome {
        let mut seen: HashSet<String> = HashSet::new();
        let mut results = Vec::new();
        let mut providers_used = Vec::with_capacity(batches.len());
        let mut dropped = 0usize;

        for (provider, batch) in batches {
            for mut result in batch {
                if dedupe && !seen.insert(self.normalizer.normalize(&result.url)) {
                    dropped += 1;
                    continue;
                }
                result.provider = provider.clone();
                results.push(result);
            }
            providers_used.push(provider);
        }

        if dropped > 0 {
            log::debug!("Dropped {dropped} duplicate results during merge");
        }

        SearchOutcome {
            results,
            providers_used,
            ..Default::default()
        }
    }
}
