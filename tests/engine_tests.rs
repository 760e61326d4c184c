//! Engine integration tests
//!
//! Exercise the fallback and fan-out coordinators end to end with scripted
//! providers: ordering, exclusion, timeouts, deduplication and routing errors.

use async_trait::async_trait;
use rand::{rngs::StdRng, SeedableRng};
use search_gateway::{
    build_engine,
    config::GatewayConfig,
    error::{FailureKind, SearchError},
    multi_provider::{EngineConfig, SearchEngine},
    registry::{ProviderDescriptor, ProviderRegistry},
    types::{
        Capability, FetchFormat, FetchResponse, ProviderSelection, SearchFilters, SearchOptions,
        SearchProvider, SearchResult,
    },
    tools,
};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

#[derive(Debug)]
struct ScriptedProvider {
    name: String,
    capabilities: Vec<Capability>,
    urls: Vec<String>,
    error: Option<SearchError>,
    delay: Duration,
    calls: AtomicUsize,
    seen_repos: Mutex<Vec<Option<String>>>,
}

impl ScriptedProvider {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            capabilities: vec![Capability::Web],
            urls: vec![
                format!("https://{name}.example.com/1"),
                format!("https://{name}.example.com/2"),
            ],
            error: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            seen_repos: Mutex::new(Vec::new()),
        }
    }

    fn failing(name: &str, error: SearchError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(name)
        }
    }

    fn with_urls(mut self, urls: &[&str]) -> Self {
        self.urls = urls.iter().map(|u| u.to_string()).collect();
        self
    }

    fn with_delay(mut self, millis: u64) -> Self {
        self.delay = Duration::from_millis(millis);
        self
    }

    fn with_capabilities(mut self, capabilities: &[Capability]) -> Self {
        self.capabilities = capabilities.to_vec();
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn respond(&self, options: &SearchOptions) -> Result<Vec<SearchResult>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_repos
            .lock()
            .unwrap()
            .push(options.filters.repo.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.error {
            Some(error) => Err(error.clone()),
            None => Ok(self
                .urls
                .iter()
                .map(|url| SearchResult::new(format!("{} {url}", self.name), url, &self.name))
                .collect()),
        }
    }
}

#[async_trait]
impl SearchProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    async fn search(&self, options: &SearchOptions) -> Result<Vec<SearchResult>, SearchError> {
        self.respond(options).await
    }

    async fn search_code(&self, options: &SearchOptions) -> Result<Vec<SearchResult>, SearchError> {
        self.respond(options).await
    }

    async fn fetch(&self, url: &str, format: FetchFormat) -> Result<FetchResponse, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.error {
            Some(error) => Err(error.clone()),
            None => Ok(FetchResponse {
                url: url.to_string(),
                title: "Page".to_string(),
                content: format!("# Page\nfetched by {}", self.name),
                format,
                provider: self.name.clone(),
                elapsed_ms: 0,
            }),
        }
    }
}

fn upstream_error() -> SearchError {
    SearchError::HttpError {
        message: "Server error (502)".to_string(),
        status_code: Some(502),
        response_body: None,
    }
}

fn engine_with(entries: Vec<(Arc<ScriptedProvider>, u32)>) -> SearchEngine {
    let mut registry = ProviderRegistry::new();
    for (provider, weight) in entries {
        registry
            .register(ProviderDescriptor::new(provider).with_weight(weight))
            .unwrap();
    }
    SearchEngine::new(Arc::new(registry))
}

fn multi_options(query: &str) -> SearchOptions {
    SearchOptions {
        selection: ProviderSelection::All,
        ..SearchOptions::new(query)
    }
}

#[tokio::test]
async fn test_fallback_never_attempts_a_provider_twice() {
    let names = ["serper", "brave", "tavily", "perplexity", "exa_mcp"];
    let providers: Vec<Arc<ScriptedProvider>> = names
        .iter()
        .map(|name| Arc::new(ScriptedProvider::failing(name, upstream_error())))
        .collect();
    let engine = engine_with(
        providers
            .iter()
            .cloned()
            .zip([42, 33, 17, 8, 0])
            .collect(),
    );

    for seed in 0..25 {
        let mut rng = StdRng::seed_from_u64(seed);
        let error = engine
            .search_single_with_rng(&SearchOptions::new("rust"), &mut rng)
            .await
            .unwrap_err();

        let attempts = error.attempts();
        assert_eq!(attempts.len(), names.len());
        let unique: HashSet<&str> = attempts.iter().map(|a| a.provider.as_str()).collect();
        assert_eq!(unique.len(), attempts.len(), "seed {seed} repeated a provider");
    }

    for provider in &providers {
        assert_eq!(provider.calls(), 25);
    }
}

#[tokio::test]
async fn test_single_enabled_provider_is_the_only_one_used() {
    let only = Arc::new(ScriptedProvider::new("brave"));
    let mut registry = ProviderRegistry::new();
    registry
        .register(ProviderDescriptor::new(only.clone()).with_weight(33))
        .unwrap();
    registry
        .register(
            ProviderDescriptor::new(Arc::new(ScriptedProvider::new("serper")))
                .with_weight(42)
                .with_enabled(false),
        )
        .unwrap();
    let engine = SearchEngine::new(Arc::new(registry));

    let outcome = engine.search(&SearchOptions::new("rust")).await.unwrap();

    assert_eq!(outcome.providers_used, vec!["brave"]);
    assert_eq!(outcome.attempts.len(), 1);
    assert!(outcome.results.iter().all(|r| r.provider == "brave"));
}

#[tokio::test]
async fn test_all_failing_reports_every_eligible_provider() {
    let mut registry = ProviderRegistry::new();
    registry
        .register(
            ProviderDescriptor::new(Arc::new(ScriptedProvider::failing(
                "serper",
                SearchError::AuthenticationError("Invalid API key (HTTP 401)".to_string()),
            )))
            .with_weight(42),
        )
        .unwrap();
    registry
        .register(
            ProviderDescriptor::new(Arc::new(ScriptedProvider::failing(
                "brave",
                SearchError::RateLimit("Rate limit exceeded (HTTP 429)".to_string()),
            )))
            .with_weight(33),
        )
        .unwrap();
    registry
        .register(
            ProviderDescriptor::new(Arc::new(ScriptedProvider::failing(
                "tavily",
                SearchError::ParseError("bad json".to_string()),
            )))
            .with_weight(17),
        )
        .unwrap();
    registry
        .register(
            ProviderDescriptor::new(Arc::new(ScriptedProvider::new("perplexity")))
                .with_weight(8)
                .with_enabled(false),
        )
        .unwrap();
    let engine = SearchEngine::new(Arc::new(registry));

    let error = engine
        .search_single(&SearchOptions::new("rust"))
        .await
        .unwrap_err();

    let kinds: HashMap<&str, FailureKind> = error
        .attempts()
        .iter()
        .map(|a| (a.provider.as_str(), a.kind().unwrap()))
        .collect();
    assert_eq!(kinds.len(), 3);
    assert_eq!(kinds["serper"], FailureKind::Auth);
    assert_eq!(kinds["brave"], FailureKind::RateLimited);
    assert_eq!(kinds["tavily"], FailureKind::InvalidResponse);

    let message = error.to_string();
    assert!(message.contains("serper") && message.contains("brave") && message.contains("tavily"));
}

#[tokio::test]
async fn test_fan_out_merge_order_ignores_completion_order() {
    let a = Arc::new(ScriptedProvider::new("a").with_delay(90));
    let b = Arc::new(ScriptedProvider::new("b").with_delay(45));
    let c = Arc::new(ScriptedProvider::new("c"));
    let engine = engine_with(vec![(a, 1), (b, 1), (c, 1)]);

    let outcome = engine
        .search_multi(&SearchOptions::new("rust"), None, true)
        .await
        .unwrap();

    let sources: Vec<&str> = outcome.results.iter().map(|r| r.provider.as_str()).collect();
    assert_eq!(sources, vec!["a", "a", "b", "b", "c", "c"]);
    assert_eq!(outcome.providers_used, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_fan_out_deduplicates_normalized_urls() {
    let first = Arc::new(
        ScriptedProvider::new("serper").with_urls(&["https://example.com/x?utm_source=foo"]),
    );
    let second = Arc::new(
        ScriptedProvider::new("brave")
            .with_urls(&["https://example.com/x/", "https://example.com/y"]),
    );
    let engine = engine_with(vec![(first, 42), (second, 33)]);

    let outcome = engine.search(&multi_options("rust")).await.unwrap();

    let urls: Vec<&str> = outcome.results.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        vec!["https://example.com/x?utm_source=foo", "https://example.com/y"]
    );
    assert_eq!(outcome.results[0].provider, "serper");
    assert_eq!(outcome.providers_used, vec!["serper", "brave"]);
}

#[tokio::test]
async fn test_unknown_explicit_provider_makes_no_calls() {
    let serper = Arc::new(ScriptedProvider::new("serper"));
    let brave = Arc::new(ScriptedProvider::new("brave"));
    let engine = engine_with(vec![(serper.clone(), 42), (brave.clone(), 33)]);

    let names = vec!["serper".to_string(), "bing".to_string()];
    let error = engine
        .search_multi(&SearchOptions::new("rust"), Some(&names), true)
        .await
        .unwrap_err();

    assert!(matches!(error, SearchError::UnknownProvider(ref name) if name == "bing"));
    assert_eq!(serper.calls(), 0);
    assert_eq!(brave.calls(), 0);
}

#[tokio::test]
async fn test_fan_out_call_timeout_spares_siblings() {
    let slow = Arc::new(ScriptedProvider::new("slow").with_delay(400));
    let fast = Arc::new(ScriptedProvider::new("fast").with_delay(10));
    let mut registry = ProviderRegistry::new();
    registry
        .register(
            ProviderDescriptor::new(slow)
                .with_weight(1)
                .with_timeout(Duration::from_millis(30)),
        )
        .unwrap();
    registry
        .register(ProviderDescriptor::new(fast).with_weight(1))
        .unwrap();
    let engine = SearchEngine::new(Arc::new(registry));

    let outcome = engine.search(&multi_options("rust")).await.unwrap();

    assert_eq!(outcome.providers_used, vec!["fast"]);
    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.attempts.len(), 2);
    assert_eq!(outcome.attempts[0].provider, "slow");
    assert_eq!(outcome.attempts[0].kind(), Some(FailureKind::Timeout));
    assert!(outcome.attempts[1].is_success());
    assert!(outcome.elapsed_ms < 400);
}

#[tokio::test]
async fn test_fan_out_fails_only_when_every_provider_fails() {
    let engine = engine_with(vec![
        (Arc::new(ScriptedProvider::failing("a", upstream_error())), 1),
        (
            Arc::new(ScriptedProvider::failing(
                "b",
                SearchError::Timeout { timeout_ms: 10 },
            )),
            1,
        ),
    ]);

    let error = engine.search(&multi_options("rust")).await.unwrap_err();
    match error {
        SearchError::AllProvidersFailed { attempts } => {
            let names: Vec<&str> = attempts.iter().map(|a| a.provider.as_str()).collect();
            assert_eq!(names, vec!["a", "b"]);
        }
        other => panic!("Expected AllProvidersFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_zero_weight_provider_rescues_fallback() {
    let weighted = Arc::new(ScriptedProvider::failing("serper", upstream_error()));
    let spare = Arc::new(ScriptedProvider::new("exa"));
    let engine = engine_with(vec![(weighted, 42), (spare.clone(), 0)]);

    for seed in 0..10 {
        let mut rng = StdRng::seed_from_u64(seed);
        let outcome = engine
            .search_single_with_rng(&SearchOptions::new("rust"), &mut rng)
            .await
            .unwrap();
        // weighted providers are always drawn before zero-weight ones
        assert_eq!(outcome.attempts[0].provider, "serper");
        assert_eq!(outcome.providers_used, vec!["exa"]);
    }
    assert_eq!(spare.calls(), 10);
}

#[tokio::test]
async fn test_selection_frequencies_follow_weights() {
    let engine = engine_with(vec![
        (Arc::new(ScriptedProvider::new("serper")), 60),
        (Arc::new(ScriptedProvider::new("brave")), 30),
        (Arc::new(ScriptedProvider::new("tavily")), 10),
    ]);

    let trials = 3000;
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..trials {
        let outcome = engine
            .search_single_with_rng(&SearchOptions::new("rust"), &mut rng)
            .await
            .unwrap();
        *counts.entry(outcome.providers_used[0].clone()).or_default() += 1;
    }

    for (name, expected) in [("serper", 0.6), ("brave", 0.3), ("tavily", 0.1)] {
        let observed = counts.get(name).copied().unwrap_or_default() as f64 / trials as f64;
        assert!(
            (observed - expected).abs() < 0.04,
            "{name}: observed {observed:.3}, expected {expected}"
        );
    }
}

#[tokio::test]
async fn test_explicit_selection_allows_disabled_provider() {
    let disabled = Arc::new(ScriptedProvider::new("exa"));
    let mut registry = ProviderRegistry::new();
    registry
        .register(
            ProviderDescriptor::new(Arc::new(ScriptedProvider::new("serper"))).with_weight(42),
        )
        .unwrap();
    registry
        .register(ProviderDescriptor::new(disabled.clone()).with_enabled(false))
        .unwrap();
    let engine = SearchEngine::new(Arc::new(registry));

    let options = SearchOptions {
        selection: ProviderSelection::parse("exa"),
        ..SearchOptions::new("rust")
    };
    let outcome = engine.search(&options).await.unwrap();

    assert_eq!(outcome.providers_used, vec!["exa"]);
    assert_eq!(disabled.calls(), 1);
}

#[tokio::test]
async fn test_code_search_passes_repo_filter_without_dedupe() {
    let exa = Arc::new(
        ScriptedProvider::new("exa_mcp")
            .with_capabilities(&[Capability::Web, Capability::Code])
            .with_urls(&["https://github.com/tokio-rs/tokio/blob/master/README.md"]),
    );
    let grep = Arc::new(
        ScriptedProvider::new("grep_app")
            .with_capabilities(&[Capability::Code])
            .with_urls(&["https://github.com/tokio-rs/tokio/blob/master/README.md/"]),
    );
    let web_only = Arc::new(ScriptedProvider::new("serper"));
    let engine = engine_with(vec![(exa.clone(), 15), (grep.clone(), 0), (web_only.clone(), 42)]);

    let options = SearchOptions {
        filters: SearchFilters {
            repo: Some("tokio-rs/tokio".to_string()),
        },
        ..SearchOptions::new("spawn")
    };
    let outcome = engine.search_code(&options).await.unwrap();

    assert_eq!(outcome.providers_used, vec!["exa_mcp", "grep_app"]);
    assert_eq!(outcome.results.len(), 2);
    assert_eq!(web_only.calls(), 0);
    assert_eq!(
        grep.seen_repos.lock().unwrap().as_slice(),
        &[Some("tokio-rs/tokio".to_string())]
    );
}

#[tokio::test]
async fn test_fetch_falls_back_between_extractors() {
    let broken = Arc::new(
        ScriptedProvider::failing("jina", upstream_error())
            .with_capabilities(&[Capability::Extraction]),
    );
    let backup = Arc::new(
        ScriptedProvider::new("reader").with_capabilities(&[Capability::Extraction]),
    );
    let engine = engine_with(vec![(broken.clone(), 1), (backup, 0)]);

    let page = engine
        .fetch("https://example.com", FetchFormat::Markdown)
        .await
        .unwrap();

    assert_eq!(page.provider, "reader");
    assert_eq!(broken.calls(), 1);
}

#[tokio::test]
async fn test_concurrent_requests_share_registry() {
    let serper = Arc::new(ScriptedProvider::new("serper").with_delay(5));
    let brave = Arc::new(ScriptedProvider::new("brave").with_delay(5));
    let engine = Arc::new(
        engine_with(vec![(serper.clone(), 50), (brave.clone(), 50)])
            .with_config(EngineConfig::new().with_call_timeout(Duration::from_secs(2))),
    );

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = engine.clone();
            tokio::spawn(async move {
                let options = if i % 2 == 0 {
                    multi_options("rust")
                } else {
                    SearchOptions::new("rust")
                };
                engine.search(&options).await
            })
        })
        .collect();

    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert!(!outcome.results.is_empty());
    }
    // 4 fan-outs hit both providers, 4 single searches hit one each
    assert_eq!(serper.calls() + brave.calls(), 12);
}

/// Default config with every web provider switched off except a keyed, disabled exa
fn config_with_disabled_exa(base_url: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    if let Some(exa_mcp) = config.providers.get_mut("exa_mcp") {
        exa_mcp.enabled = false;
    }
    if let Some(exa) = config.providers.get_mut("exa") {
        exa.api_key = Some("exa-key".to_string());
        exa.base_url = Some(base_url.to_string());
    }
    config
}

#[tokio::test]
async fn test_configured_disabled_provider_serves_explicit_fan_out() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(header("x-api-key", "exa-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "id": "1", "title": "Rust", "url": "https://www.rust-lang.org/", "text": "Rust" }
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = config_with_disabled_exa(&format!("{}/search", mock_server.uri()));
    let engine = build_engine(&config).unwrap();

    let exa = engine.registry().get("exa").unwrap();
    assert!(!exa.enabled);

    let explicit = vec!["exa".to_string()];
    let outcome = engine
        .search_multi(&SearchOptions::new("rust"), Some(explicit.as_slice()), true)
        .await
        .unwrap();
    assert_eq!(outcome.providers_used, vec!["exa"]);
    assert_eq!(outcome.results[0].url, "https://www.rust-lang.org/");

    // The same provider is never chosen automatically
    let error = tools::search_web(&engine, "rust", 5, "auto")
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        SearchError::NoProvidersAvailable {
            capability: Capability::Web
        }
    ));
}

#[tokio::test]
async fn test_web_search_without_keyed_providers_has_nothing_to_select() {
    // No API keys in the default config; only the keyless exa_mcp serves the web
    let mut config = GatewayConfig::default();
    if let Some(exa_mcp) = config.providers.get_mut("exa_mcp") {
        exa_mcp.enabled = false;
    }
    let engine = build_engine(&config).unwrap();

    for name in ["serper", "brave", "tavily", "perplexity", "exa"] {
        assert!(engine.registry().get(name).is_none(), "{name} has no key");
    }

    let error = tools::search_web(&engine, "rust", 5, "auto")
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        SearchError::NoProvidersAvailable {
            capability: Capability::Web
        }
    ));

    let error = tools::search_web(&engine, "rust", 5, "all")
        .await
        .unwrap_err();
    assert!(matches!(error, SearchError::NoProvidersAvailable { .. }));
}

#[tokio::test]
async fn test_code_fan_out_uses_longer_deadline() {
    let deepwiki = Arc::new(
        ScriptedProvider::new("deepwiki")
            .with_capabilities(&[Capability::Code])
            .with_delay(150),
    );
    let mut registry = ProviderRegistry::new();
    registry
        .register(ProviderDescriptor::new(deepwiki).with_timeout(Duration::from_millis(500)))
        .unwrap();
    let engine = SearchEngine::new(Arc::new(registry)).with_config(
        EngineConfig::new()
            .with_call_timeout(Duration::from_millis(50))
            .with_overall_timeout(Duration::from_millis(50))
            .with_code_overall_timeout(Duration::from_millis(500)),
    );

    let outcome = engine
        .search_code(&SearchOptions::new("spawn"))
        .await
        .unwrap();
    assert_eq!(outcome.providers_used, vec!["deepwiki"]);
}
