//! Search provider implementations

pub mod brave;
pub mod deepwiki;
pub mod exa;
pub mod exa_mcp;
pub mod grep_app;
pub mod jina;
pub mod mcp;
pub mod perplexity;
pub mod serper;
pub mod tavily;

// Re-export providers for convenience
pub use brave::BraveProvider;
pub use deepwiki::DeepWikiProvider;
pub use exa::ExaProvider;
pub use exa_mcp::ExaMcpProvider;
pub use grep_app::GrepAppProvider;
pub use jina::JinaProvider;
pub use perplexity::PerplexityProvider;
pub use serper::SerperProvider;
pub use tavily::TavilyProvider;

use crate::{
    config::{GatewayConfig, ProviderSettings, PROVIDER_NAMES},
    error::{SearchError, SearchResult},
    registry::{ProviderDescriptor, ProviderRegistry},
    types::{Capability, SearchProvider},
};
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;

/// A non-empty set of API keys; each request uses one chosen at random
#[derive(Debug, Clone)]
pub struct KeyRing {
    keys: Vec<String>,
}

impl KeyRing {
    pub fn new(provider: &str, keys: Vec<String>) -> SearchResult<Self> {
        let keys: Vec<String> = keys
            .into_iter()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .collect();

        if keys.is_empty() {
            return Err(SearchError::ConfigError(format!(
                "{provider} API key is required"
            )));
        }
        Ok(Self { keys })
    }

    pub fn pick(&self) -> &str {
        self.keys
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Build the provider registry described by `config`.
///
/// Providers that need a key are skipped when they have none. Everything else is
/// registered, disabled providers included, so they stay reachable by explicit
/// name. Registration follows [`PROVIDER_NAMES`] order.
pub fn build_registry(config: &GatewayConfig) -> SearchResult<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();
    let default_timeout = Duration::from_secs(config.search_timeout_seconds);

    for &name in PROVIDER_NAMES {
        let Some(settings) = config.provider(name) else {
            continue;
        };

        // The HTTP client must allow at least as long as the engine will wait
        let client_timeout = match (settings.timeout(), adapter_timeout(name)) {
            (Some(timeout), _) => timeout,
            (None, Some(timeout)) => timeout.max(default_timeout),
            (None, None) => default_timeout,
        };
        let timeout_ms = client_timeout.as_millis() as u64;

        let Some(provider) = create_provider(name, settings, timeout_ms)? else {
            log::debug!("Provider {name} has no API key configured, skipping");
            continue;
        };

        let mut descriptor = ProviderDescriptor::new(provider)
            .with_weight(settings.weight)
            .with_enabled(settings.enabled);
        descriptor = match settings.timeout() {
            Some(timeout) => descriptor.with_timeout(timeout),
            None => with_adapter_timeouts(name, descriptor),
        };

        log::info!(
            "Registered provider {name} (weight {}, {}, capabilities: {})",
            settings.weight,
            if settings.enabled { "enabled" } else { "disabled" },
            descriptor
                .capabilities
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        registry.register(descriptor)?;
    }

    Ok(registry)
}

/// Longest call an adapter needs when no timeout is configured for it
fn adapter_timeout(name: &str) -> Option<Duration> {
    match name {
        "deepwiki" => Some(Duration::from_millis(deepwiki::DEFAULT_TIMEOUT_MS)),
        "jina" => Some(Duration::from_millis(jina::DEFAULT_TIMEOUT_MS)),
        "exa_mcp" => Some(Duration::from_millis(exa_mcp::CODE_CONTEXT_TIMEOUT_MS)),
        _ => None,
    }
}

/// Per-call limits for adapters slower than the global default.
///
/// Exa MCP web search keeps the global default; only its code context calls wait longer.
fn with_adapter_timeouts(name: &str, descriptor: ProviderDescriptor) -> ProviderDescriptor {
    match (name, adapter_timeout(name)) {
        ("exa_mcp", Some(timeout)) => descriptor.with_capability_timeout(Capability::Code, timeout),
        (_, Some(timeout)) => descriptor.with_timeout(timeout),
        (_, None) => descriptor,
    }
}

/// Instantiate the adapter for `name`, or `None` when its required key is missing
fn create_provider(
    name: &str,
    settings: &ProviderSettings,
    timeout_ms: u64,
) -> SearchResult<Option<Arc<dyn SearchProvider>>> {
    let keys = settings.keys();
    let first_key = keys.first().map(String::as_str);

    let base_url = settings.base_url.as_deref();

    let provider: Arc<dyn SearchProvider> = match (name, first_key) {
        ("serper", Some(key)) => Arc::new(
            rebase(SerperProvider::new(key)?, base_url, SerperProvider::with_base_url)
                .with_timeout(timeout_ms)?,
        ),
        ("brave", Some(key)) => Arc::new(
            rebase(BraveProvider::new(key)?, base_url, BraveProvider::with_base_url)
                .with_timeout(timeout_ms)?,
        ),
        ("tavily", Some(_)) => Arc::new(
            rebase(
                TavilyProvider::with_keys(keys.clone())?,
                base_url,
                TavilyProvider::with_base_url,
            )
            .with_timeout(timeout_ms)?,
        ),
        ("perplexity", Some(key)) => Arc::new(
            rebase(PerplexityProvider::new(key)?, base_url, PerplexityProvider::with_base_url)
                .with_timeout(timeout_ms)?,
        ),
        ("exa", Some(_)) => Arc::new(
            rebase(ExaProvider::with_keys(keys.clone())?, base_url, ExaProvider::with_base_url)
                .with_timeout(timeout_ms)?,
        ),
        ("exa_mcp", _) => Arc::new(
            rebase(ExaMcpProvider::new()?, base_url, ExaMcpProvider::with_base_url)
                .with_timeout(timeout_ms)?,
        ),
        ("grep_app", _) => Arc::new(
            rebase(GrepAppProvider::new()?, base_url, GrepAppProvider::with_base_url)
                .with_timeout(timeout_ms)?,
        ),
        ("deepwiki", _) => Arc::new(
            rebase(DeepWikiProvider::new()?, base_url, DeepWikiProvider::with_base_url)
                .with_timeout(timeout_ms)?,
        ),
        ("jina", key) => Arc::new(
            rebase(JinaProvider::new(key)?, base_url, JinaProvider::with_base_url)
                .with_timeout(timeout_ms)?,
        ),
        ("serper" | "brave" | "tavily" | "perplexity" | "exa", None) => return Ok(None),
        (other, _) => return Err(SearchError::UnknownProvider(other.to_string())),
    };

    Ok(Some(provider))
}

fn rebase<P>(provider: P, base_url: Option<&str>, set: impl FnOnce(P, &str) -> P) -> P {
    match base_url {
        Some(base_url) => set(provider, base_url),
        None => provider,
    }
}
