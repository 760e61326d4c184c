//! # Search Gateway
//!
//! Routes search requests across several third-party search APIs through one
//! interface. A request either goes to a single provider picked by weighted random
//! selection, falling back to the others on failure, or fans out to several
//! providers concurrently with the results merged and deduplicated by URL.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use search_gateway::{build_engine, config::GatewayConfig, tools};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads config.yaml (if any) and provider API keys from the environment
//!     let config = GatewayConfig::load(None)?;
//!     let engine = build_engine(&config)?;
//!
//!     let outcome = tools::search_web(&engine, "Rust programming language", 5, "auto").await?;
//!
//!     for result in &outcome.results {
//!         println!("{}: {}", result.title, result.url);
//!     }
//!     println!("served by {:?}", outcome.providers_used);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod merge;
pub mod multi_provider;
pub mod providers;
pub mod registry;
pub mod render;
pub mod selector;
pub mod tools;
pub mod types;
pub mod utils;

// Re-export common types
pub use error::{FailureKind, SearchError, SearchResult as Result};
pub use multi_provider::{EngineConfig, SearchEngine};
pub use registry::{ProviderDescriptor, ProviderRegistry};
pub use types::{
    AttemptRecord, Capability, SearchOptions, SearchOutcome, SearchProvider, SearchResult,
};

use std::collections::HashSet;
use std::sync::Arc;

/// Build the registry described by `config` and wrap it in an engine
///
/// # Examples
///
/// ```rust
/// use search_gateway::{build_engine, config::GatewayConfig, Capability};
///
/// let engine = build_engine(&GatewayConfig::default()).unwrap();
/// // Keyless providers are available without any API keys
/// assert!(engine.registry().eligible(Capability::Code, None).is_ok());
/// ```
pub fn build_engine(config: &config::GatewayConfig) -> Result<SearchEngine> {
    let registry = providers::build_registry(config)?;
    log::info!("Search engine ready with {} provider(s)", registry.len());

    Ok(SearchEngine::new(Arc::new(registry))
        .with_config(config.engine_config())
        .with_merger(config.merger()))
}

/// Suggest what to check after a failed request, based on how providers failed
pub fn troubleshooting(error: &SearchError) -> Option<String> {
    let mut kinds: Vec<FailureKind> = error.attempts().iter().filter_map(|a| a.kind()).collect();
    if kinds.is_empty() {
        match error {
            SearchError::NoProvidersAvailable { .. } => {
                return Some(
                    "No providers are configured for this request. Set provider API keys \
                     (for example SERPER_API_KEY or BRAVE_API_KEY) or enable keyless providers."
                        .to_string(),
                );
            }
            SearchError::UnknownProvider(name) => {
                return Some(format!(
                    "'{name}' is not a registered provider. Run the `providers` command to list them."
                ));
            }
            SearchError::InvalidInput(_) | SearchError::ConfigError(_) => return None,
            other => kinds.push(other.kind()),
        }
    }
    let mut seen = HashSet::new();
    kinds.retain(|kind| seen.insert(*kind));

    let hints: Vec<&str> = kinds
        .iter()
        .map(|kind| match kind {
            FailureKind::Auth => {
                "Authentication failed. Check that the API key is valid and has the right permissions."
            }
            FailureKind::RateLimited => {
                "A provider's rate limit or quota was exceeded. Try again later or add another key."
            }
            FailureKind::Timeout => {
                "A provider did not answer in time. Raise search_timeout_seconds or retry."
            }
            FailureKind::Upstream => {
                "A provider returned a server or network error. Try again later."
            }
            FailureKind::InvalidResponse => {
                "A provider returned a response that could not be parsed."
            }
        })
        .collect();

    Some(hints.join(" "))
}
