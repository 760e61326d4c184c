//! Provider orchestration: weighted fallback and parallel fan-out

use crate::{
    error::{SearchError, SearchResult as Result},
    merge::ResultMerger,
    registry::{ProviderDescriptor, ProviderRegistry},
    selector,
    types::{
        AttemptRecord, Capability, FetchFormat, FetchResponse, ProviderSelection, SearchOptions,
        SearchOutcome, SearchProvider, SearchResult,
    },
};
use futures::future::join_all;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{timeout, Duration};

/// Default bound on a single adapter call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);
/// Default bound on a whole fan-out request
pub const DEFAULT_OVERALL_TIMEOUT: Duration = Duration::from_secs(45);
/// Default bound on a whole code-search fan-out
pub const DEFAULT_CODE_OVERALL_TIMEOUT: Duration = Duration::from_secs(90);

/// Timeouts applied by the engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-call timeout used when a provider has no override
    pub call_timeout: Duration,
    /// Deadline for every call of one fan-out request
    pub overall_timeout: Duration,
    /// Deadline for a code-search fan-out, whose providers answer more slowly
    pub code_overall_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            overall_timeout: DEFAULT_OVERALL_TIMEOUT,
            code_overall_timeout: DEFAULT_CODE_OVERALL_TIMEOUT,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_overall_timeout(mut self, timeout: Duration) -> Self {
        self.overall_timeout = timeout;
        self
    }

    pub fn with_code_overall_timeout(mut self, timeout: Duration) -> Self {
        self.code_overall_timeout = timeout;
        self
    }
}

/// Routes requests to providers from a shared, read-only registry
#[derive(Debug, Clone)]
pub struct SearchEngine {
    registry: Arc<ProviderRegistry>,
    config: EngineConfig,
    merger: ResultMerger,
}

impl SearchEngine {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            config: EngineConfig::default(),
            merger: ResultMerger::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_merger(mut self, merger: ResultMerger) -> Self {
        self.merger = merger;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Web search routed by `options.selection`.
    ///
    /// `Auto` uses weighted fallback; `All` and `Named` fan out with deduplication.
    pub async fn search(&self, options: &SearchOptions) -> Result<SearchOutcome> {
        match &options.selection {
            ProviderSelection::Auto => self.search_single(options).await,
            ProviderSelection::All => self.search_multi(options, None, true).await,
            ProviderSelection::Named(names) => {
                self.search_multi(options, Some(names.as_slice()), true).await
            }
        }
    }

    /// Weighted selection with fallback across enabled web providers
    pub async fn search_single(&self, options: &SearchOptions) -> Result<SearchOutcome> {
        let mut rng = StdRng::from_entropy();
        self.search_single_with_rng(options, &mut rng).await
    }

    /// [`search_single`](Self::search_single) with a caller-supplied random source
    pub async fn search_single_with_rng<R>(
        &self,
        options: &SearchOptions,
        rng: &mut R,
    ) -> Result<SearchOutcome>
    where
        R: Rng + ?Sized,
    {
        let started = Instant::now();
        let candidates = self.registry.eligible(Capability::Web, None)?;

        let (descriptor, mut results, attempts) = self
            .run_fallback(&candidates, Capability::Web, rng, |d| {
                invoke(d.provider.as_ref(), Capability::Web, options)
            })
            .await?;

        results.truncate(options.limit());
        let mut outcome = self
            .merger
            .merge(vec![(descriptor.name.clone(), results)], false);
        outcome.query = options.query.clone();
        outcome.attempts = attempts;
        outcome.elapsed_ms = started.elapsed().as_millis() as u64;

        log::info!(
            "Search served by {} after {} attempt(s) in {}ms",
            descriptor.name,
            outcome.attempts.len(),
            outcome.elapsed_ms
        );

        Ok(outcome)
    }

    /// Concurrent search across `providers`, or every enabled web provider
    pub async fn search_multi(
        &self,
        options: &SearchOptions,
        providers: Option<&[String]>,
        dedupe: bool,
    ) -> Result<SearchOutcome> {
        self.fan_out(Capability::Web, options, providers, dedupe).await
    }

    /// Concurrent code search across code-capable providers.
    ///
    /// A `Named` selection restricts the providers; results are not deduplicated so
    /// each provider's section stays intact.
    pub async fn search_code(&self, options: &SearchOptions) -> Result<SearchOutcome> {
        let explicit = match &options.selection {
            ProviderSelection::Named(names) => Some(names.as_slice()),
            _ => None,
        };
        self.fan_out(Capability::Code, options, explicit, false).await
    }

    /// Extract a page through the extraction providers, falling back on failure
    pub async fn fetch(&self, url: &str, format: FetchFormat) -> Result<FetchResponse> {
        let candidates = self.registry.eligible(Capability::Extraction, None)?;
        let mut rng = StdRng::from_entropy();

        let (_, page, attempts) = self
            .run_fallback(&candidates, Capability::Extraction, &mut rng, |d| {
                d.provider.fetch(url, format)
            })
            .await?;

        log::debug!("Fetched {url} after {} attempt(s)", attempts.len());
        Ok(page)
    }

    fn call_timeout_for(
        &self,
        descriptor: &ProviderDescriptor,
        capability: Capability,
    ) -> Duration {
        descriptor
            .timeout_for(capability)
            .unwrap_or(self.config.call_timeout)
    }

    fn overall_timeout_for(&self, capability: Capability) -> Duration {
        match capability {
            Capability::Code => self.config.code_overall_timeout,
            _ => self.config.overall_timeout,
        }
    }

    /// Try providers one at a time until one succeeds.
    ///
    /// Each provider is attempted at most once; the excluded set grows with every
    /// attempt until the selector has nothing left.
    async fn run_fallback<'a, T, R, F, Fut>(
        &self,
        candidates: &[&'a ProviderDescriptor],
        capability: Capability,
        rng: &mut R,
        call: F,
    ) -> Result<(&'a ProviderDescriptor, T, Vec<AttemptRecord>)>
    where
        R: Rng + ?Sized,
        F: Fn(&'a ProviderDescriptor) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut excluded: HashSet<String> = HashSet::new();
        let mut attempts: Vec<AttemptRecord> = Vec::new();

        while let Some(descriptor) = selector::pick(candidates, &excluded, rng) {
            excluded.insert(descriptor.name.clone());
            log::debug!(
                "Trying provider {} (attempt {} of {})",
                descriptor.name,
                attempts.len() + 1,
                candidates.len()
            );

            let limit = self.call_timeout_for(descriptor, capability);
            let (value, record) = timed_call(&descriptor.name, limit, call(descriptor)).await;
            attempts.push(record);

            if let Some(value) = value {
                return Ok((descriptor, value, attempts));
            }
        }

        log::warn!(
            "All {} provider(s) failed: {}",
            attempts.len(),
            attempts
                .iter()
                .map(|a| a.provider.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Err(SearchError::AllProvidersFailed { attempts })
    }

    /// Call every eligible provider at once and merge whatever succeeded.
    ///
    /// Results are merged in candidate order, never arrival order.
    async fn fan_out(
        &self,
        capability: Capability,
        options: &SearchOptions,
        explicit: Option<&[String]>,
        dedupe: bool,
    ) -> Result<SearchOutcome> {
        let started = Instant::now();
        let candidates = self.registry.eligible(capability, explicit)?;
        let deadline = started + self.overall_timeout_for(capability);
        let per_provider_limit = options.limit();

        log::info!(
            "Fanning out {capability} search to {} provider(s): {}",
            candidates.len(),
            candidates
                .iter()
                .map(|d| d.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let calls = candidates.iter().map(|descriptor| {
            let call_limit = self.call_timeout_for(descriptor, capability);
            async move {
                let remaining = deadline.saturating_duration_since(Instant::now());
                let call = invoke(descriptor.provider.as_ref(), capability, options);
                let settled = timed_call(&descriptor.name, call_limit.min(remaining), call).await;
                (*descriptor, settled)
            }
        });

        let mut batches: Vec<(String, Vec<SearchResult>)> = Vec::new();
        let mut attempts: Vec<AttemptRecord> = Vec::with_capacity(candidates.len());

        for (descriptor, (value, record)) in join_all(calls).await {
            attempts.push(record);
            if let Some(mut results) = value {
                results.truncate(per_provider_limit);
                batches.push((descriptor.name.clone(), results));
            }
        }

        if batches.is_empty() {
            log::warn!("Every provider failed for {capability} fan-out");
            return Err(SearchError::AllProvidersFailed { attempts });
        }

        let mut outcome = self.merger.merge(batches, dedupe);
        outcome.query = options.query.clone();
        outcome.attempts = attempts;
        outcome.elapsed_ms = started.elapsed().as_millis() as u64;

        log::info!(
            "Fan-out returned {} result(s) from {} of {} provider(s) in {}ms",
            outcome.results.len(),
            outcome.providers_used.len(),
            outcome.attempts.len(),
            outcome.elapsed_ms
        );

        Ok(outcome)
    }
}

async fn invoke(
    provider: &dyn SearchProvider,
    capability: Capability,
    options: &SearchOptions,
) -> Result<Vec<SearchResult>> {
    match capability {
        Capability::Web => provider.search(options).await,
        Capability::Code => provider.search_code(options).await,
        Capability::Extraction => Err(SearchError::InvalidInput(
            "Extraction requests are served by fetch, not search".to_string(),
        )),
    }
}

/// Run one adapter call under `limit`, recording how it went
async fn timed_call<T, Fut>(
    provider: &str,
    limit: Duration,
    call: Fut,
) -> (Option<T>, AttemptRecord)
where
    Fut: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let result = match timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(SearchError::Timeout {
            timeout_ms: limit.as_millis() as u64,
        }),
    };
    let latency = started.elapsed();

    match result {
        Ok(value) => {
            log::debug!("Provider {provider} succeeded in {}ms", latency.as_millis());
            (Some(value), AttemptRecord::succeeded(provider, latency))
        }
        Err(error) => {
            log::warn!(
                "Provider {provider} failed after {}ms: {error}",
                latency.as_millis()
            );
            (None, AttemptRecord::failed(provider, latency, &error))
        }
    }
}
