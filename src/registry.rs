//! Provider registry: the configured adapters with their weights and capabilities

use crate::{
    error::{SearchError, SearchResult as Result},
    types::{Capability, SearchProvider},
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A registered adapter plus the settings the engine selects it by
#[derive(Clone)]
pub struct ProviderDescriptor {
    pub name: String,
    pub weight: u32,
    pub enabled: bool,
    pub capabilities: Vec<Capability>,
    /// Per-call timeout override
    pub timeout: Option<Duration>,
    /// Overrides for a single capability, taking precedence over `timeout`
    pub capability_timeouts: Vec<(Capability, Duration)>,
    pub provider: Arc<dyn SearchProvider>,
}

impl ProviderDescriptor {
    /// Describe an adapter using its own name and capabilities
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            name: provider.name().to_string(),
            weight: 0,
            enabled: true,
            capabilities: provider.capabilities().to_vec(),
            timeout: None,
            capability_timeouts: Vec::new(),
            provider,
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_capability_timeout(mut self, capability: Capability, timeout: Duration) -> Self {
        self.capability_timeouts.retain(|(c, _)| *c != capability);
        self.capability_timeouts.push((capability, timeout));
        self
    }

    /// Per-call timeout override for `capability` requests, if any
    pub fn timeout_for(&self, capability: Capability) -> Option<Duration> {
        self.capability_timeouts
            .iter()
            .find(|(c, _)| *c == capability)
            .map(|(_, timeout)| *timeout)
            .or(self.timeout)
    }

    pub fn with_capabilities(mut self, capabilities: &[Capability]) -> Self {
        self.capabilities = capabilities.to_vec();
        self
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

impl fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .field("enabled", &self.enabled)
            .field("capabilities", &self.capabilities)
            .field("timeout", &self.timeout)
            .field("capability_timeouts", &self.capability_timeouts)
            .finish()
    }
}

/// Immutable set of descriptors, kept in registration order
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<ProviderDescriptor>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor; names must be unique
    pub fn register(&mut self, descriptor: ProviderDescriptor) -> Result<()> {
        if self.get(&descriptor.name).is_some() {
            return Err(SearchError::ConfigError(format!(
                "Provider '{}' is registered twice",
                descriptor.name
            )));
        }
        self.providers.push(descriptor);
        Ok(())
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_provider(mut self, descriptor: ProviderDescriptor) -> Result<Self> {
        self.register(descriptor)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&ProviderDescriptor> {
        self.providers.iter().find(|d| d.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderDescriptor> {
        self.providers.iter()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Resolve the providers that may serve a request.
    ///
    /// With `explicit` names the result follows the caller's order and may include
    /// disabled providers; every name must exist. Without names, every enabled
    /// provider with `capability` is returned in registration order.
    pub fn eligible(
        &self,
        capability: Capability,
        explicit: Option<&[String]>,
    ) -> Result<Vec<&ProviderDescriptor>> {
        let eligible: Vec<&ProviderDescriptor> = match explicit {
            Some(names) => {
                let mut resolved: Vec<&ProviderDescriptor> = Vec::with_capacity(names.len());
                for name in names {
                    let descriptor = self
                        .get(name)
                        .ok_or_else(|| SearchError::UnknownProvider(name.clone()))?;

                    if !descriptor.supports(capability) {
                        log::warn!(
                            "Provider {} does not support {} requests, skipping",
                            descriptor.name,
                            capability
                        );
                        continue;
                    }
                    if resolved.iter().any(|d| d.name == descriptor.name) {
                        continue;
                    }
                    resolved.push(descriptor);
                }
                resolved
            }
            None => self
                .providers
                .iter()
                .filter(|d| d.enabled && d.supports(capability))
                .collect(),
        };

        if eligible.is_empty() {
            return Err(SearchError::NoProvidersAvailable { capability });
        }

        Ok(eligible)
    }
}
