//! Gateway configuration loaded from YAML and the environment

use crate::{
    error::{SearchError, SearchResult as Result},
    merge::{ResultMerger, UrlNormalizer},
    multi_provider::EngineConfig,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Every provider the gateway knows about, in registration order
pub const PROVIDER_NAMES: &[&str] = &[
    "serper",
    "brave",
    "tavily",
    "perplexity",
    "exa_mcp",
    "exa",
    "grep_app",
    "deepwiki",
    "jina",
];

/// Files looked up in the working directory when no path is given
pub const CONFIG_FILE_NAMES: &[&str] = &["config.yaml", "config.yml", "search_gateway.yaml"];

/// Highest weight a provider may carry
pub const MAX_WEIGHT: u32 = 100;

/// Settings for a single provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub weight: u32,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub api_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    /// Endpoint replacing the provider's public API, such as a proxy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl ProviderSettings {
    fn new(weight: u32, enabled: bool) -> Self {
        Self {
            weight,
            enabled,
            ..Default::default()
        }
    }

    /// All configured keys, `api_key` first, without blanks or repeats
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for key in self.api_key.iter().chain(self.api_keys.iter()) {
            let key = key.trim();
            if !key.is_empty() && !keys.iter().any(|k| k == key) {
                keys.push(key.to_string());
            }
        }
        keys
    }

    pub fn has_key(&self) -> bool {
        !self.keys().is_empty()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

/// Top-level gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Default per-call timeout
    pub search_timeout_seconds: u64,
    /// Bound on a whole fan-out request
    pub overall_timeout_seconds: u64,
    /// Bound on a whole code-search fan-out
    pub code_overall_timeout_seconds: u64,
    /// Replaces the default tracking-parameter denylist when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_params: Option<Vec<String>>,
    pub providers: HashMap<String, ProviderSettings>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        // Weights follow each provider's free-tier quota share
        let providers = [
            ("serper", ProviderSettings::new(42, true)),
            ("brave", ProviderSettings::new(33, true)),
            ("tavily", ProviderSettings::new(17, true)),
            ("perplexity", ProviderSettings::new(8, true)),
            ("exa_mcp", ProviderSettings::new(15, true)),
            ("exa", ProviderSettings::new(0, false)),
            ("grep_app", ProviderSettings::new(0, true)),
            ("deepwiki", ProviderSettings::new(0, true)),
            ("jina", ProviderSettings::new(0, true)),
        ]
        .into_iter()
        .map(|(name, settings)| (name.to_string(), settings))
        .collect();

        Self {
            search_timeout_seconds: 30,
            overall_timeout_seconds: 45,
            code_overall_timeout_seconds: 90,
            tracking_params: None,
            providers,
        }
    }
}

/// On-disk shape: every field optional so a file only overrides what it names
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    search_timeout_seconds: Option<u64>,
    overall_timeout_seconds: Option<u64>,
    code_overall_timeout_seconds: Option<u64>,
    tracking_params: Option<Vec<String>>,
    #[serde(default)]
    providers: HashMap<String, ProviderSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProviderSection {
    weight: Option<u32>,
    enabled: Option<bool>,
    api_key: Option<String>,
    #[serde(default)]
    api_keys: Vec<String>,
    timeout_seconds: Option<u64>,
    base_url: Option<String>,
}

impl GatewayConfig {
    /// Load from `path`, or the first default file found in the working
    /// directory, then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let cwd = std::env::current_dir()?;
                match Self::discover(&cwd) {
                    Some(found) => Self::from_file(found)?,
                    None => {
                        log::debug!("No config file found, using defaults");
                        Self::default()
                    }
                }
            }
        };

        config.merge_env();
        config.validate()?;
        Ok(config)
    }

    /// First of [`CONFIG_FILE_NAMES`] that exists in `dir`
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SearchError::ConfigError(format!("Failed to read {}: {e}", path.display()))
        })?;
        log::info!("Loading configuration from {}", path.display());
        Self::from_yaml_str(&content)
    }

    /// Parse YAML on top of the defaults
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = if content.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(content)
                .map_err(|e| SearchError::ConfigError(format!("Invalid configuration: {e}")))?
        };

        let mut config = Self::default();
        if let Some(seconds) = file.search_timeout_seconds {
            config.search_timeout_seconds = seconds;
        }
        if let Some(seconds) = file.overall_timeout_seconds {
            config.overall_timeout_seconds = seconds;
        }
        if let Some(seconds) = file.code_overall_timeout_seconds {
            config.code_overall_timeout_seconds = seconds;
        }
        if file.tracking_params.is_some() {
            config.tracking_params = file.tracking_params;
        }

        for (name, section) in file.providers {
            let settings = config.providers.get_mut(&name).ok_or_else(|| {
                SearchError::ConfigError(format!(
                    "Unknown provider '{name}' in configuration. Known providers: {}",
                    PROVIDER_NAMES.join(", ")
                ))
            })?;

            if let Some(weight) = section.weight {
                settings.weight = weight;
            }
            if let Some(enabled) = section.enabled {
                settings.enabled = enabled;
            }
            if section.api_key.is_some() {
                settings.api_key = section.api_key;
            }
            if !section.api_keys.is_empty() {
                settings.api_keys = section.api_keys;
            }
            if section.timeout_seconds.is_some() {
                settings.timeout_seconds = section.timeout_seconds;
            }
            if section.base_url.is_some() {
                settings.base_url = section.base_url;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn merge_env(&mut self) {
        self.merge_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`, which maps variable names to values
    pub fn merge_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        for (provider, var) in [
            ("serper", "SERPER_API_KEY"),
            ("brave", "BRAVE_API_KEY"),
            ("tavily", "TAVILY_API_KEY"),
            ("perplexity", "PERPLEXITY_API_KEY"),
            ("jina", "JINA_API_KEY"),
            ("exa", "EXA_API_KEY"),
        ] {
            if let (Some(key), Some(settings)) = (lookup(var), self.providers.get_mut(provider)) {
                settings.api_key = Some(key);
            }
        }

        if let (Some(key), Some(settings)) =
            (lookup("TAVILY_API_KEY_2"), self.providers.get_mut("tavily"))
        {
            if !settings.api_keys.contains(&key) {
                settings.api_keys.push(key);
            }
        }

        if let Some(value) = lookup("SEARCH_TIMEOUT_SECONDS") {
            match value.trim().parse::<u64>() {
                Ok(seconds) => self.search_timeout_seconds = seconds,
                Err(_) => log::warn!("Ignoring invalid SEARCH_TIMEOUT_SECONDS value: {value}"),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.search_timeout_seconds == 0 {
            return Err(SearchError::ConfigError(
                "search_timeout_seconds must be greater than zero".to_string(),
            ));
        }
        if self.overall_timeout_seconds == 0 || self.code_overall_timeout_seconds == 0 {
            return Err(SearchError::ConfigError(
                "overall timeouts must be greater than zero".to_string(),
            ));
        }

        for (name, settings) in &self.providers {
            if !PROVIDER_NAMES.contains(&name.as_str()) {
                return Err(SearchError::ConfigError(format!(
                    "Unknown provider '{name}' in configuration"
                )));
            }
            if settings.weight > MAX_WEIGHT {
                return Err(SearchError::ConfigError(format!(
                    "Weight for '{name}' must be between 0 and {MAX_WEIGHT}, got {}",
                    settings.weight
                )));
            }
            if let Some(base_url) = &settings.base_url {
                let parsed = url::Url::parse(base_url).map_err(|e| {
                    SearchError::ConfigError(format!("Invalid base_url for '{name}': {e}"))
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(SearchError::ConfigError(format!(
                        "base_url for '{name}' must be http or https"
                    )));
                }
            }
            if settings.timeout_seconds == Some(0) {
                return Err(SearchError::ConfigError(format!(
                    "timeout_seconds for '{name}' must be greater than zero"
                )));
            }
        }

        Ok(())
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderSettings> {
        self.providers.get(name)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new()
            .with_call_timeout(Duration::from_secs(self.search_timeout_seconds))
            .with_overall_timeout(Duration::from_secs(self.overall_timeout_seconds))
            .with_code_overall_timeout(Duration::from_secs(self.code_overall_timeout_seconds))
    }

    pub fn merger(&self) -> ResultMerger {
        match &self.tracking_params {
            Some(params) => ResultMerger::new(UrlNormalizer::from_denylist(params)),
            None => ResultMerger::default(),
        }
    }
}
