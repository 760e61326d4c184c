//! Error types for the search gateway

use crate::types::{AttemptRecord, Capability};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for gateway operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Comprehensive error types for adapter calls and orchestration
#[derive(Error, Debug, Clone)]
pub enum SearchError {
    /// HTTP request failed
    #[error("HTTP request failed: {message}")]
    HttpError {
        message: String,
        status_code: Option<u16>,
        response_body: Option<String>,
    },

    /// Invalid input parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Parsing error (JSON, SSE, Markdown)
    #[error("Parsing error: {0}")]
    ParseError(String),

    /// Timeout error
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// The provider was asked for something it cannot do
    #[error("Provider '{provider}' does not support {capability} requests")]
    Unsupported {
        provider: String,
        capability: Capability,
    },

    /// No enabled provider can serve the requested capability
    #[error("No {capability} providers available. Configure API keys or enable a provider.")]
    NoProvidersAvailable { capability: Capability },

    /// The caller named a provider that is not registered
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Every eligible provider was tried and none succeeded
    #[error("All providers failed: {}", describe_attempts(.attempts))]
    AllProvidersFailed { attempts: Vec<AttemptRecord> },

    /// Generic error for unhandled cases
    #[error("Search error: {0}")]
    Other(String),
}

/// Coarse classification of a failed adapter call, kept for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Auth,
    RateLimited,
    Timeout,
    Upstream,
    InvalidResponse,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Auth => write!(f, "auth_error"),
            FailureKind::RateLimited => write!(f, "rate_limited"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Upstream => write!(f, "upstream_error"),
            FailureKind::InvalidResponse => write!(f, "invalid_response"),
        }
    }
}

impl SearchError {
    /// Classify this error the way an attempt record stores it
    pub fn kind(&self) -> FailureKind {
        match self {
            SearchError::HttpError {
                status_code: Some(401 | 403),
                ..
            } => FailureKind::Auth,
            SearchError::HttpError {
                status_code: Some(429),
                ..
            } => FailureKind::RateLimited,
            SearchError::AuthenticationError(_) | SearchError::ConfigError(_) => FailureKind::Auth,
            SearchError::RateLimit(_) => FailureKind::RateLimited,
            SearchError::Timeout { .. } => FailureKind::Timeout,
            SearchError::ParseError(_) => FailureKind::InvalidResponse,
            _ => FailureKind::Upstream,
        }
    }

    /// Failed attempts carried by an `AllProvidersFailed` error
    pub fn attempts(&self) -> &[AttemptRecord] {
        match self {
            SearchError::AllProvidersFailed { attempts } => attempts,
            _ => &[],
        }
    }
}

fn describe_attempts(attempts: &[AttemptRecord]) -> String {
    if attempts.is_empty() {
        return "no attempts were made".to_string();
    }

    attempts
        .iter()
        .map(|attempt| attempt.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<reqwest::Error> for SearchError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            SearchError::Timeout {
                timeout_ms: 30_000, // Default per-call timeout
            }
        } else if error.is_status() {
            let status_code = error.status().map(|s| s.as_u16());
            let message = error.to_string();

            match status_code {
                Some(401 | 403) => SearchError::AuthenticationError(message),
                Some(429) => SearchError::RateLimit(message),
                _ => SearchError::HttpError {
                    message,
                    status_code,
                    response_body: None,
                },
            }
        } else if error.is_decode() {
            SearchError::ParseError(error.to_string())
        } else {
            SearchError::HttpError {
                message: error.to_string(),
                status_code: None,
                response_body: None,
            }
        }
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(error: serde_json::Error) -> Self {
        SearchError::ParseError(format!("JSON parsing failed: {error}"))
    }
}

impl From<url::ParseError> for SearchError {
    fn from(error: url::ParseError) -> Self {
        SearchError::InvalidInput(format!("Invalid URL: {error}"))
    }
}

impl From<std::io::Error> for SearchError {
    fn from(error: std::io::Error) -> Self {
        SearchError::Other(format!("IO error: {error}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_failure_kind_classification() {
        let cases = vec![
            (
                SearchError::HttpError {
                    message: "Unauthorized".to_string(),
                    status_code: Some(401),
                    response_body: None,
                },
                FailureKind::Auth,
            ),
            (
                SearchError::HttpError {
                    message: "Too Many Requests".to_string(),
                    status_code: Some(429),
                    response_body: None,
                },
                FailureKind::RateLimited,
            ),
            (
                SearchError::HttpError {
                    message: "Bad Gateway".to_string(),
                    status_code: Some(502),
                    response_body: None,
                },
                FailureKind::Upstream,
            ),
            (SearchError::Timeout { timeout_ms: 10 }, FailureKind::Timeout),
            (
                SearchError::ParseError("bad json".to_string()),
                FailureKind::InvalidResponse,
            ),
            (
                SearchError::RateLimit("slow down".to_string()),
                FailureKind::RateLimited,
            ),
            (
                SearchError::ConfigError("missing key".to_string()),
                FailureKind::Auth,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.kind(), expected, "unexpected kind for {error}");
        }
    }

    #[test]
    fn test_all_providers_failed_lists_every_attempt() {
        let error = SearchError::AllProvidersFailed {
            attempts: vec![
                AttemptRecord::failed(
                    "serper",
                    Duration::from_millis(12),
                    &SearchError::RateLimit("quota".to_string()),
                ),
                AttemptRecord::failed(
                    "brave",
                    Duration::from_millis(30),
                    &SearchError::Timeout { timeout_ms: 30 },
                ),
            ],
        };

        let message = error.to_string();
        assert!(message.contains("serper"));
        assert!(message.contains("rate_limited"));
        assert!(message.contains("brave"));
        assert!(message.contains("timeout"));
        assert_eq!(error.attempts().len(), 2);
    }

    #[test]
    fn test_no_providers_message_names_capability() {
        let error = SearchError::NoProvidersAvailable {
            capability: Capability::Code,
        };
        assert!(error.to_string().contains("code"));
        assert!(error.attempts().is_empty());
    }
}
