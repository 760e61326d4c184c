//! HTTP utilities for making requests to provider APIs

use crate::error::{SearchError, SearchResult};
use reqwest::{header::HeaderMap, Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use url::Url;

const USER_AGENT: &str = concat!("search-gateway/", env!("CARGO_PKG_VERSION"));

/// Default adapter timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// HTTP client wrapper that turns provider failures into typed errors
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client with the default timeout
    pub fn new() -> SearchResult<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT_MS)
    }

    /// Create a new HTTP client with custom timeout
    pub fn with_timeout(timeout_ms: u64) -> SearchResult<Self> {
        let timeout = Duration::from_millis(timeout_ms);
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::ConfigError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, timeout })
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    /// Make a GET request with query parameters and headers, deserializing JSON
    pub async fn get_json<T>(
        &self,
        url: &str,
        params: &[(&str, String)],
        headers: &[(&str, &str)],
    ) -> SearchResult<T>
    where
        T: DeserializeOwned,
    {
        let request = with_headers(self.client.get(url).query(params), headers);
        let text = self.send_text(request).await?.1;
        parse_json(&text)
    }

    /// Make a GET request and return the response body as text
    pub async fn get_text(&self, url: &str, headers: &[(&str, &str)]) -> SearchResult<String> {
        let request = with_headers(self.client.get(url), headers);
        Ok(self.send_text(request).await?.1)
    }

    /// POST a JSON body and deserialize the JSON response
    pub async fn post_json<B, T>(
        &self,
        url: &str,
        body: &B,
        headers: &[(&str, &str)],
    ) -> SearchResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let text = self.post_json_text(url, body, headers).await?.1;
        parse_json(&text)
    }

    /// POST a JSON body and return the response headers and body text
    pub async fn post_json_text<B>(
        &self,
        url: &str,
        body: &B,
        headers: &[(&str, &str)],
    ) -> SearchResult<(HeaderMap, String)>
    where
        B: Serialize + ?Sized,
    {
        let request = with_headers(self.client.post(url).json(body), headers);
        self.send_text(request).await
    }

    async fn send_text(&self, request: RequestBuilder) -> SearchResult<(HeaderMap, String)> {
        let response = request.send().await.map_err(|e| self.map_send_error(e))?;
        self.handle_response_text(response).await
    }

    fn map_send_error(&self, error: reqwest::Error) -> SearchError {
        if error.is_timeout() {
            SearchError::Timeout {
                timeout_ms: self.timeout_ms(),
            }
        } else {
            SearchError::from(error)
        }
    }

    /// Handle HTTP response and return headers and body text
    async fn handle_response_text(&self, response: Response) -> SearchResult<(HeaderMap, String)> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(|e| self.map_send_error(e))?;

        if status.is_success() {
            Ok((headers, body))
        } else {
            Err(status_error(status.as_u16(), body))
        }
    }
}

fn with_headers(mut request: RequestBuilder, headers: &[(&str, &str)]) -> RequestBuilder {
    for (key, value) in headers {
        request = request.header(*key, *value);
    }
    request
}

fn parse_json<T: DeserializeOwned>(text: &str) -> SearchResult<T> {
    serde_json::from_str(text).map_err(|e| {
        SearchError::ParseError(format!(
            "Failed to parse provider response: {e}. Response: {}",
            crate::utils::text::truncate_chars(text, 200)
        ))
    })
}

/// Map a non-success HTTP status onto the adapter error taxonomy
pub fn status_error(status_code: u16, body: String) -> SearchError {
    let body = if body.is_empty() { None } else { Some(body) };
    match status_code {
        401 => SearchError::AuthenticationError("Invalid API key (HTTP 401)".to_string()),
        403 => SearchError::AuthenticationError(
            "Access forbidden, the API key may lack permissions (HTTP 403)".to_string(),
        ),
        429 => SearchError::RateLimit("Rate limit exceeded (HTTP 429)".to_string()),
        500..=599 => SearchError::HttpError {
            message: format!("Server error ({status_code})"),
            status_code: Some(status_code),
            response_body: body,
        },
        _ => SearchError::HttpError {
            message: format!("Request failed with status: {status_code}"),
            status_code: Some(status_code),
            response_body: body,
        },
    }
}

/// Extract domain from a URL
pub fn extract_domain(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(|host| host.to_string()))
}
