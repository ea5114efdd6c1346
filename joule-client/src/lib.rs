//! Joule Engine Client
//!
//! A type-safe HTTP client for the external compute engine's cluster and job
//! APIs. The coordinator drives aggregation runs exclusively through the
//! [`ComputeEngine`] trait, so tests can substitute a scripted engine.

pub mod engine;
pub mod error;

mod clusters;
mod jobs;

// Re-export commonly used types
pub use engine::ComputeEngine;
pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the compute engine API
///
/// Provides methods for the endpoints the coordinator consumes:
/// - Cluster roster, start and state polling
/// - Job creation, run-now and run polling
#[derive(Debug, Clone)]
pub struct EngineClient {
    /// Base URL of the engine (e.g. "https://engine.example.com")
    base_url: String,
    /// API token sent as a bearer header
    token: String,
    /// HTTP client instance
    client: Client,
}

impl EngineClient {
    /// Create a new engine client
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            client: Client::new(),
        }
    }

    /// Create an engine client with a custom HTTP client
    ///
    /// This allows configuring timeouts, proxies, TLS settings, etc.
    pub fn with_client(
        base_url: impl Into<String>,
        token: impl Into<String>,
        client: Client,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            client,
        }
    }

    /// Get the base URL of the engine
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = EngineClient::new("https://engine.example.com", "token");
        assert_eq!(client.base_url(), "https://engine.example.com");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = EngineClient::new("https://engine.example.com/", "token");
        assert_eq!(client.base_url(), "https://engine.example.com");
    }

    #[test]
    fn test_client_with_custom_client() {
        let http_client = Client::new();
        let client = EngineClient::with_client("https://engine.example.com", "token", http_client);
        assert_eq!(client.base_url(), "https://engine.example.com");
    }
}
