//! Kubeplex Kubernetes Client
//!
//! A small, type-safe HTTP client for the parts of the Kubernetes API that
//! Kubeplex needs: reading, creating and deleting pods.
//!
//! Callers depend on the [`PodApi`] trait so the lifecycle logic can be
//! exercised against an in-memory implementation.
//!
//! # Example
//!
//! ```no_run
//! use kubeplex_client::{ClusterConfig, KubeClient, PodApi};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClusterConfig::in_cluster()?;
//!     let client = KubeClient::from_config(&config, Duration::from_secs(30))?;
//!
//!     let pod = client.get_pod("media", "plex-0").await?;
//!     println!("Phase: {:?}", pod.phase());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
mod pods;

// Re-export commonly used types
pub use config::ClusterConfig;
pub use error::{ClientError, Result};
pub use pods::PodApi;

use std::time::Duration;

use reqwest::{Certificate, Client, Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// HTTP client for the Kubernetes API server
#[derive(Debug, Clone)]
pub struct KubeClient {
    /// Base URL of the API server (e.g., "https://10.96.0.1:443")
    base_url: String,
    /// Service account token, if the endpoint requires one
    token: Option<String>,
    /// HTTP client instance
    client: Client,
}

impl KubeClient {
    /// Create a new client for an unauthenticated endpoint
    ///
    /// # Example
    /// ```
    /// use kubeplex_client::KubeClient;
    ///
    /// let client = KubeClient::new("http://127.0.0.1:8001");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client,
        }
    }

    /// Create a client from resolved cluster settings
    ///
    /// Trusts the cluster CA (when present) and bounds every request by
    /// `timeout`.
    pub fn from_config(config: &ClusterConfig, timeout: Duration) -> Result<Self> {
        let mut builder = Client::builder().timeout(timeout);

        if let Some(pem) = &config.ca_cert_pem {
            builder = builder.add_root_certificate(Certificate::from_pem(pem)?);
        }

        let mut client = Self::with_client(config.base_url.clone(), builder.build()?);
        client.token = config.token.clone();
        Ok(client)
    }

    /// Get the base URL of the API server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Starts a request, attaching the bearer token when configured
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = Self::check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response whose body is not needed (e.g., DELETE operations)
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        Self::check_status(response).await?;
        Ok(())
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let message = status_message(&body);

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(message));
        }

        Err(ClientError::api_error(status.as_u16(), message))
    }
}

/// `metav1.Status` body returned by the API server on failures
#[derive(Deserialize)]
struct ApiStatus {
    message: Option<String>,
}

/// Extracts the human readable message from an error body
fn status_message(body: &str) -> String {
    serde_json::from_str::<ApiStatus>(body)
        .ok()
        .and_then(|s| s.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = KubeClient::new("http://127.0.0.1:8001");
        assert_eq!(client.base_url(), "http://127.0.0.1:8001");
        assert!(client.token.is_none());
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = KubeClient::new("http://127.0.0.1:8001/");
        assert_eq!(client.base_url(), "http://127.0.0.1:8001");
    }

    #[test]
    fn test_client_from_config_keeps_token() {
        let config = ClusterConfig {
            base_url: "https://10.96.0.1:443/".to_string(),
            token: Some("abc".to_string()),
            ca_cert_pem: None,
        };

        let client = KubeClient::from_config(&config, Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "https://10.96.0.1:443");
        assert_eq!(client.token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_status_message_from_api_status() {
        let body = r#"{"kind":"Status","apiVersion":"v1","status":"Failure","message":"pods \"plex-0\" is forbidden","reason":"Forbidden","code":403}"#;
        assert_eq!(status_message(body), "pods \"plex-0\" is forbidden");
    }

    #[test]
    fn test_status_message_falls_back_to_body() {
        assert_eq!(status_message("upstream connect error\n"), "upstream connect error");
        assert_eq!(status_message(r#"{"kind":"Status"}"#), r#"{"kind":"Status"}"#);
    }
}
