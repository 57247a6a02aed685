//! Cluster connection settings
//!
//! Resolves where the API server lives and how to authenticate against it.
//! Inside a pod this is the service account mounted by the kubelet; outside
//! a cluster an explicit URL (for example a `kubectl proxy`) is used instead.

use std::path::Path;

use tracing::debug;

use crate::error::{ClientError, Result};

/// Directory where the kubelet mounts service account credentials
pub const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Connection settings for the Kubernetes API server
#[derive(Clone)]
pub struct ClusterConfig {
    /// API server base URL (e.g., "https://10.96.0.1:443")
    pub base_url: String,
    /// Bearer token sent with every request
    pub token: Option<String>,
    /// PEM encoded CA bundle used to verify the API server
    pub ca_cert_pem: Option<Vec<u8>>,
}

impl ClusterConfig {
    /// Settings for an unauthenticated endpoint such as `kubectl proxy`
    pub fn from_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            ca_cert_pem: None,
        }
    }

    /// Loads the in-cluster service account configuration
    ///
    /// Requires `KUBERNETES_SERVICE_HOST` and `KUBERNETES_SERVICE_PORT`, and
    /// the token and CA files under [`SERVICE_ACCOUNT_DIR`].
    pub fn in_cluster() -> Result<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST").map_err(|_| {
            ClientError::Config("KUBERNETES_SERVICE_HOST environment variable not set".to_string())
        })?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT").map_err(|_| {
            ClientError::Config("KUBERNETES_SERVICE_PORT environment variable not set".to_string())
        })?;

        Self::from_service_account(&host, &port, Path::new(SERVICE_ACCOUNT_DIR))
    }

    /// Builds the configuration from a service address and a credentials directory
    pub fn from_service_account(host: &str, port: &str, dir: &Path) -> Result<Self> {
        let token_path = dir.join("token");
        let token = std::fs::read_to_string(&token_path)
            .map_err(|e| read_error(&token_path, e))?
            .trim()
            .to_string();

        if token.is_empty() {
            return Err(ClientError::Config(format!(
                "service account token at {} is empty",
                token_path.display()
            )));
        }

        let ca_path = dir.join("ca.crt");
        let ca_cert_pem = std::fs::read(&ca_path).map_err(|e| read_error(&ca_path, e))?;

        let base_url = service_url(host, port);
        debug!("Using in-cluster API server at {}", base_url);

        Ok(Self {
            base_url,
            token: Some(token),
            ca_cert_pem: Some(ca_cert_pem),
        })
    }
}

impl std::fmt::Debug for ClusterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("ca_cert_pem", &self.ca_cert_pem.as_ref().map(Vec::len))
            .finish()
    }
}

/// Formats the API server URL, bracketing IPv6 hosts
fn service_url(host: &str, port: &str) -> String {
    if host.contains(':') {
        format!("https://[{}]:{}", host, port)
    } else {
        format!("https://{}:{}", host, port)
    }
}

fn read_error(path: &Path, err: std::io::Error) -> ClientError {
    ClientError::Config(format!("failed to read {}: {}", path.display(), err))
}
