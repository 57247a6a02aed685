//! Transcoder configuration
//!
//! Everything the transcoder needs from its environment is read once at
//! startup into [`Config`] and passed down explicitly.

use std::time::Duration;
use tracing::warn;

/// Transcoder configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace the media server (and its workers) run in
    pub namespace: String,

    /// Name of the media server's own pod, used as the worker template
    pub pod_name: String,

    /// Cluster-internal base URL of the media server (e.g., "http://plex:32400")
    pub pms_internal_address: String,

    /// Explicit API server URL; in-cluster discovery is used when unset
    pub api_url: Option<String>,

    /// Delay between worker status polls
    pub poll_interval: Duration,

    /// Upper bound on a single API request
    pub request_timeout: Duration,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(namespace: String, pod_name: String, pms_internal_address: String) -> Self {
        Self {
            namespace,
            pod_name,
            pms_internal_address,
            api_url: None,
            poll_interval: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - KUBE_NAMESPACE (required)
    /// - KUBE_POD_NAME (required)
    /// - PMS_INTERNAL_ADDRESS (required)
    /// - KUBE_API_URL (optional)
    /// - POLL_INTERVAL (optional, seconds, default: 1)
    /// - REQUEST_TIMEOUT (optional, seconds, default: 30)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let namespace = lookup("KUBE_NAMESPACE")
            .ok_or_else(|| anyhow::anyhow!("KUBE_NAMESPACE environment variable not set"))?;

        let pod_name = lookup("KUBE_POD_NAME")
            .ok_or_else(|| anyhow::anyhow!("KUBE_POD_NAME environment variable not set"))?;

        let pms_internal_address = lookup("PMS_INTERNAL_ADDRESS")
            .ok_or_else(|| anyhow::anyhow!("PMS_INTERNAL_ADDRESS environment variable not set"))?;

        let mut config = Self::new(namespace, pod_name, pms_internal_address);

        config.api_url = lookup("KUBE_API_URL").filter(|s| !s.is_empty());

        if let Some(interval) =
            lookup("POLL_INTERVAL").and_then(|s| parse_seconds("POLL_INTERVAL", &s))
        {
            config.poll_interval = interval;
        }

        if let Some(timeout) =
            lookup("REQUEST_TIMEOUT").and_then(|s| parse_seconds("REQUEST_TIMEOUT", &s))
        {
            config.request_timeout = timeout;
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.namespace.is_empty() {
            anyhow::bail!("namespace cannot be empty");
        }

        if self.pod_name.is_empty() {
            anyhow::bail!("pod_name cannot be empty");
        }

        if !is_http_url(&self.pms_internal_address) {
            anyhow::bail!("pms_internal_address must start with http:// or https://");
        }

        if let Some(url) = &self.api_url {
            if !is_http_url(url) {
                anyhow::bail!("api_url must start with http:// or https://");
            }
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.request_timeout.is_zero() {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        Ok(())
    }
}

/// Parses a whole number of seconds, warning and returning `None` otherwise
fn parse_seconds(key: &str, value: &str) -> Option<Duration> {
    match value.trim().parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(e) => {
            warn!("Ignoring {}={:?} ({}), using the default", key, value, e);
            None
        }
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
