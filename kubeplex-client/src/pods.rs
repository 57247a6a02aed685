//! Pod API endpoints

use async_trait::async_trait;
use kubeplex_core::domain::pod::Pod;
use reqwest::Method;
use tracing::debug;

use crate::KubeClient;
use crate::error::Result;

/// Pod operations used by the transcoder
///
/// Every call is independent; implementations must not retry on their own.
#[async_trait]
pub trait PodApi: Send + Sync {
    /// Fetches a pod by name
    ///
    /// Returns `ClientError::NotFound` if the pod does not exist.
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod>;

    /// Submits a pod and returns it as stored by the API server
    ///
    /// The returned pod carries the server-generated name when the request
    /// used `metadata.generateName`.
    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<Pod>;

    /// Requests deletion of a pod
    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()>;
}

impl KubeClient {
    fn pods_url(&self, namespace: &str) -> String {
        format!("{}/api/v1/namespaces/{}/pods", self.base_url, namespace)
    }

    fn pod_url(&self, namespace: &str, name: &str) -> String {
        format!("{}/{}", self.pods_url(namespace), name)
    }
}

#[async_trait]
impl PodApi for KubeClient {
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod> {
        let url = self.pod_url(namespace, name);
        debug!("GET {}", url);
        let response = self.request(Method::GET, &url).send().await?;

        self.handle_response(response).await
    }

    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<Pod> {
        let url = self.pods_url(namespace);
        debug!("POST {}", url);
        let response = self.request(Method::POST, &url).json(pod).send().await?;

        self.handle_response(response).await
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()> {
        let url = self.pod_url(namespace, name);
        debug!("DELETE {}", url);
        let response = self.request(Method::DELETE, &url).send().await?;

        self.handle_empty_response(response).await
    }
}
