//! Lifecycle controller
//!
//! Drives one worker pod from submission to deletion:
//!
//! 1. Read the media server's own pod
//! 2. Derive and submit the worker pod
//! 3. Wait for completion, racing the wait against cancellation
//! 4. Delete the worker pod, whatever the wait returned
//!
//! Failures before the pod exists abort the run. Once the pod exists it is
//! deleted exactly once, and only a failed deletion is reported as an error.

use anyhow::{Context, Result};
use kubeplex_client::PodApi;
use kubeplex_core::derive_worker_pod;
use std::sync::Arc;
use tracing::{error, info};

use super::waiter::CompletionWaiter;
use super::{RunOutcome, RunReport};
use crate::config::Config;
use crate::signals::Cancellation;

/// Runs a single transcode as a worker pod
pub struct LifecycleController {
    client: Arc<dyn PodApi>,
    config: Config,
}

impl LifecycleController {
    /// Creates a new controller
    pub fn new(client: Arc<dyn PodApi>, config: Config) -> Self {
        Self { client, config }
    }

    /// Runs the worker pod to completion
    ///
    /// # Arguments
    /// * `working_dir` - Working directory the worker should start in
    /// * `args` - Command for the worker, argument zero included
    /// * `cancellation` - Fires when the transcode should stop early
    ///
    /// # Returns
    /// The outcome of the wait. `Err` means either nothing was submitted or
    /// the submitted pod could not be deleted.
    pub async fn run(
        &self,
        working_dir: &str,
        args: &[String],
        cancellation: Cancellation,
    ) -> Result<RunReport> {
        let namespace = &self.config.namespace;

        let reference = match self.client.get_pod(namespace, &self.config.pod_name).await {
            Ok(pod) => pod,
            Err(e) if e.is_not_found() => anyhow::bail!(
                "Error getting current pod: {} does not exist in namespace {} (check KUBE_POD_NAME and KUBE_NAMESPACE)",
                self.config.pod_name,
                namespace
            ),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Error getting current pod {}", self.config.pod_name)
                });
            }
        };

        let pod = derive_worker_pod(&reference, working_dir, args)
            .context("Error building worker pod")?;

        if cancellation.is_cancelled() {
            info!("Exit requested before the worker pod was created");
            return Ok(RunReport {
                pod_name: None,
                outcome: RunOutcome::Cancelled,
            });
        }

        let created = self
            .client
            .create_pod(namespace, &pod)
            .await
            .context("Error creating pod")?;

        // Without a name the pod cannot be deleted, so this counts as a
        // failed submission.
        let pod_name = created
            .name()
            .map(str::to_string)
            .context("API server returned the created pod without a name")?;

        info!("Created pod: {}", pod_name);

        let outcome = self.wait_for_completion(&pod_name, cancellation).await;
        self.log_outcome(&pod_name, &outcome);

        info!("Cleaning up pod...");
        self.client
            .delete_pod(namespace, &pod_name)
            .await
            .with_context(|| format!("Error cleaning up pod {}", pod_name))?;
        info!("Deleted pod: {}", pod_name);

        Ok(RunReport {
            pod_name: Some(pod_name),
            outcome,
        })
    }

    /// Races the completion waiter against cancellation
    ///
    /// The waiter runs as its own task; if cancellation wins, the task is
    /// aborted and joined before returning.
    async fn wait_for_completion(&self, pod_name: &str, cancellation: Cancellation) -> RunOutcome {
        let waiter = CompletionWaiter::new(
            Arc::clone(&self.client),
            self.config.namespace.clone(),
            pod_name.to_string(),
            self.config.poll_interval,
        );
        let mut handle = tokio::spawn(waiter.wait(cancellation.clone()));

        tokio::select! {
            joined = &mut handle => joined.unwrap_or_else(|e| RunOutcome::PollError {
                message: format!("completion waiter stopped: {}", e),
            }),
            _ = cancellation.cancelled() => {
                handle.abort();
                let _ = handle.await;
                RunOutcome::Cancelled
            }
        }
    }

    fn log_outcome(&self, pod_name: &str, outcome: &RunOutcome) {
        match outcome {
            RunOutcome::Succeeded => info!("Pod {} completed successfully", pod_name),
            RunOutcome::Failed { reason } => {
                error!("Error waiting for pod to complete: {}", reason)
            }
            RunOutcome::PollError { message } => {
                error!("Error waiting for pod to complete: {}", message)
            }
            RunOutcome::Cancelled => info!("Exit requested."),
        }
    }
}
