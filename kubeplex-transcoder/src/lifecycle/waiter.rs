//! Completion waiter
//!
//! Polls a submitted pod until it reaches a terminal phase, sleeping a fixed
//! interval after each poll. The sleep is raced against the cancellation
//! token; a request that is already in flight is allowed to finish.

use std::sync::Arc;
use std::time::Duration;

use kubeplex_client::PodApi;
use kubeplex_core::domain::pod::{Pod, PodPhase};
use tracing::{debug, warn};

use super::RunOutcome;
use crate::signals::Cancellation;

/// Waits for a single worker pod to finish
pub struct CompletionWaiter {
    client: Arc<dyn PodApi>,
    namespace: String,
    pod_name: String,
    poll_interval: Duration,
}

impl CompletionWaiter {
    /// Creates a waiter for a submitted pod
    pub fn new(
        client: Arc<dyn PodApi>,
        namespace: String,
        pod_name: String,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            namespace,
            pod_name,
            poll_interval,
        }
    }

    /// Polls until the pod succeeds, fails, cannot be read, or the wait is
    /// cancelled
    ///
    /// The first poll happens immediately; each later poll starts a full
    /// `poll_interval` after the previous one returned. Transport errors are
    /// not retried.
    pub async fn wait(self, cancellation: Cancellation) -> RunOutcome {
        loop {
            if cancellation.is_cancelled() {
                return RunOutcome::Cancelled;
            }

            let pod = match self.client.get_pod(&self.namespace, &self.pod_name).await {
                Ok(pod) => pod,
                Err(e) => {
                    return RunOutcome::PollError {
                        message: e.to_string(),
                    };
                }
            };

            if let Some(outcome) = terminal_outcome(&self.pod_name, &pod) {
                return outcome;
            }

            tokio::select! {
                biased;
                _ = cancellation.cancelled() => return RunOutcome::Cancelled,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}

/// Maps a polled pod to a terminal outcome, or `None` to keep waiting
fn terminal_outcome(pod_name: &str, pod: &Pod) -> Option<RunOutcome> {
    match pod.phase() {
        None | Some(PodPhase::Pending) | Some(PodPhase::Running) => {
            debug!("Pod {} is {}", pod_name, phase_label(pod.phase()));
            None
        }
        Some(PodPhase::Unknown) => {
            warn!("Warning: pod {:?} is in an unknown state", pod_name);
            None
        }
        Some(PodPhase::Failed) => Some(RunOutcome::Failed {
            reason: failure_reason(pod_name, pod),
        }),
        Some(PodPhase::Succeeded) => Some(RunOutcome::Succeeded),
    }
}

fn phase_label(phase: Option<PodPhase>) -> &'static str {
    phase.map(|p| p.as_str()).unwrap_or("not yet scheduled")
}

fn failure_reason(pod_name: &str, pod: &Pod) -> String {
    let detail = pod
        .status
        .as_ref()
        .and_then(|s| s.message.as_deref().or(s.reason.as_deref()));

    match detail {
        Some(detail) => format!("pod {:?} failed: {}", pod_name, detail),
        None => format!("pod {:?} failed", pod_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::CancellationBridge;
    use async_trait::async_trait;
    use kubeplex_core::domain::pod::PodStatus;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Worker pod whose status reads are slow and stay `Running` until the
    /// third read
    struct SlowPod {
        latency: Duration,
        reads: Mutex<Vec<(Instant, Instant)>>,
    }

    #[async_trait]
    impl PodApi for SlowPod {
        async fn get_pod(&self, _namespace: &str, _name: &str) -> kubeplex_client::Result<Pod> {
            let started = Instant::now();
            tokio::time::sleep(self.latency).await;
            let mut reads = self.reads.lock().unwrap();
            reads.push((started, Instant::now()));

            let phase = if reads.len() >= 3 {
                PodPhase::Succeeded
            } else {
                PodPhase::Running
            };
            Ok(pod_in(Some(phase)))
        }

        async fn create_pod(&self, _namespace: &str, pod: &Pod) -> kubeplex_client::Result<Pod> {
            Ok(pod.clone())
        }

        async fn delete_pod(&self, _namespace: &str, _name: &str) -> kubeplex_client::Result<()> {
            Ok(())
        }
    }

    fn pod_in(phase: Option<PodPhase>) -> Pod {
        Pod {
            status: Some(PodStatus {
                phase,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_non_terminal_phases_keep_waiting() {
        assert_eq!(terminal_outcome("w", &pod_in(Some(PodPhase::Pending))), None);
        assert_eq!(terminal_outcome("w", &pod_in(Some(PodPhase::Running))), None);
        assert_eq!(terminal_outcome("w", &pod_in(Some(PodPhase::Unknown))), None);
        assert_eq!(terminal_outcome("w", &pod_in(None)), None);
        assert_eq!(terminal_outcome("w", &Pod::default()), None);
    }

    #[test]
    fn test_terminal_phases() {
        assert_eq!(
            terminal_outcome("w", &pod_in(Some(PodPhase::Succeeded))),
            Some(RunOutcome::Succeeded)
        );
        assert_eq!(
            terminal_outcome("w", &pod_in(Some(PodPhase::Failed))),
            Some(RunOutcome::Failed {
                reason: "pod \"w\" failed".to_string()
            })
        );
    }

    #[test]
    fn test_failure_reason_uses_status_detail() {
        let pod = Pod {
            status: Some(PodStatus {
                phase: Some(PodPhase::Failed),
                reason: Some("Evicted".to_string()),
                message: Some("The node was low on resource: memory.".to_string()),
            }),
            ..Default::default()
        };

        assert_eq!(
            failure_reason("plex-transcoder-x7k2q", &pod),
            "pod \"plex-transcoder-x7k2q\" failed: The node was low on resource: memory."
        );
    }

    #[tokio::test]
    async fn test_full_interval_between_slow_polls() {
        let interval = Duration::from_millis(200);
        let pod = Arc::new(SlowPod {
            latency: Duration::from_millis(150),
            reads: Mutex::new(Vec::new()),
        });
        let (_bridge, cancellation) = CancellationBridge::new();
        let waiter = CompletionWaiter::new(
            pod.clone(),
            "media".to_string(),
            "plex-transcoder-x7k2q".to_string(),
            interval,
        );

        assert_eq!(waiter.wait(cancellation).await, RunOutcome::Succeeded);

        let reads = pod.reads.lock().unwrap().clone();
        assert_eq!(reads.len(), 3);
        for pair in reads.windows(2) {
            let gap = pair[1].0.duration_since(pair[0].1);
            assert!(gap >= interval, "slept {:?}, interval is {:?}", gap, interval);
        }
    }

    #[tokio::test]
    async fn test_cancelled_before_first_poll() {
        let pod = Arc::new(SlowPod {
            latency: Duration::ZERO,
            reads: Mutex::new(Vec::new()),
        });
        let (bridge, cancellation) = CancellationBridge::new();
        bridge.cancel();

        let waiter = CompletionWaiter::new(
            pod.clone(),
            "media".to_string(),
            "plex-transcoder-x7k2q".to_string(),
            Duration::from_millis(10),
        );

        assert_eq!(waiter.wait(cancellation).await, RunOutcome::Cancelled);
        assert!(pod.reads.lock().unwrap().is_empty());
    }
}
