//! Worker pod lifecycle
//!
//! Submits the worker pod, waits for it to finish (or for the transcode to be
//! cancelled) and always deletes it afterwards.

pub mod controller;
pub mod waiter;

pub use controller::LifecycleController;

/// How the wait for a worker pod ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The pod reached the `Succeeded` phase
    Succeeded,
    /// The pod reached the `Failed` phase
    Failed { reason: String },
    /// Polling the pod's status failed
    PollError { message: String },
    /// A termination signal arrived before the pod finished
    Cancelled,
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed { reason } => write!(f, "failed: {}", reason),
            Self::PollError { message } => write!(f, "poll error: {}", message),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of one transcoder invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Generated name of the worker pod, if one was submitted
    pub pod_name: Option<String>,
    pub outcome: RunOutcome,
}
