//! Worker pod template
//!
//! Builds the pod that runs a single transcode, using the media server's own
//! pod as the template. The worker inherits the server's image, environment
//! and storage so it sees the same filesystem, but none of the volumes that
//! only make sense inside the server pod.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::info;

use crate::domain::pod::{Container, ObjectMeta, Pod, PodSpec, RestartPolicy};

/// Label on the reference pod whose value prefixes worker pod names
pub const GROUP_LABEL: &str = "app";

/// Name of the worker's single container
pub const WORKER_CONTAINER_NAME: &str = "plex";

/// Volume shared between containers of the server pod
const SHARED_VOLUME: &str = "shared";

/// Prefix of volumes injected by Kubernetes (service account tokens etc.)
const RESERVED_VOLUME_PREFIX: &str = "kube";

const ARCH_SELECTOR_KEY: &str = "beta.kubernetes.io/arch";
const ARCH_SELECTOR_VALUE: &str = "amd64";

/// Errors raised when the reference pod cannot serve as a template
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeriveError {
    #[error("reference pod has no containers")]
    NoContainers,

    #[error("reference pod has no 'app' label")]
    MissingGroupLabel,
}

/// Returns true if a volume (or mount) of the reference pod should be
/// carried over to the worker
pub fn is_inherited_volume(name: &str) -> bool {
    name != SHARED_VOLUME && !name.starts_with(RESERVED_VOLUME_PREFIX)
}

/// Derives the worker pod from the reference pod
///
/// # Arguments
/// * `reference` - The caller's own pod
/// * `working_dir` - Working directory of the calling process
/// * `command` - Full argument vector, argument zero included
///
/// # Returns
/// A pod ready to be submitted; its name is generated server-side from
/// `<app label>-transcoder-`
pub fn derive_worker_pod(
    reference: &Pod,
    working_dir: &str,
    command: &[String],
) -> Result<Pod, DeriveError> {
    let template = reference
        .primary_container()
        .ok_or(DeriveError::NoContainers)?;

    let group = reference
        .label(GROUP_LABEL)
        .filter(|g| !g.is_empty())
        .ok_or(DeriveError::MissingGroupLabel)?;

    info!("Creating pod to run command: {}", command.join(" "));

    let mut volume_mounts = Vec::new();
    for mount in &template.volume_mounts {
        if is_inherited_volume(&mount.name) {
            info!("Adding volume mount for {}", mount.name);
            volume_mounts.push(mount.clone());
        }
    }

    let mut volumes = Vec::new();
    for volume in reference.spec.iter().flat_map(|s| &s.volumes) {
        if is_inherited_volume(&volume.name) {
            info!("Adding volume for {}", volume.name);
            volumes.push(volume.clone());
        }
    }

    Ok(Pod {
        api_version: Some("v1".to_string()),
        kind: Some("Pod".to_string()),
        metadata: ObjectMeta {
            generate_name: Some(format!("{}-transcoder-", group)),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: WORKER_CONTAINER_NAME.to_string(),
                image: template.image.clone(),
                command: command.to_vec(),
                env: template.env.clone(),
                working_dir: Some(working_dir.to_string()),
                volume_mounts,
            }],
            volumes,
            restart_policy: Some(RestartPolicy::Never),
            node_selector: BTreeMap::from([(
                ARCH_SELECTOR_KEY.to_string(),
                ARCH_SELECTOR_VALUE.to_string(),
            )]),
        }),
        status: None,
    })
}
