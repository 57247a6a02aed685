//! Pod domain types
//!
//! A deliberately small slice of `core/v1 Pod`. Fields Kubeplex never inspects
//! are either dropped on read or, for volumes and mounts, carried through as
//! opaque JSON so a copied entry is submitted exactly as it was received.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Kubernetes Pod
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<PodSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PodStatus>,
}

impl Pod {
    /// Name assigned by the API server, or the requested name
    pub fn name(&self) -> Option<&str> {
        self.metadata.name.as_deref()
    }

    /// Reported phase, if the pod has a status yet
    pub fn phase(&self) -> Option<PodPhase> {
        self.status.as_ref().and_then(|s| s.phase)
    }

    /// First container of the pod spec
    pub fn primary_container(&self) -> Option<&Container> {
        self.spec.as_ref().and_then(|s| s.containers.first())
    }

    /// Looks up a metadata label
    pub fn label(&self, key: &str) -> Option<&str> {
        self.metadata.labels.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<RestartPolicy>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,
}

/// Environment variable, either a literal value or a `valueFrom` reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
    /// Remaining mount options (`mountPropagation`, `subPathExpr`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Pod volume
///
/// Only the name is typed; the volume source (`hostPath`,
/// `persistentVolumeClaim`, `nfs`, ...) is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,
    #[serde(flatten)]
    pub source: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestartPolicy {
    Always,
    OnFailure,
    Never,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<PodPhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Pod lifecycle phase as reported by the API server
///
/// Phases added by future API versions deserialize as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

impl PodPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for PodPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unrecognised_phase_is_unknown() {
        let status: PodStatus = serde_json::from_value(json!({ "phase": "Evicted" })).unwrap();
        assert_eq!(status.phase, Some(PodPhase::Unknown));

        let status: PodStatus = serde_json::from_value(json!({ "phase": "Running" })).unwrap();
        assert_eq!(status.phase, Some(PodPhase::Running));
    }

    #[test]
    fn test_volume_source_is_preserved() {
        let raw = json!({
            "name": "media",
            "persistentVolumeClaim": { "claimName": "plex-media", "readOnly": true }
        });

        let volume: Volume = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(volume.name, "media");
        assert!(volume.source.contains_key("persistentVolumeClaim"));
        assert_eq!(serde_json::to_value(&volume).unwrap(), raw);
    }

    #[test]
    fn test_pod_from_api_response() {
        let pod: Pod = serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {
                "name": "plex-0",
                "namespace": "media",
                "labels": { "app": "plex" },
                "creationTimestamp": "2024-05-01T10:00:00Z",
                "uid": "ignored"
            },
            "spec": {
                "containers": [{
                    "name": "plex",
                    "image": "plexinc/pms-docker:1.40",
                    "env": [
                        { "name": "TZ", "value": "UTC" },
                        { "name": "POD_IP", "valueFrom": { "fieldRef": { "fieldPath": "status.podIP" } } }
                    ],
                    "volumeMounts": [
                        { "name": "data", "mountPath": "/data", "mountPropagation": "HostToContainer" }
                    ],
                    "ports": [{ "containerPort": 32400 }]
                }],
                "volumes": [{ "name": "data", "hostPath": { "path": "/srv/data" } }]
            },
            "status": { "phase": "Running" }
        }))
        .unwrap();

        assert_eq!(pod.name(), Some("plex-0"));
        assert_eq!(pod.label("app"), Some("plex"));
        assert_eq!(pod.phase(), Some(PodPhase::Running));
        // Server-managed metadata is not carried over
        assert_eq!(
            serde_json::to_value(&pod.metadata).unwrap(),
            json!({ "name": "plex-0", "namespace": "media", "labels": { "app": "plex" } })
        );

        let container = pod.primary_container().unwrap();
        assert_eq!(container.env.len(), 2);
        assert!(container.env[1].value_from.is_some());
        assert_eq!(
            container.volume_mounts[0].extra.get("mountPropagation"),
            Some(&json!("HostToContainer"))
        );
    }

    #[test]
    fn test_serialization_omits_empty_fields() {
        let pod = Pod {
            metadata: ObjectMeta {
                generate_name: Some("plex-transcoder-".to_string()),
                ..Default::default()
            },
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: "plex".to_string(),
                    ..Default::default()
                }],
                restart_policy: Some(RestartPolicy::Never),
                ..Default::default()
            }),
            ..Default::default()
        };

        let value = serde_json::to_value(&pod).unwrap();
        assert_eq!(
            value,
            json!({
                "metadata": { "generateName": "plex-transcoder-" },
                "spec": {
                    "containers": [{ "name": "plex" }],
                    "restartPolicy": "Never"
                }
            })
        );
    }
}
