use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::kind::Kind;

pub const CONDITION_POD_SCHEDULED: &str = "PodScheduled";
pub const CONDITION_INITIALIZED: &str = "Initialized";
pub const CONDITION_CONTAINERS_READY: &str = "ContainersReady";
pub const CONDITION_READY: &str = "Ready";
pub const CONDITION_DISRUPTION_TARGET: &str = "DisruptionTarget";

pub const EVENT_TYPE_NORMAL: &str = "Normal";
pub const EVENT_TYPE_WARNING: &str = "Warning";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PodCondition {
    #[serde(rename = "type")]
    pub type_: String,
    /// "True", "False" or "Unknown".
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PodCondition {
    pub fn new(type_: &str, status: bool) -> Self {
        Self {
            type_: type_.to_string(),
            status: if status { "True" } else { "False" }.to_string(),
            reason: None,
            message: None,
        }
    }
}

/// Looks up a condition by type: `Some(true)` / `Some(false)` for an
/// explicit True / False, `None` when absent or Unknown.
pub fn condition_status(conditions: &[PodCondition], type_: &str) -> Option<bool> {
    conditions
        .iter()
        .find(|c| c.type_ == type_)
        .and_then(|c| match c.status.as_str() {
            "True" => Some(true),
            "False" => Some(false),
            _ => None,
        })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerStateTerminated {
    pub exit_code: i32,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminated: Option<ContainerStateTerminated>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerStatus {
    pub name: String,
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub restart_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_state: Option<ContainerState>,
}

/// A replica of a deployment, as reported by the cluster.
///
/// Stored under `/{namespace}/pods/{name}` by the deployment operator and
/// only read here for diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pod {
    pub name: String,
    /// ID of the owning deployment.
    pub deployment: String,
    #[serde(default)]
    pub conditions: Vec<PodCondition>,
    #[serde(default)]
    pub container_statuses: Vec<ContainerStatus>,
}

impl Kind for Pod {
    const KIND: &'static str = "pods";

    fn object_name(&self) -> &str {
        &self.name
    }
}

/// A cluster event about a pod or deployment.
///
/// Stored under `/{namespace}/events/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PodEvent {
    pub name: String,
    /// Name of the pod or deployment the event is about.
    pub regarding: String,
    /// "Normal" or "Warning".
    #[serde(rename = "type", default)]
    pub type_: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_time: Option<DateTime<Utc>>,
    /// Legacy timestamp set by older event producers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated_last_timestamp: Option<DateTime<Utc>>,
}

impl Kind for PodEvent {
    const KIND: &'static str = "events";

    fn object_name(&self) -> &str {
        &self.name
    }
}

impl PodEvent {
    /// When the event was last observed: the event time, else the legacy
    /// last timestamp.
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.event_time.or(self.deprecated_last_timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_lookup() {
        let conditions = vec![
            PodCondition::new(CONDITION_POD_SCHEDULED, true),
            PodCondition::new(CONDITION_READY, false),
            PodCondition {
                type_: CONDITION_INITIALIZED.to_string(),
                status: "Unknown".to_string(),
                reason: None,
                message: None,
            },
        ];
        assert_eq!(condition_status(&conditions, CONDITION_POD_SCHEDULED), Some(true));
        assert_eq!(condition_status(&conditions, CONDITION_READY), Some(false));
        assert_eq!(condition_status(&conditions, CONDITION_INITIALIZED), None);
        assert_eq!(condition_status(&conditions, CONDITION_DISRUPTION_TARGET), None);
    }

    #[test]
    fn event_wire_format() {
        let ev: PodEvent = serde_json::from_str(
            r#"{"name": "e1", "regarding": "p1", "type": "Warning", "reason": "Failed",
                "deprecated_last_timestamp": "2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(ev.type_, EVENT_TYPE_WARNING);
        assert!(ev.event_time.is_none());
        assert_eq!(ev.observed_at(), ev.deprecated_last_timestamp);
    }
}
