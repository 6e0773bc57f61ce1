use std::collections::BTreeMap;

use lepton_common::{
    diagnose_readiness, diagnose_terminations, Pod, PodEvent, ReplicaReadinessIssue,
    ReplicaTermination,
};

use crate::error::ApiError;
use crate::state::AppState;

pub type ReadinessReport = BTreeMap<String, Vec<ReplicaReadinessIssue>>;
pub type TerminationReport = BTreeMap<String, Vec<ReplicaTermination>>;

async fn replicas(st: &AppState, deployment_id: &str) -> Result<Vec<Pod>, ApiError> {
    // 404 for unknown deployments rather than an empty report.
    st.deployments.get(deployment_id).await?;
    let pods = st.pods.list().await?;
    Ok(pods
        .into_iter()
        .filter(|p| p.deployment == deployment_id)
        .collect())
}

/// Events about the pod itself or about its deployment.
fn events_about(events: &[PodEvent], pod: &Pod) -> Vec<PodEvent> {
    events
        .iter()
        .filter(|e| e.regarding == pod.name || e.regarding == pod.deployment)
        .cloned()
        .collect()
}

pub async fn readiness(st: &AppState, deployment_id: &str) -> Result<ReadinessReport, ApiError> {
    let pods = replicas(st, deployment_id).await?;
    let events = st.events.list().await;

    let mut report = ReadinessReport::new();
    for pod in pods {
        let about: Result<Vec<PodEvent>, String> = match &events {
            Ok(all) => Ok(events_about(all, &pod)),
            Err(e) => Err(format!("failed to list events: {e}")),
        };
        let issue = diagnose_readiness(&pod.conditions, about.as_deref());
        report.entry(pod.name).or_default().push(issue);
    }
    Ok(report)
}

pub async fn termination(
    st: &AppState,
    deployment_id: &str,
) -> Result<TerminationReport, ApiError> {
    let pods = replicas(st, deployment_id).await?;
    Ok(pods
        .into_iter()
        .map(|pod| {
            let terminations = diagnose_terminations(&pod.container_statuses);
            (pod.name, terminations)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use lepton_common::pod::{
        ContainerState, ContainerStateTerminated, CONDITION_POD_SCHEDULED, CONDITION_READY,
        EVENT_TYPE_NORMAL, EVENT_TYPE_WARNING,
    };
    use lepton_common::{
        ContainerStatus, Deployment, DeploymentUserSpec, PodCondition, ReadinessReason,
        ResourceRequirement,
    };

    use super::*;
    use crate::state::testing::app_state;

    async fn seed_deployment(st: &AppState, id: &str) {
        let d = Deployment {
            id: id.to_string(),
            spec: DeploymentUserSpec {
                name: id.to_string(),
                photon_id: "p-00000000".to_string(),
                resource_requirement: ResourceRequirement {
                    resource_shape: "cpu.small".to_string(),
                    min_replicas: Some(2),
                    ..Default::default()
                },
                api_tokens: None,
                envs: None,
                mounts: None,
            },
            system: Default::default(),
            status: Default::default(),
            created_at_ms: 0,
            updated_at_ms: 0,
        };
        st.deployments.create(id, &d).await.unwrap();
    }

    async fn seed_pod(st: &AppState, name: &str, deployment: &str, conditions: Vec<PodCondition>) {
        let pod = Pod {
            name: name.to_string(),
            deployment: deployment.to_string(),
            conditions,
            container_statuses: vec![],
        };
        st.pods.create(name, &pod).await.unwrap();
    }

    async fn seed_event(st: &AppState, name: &str, regarding: &str, type_: &str, reason: &str, min: u32) {
        let ev = PodEvent {
            name: name.to_string(),
            regarding: regarding.to_string(),
            type_: type_.to_string(),
            reason: reason.to_string(),
            note: String::new(),
            event_time: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, min, 0).unwrap()),
            deprecated_last_timestamp: None,
        };
        st.events.create(name, &ev).await.unwrap();
    }

    #[tokio::test]
    async fn readiness_per_replica() {
        let st = app_state();
        seed_deployment(&st, "chat").await;
        seed_deployment(&st, "other").await;

        seed_pod(&st, "chat-1", "chat", vec![PodCondition::new(CONDITION_READY, true)]).await;
        seed_pod(
            &st,
            "chat-2",
            "chat",
            vec![
                PodCondition::new(CONDITION_POD_SCHEDULED, false),
                PodCondition::new(CONDITION_READY, false),
            ],
        )
        .await;
        seed_pod(
            &st,
            "chat-3",
            "chat",
            vec![PodCondition::new(CONDITION_POD_SCHEDULED, false)],
        )
        .await;
        seed_pod(&st, "other-1", "other", vec![]).await;

        seed_event(&st, "e1", "chat-2", EVENT_TYPE_WARNING, "FailedScheduling", 1).await;
        seed_event(&st, "e2", "chat-2", EVENT_TYPE_NORMAL, "TriggeredScaleUp", 2).await;
        seed_event(&st, "e3", "other-1", EVENT_TYPE_WARNING, "FailedMount", 3).await;

        let report = readiness(&st, "chat").await.unwrap();
        assert_eq!(report.len(), 3);
        assert_eq!(report["chat-1"][0].reason, ReadinessReason::Ready);

        let pending = &report["chat-2"][0];
        assert_eq!(pending.reason, ReadinessReason::InProgress);
        assert!(pending.message.contains("Adding capacity"));

        // chat-3 has no events of its own; chat-2's must not be used.
        let unscheduled = &report["chat-3"][0];
        assert_eq!(unscheduled.reason, ReadinessReason::NoCapacity);
        assert_eq!(unscheduled.message, "Scheduling the replica");
    }

    #[tokio::test]
    async fn termination_per_replica() {
        let st = app_state();
        seed_deployment(&st, "chat").await;

        let oom = ContainerStatus {
            name: "main".to_string(),
            ready: false,
            restart_count: 3,
            last_state: Some(ContainerState {
                terminated: Some(ContainerStateTerminated {
                    exit_code: 137,
                    reason: String::new(),
                    message: String::new(),
                    started_at: None,
                    finished_at: None,
                }),
            }),
        };
        let pod = Pod {
            name: "chat-1".to_string(),
            deployment: "chat".to_string(),
            conditions: vec![],
            container_statuses: vec![oom],
        };
        st.pods.create("chat-1", &pod).await.unwrap();
        seed_pod(&st, "chat-2", "chat", vec![]).await;

        let report = termination(&st, "chat").await.unwrap();
        assert_eq!(report["chat-1"].len(), 1);
        assert_eq!(report["chat-1"][0].exit_code, 137);
        assert!(report["chat-1"][0].reason.contains("SIGKILL"));
        assert!(report["chat-2"].is_empty());
    }

    #[tokio::test]
    async fn unknown_deployment_is_not_found() {
        let st = app_state();
        assert!(matches!(readiness(&st, "nope").await.unwrap_err(), ApiError::NotFound(_)));
        assert!(matches!(termination(&st, "nope").await.unwrap_err(), ApiError::NotFound(_)));
    }
}
