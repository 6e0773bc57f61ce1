use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::pod::{
    condition_status, PodCondition, PodEvent, CONDITION_CONTAINERS_READY,
    CONDITION_DISRUPTION_TARGET, CONDITION_INITIALIZED, CONDITION_POD_SCHEDULED, CONDITION_READY,
    EVENT_TYPE_NORMAL, EVENT_TYPE_WARNING,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReadinessReason {
    Ready,
    InProgress,
    NoCapacity,
    ConfigError,
    SystemError,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplicaReadinessIssue {
    pub reason: ReadinessReason,
    pub message: String,
}

impl ReplicaReadinessIssue {
    fn new(reason: ReadinessReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

pub const MSG_ADDING_CAPACITY: &str = "Adding capacity for the replica";
pub const MSG_WAITING_FOR_CAPACITY: &str = "Waiting to add capacity for the replica";
pub const MSG_SCHEDULING: &str = "Scheduling the replica";
pub const MSG_INITIALIZING: &str = "Initializing the replica";
pub const MSG_DISRUPTION: &str = "Replica is about to be terminated due to a disruption";

const REASON_FAILED_SCHEDULING: &str = "FailedScheduling";
const REASON_TRIGGERED_SCALE_UP: &str = "TriggeredScaleUp";
const REASON_NOT_TRIGGER_SCALE_UP: &str = "NotTriggerScaleUp";

/// Image pulled by the platform's own init container.
const SYSTEM_IMAGE_PULL_PREFIX: &str = "Failed to pull image \"amazon/aws-cli\"";

static IPV4_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").expect("static regex"));

fn mask_ip_addresses(s: &str) -> String {
    IPV4_RE.replace_all(s, "<ip>").into_owned()
}

#[derive(Debug, Clone, Copy, Default)]
struct EventFilter<'a> {
    type_: Option<&'a str>,
    reason: Option<&'a str>,
    note_prefix: Option<&'a str>,
}

impl EventFilter<'_> {
    fn matches(&self, ev: &PodEvent) -> bool {
        self.type_.map_or(true, |t| ev.type_ == t)
            && self.reason.map_or(true, |r| ev.reason == r)
            && self.note_prefix.map_or(true, |p| ev.note.starts_with(p))
    }
}

/// The matching event observed last. Events without any timestamp sort
/// first; on equal timestamps the earlier position in `events` wins.
fn last_event<'e>(events: &'e [PodEvent], filter: EventFilter<'_>) -> Option<&'e PodEvent> {
    let mut last: Option<&PodEvent> = None;
    for ev in events.iter().filter(|e| filter.matches(e)) {
        match last {
            Some(l) if ev.observed_at() <= l.observed_at() => {}
            _ => last = Some(ev),
        }
    }
    last
}

fn last_with_reason<'e>(events: &'e [PodEvent], reason: &str) -> Option<&'e PodEvent> {
    last_event(
        events,
        EventFilter {
            reason: Some(reason),
            ..Default::default()
        },
    )
}

struct WarningRule {
    reason: Option<&'static str>,
    note_prefix: Option<&'static str>,
    verdict: fn(&PodEvent) -> ReplicaReadinessIssue,
}

/// Warning events that explain a replica, highest priority first.
const WARNING_RULES: &[WarningRule] = &[
    WarningRule {
        reason: Some("Failed"),
        note_prefix: Some(SYSTEM_IMAGE_PULL_PREFIX),
        verdict: |ev| {
            if ev.note.contains("401 Unauthorized") {
                ReplicaReadinessIssue::new(
                    ReadinessReason::ConfigError,
                    "Failed to pull system image: invalid dockerhub credentials",
                )
            } else {
                ReplicaReadinessIssue::new(
                    ReadinessReason::SystemError,
                    "Failed to pull system image",
                )
            }
        },
    },
    WarningRule {
        reason: Some("Failed"),
        note_prefix: Some("Failed to pull image"),
        verdict: |_| {
            ReplicaReadinessIssue::new(
                ReadinessReason::ConfigError,
                "Image not found or not accessible",
            )
        },
    },
    WarningRule {
        reason: Some("Failed"),
        note_prefix: Some("Error: couldn't find key non-exist in Secret"),
        verdict: |_| ReplicaReadinessIssue::new(ReadinessReason::ConfigError, "Secret not found"),
    },
    WarningRule {
        reason: Some("FailedMount"),
        note_prefix: None,
        verdict: |_| {
            ReplicaReadinessIssue::new(ReadinessReason::ConfigError, "Mount point not found")
        },
    },
    WarningRule {
        reason: Some("Unhealthy"),
        note_prefix: Some("Readiness probe failed"),
        verdict: |ev| {
            ReplicaReadinessIssue::new(ReadinessReason::InProgress, mask_ip_addresses(&ev.note))
        },
    },
    WarningRule {
        reason: None,
        note_prefix: None,
        verdict: |ev| ReplicaReadinessIssue::new(ReadinessReason::Unknown, ev.note.clone()),
    },
];

/// Classifies a replica from its event history alone.
fn classify_events(events: &[PodEvent]) -> ReplicaReadinessIssue {
    if let Some(last) = last_event(events, EventFilter::default()) {
        if last.type_ == EVENT_TYPE_NORMAL {
            let message = match last.reason.as_str() {
                "Pulling" => "Pulling image",
                "Pulled" => "Creating the replica",
                "Created" => "Starting the replica",
                "Started" => "Waiting for the replica to become ready",
                _ => "",
            };
            return ReplicaReadinessIssue::new(ReadinessReason::InProgress, message);
        }
    }

    for rule in WARNING_RULES {
        let filter = EventFilter {
            type_: Some(EVENT_TYPE_WARNING),
            reason: rule.reason,
            note_prefix: rule.note_prefix,
        };
        if let Some(ev) = last_event(events, filter) {
            return (rule.verdict)(ev);
        }
    }

    ReplicaReadinessIssue::new(ReadinessReason::Unknown, "")
}

fn classify_unscheduled(events: &[PodEvent]) -> ReplicaReadinessIssue {
    let failed = last_with_reason(events, REASON_FAILED_SCHEDULING);
    if last_with_reason(events, REASON_TRIGGERED_SCALE_UP).is_some() {
        return ReplicaReadinessIssue::new(ReadinessReason::InProgress, MSG_ADDING_CAPACITY);
    }
    if last_with_reason(events, REASON_NOT_TRIGGER_SCALE_UP).is_some() {
        return ReplicaReadinessIssue::new(ReadinessReason::NoCapacity, MSG_WAITING_FOR_CAPACITY);
    }
    if failed.is_none() {
        return ReplicaReadinessIssue::new(ReadinessReason::NoCapacity, MSG_SCHEDULING);
    }
    ReplicaReadinessIssue::new(ReadinessReason::NoCapacity, MSG_WAITING_FOR_CAPACITY)
}

/// Diagnoses a replica's readiness: pod conditions first, then the event
/// history when they are not conclusive. The first matching rule wins.
///
/// `events` is the result of looking up the pod's events; a failed lookup
/// yields `Unknown` carrying the error, unless the pod is already ready.
pub fn diagnose_readiness<E: fmt::Display>(
    conditions: &[PodCondition],
    events: Result<&[PodEvent], E>,
) -> ReplicaReadinessIssue {
    if condition_status(conditions, CONDITION_READY) == Some(true) {
        return ReplicaReadinessIssue::new(ReadinessReason::Ready, "");
    }

    let events = match events {
        Ok(events) => events,
        Err(e) => return ReplicaReadinessIssue::new(ReadinessReason::Unknown, e.to_string()),
    };

    if condition_status(conditions, CONDITION_POD_SCHEDULED) == Some(false) {
        return classify_unscheduled(events);
    }

    if condition_status(conditions, CONDITION_INITIALIZED) == Some(false) {
        let mut issue = classify_events(events);
        if issue.reason == ReadinessReason::InProgress {
            issue.message = MSG_INITIALIZING.to_string();
        }
        return issue;
    }

    if condition_status(conditions, CONDITION_CONTAINERS_READY) == Some(false) {
        return classify_events(events);
    }

    if condition_status(conditions, CONDITION_DISRUPTION_TARGET) == Some(true) {
        return ReplicaReadinessIssue::new(ReadinessReason::InProgress, MSG_DISRUPTION);
    }

    classify_events(events)
}
