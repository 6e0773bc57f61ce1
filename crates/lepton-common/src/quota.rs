use serde::{Deserialize, Serialize};

use crate::kind::Kind;
use crate::resources::ResourceList;

/// Capacity the platform reserves in every workspace for its own agents.
/// Hidden from users so they only see what they bought and what they use.
pub const SYSTEM_OVERHEAD: ResourceList = ResourceList::new(2.0, 4096, 0.0);

/// Ceiling and consumption of a workspace, as read from the cluster.
///
/// Stored as an object of kind `resourcequotas`; maintained by the
/// cluster, never written by the control plane.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkspaceResourceQuota {
    pub name: String,
    pub hard: ResourceList,
    #[serde(default)]
    pub used: ResourceList,
}

impl Kind for WorkspaceResourceQuota {
    const KIND: &'static str = "resourcequotas";

    fn object_name(&self) -> &str {
        &self.name
    }
}

impl WorkspaceResourceQuota {
    /// The view exposed to users: system overhead removed from both
    /// the ceiling and the consumption.
    pub fn without_system_overhead(&self) -> WorkspaceResourceQuota {
        WorkspaceResourceQuota {
            name: self.name.clone(),
            hard: self.hard.saturating_sub(&SYSTEM_OVERHEAD),
            used: self.used.saturating_sub(&SYSTEM_OVERHEAD),
        }
    }
}

/// Decides whether `requested` may be admitted against `quota`.
///
/// `current` is what the object being replaced already holds; it is added
/// back to the headroom so an update is never charged twice for the same
/// resources. A workspace without a quota object is unlimited.
pub fn admit(
    quota: Option<&WorkspaceResourceQuota>,
    requested: &ResourceList,
    current: Option<&ResourceList>,
) -> bool {
    let Some(quota) = quota else {
        return true;
    };
    let mut headroom = quota.hard - quota.used;
    if let Some(current) = current {
        headroom = headroom + *current;
    }
    requested.fits_within(&headroom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quota(hard: ResourceList, used: ResourceList) -> WorkspaceResourceQuota {
        WorkspaceResourceQuota {
            name: "quota".to_string(),
            hard,
            used,
        }
    }

    #[test]
    fn unlimited_without_quota() {
        assert!(admit(None, &ResourceList::new(1e6, 1 << 40, 64.0), None));
    }

    #[test]
    fn create_checks_against_headroom() {
        let q = quota(
            ResourceList::new(10.0, 10240, 2.0),
            ResourceList::new(6.0, 4096, 1.0),
        );
        assert!(admit(Some(&q), &ResourceList::new(4.0, 6144, 1.0), None));
        assert!(!admit(Some(&q), &ResourceList::new(4.5, 1024, 0.0), None));
        assert!(!admit(Some(&q), &ResourceList::new(1.0, 6145, 0.0), None));
        assert!(!admit(Some(&q), &ResourceList::new(1.0, 1024, 2.0), None));
    }

    #[test]
    fn update_adds_back_current_consumption() {
        // Fully used workspace: the object holds 4 cores already.
        let q = quota(
            ResourceList::new(8.0, 8192, 0.0),
            ResourceList::new(8.0, 8192, 0.0),
        );
        let current = ResourceList::new(4.0, 4096, 0.0);

        assert!(admit(Some(&q), &current, Some(&current)));
        assert!(admit(Some(&q), &ResourceList::new(2.0, 2048, 0.0), Some(&current)));
        assert!(!admit(Some(&q), &ResourceList::new(5.0, 4096, 0.0), Some(&current)));
        assert!(!admit(Some(&q), &current, None));
    }

    #[test]
    fn overhead_is_removed_from_hard_and_used() {
        let q = quota(
            ResourceList::new(10.0, 16384, 1.0),
            ResourceList::new(3.0, 5120, 0.0),
        );
        let view = q.without_system_overhead();
        assert_eq!(view.hard, ResourceList::new(8.0, 12288, 1.0));
        assert_eq!(view.used, ResourceList::new(1.0, 1024, 0.0));

        let tiny = quota(ResourceList::new(1.0, 1024, 0.0), ResourceList::ZERO);
        let view = tiny.without_system_overhead();
        assert_eq!(view.hard, ResourceList::ZERO);
        assert_eq!(view.used, ResourceList::ZERO);
    }
}
