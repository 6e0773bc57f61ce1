use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::shape::lookup_shape;

/// Quantities of schedulable resources. CPU in cores, memory in MiB.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceList {
    #[serde(default)]
    pub cpu: f64,
    #[serde(default)]
    pub memory: i64,
    #[serde(default)]
    pub accelerator_num: f64,
}

impl ResourceList {
    pub const ZERO: ResourceList = ResourceList {
        cpu: 0.0,
        memory: 0,
        accelerator_num: 0.0,
    };

    pub const fn new(cpu: f64, memory: i64, accelerator_num: f64) -> Self {
        Self {
            cpu,
            memory,
            accelerator_num,
        }
    }

    /// True if every component of `self` is at most the matching component of `limit`.
    pub fn fits_within(&self, limit: &ResourceList) -> bool {
        self.cpu <= limit.cpu
            && self.memory <= limit.memory
            && self.accelerator_num <= limit.accelerator_num
    }

    /// Componentwise `self - other`, floored at zero.
    pub fn saturating_sub(&self, other: &ResourceList) -> ResourceList {
        ResourceList {
            cpu: (self.cpu - other.cpu).max(0.0),
            memory: self.memory.saturating_sub(other.memory).max(0),
            accelerator_num: (self.accelerator_num - other.accelerator_num).max(0.0),
        }
    }

    /// `self` times `n`, or `None` if memory overflows or a fractional
    /// component stops being finite.
    pub fn checked_scale(&self, n: u32) -> Option<ResourceList> {
        let scaled = ResourceList {
            cpu: self.cpu * f64::from(n),
            memory: self.memory.checked_mul(i64::from(n))?,
            accelerator_num: self.accelerator_num * f64::from(n),
        };
        (scaled.cpu.is_finite() && scaled.accelerator_num.is_finite()).then_some(scaled)
    }
}

// Memory saturates instead of wrapping.
impl Add for ResourceList {
    type Output = ResourceList;

    fn add(self, rhs: ResourceList) -> ResourceList {
        ResourceList {
            cpu: self.cpu + rhs.cpu,
            memory: self.memory.saturating_add(rhs.memory),
            accelerator_num: self.accelerator_num + rhs.accelerator_num,
        }
    }
}

impl Sub for ResourceList {
    type Output = ResourceList;

    fn sub(self, rhs: ResourceList) -> ResourceList {
        ResourceList {
            cpu: self.cpu - rhs.cpu,
            memory: self.memory.saturating_sub(rhs.memory),
            accelerator_num: self.accelerator_num - rhs.accelerator_num,
        }
    }
}

/// Resource ask of a deployment: either raw CPU/memory (plus optional
/// accelerators) or a named shape, never both.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceRequirement {
    #[serde(default)]
    pub cpu: f64,

    /// Memory in MiB.
    #[serde(default)]
    pub memory: i64,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub accelerator_type: String,

    #[serde(default)]
    pub accelerator_num: f64,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_shape: String,

    /// `None` only for objects whose replica floor was never set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<u32>,

    /// Reserve whole nodes for the replicas.
    #[serde(default)]
    pub exclusive: bool,
}

impl ResourceRequirement {
    pub fn has_shape(&self) -> bool {
        !self.resource_shape.is_empty()
    }

    pub fn has_raw_resources(&self) -> bool {
        self.cpu > 0.0 && self.memory > 0
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.cpu < 0.0 || self.memory < 0 || self.accelerator_num < 0.0 {
            return Err(ValidationError::InvalidResourceRequirement(
                "cpu, memory and accelerator_num must not be negative".to_string(),
            ));
        }
        match (self.has_shape(), self.has_raw_resources()) {
            (true, true) => {
                return Err(ValidationError::InvalidResourceRequirement(
                    "resource_shape and cpu/memory are mutually exclusive".to_string(),
                ))
            }
            (false, false) => {
                return Err(ValidationError::InvalidResourceRequirement(
                    "either resource_shape or both cpu and memory must be set".to_string(),
                ))
            }
            (true, false) => {
                if lookup_shape(&self.resource_shape).is_none() {
                    return Err(ValidationError::UnknownShape(self.resource_shape.clone()));
                }
            }
            (false, true) => {}
        }
        match self.min_replicas {
            Some(n) if n > 0 => {}
            _ => {
                return Err(ValidationError::InvalidResourceRequirement(
                    "min_replicas must be greater than 0".to_string(),
                ))
            }
        }
        self.total().map(|_| ())
    }

    /// Resources a single replica asks for. Unknown shapes count as zero;
    /// callers validate before relying on this.
    pub fn per_replica(&self) -> ResourceList {
        if self.has_shape() {
            return lookup_shape(&self.resource_shape)
                .map(|s| s.resources)
                .unwrap_or(ResourceList::ZERO);
        }
        ResourceList::new(self.cpu, self.memory, self.accelerator_num)
    }

    /// Resources the requirement holds against the workspace quota.
    pub fn total(&self) -> Result<ResourceList, ValidationError> {
        self.per_replica()
            .checked_scale(self.min_replicas.unwrap_or(0))
            .ok_or_else(|| {
                ValidationError::InvalidResourceRequirement(
                    "total resources across replicas are too large".to_string(),
                )
            })
    }
}
