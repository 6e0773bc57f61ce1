use crate::resources::ResourceList;

/// A named bundle of per-replica resources.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shape {
    pub name: &'static str,
    pub resources: ResourceList,
    pub accelerator_type: Option<&'static str>,
}

const fn cpu_shape(name: &'static str, cpu: f64, memory: i64) -> Shape {
    Shape {
        name,
        resources: ResourceList::new(cpu, memory, 0.0),
        accelerator_type: None,
    }
}

const fn gpu_shape(
    name: &'static str,
    cpu: f64,
    memory: i64,
    accelerator_type: &'static str,
    accelerator_num: f64,
) -> Shape {
    Shape {
        name,
        resources: ResourceList::new(cpu, memory, accelerator_num),
        accelerator_type: Some(accelerator_type),
    }
}

/// Shapes this control plane can schedule.
pub const SUPPORTED_SHAPES: &[Shape] = &[
    cpu_shape("cpu.small", 1.0, 4096),
    cpu_shape("cpu.medium", 2.0, 8192),
    cpu_shape("cpu.large", 4.0, 16384),
    cpu_shape("gp1.small", 1.0, 4096),
    cpu_shape("gp1.medium", 2.0, 8192),
    cpu_shape("gp1.large", 4.0, 16384),
    gpu_shape("gpu.t4", 4.0, 16384, "NVIDIA-T4", 1.0),
    gpu_shape("gpu.a10", 8.0, 32768, "NVIDIA-A10G", 1.0),
    gpu_shape("gpu.a10.6xlarge", 24.0, 98304, "NVIDIA-A10G", 1.0),
    gpu_shape("gpu.a100-40gb", 12.0, 88064, "NVIDIA-A100-40GB", 1.0),
    gpu_shape("gpu.a100-80gb", 12.0, 176128, "NVIDIA-A100-80GB", 1.0),
    gpu_shape("gpu.2xa100-80gb", 24.0, 352256, "NVIDIA-A100-80GB", 2.0),
    gpu_shape("gpu.h100", 24.0, 229376, "NVIDIA-H100", 1.0),
];

pub fn lookup_shape(name: &str) -> Option<&'static Shape> {
    SUPPORTED_SHAPES.iter().find(|s| s.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_names_are_unique() {
        for (i, a) in SUPPORTED_SHAPES.iter().enumerate() {
            for b in &SUPPORTED_SHAPES[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn lookup() {
        let s = lookup_shape("gpu.a10").unwrap();
        assert_eq!(s.accelerator_type, Some("NVIDIA-A10G"));
        assert_eq!(s.resources.accelerator_num, 1.0);
        assert!(lookup_shape("gpu.unknown").is_none());
    }
}
