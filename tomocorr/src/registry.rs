//! Operation descriptors for an orchestrator: name, data pattern and the
//! slice estimator to size chunks with.

use std::fmt;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::budget::{self, MaxSlicesFn};
use crate::distortion::{DISCORPY_OP, DISTORTION_OP};
use crate::median::{MEDIAN_OP, REMOVE_OUTLIER_OP};

/// Data layout an operation expects along the slice axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pattern {
    Projection,
    Sinogram,
    /// Either layout.
    All,
}

impl Pattern {
    pub fn accepts(self, layout: Pattern) -> bool {
        self == Pattern::All || layout == Pattern::All || self == layout
    }
}

#[derive(Clone, Copy)]
pub struct OperationDescriptor {
    pub name: &'static str,
    pub pattern: Pattern,
    pub max_slices: MaxSlicesFn,
}

impl fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// Name-indexed table of operations.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    operations: HashMap<&'static str, OperationDescriptor>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The operations this crate implements.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (name, pattern, max_slices) in [
            (DISTORTION_OP, Pattern::Projection, budget::distortion_max_slices as MaxSlicesFn),
            (DISCORPY_OP, Pattern::Projection, budget::distortion_max_slices),
            (MEDIAN_OP, Pattern::All, budget::default_max_slices),
            (REMOVE_OUTLIER_OP, Pattern::All, budget::default_max_slices),
        ] {
            registry.register(OperationDescriptor {
                name,
                pattern,
                max_slices,
            });
        }
        registry
    }

    /// Adds `descriptor`, returning the one it replaces.
    pub fn register(&mut self, descriptor: OperationDescriptor) -> Option<OperationDescriptor> {
        tracing::debug!(
            name = descriptor.name,
            pattern = ?descriptor.pattern,
            "operation registered"
        );
        self.operations.insert(descriptor.name, descriptor)
    }

    pub fn get(&self, name: &str) -> Option<&OperationDescriptor> {
        self.operations.get(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.operations.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::DType;

    #[test]
    fn test_builtin_operations() {
        let registry = OperationRegistry::builtin();
        assert_eq!(
            registry.names(),
            vec![
                "distortion_correction_proj",
                "distortion_correction_proj_discorpy",
                "median_filter3d",
                "remove_outlier3d",
            ]
        );
        assert_eq!(registry.get("median_filter3d").unwrap().pattern, Pattern::All);
        assert_eq!(
            registry.get("distortion_correction_proj").unwrap().pattern,
            Pattern::Projection
        );
        assert!(registry.get("paganin_filter").is_none());
    }

    #[test]
    fn test_descriptor_estimator_is_callable() {
        let registry = OperationRegistry::builtin();
        let available = 64 * 1024 * 1024;
        let op = registry.get("distortion_correction_proj").unwrap();
        let est = (op.max_slices)((111, 121), DType::Float32, available);
        assert_eq!(est, budget::distortion_max_slices((111, 121), DType::Float32, available));

        let op = registry.get("remove_outlier3d").unwrap();
        let est = (op.max_slices)((64, 64), DType::Uint16, available);
        assert!(est.max_slices > 0);
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = OperationRegistry::new();
        let descriptor = OperationDescriptor {
            name: "custom",
            pattern: Pattern::Sinogram,
            max_slices: budget::default_max_slices,
        };
        assert!(registry.register(descriptor).is_none());
        let replaced = registry.register(OperationDescriptor {
            pattern: Pattern::All,
            ..descriptor
        });
        assert_eq!(replaced.unwrap().pattern, Pattern::Sinogram);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_pattern_accepts() {
        assert!(Pattern::All.accepts(Pattern::Sinogram));
        assert!(Pattern::Projection.accepts(Pattern::Projection));
        assert!(!Pattern::Projection.accepts(Pattern::Sinogram));
        let p: Pattern = serde_json::from_str("\"sinogram\"").unwrap();
        assert_eq!(p, Pattern::Sinogram);
    }
}
