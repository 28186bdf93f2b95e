use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Region of the full dataset that the current chunk represents.
///
/// The lists either cover the two spatial axes `[y, x]` or all chunk axes
/// `[slice, y, x]`; in the latter case the trailing two entries are spatial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    pub starts: Vec<usize>,
    #[serde(default)]
    pub stops: Vec<usize>,
    pub steps: Vec<usize>,
}

/// Chunk-local origin of the spatial axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpatialOffset {
    pub y: usize,
    pub x: usize,
}

impl Default for Preview {
    /// Unit steps from the origin of the spatial axes.
    fn default() -> Self {
        Self::new(vec![0, 0], vec![1, 1])
    }
}

impl Preview {
    pub fn new(starts: Vec<usize>, steps: Vec<usize>) -> Self {
        Self {
            starts,
            stops: Vec::new(),
            steps,
        }
    }

    /// Unit-step preview starting at the origin of `[height, width]`.
    pub fn full(height: usize, width: usize) -> Self {
        Self {
            starts: vec![0, 0],
            stops: vec![height, width],
            steps: vec![1, 1],
        }
    }

    /// Validates the spatial steps and returns the spatial start offsets.
    pub fn spatial_offset(&self) -> Result<SpatialOffset> {
        let n = self.starts.len();
        if n != 2 && n != 3 {
            return Err(Error::invalid_parameter(
                "preview",
                format!("expected 2 or 3 entries in starts, got {n}"),
            ));
        }
        if self.steps.len() != n || (!self.stops.is_empty() && self.stops.len() != n) {
            return Err(Error::invalid_parameter(
                "preview",
                format!(
                    "starts, stops and steps differ in length ({}, {}, {})",
                    n,
                    self.stops.len(),
                    self.steps.len()
                ),
            ));
        }

        let (y_axis, x_axis) = (n - 2, n - 1);
        for axis in [y_axis, x_axis] {
            let step = self.steps[axis];
            if step != 1 {
                return Err(Error::invalid_parameter(
                    "preview",
                    format!("step {step} on spatial axis {axis} is not supported, must be 1"),
                ));
            }
        }

        Ok(SpatialOffset {
            y: self.starts[y_axis],
            x: self.starts[x_axis],
        })
    }
}
