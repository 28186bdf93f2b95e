//! Slice budgets: how many slices of a chunk fit into a given amount of memory.
//!
//! `max_slices = floor((available - fixed) / per_slice)`, where `fixed` is the
//! operation's slice-independent temporaries and `per_slice` is
//! `H * W * itemsize * 4`. Each operation also lists the buffers that formula
//! counts as a [`WorkingSet`], so a chunk of `max_slices` slices can be checked
//! against the budget buffer by buffer.

use crate::volume::DType;

/// Share of the available host memory used when sizing chunks for the CPU path.
pub const MEMORY_PERCENT: u64 = 75;

/// Buffers allocated per slice on the device path: upload staging, device
/// input, device output, readback staging.
pub const PER_SLICE_BUFFERS: u64 = 4;

/// Result of a slice estimate, echoing the inputs it was computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceEstimate {
    pub max_slices: usize,
    pub dtype: DType,
    pub non_slice_shape: (usize, usize),
}

/// Signature shared by all estimators: `(non_slice_shape, dtype, available_bytes)`.
pub type MaxSlicesFn = fn((usize, usize), DType, u64) -> SliceEstimate;

/// One allocation of an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferSpec {
    pub label: &'static str,
    pub bytes: u64,
}

/// Buffers one invocation holds at its peak, as counted by the slice budget.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingSet {
    buffers: Vec<BufferSpec>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: &'static str, bytes: u64) {
        self.buffers.push(BufferSpec { label, bytes });
    }

    pub fn buffers(&self) -> &[BufferSpec] {
        &self.buffers
    }

    pub fn get(&self, label: &str) -> Option<u64> {
        self.buffers
            .iter()
            .find(|b| b.label == label)
            .map(|b| b.bytes)
    }

    /// Sum of all buffers; `None` on overflow.
    pub fn total(&self) -> Option<u64> {
        self.buffers
            .iter()
            .try_fold(0u64, |acc, b| acc.checked_add(b.bytes))
    }
}

fn buffer_bytes(count: usize, size: usize) -> Option<u64> {
    (count as u64).checked_mul(size as u64)
}

/// Bytes per slice: `height * width * itemsize * 4`.
pub fn per_slice_bytes(height: usize, width: usize, dtype: DType) -> Option<u64> {
    (height as u64)
        .checked_mul(width as u64)?
        .checked_mul(dtype.itemsize() as u64)?
        .checked_mul(PER_SLICE_BUFFERS)
}

/// Slice-independent bytes of a distortion correction: the coordinate lists,
/// the mesh pair, the radius and polynomial matrices, the two mapped
/// coordinate matrices and three copies of the stacked index buffer.
pub fn distortion_fixed_bytes(height: usize, width: usize) -> Option<u64> {
    let (h, w) = (height as u64, width as u64);
    let hw = h.checked_mul(w)?;
    let lists = h.checked_add(w)?.checked_mul(8)?;
    let mesh = hw.checked_mul(2 * 8)?;
    let radius = hw.checked_mul(8)?;
    let poly = hw.checked_mul(8)?;
    let mapped = hw.checked_mul(2 * 4)?;
    let indices = hw.checked_mul(2 * 4)?.checked_mul(3)?;
    lists
        .checked_add(mesh)?
        .checked_add(radius)?
        .checked_add(poly)?
        .checked_add(mapped)?
        .checked_add(indices)
}

fn max_slices_for(fixed: Option<u64>, per_slice: Option<u64>, available: u64) -> usize {
    let (Some(fixed), Some(per_slice)) = (fixed, per_slice) else {
        return 0;
    };
    if per_slice == 0 {
        return 0;
    }
    let remaining = available.saturating_sub(fixed);
    usize::try_from(remaining / per_slice).unwrap_or(usize::MAX)
}

/// Estimator for both distortion correction variants.
pub fn distortion_max_slices(
    non_slice_shape: (usize, usize),
    dtype: DType,
    available_bytes: u64,
) -> SliceEstimate {
    let (height, width) = non_slice_shape;
    let fixed = distortion_fixed_bytes(height, width);
    let per_slice = per_slice_bytes(height, width, dtype);
    let max_slices = max_slices_for(fixed, per_slice, available_bytes);

    tracing::debug!(
        height,
        width,
        %dtype,
        available_bytes,
        fixed_bytes = ?fixed,
        per_slice_bytes = ?per_slice,
        max_slices,
        "distortion slice budget"
    );

    SliceEstimate {
        max_slices,
        dtype,
        non_slice_shape,
    }
}

/// Estimator for operations without slice-independent temporaries
/// (median filter, outlier removal).
pub fn default_max_slices(
    non_slice_shape: (usize, usize),
    dtype: DType,
    available_bytes: u64,
) -> SliceEstimate {
    let (height, width) = non_slice_shape;
    let per_slice = per_slice_bytes(height, width, dtype);
    let max_slices = max_slices_for(Some(0), per_slice, available_bytes);

    tracing::debug!(
        height,
        width,
        %dtype,
        available_bytes,
        per_slice_bytes = ?per_slice,
        max_slices,
        "default slice budget"
    );

    SliceEstimate {
        max_slices,
        dtype,
        non_slice_shape,
    }
}

fn push_slice_buffers(
    ws: &mut WorkingSet,
    slices: usize,
    height: usize,
    width: usize,
    dtype: DType,
) {
    let count = slices.saturating_mul(height).saturating_mul(width);
    let bytes = buffer_bytes(count, dtype.itemsize()).unwrap_or(u64::MAX);
    ws.push("upload_staging", bytes);
    ws.push("volume_in", bytes);
    ws.push("volume_out", bytes);
    ws.push("readback_staging", bytes);
}

/// Buffers a distortion correction of `slices` slices allocates.
pub fn distortion_working_set(
    slices: usize,
    height: usize,
    width: usize,
    dtype: DType,
) -> WorkingSet {
    let hw = height.saturating_mul(width);
    let f64_bytes = |n: usize| buffer_bytes(n, 8).unwrap_or(u64::MAX);
    let f32_bytes = |n: usize| buffer_bytes(n, 4).unwrap_or(u64::MAX);

    let mut ws = WorkingSet::new();
    ws.push("x_list", f64_bytes(width));
    ws.push("y_list", f64_bytes(height));
    ws.push("mesh_x", f64_bytes(hw));
    ws.push("mesh_y", f64_bytes(hw));
    ws.push("radius", f64_bytes(hw));
    ws.push("poly", f64_bytes(hw));
    ws.push("xd", f32_bytes(hw));
    ws.push("yd", f32_bytes(hw));
    let stacked = hw.saturating_mul(2);
    ws.push("coords_host", f32_bytes(stacked));
    ws.push("coords_staging", f32_bytes(stacked));
    ws.push("coords_device", f32_bytes(stacked));
    push_slice_buffers(&mut ws, slices, height, width, dtype);
    ws
}

/// Buffers a median filter of `slices` slices allocates.
pub fn median_working_set(slices: usize, height: usize, width: usize, dtype: DType) -> WorkingSet {
    let mut ws = WorkingSet::new();
    push_slice_buffers(&mut ws, slices, height, width, dtype);
    ws
}

/// Host memory usable for CPU-path chunks: [`MEMORY_PERCENT`] of what the
/// system currently reports as available.
pub fn available_host_memory() -> u64 {
    use sysinfo::System;

    let mut sys = System::new();
    sys.refresh_memory();
    let available = sys.available_memory();
    let usable = available / 100 * MEMORY_PERCENT;

    tracing::debug!(
        available_mb = available / (1024 * 1024),
        usable_mb = usable / (1024 * 1024),
        "host memory queried"
    );
    usable
}
