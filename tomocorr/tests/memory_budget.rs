use tomocorr::budget::{
    default_max_slices, distortion_max_slices, distortion_working_set, median_working_set,
    per_slice_bytes, WorkingSet,
};
use tomocorr::DType;

type WorkingSetFn = fn(usize, usize, usize, DType) -> WorkingSet;

/// Largest slice count whose working set fits into `available`.
fn true_max_slices(
    working_set: WorkingSetFn,
    (h, w): (usize, usize),
    dtype: DType,
    available: u64,
) -> usize {
    let mut slices = 0;
    while working_set(slices + 1, h, w, dtype)
        .total()
        .is_some_and(|total| total <= available)
    {
        slices += 1;
    }
    slices
}

fn check_estimate(
    working_set: WorkingSetFn,
    estimate: tomocorr::budget::MaxSlicesFn,
    shape: (usize, usize),
    dtype: DType,
    slices: usize,
) {
    let per_slice = per_slice_bytes(shape.0, shape.1, dtype).unwrap();
    let available =
        working_set(slices, shape.0, shape.1, dtype).total().unwrap() + per_slice - 1;

    let est = estimate(shape, dtype, available);
    let true_max = true_max_slices(working_set, shape, dtype, available);

    assert_eq!(est.dtype, dtype);
    assert_eq!(est.non_slice_shape, shape);
    assert!(
        est.max_slices <= true_max,
        "{dtype} {shape:?}: estimate {} exceeds capacity {true_max}",
        est.max_slices
    );
    assert!(
        est.max_slices as f64 >= 0.8 * true_max as f64,
        "{dtype} {shape:?}: estimate {} undershoots capacity {true_max}",
        est.max_slices
    );
    let used = working_set(est.max_slices, shape.0, shape.1, dtype)
        .total()
        .unwrap();
    assert!(used <= available);
}

#[test]
fn distortion_estimate_is_conservative_and_tight() {
    for dtype in [DType::Float32, DType::Uint16] {
        for slices in [15, 51, 160] {
            check_estimate(
                distortion_working_set,
                distortion_max_slices,
                (111, 121),
                dtype,
                slices,
            );
        }
    }
}

#[test]
fn default_estimate_is_conservative_and_tight() {
    for dtype in [DType::Float32, DType::Uint16] {
        for slices in [15, 51, 160] {
            check_estimate(median_working_set, default_max_slices, (111, 121), dtype, slices);
        }
    }
}

#[test]
fn distortion_estimate_on_round_budgets() {
    for mb in [16u64, 256, 1024] {
        let available = mb * 1024 * 1024;
        for dtype in [DType::Float32, DType::Uint16] {
            let est = distortion_max_slices((540, 640), dtype, available);
            let used = distortion_working_set(est.max_slices, 540, 640, dtype)
                .total()
                .unwrap();
            if est.max_slices == 0 {
                // The shared field alone does not fit.
                assert!(used > available);
            } else {
                assert!(used <= available, "{mb} MiB {dtype}: {used} bytes used");
            }
        }
    }
}

#[test]
fn budget_of_whole_slices_is_used_exactly() {
    for dtype in [DType::Float32, DType::Uint16] {
        for slices in [1, 15, 51] {
            let available = distortion_working_set(slices, 111, 121, dtype)
                .total()
                .unwrap();
            let est = distortion_max_slices((111, 121), dtype, available);
            assert_eq!(est.max_slices, slices, "{dtype}");

            let available = median_working_set(slices, 111, 121, dtype).total().unwrap();
            let est = default_max_slices((111, 121), dtype, available);
            assert_eq!(est.max_slices, slices, "{dtype}");
        }
    }
}

#[test]
fn fixed_cost_larger_than_budget_gives_zero() {
    let fixed_only = distortion_working_set(0, 2048, 2048, DType::Float32)
        .total()
        .unwrap();
    let est = distortion_max_slices((2048, 2048), DType::Float32, fixed_only);
    assert_eq!(est.max_slices, 0);
}
