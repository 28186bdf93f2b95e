use common::FloatExt;

use super::*;

fn ramp(height: usize, width: usize) -> Vec<f32> {
    (0..height * width)
        .map(|i| ((i * 7919) % 101) as f32 * 0.5)
        .collect()
}

#[test]
fn test_integer_coordinates_return_samples() {
    let (h, w) = (9, 11);
    let values = ramp(h, w);
    for mode in BoundaryMode::ALL {
        for order in [
            InterpolationOrder::Nearest,
            InterpolationOrder::Linear,
            InterpolationOrder::Cubic,
            InterpolationOrder::Quintic,
        ] {
            let r = Resampler::new(&values, h, w, order, mode).unwrap();
            for y in 0..h {
                for x in 0..w {
                    let v = r.sample(y as f64, x as f64);
                    let expected = values[y * w + x] as f64;
                    assert!(
                        (v - expected).abs() < 1e-6,
                        "{mode} order {order:?} at ({y},{x}): {v} vs {expected}"
                    );
                }
            }
        }
    }
}

#[test]
fn test_linear_midpoints() {
    let values = [0.0f32, 10.0, 20.0, 30.0];
    let r = Resampler::new(&values, 2, 2, InterpolationOrder::Linear, BoundaryMode::Reflect)
        .unwrap();
    assert!((r.sample(0.0, 0.5) - 5.0).abs() < 1e-12);
    assert!((r.sample(0.5, 0.0) - 10.0).abs() < 1e-12);
    assert!((r.sample(0.5, 0.5) - 15.0).abs() < 1e-12);
}

#[test]
fn test_nearest_order_rounds_half_up() {
    let values = [1.0f32, 2.0, 3.0];
    let r = Resampler::new(&values, 1, 3, InterpolationOrder::Nearest, BoundaryMode::Reflect)
        .unwrap();
    assert_eq!(r.sample(0.0, 0.49), 1.0);
    assert_eq!(r.sample(0.0, 0.5), 2.0);
    assert_eq!(r.sample(0.0, 1.7), 3.0);
}

#[test]
fn test_cubic_reproduces_linear_ramp_in_interior() {
    let (h, w) = (4, 64);
    let values: Vec<f32> = (0..h * w).map(|i| (i % w) as f32 * 2.0 + 1.0).collect();
    let r = Resampler::new(&values, h, w, InterpolationOrder::Cubic, BoundaryMode::Mirror).unwrap();
    for x in [20.25, 31.5, 40.75] {
        let v = r.sample(1.0, x);
        assert!(v.within(x * 2.0 + 1.0, 1e-6), "x={x}: {v}");
    }
}

#[test]
fn test_out_of_range_folding() {
    let values = [1.0f32, 2.0, 3.0, 4.0];
    let sample = |mode: BoundaryMode, x: f64| {
        Resampler::new(&values, 1, 4, InterpolationOrder::Linear, mode)
            .unwrap()
            .sample(0.0, x)
    };

    assert_eq!(sample(BoundaryMode::Reflect, -1.0), 1.0);
    assert_eq!(sample(BoundaryMode::GridMirror, 4.0), 4.0);
    assert_eq!(sample(BoundaryMode::Mirror, -1.0), 2.0);
    assert_eq!(sample(BoundaryMode::Mirror, 4.0), 3.0);
    assert_eq!(sample(BoundaryMode::Nearest, -3.0), 1.0);
    assert_eq!(sample(BoundaryMode::Nearest, 9.0), 4.0);
    assert_eq!(sample(BoundaryMode::GridWrap, -1.0), 4.0);
    assert_eq!(sample(BoundaryMode::Wrap, 5.0), 2.0);
    assert_eq!(sample(BoundaryMode::Constant, -0.5), 0.0);
    assert_eq!(sample(BoundaryMode::Constant, 3.5), 0.0);
    assert_eq!(sample(BoundaryMode::GridConstant, -0.5), 0.5);
    assert_eq!(sample(BoundaryMode::GridConstant, -2.0), 0.0);
}

#[test]
fn test_padded_modes_keep_interior_values() {
    let (h, w) = (6, 7);
    let values = ramp(h, w);
    for mode in [BoundaryMode::Nearest, BoundaryMode::GridConstant] {
        let r = Resampler::new(&values, h, w, InterpolationOrder::Cubic, mode).unwrap();
        assert!((r.sample(3.0, 4.0) - values[3 * w + 4] as f64).abs() < 1e-6);
    }
}

#[test]
fn test_map_coordinates_u16_rounds_and_saturates() {
    let values = [0u16, 65535, 100, 101];
    let rows = [0.0f32, 0.0, 0.0];
    let cols = [0.5f32, 2.5, 2.25];
    let out = map_coordinates(
        &values,
        1,
        4,
        &rows,
        &cols,
        InterpolationOrder::Linear,
        BoundaryMode::Reflect,
    )
    .unwrap();
    assert_eq!(out, vec![32768, 101, 100]);
}

#[test]
fn test_half_sample_modes_reproduce_knots_at_every_order() {
    let (h, w) = (9, 11);
    let values = ramp(h, w);
    for mode in [BoundaryMode::Reflect, BoundaryMode::GridMirror] {
        for order in [
            InterpolationOrder::Quadratic,
            InterpolationOrder::Cubic,
            InterpolationOrder::Quartic,
            InterpolationOrder::Quintic,
        ] {
            let r = Resampler::new(&values, h, w, order, mode).unwrap();
            let worst = (0..h * w)
                .map(|i| (r.sample((i / w) as f64, (i % w) as f64) - values[i] as f64).abs())
                .fold(0.0f64, f64::max);
            assert!(worst < 1e-9, "{mode} order {order:?}: knot error {worst}");
        }
    }
}

#[test]
fn test_length_mismatch_is_an_error() {
    let values = [1.0f32; 6];
    let order = InterpolationOrder::Linear;
    let mode = BoundaryMode::Reflect;

    assert!(matches!(
        Resampler::new(&values, 2, 4, order, mode),
        Err(Error::InvalidParameter { name: "values", .. })
    ));
    assert!(matches!(
        map_coordinates(&values, 2, 3, &[0.0, 1.0], &[0.0], order, mode),
        Err(Error::InvalidParameter { name: "cols", .. })
    ));

    let r = Resampler::new(&values, 2, 3, order, mode).unwrap();
    let mut output = [0.0f32; 3];
    assert!(matches!(
        r.resample_into(&[0.0, 1.0], &[0.0, 1.0], &mut output),
        Err(Error::InvalidParameter { name: "output", .. })
    ));
}

#[test]
fn test_boundary_mode_parsing() {
    for mode in BoundaryMode::ALL {
        assert_eq!(mode.name().parse::<BoundaryMode>().unwrap(), mode);
    }
    assert!("bogus".parse::<BoundaryMode>().is_err());

    let mode: BoundaryMode = serde_json::from_str("\"grid-constant\"").unwrap();
    assert_eq!(mode, BoundaryMode::GridConstant);
    assert_eq!(
        serde_json::to_string(&BoundaryMode::GridMirror).unwrap(),
        "\"grid-mirror\""
    );
}

#[test]
fn test_order_parsing() {
    assert_eq!("3".parse::<InterpolationOrder>().unwrap(), InterpolationOrder::Cubic);
    assert!("6".parse::<InterpolationOrder>().is_err());
    assert!("x".parse::<InterpolationOrder>().is_err());

    let order: InterpolationOrder = serde_json::from_str("0").unwrap();
    assert_eq!(order, InterpolationOrder::Nearest);
    assert!(serde_json::from_str::<InterpolationOrder>("9").is_err());
    assert_eq!(InterpolationOrder::default(), InterpolationOrder::Linear);
}
