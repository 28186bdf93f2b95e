use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tomocorr::{AnyVolume, Error, MedianDezinger, MedianParams, ProcessingContext, Volume};

fn filter() -> MedianDezinger {
    MedianDezinger::new(ProcessingContext::cpu_only())
}

fn random_volume(dims: [usize; 3], seed: u64) -> Volume<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Volume::from_fn(dims, |_, _, _| rng.random_range(0.0f32..100.0))
}

fn neighbourhood_median(volume: &Volume<f32>, k: usize, z: usize, y: usize, x: usize) -> f32 {
    let [d, h, w] = volume.dims3().unwrap();
    let r = (k / 2) as isize;
    let at = |c: usize, o: isize, len: usize| (c as isize + o).clamp(0, len as isize - 1) as usize;
    let mut window = Vec::with_capacity(k * k * k);
    for dz in -r..=r {
        for dy in -r..=r {
            for dx in -r..=r {
                window.push(volume.get(at(z, dz, d), at(y, dy, h), at(x, dx, w)));
            }
        }
    }
    window.sort_by(f32::total_cmp);
    window[window.len() / 2]
}

fn total_change(a: &Volume<f32>, b: &Volume<f32>) -> f64 {
    a.data()
        .iter()
        .zip(b.data())
        .map(|(x, y)| (x - y).abs() as f64)
        .sum()
}

#[test]
fn every_voxel_is_the_neighbourhood_median() {
    let volume = random_volume([5, 6, 7], 1);
    for k in [3u32, 5, 7, 9, 11, 13] {
        let out = filter().apply(&volume, &MedianParams::new(k, 0.0)).unwrap();
        for z in 0..5 {
            for y in 0..6 {
                for x in 0..7 {
                    assert_eq!(
                        out.get(z, y, x),
                        neighbourhood_median(&volume, k as usize, z, y, x),
                        "k={k} at ({z},{y},{x})"
                    );
                }
            }
        }
    }
}

#[test]
fn refiltering_changes_less_than_first_pass() {
    let volume = random_volume([8, 16, 16], 2);
    for k in [3u32, 5, 7, 9, 11, 13] {
        let params = MedianParams::new(k, 0.0);
        let once = filter().apply(&volume, &params).unwrap();
        let twice = filter().apply(&once, &params).unwrap();
        assert!(
            total_change(&once, &twice) < total_change(&volume, &once),
            "k={k}"
        );
    }
}

#[test]
fn large_dif_passes_input_through() {
    let volume = random_volume([4, 9, 11], 3);
    for k in [3u32, 7] {
        let out = filter()
            .apply(&volume, &MedianParams::new(k, 1.0e6))
            .unwrap();
        assert_eq!(out, volume);
    }
}

#[test]
fn only_the_injected_outlier_is_replaced() {
    let mut rng = StdRng::seed_from_u64(4);
    let mut volume = Volume::from_fn([5, 9, 9], |_, _, _| 10.0 + rng.random_range(-0.5f32..0.5));
    let index = (2 * 9 + 4) * 9 + 4;
    volume.data_mut()[index] = 500.0;

    let out = filter()
        .apply(&volume, &MedianParams::new(3, 5.0))
        .unwrap();
    for (i, (&before, &after)) in volume.data().iter().zip(out.data()).enumerate() {
        if i == index {
            assert!((after - 10.0).abs() <= 0.5, "outlier became {after}");
        } else {
            assert_eq!(before, after, "voxel {i} changed");
        }
    }
}

#[test]
fn uint16_keeps_type_and_shape() {
    let mut rng = StdRng::seed_from_u64(5);
    let volume = Volume::from_fn([3, 10, 12], |_, _, _| rng.random_range(0u16..4096));
    let out = filter()
        .apply_any(&volume.clone().into(), &MedianParams::new(5, 0.0))
        .unwrap();
    let out = out.as_u16().unwrap();
    assert_eq!(out.shape(), volume.shape());
}

#[test]
fn remove_outlier_defaults() {
    let mut volume = Volume::from_fn([3, 5, 5], |_, _, _| 1.0f32);
    volume.data_mut()[37] = 1.05;
    volume.data_mut()[38] = 9.0;

    let out = filter().remove_outlier(&volume).unwrap();
    assert_eq!(out.data()[37], 1.05);
    assert_eq!(out.data()[38], 1.0);
}

#[test]
fn invalid_inputs_are_rejected() {
    let f64_volume: AnyVolume = Volume::<f64>::zeros(vec![2, 2, 2]).into();
    assert!(matches!(
        filter().apply_any(&f64_volume, &MedianParams::default()),
        Err(Error::InvalidInputType { .. })
    ));

    for shape in [vec![4, 4], vec![1, 2, 2, 2]] {
        let volume: AnyVolume = Volume::<f32>::zeros(shape).into();
        assert!(matches!(
            filter().apply_any(&volume, &MedianParams::default()),
            Err(Error::InvalidShape { .. })
        ));
    }
}
