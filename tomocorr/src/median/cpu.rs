use rayon::prelude::*;

use super::KernelSize;
use crate::volume::Voxel;

/// Filters `src` (`[depth, height, width]`) into a new buffer.
pub(super) fn median_filter<T: Voxel>(
    src: &[T],
    dims: [usize; 3],
    size: KernelSize,
    dif: f32,
) -> Vec<T> {
    match size {
        KernelSize::K3 => filter::<T, 3, 27>(src, dims, dif),
        KernelSize::K5 => filter::<T, 5, 125>(src, dims, dif),
        KernelSize::K7 => filter::<T, 7, 343>(src, dims, dif),
        KernelSize::K9 => filter::<T, 9, 729>(src, dims, dif),
        KernelSize::K11 => filter::<T, 11, 1331>(src, dims, dif),
        KernelSize::K13 => filter::<T, 13, 2197>(src, dims, dif),
    }
}

/// Clamped neighbour indices of `center` along an axis of length `len`.
#[inline]
fn neighbours<const K: usize>(center: usize, len: usize) -> [usize; K] {
    let radius = (K / 2) as isize;
    let last = len as isize - 1;
    std::array::from_fn(|i| (center as isize + i as isize - radius).clamp(0, last) as usize)
}

fn filter<T: Voxel, const K: usize, const N: usize>(
    src: &[T],
    [depth, height, width]: [usize; 3],
    dif: f32,
) -> Vec<T> {
    debug_assert_eq!(K * K * K, N);
    let mut out = vec![T::default(); src.len()];

    out.par_chunks_mut(width)
        .enumerate()
        .for_each(|(row_index, out_row)| {
            let z = row_index / height;
            let y = row_index % height;
            let zs = neighbours::<K>(z, depth);
            let ys = neighbours::<K>(y, height);
            let row_start = row_index * width;
            let mut window = [0.0f32; N];

            for (x, out_value) in out_row.iter_mut().enumerate() {
                let xs = neighbours::<K>(x, width);
                let mut k = 0;
                for &zz in &zs {
                    for &yy in &ys {
                        let line = &src[(zz * height + yy) * width..][..width];
                        for &xx in &xs {
                            window[k] = line[xx].to_f32();
                            k += 1;
                        }
                    }
                }

                let (_, &mut median, _) = window.select_nth_unstable_by(N / 2, f32::total_cmp);
                let value = src[row_start + x];
                *out_value = if dif > 0.0 && (value.to_f32() - median).abs() <= dif {
                    value
                } else {
                    T::from_f64(median as f64)
                };
            }
        });

    out
}
