//! B-spline prefilter and interpolation weights (orders 0 to 5).
//!
//! The prefilter turns samples into spline coefficients with the recursive
//! causal/anti-causal filter pair of each pole; the boundary initialisation
//! depends on how the signal is extended past its ends.

use common::Buffer2;

/// Signal extension assumed by the prefilter's boundary initialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum FilterExtension {
    /// Whole-sample symmetric: `c b | a b c | b a`.
    Mirror,
    /// Half-sample symmetric: `b a | a b c | c b`.
    Reflect,
    /// Periodic: `b c | a b c | a b`.
    Periodic,
}

/// Poles of the B-spline prefilter of `order`. Orders 0 and 1 need no prefilter.
pub(super) fn poles(order: usize) -> &'static [f64] {
    use std::sync::OnceLock;

    static POLES: OnceLock<[Vec<f64>; 6]> = OnceLock::new();
    let table = POLES.get_or_init(|| {
        let sqrt = f64::sqrt;
        [
            vec![],
            vec![],
            vec![sqrt(8.0) - 3.0],
            vec![sqrt(3.0) - 2.0],
            vec![
                sqrt(664.0 - sqrt(438976.0)) + sqrt(304.0) - 19.0,
                sqrt(664.0 + sqrt(438976.0)) - sqrt(304.0) - 19.0,
            ],
            vec![
                sqrt(67.5 - sqrt(4436.25)) + sqrt(26.25) - 6.5,
                sqrt(67.5 + sqrt(4436.25)) - sqrt(26.25) - 6.5,
            ],
        ]
    });
    table.get(order).map(Vec::as_slice).unwrap_or(&[])
}

/// Boundary initialisation of one causal/anti-causal pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineBoundary {
    Mirror,
    Periodic,
}

fn init_causal(c: &mut [f64], z: f64, boundary: LineBoundary) {
    let n = c.len();
    match boundary {
        LineBoundary::Mirror => {
            let z_n_1 = z.powi(n as i32 - 1);
            let mut z_i = z;
            c[0] += z_n_1 * c[n - 1];
            for i in 1..n - 1 {
                c[0] += z_i * (c[i] + z_n_1 * c[n - 1 - i]);
                z_i *= z;
            }
            c[0] /= 1.0 - z_n_1 * z_n_1;
        }
        LineBoundary::Periodic => {
            let mut z_i = z;
            for i in 1..n {
                c[0] += z_i * c[n - i];
                z_i *= z;
            }
            c[0] /= 1.0 - z_i;
        }
    }
}

fn init_anticausal(c: &mut [f64], z: f64, boundary: LineBoundary) {
    let n = c.len();
    match boundary {
        LineBoundary::Mirror => {
            c[n - 1] = (z * c[n - 2] + c[n - 1]) * z / (z * z - 1.0);
        }
        LineBoundary::Periodic => {
            let mut z_i = z;
            for i in 0..n - 1 {
                c[n - 1] += z_i * c[i];
                z_i *= z;
            }
            c[n - 1] *= z / (z_i - 1.0);
        }
    }
}

fn filter_poles(line: &mut [f64], zs: &[f64], boundary: LineBoundary) {
    let n = line.len();
    let gain: f64 = zs.iter().map(|&z| (1.0 - z) * (1.0 - 1.0 / z)).product();
    line.iter_mut().for_each(|v| *v *= gain);

    for &z in zs {
        init_causal(line, z, boundary);
        for i in 1..n {
            line[i] += z * line[i - 1];
        }
        init_anticausal(line, z, boundary);
        for i in (0..n - 1).rev() {
            line[i] = z * (line[i + 1] - line[i]);
        }
    }
}

/// Converts one line of samples into spline coefficients in place.
pub(super) fn prefilter_line(line: &mut [f64], order: usize, ext: FilterExtension) {
    let n = line.len();
    let zs = poles(order);
    if n < 2 || zs.is_empty() {
        return;
    }

    match ext {
        FilterExtension::Mirror => filter_poles(line, zs, LineBoundary::Mirror),
        FilterExtension::Periodic => filter_poles(line, zs, LineBoundary::Periodic),
        // The half-sample symmetric extension is periodic with period 2n.
        FilterExtension::Reflect => {
            let mut extended = Vec::with_capacity(2 * n);
            extended.extend_from_slice(line);
            extended.extend(line.iter().rev());
            filter_poles(&mut extended, zs, LineBoundary::Periodic);
            line.copy_from_slice(&extended[..n]);
        }
    }
}

/// Separable prefilter over both axes of `coeffs`.
pub(super) fn prefilter_2d(coeffs: &mut Buffer2<f64>, order: usize, ext: FilterExtension) {
    if poles(order).is_empty() {
        return;
    }
    let (w, h) = (coeffs.width(), coeffs.height());

    let mut column = vec![0.0f64; h];
    for x in 0..w {
        for (y, v) in column.iter_mut().enumerate() {
            *v = coeffs[(x, y)];
        }
        prefilter_line(&mut column, order, ext);
        for (y, v) in column.iter().enumerate() {
            coeffs[(x, y)] = *v;
        }
    }

    for y in 0..h {
        prefilter_line(coeffs.row_mut(y), order, ext);
    }
}

/// Fills `weights[..=order]` for sampling at `x` and returns the first tap index.
///
/// Odd orders start at `floor(x) - order / 2`, even orders at
/// `floor(x + 0.5) - order / 2`. The weights sum to one.
pub(super) fn weights(x: f64, order: usize, weights: &mut [f64; 6]) -> isize {
    let anchor = if order & 1 == 1 {
        x.floor()
    } else {
        (x + 0.5).floor()
    };
    let start = anchor as isize - (order / 2) as isize;
    let t = x - anchor;

    match order {
        0 => {}
        1 => {
            weights[0] = 1.0 - t;
        }
        2 => {
            weights[1] = 0.75 - t * t;
            let y = 0.5 - t;
            weights[0] = 0.5 * y * y;
        }
        3 => {
            let y = t;
            let z = 1.0 - t;
            weights[1] = (y * y * (y - 2.0) * 3.0 + 4.0) / 6.0;
            weights[2] = (z * z * (z - 2.0) * 3.0 + 4.0) / 6.0;
            weights[0] = z * z * z / 6.0;
        }
        4 => {
            let sq = t * t;
            weights[2] = sq * (sq * 0.25 - 0.625) + 115.0 / 192.0;
            let y = 1.0 + t;
            weights[1] =
                y * (y * (y * (5.0 - y) / 6.0 - 1.25) + 5.0 / 24.0) + 55.0 / 96.0;
            let z = 1.0 - t;
            weights[3] =
                z * (z * (z * (5.0 - z) / 6.0 - 1.25) + 5.0 / 24.0) + 55.0 / 96.0;
            let y = 0.5 - t;
            let sq = y * y;
            weights[0] = sq * sq / 24.0;
        }
        5 => {
            let y = t;
            let sq = y * y;
            weights[2] = sq * (sq * (0.25 - y / 12.0) - 0.5) + 0.55;
            let z = 1.0 - t;
            let sq = z * z;
            weights[3] = sq * (sq * (0.25 - z / 12.0) - 0.5) + 0.55;
            let y = 1.0 + t;
            weights[1] =
                y * (y * (y * (y * (y / 24.0 - 0.375) + 1.25) - 1.75) + 0.625) + 0.425;
            let z = 2.0 - t;
            weights[4] =
                z * (z * (z * (z * (z / 24.0 - 0.375) + 1.25) - 1.75) + 0.625) + 0.425;
            let y = 1.0 - t;
            let sq = y * y;
            weights[0] = y * sq * sq / 120.0;
        }
        _ => unreachable!("spline order {order} not supported"),
    }

    weights[order] = 1.0 - weights[..order].iter().sum::<f64>();
    start
}
