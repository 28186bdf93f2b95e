//! Resampling a 2D field at floating-point coordinates.
//!
//! Behaves like `scipy.ndimage.map_coordinates` for spline orders 0 to 5:
//! orders above 1 prefilter the field into B-spline coefficients first, and
//! the boundary mode decides both how out-of-range coordinates are folded
//! back and which samples stand in for taps past the edges.

mod spline;
#[cfg(test)]
mod tests;

use std::fmt;
use std::str::FromStr;

use common::Buffer2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::volume::Voxel;

use spline::FilterExtension;

/// Padding added around the field for modes the prefilter can't extend analytically.
const SPLINE_PAD: usize = 12;

/// Boundary handling for [`map_coordinates`]. Out-of-range constant samples are 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryMode {
    /// Half-sample symmetric: `d c b a | a b c d | d c b a`.
    #[default]
    Reflect,
    /// Same extension as `Reflect`.
    GridMirror,
    /// Whole-sample symmetric: `d c b | a b c d | c b a`.
    Mirror,
    /// Edge replication: `a a a | a b c d | d d d`.
    Nearest,
    /// Coordinates outside `[0, n - 1]` produce 0; taps past the edges are mirrored.
    Constant,
    /// Zero padding: `0 0 0 | a b c d | 0 0 0`.
    GridConstant,
    /// Periodic, same as `GridWrap`.
    Wrap,
    /// Periodic: `a b c d | a b c d | a b c d`.
    GridWrap,
}

impl BoundaryMode {
    pub const ALL: [BoundaryMode; 8] = [
        BoundaryMode::Reflect,
        BoundaryMode::GridMirror,
        BoundaryMode::Mirror,
        BoundaryMode::Nearest,
        BoundaryMode::Constant,
        BoundaryMode::GridConstant,
        BoundaryMode::Wrap,
        BoundaryMode::GridWrap,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            BoundaryMode::Reflect => "reflect",
            BoundaryMode::GridMirror => "grid-mirror",
            BoundaryMode::Mirror => "mirror",
            BoundaryMode::Nearest => "nearest",
            BoundaryMode::Constant => "constant",
            BoundaryMode::GridConstant => "grid-constant",
            BoundaryMode::Wrap => "wrap",
            BoundaryMode::GridWrap => "grid-wrap",
        }
    }

    fn filter_extension(self) -> FilterExtension {
        match self {
            BoundaryMode::Mirror | BoundaryMode::Constant | BoundaryMode::GridConstant => {
                FilterExtension::Mirror
            }
            BoundaryMode::Reflect | BoundaryMode::GridMirror | BoundaryMode::Nearest => {
                FilterExtension::Reflect
            }
            BoundaryMode::Wrap | BoundaryMode::GridWrap => FilterExtension::Periodic,
        }
    }

    fn needs_padding(self) -> bool {
        matches!(self, BoundaryMode::Nearest | BoundaryMode::GridConstant)
    }
}

impl fmt::Display for BoundaryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BoundaryMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        BoundaryMode::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| Error::invalid_parameter("mode", format!("unknown boundary mode '{s}'")))
    }
}

/// Spline order used by [`map_coordinates`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum InterpolationOrder {
    Nearest,
    #[default]
    Linear,
    Quadratic,
    Cubic,
    Quartic,
    Quintic,
}

impl InterpolationOrder {
    pub const fn degree(self) -> usize {
        self as usize
    }
}

impl TryFrom<u32> for InterpolationOrder {
    type Error = Error;

    fn try_from(order: u32) -> Result<Self> {
        Ok(match order {
            0 => InterpolationOrder::Nearest,
            1 => InterpolationOrder::Linear,
            2 => InterpolationOrder::Quadratic,
            3 => InterpolationOrder::Cubic,
            4 => InterpolationOrder::Quartic,
            5 => InterpolationOrder::Quintic,
            _ => {
                return Err(Error::invalid_parameter(
                    "order",
                    format!("spline order must be in 0..=5, got {order}"),
                ))
            }
        })
    }
}

impl From<InterpolationOrder> for u32 {
    fn from(order: InterpolationOrder) -> Self {
        order.degree() as u32
    }
}

impl FromStr for InterpolationOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let order: u32 = s
            .trim()
            .parse()
            .map_err(|_| Error::invalid_parameter("order", format!("'{s}' is not an integer")))?;
        InterpolationOrder::try_from(order)
    }
}

/// Folds a coordinate outside `[0, len - 1]` back into range.
/// `None` means the sample is the constant 0.
fn fold_coordinate(c: f64, len: usize, mode: BoundaryMode) -> Option<f64> {
    let n = len as f64;
    if c >= 0.0 && c <= n - 1.0 {
        return Some(c);
    }
    if len <= 1 {
        return match mode {
            BoundaryMode::Constant => None,
            BoundaryMode::GridConstant => Some(c),
            _ => Some(0.0),
        };
    }
    match mode {
        BoundaryMode::Mirror => {
            let period = 2.0 * n - 2.0;
            let mut m = c.abs().rem_euclid(period);
            if m > n - 1.0 {
                m = period - m;
            }
            Some(m)
        }
        BoundaryMode::Reflect | BoundaryMode::GridMirror => {
            let period = 2.0 * n;
            let mut m = c.rem_euclid(period);
            if m >= n {
                m = period - m - 1.0;
            }
            Some(m)
        }
        BoundaryMode::Wrap | BoundaryMode::GridWrap => Some(c.rem_euclid(n)),
        BoundaryMode::Nearest => Some(c.clamp(0.0, n - 1.0)),
        BoundaryMode::Constant => None,
        BoundaryMode::GridConstant => Some(c),
    }
}

/// Maps an integer tap index into `[0, len)`. `None` means the tap reads 0.
#[inline]
fn fold_tap(i: isize, len: usize, mode: BoundaryMode) -> Option<usize> {
    let n = len as isize;
    if (0..n).contains(&i) {
        return Some(i as usize);
    }
    if n == 1 {
        return (mode != BoundaryMode::GridConstant).then_some(0);
    }
    let j = match mode {
        BoundaryMode::Mirror | BoundaryMode::Constant => {
            let period = 2 * n - 2;
            let m = i.rem_euclid(period);
            if m >= n {
                period - m
            } else {
                m
            }
        }
        BoundaryMode::Reflect | BoundaryMode::GridMirror => {
            let period = 2 * n;
            let m = i.rem_euclid(period);
            if m >= n {
                period - 1 - m
            } else {
                m
            }
        }
        BoundaryMode::Wrap | BoundaryMode::GridWrap => i.rem_euclid(n),
        BoundaryMode::Nearest => i.clamp(0, n - 1),
        BoundaryMode::GridConstant => return None,
    };
    Some(j as usize)
}

/// A 2D field prepared for repeated sampling.
#[derive(Debug, Clone)]
pub struct Resampler {
    coeffs: Buffer2<f64>,
    pad: usize,
    height: usize,
    width: usize,
    order: InterpolationOrder,
    mode: BoundaryMode,
}

impl Resampler {
    /// Prepares `values` (`height × width`, row-major) for sampling.
    pub fn new<T: Voxel>(
        values: &[T],
        height: usize,
        width: usize,
        order: InterpolationOrder,
        mode: BoundaryMode,
    ) -> Result<Self> {
        if values.len() != height * width {
            return Err(Error::invalid_parameter(
                "values",
                format!("{} samples don't fill a {height}x{width} field", values.len()),
            ));
        }

        let degree = order.degree();
        let pad = if degree > 1 && mode.needs_padding() {
            SPLINE_PAD
        } else {
            0
        };

        let (ph, pw) = (height + 2 * pad, width + 2 * pad);
        let coeffs = if pad == 0 {
            Buffer2::new(width, height, values.iter().map(|v| v.to_f64()).collect())
        } else {
            Buffer2::from_fn(pw, ph, |x, y| {
                let sx = x as isize - pad as isize;
                let sy = y as isize - pad as isize;
                match (mode, fold_tap(sy, height, mode), fold_tap(sx, width, mode)) {
                    (BoundaryMode::GridConstant, Some(yy), Some(xx)) => {
                        values[yy * width + xx].to_f64()
                    }
                    (BoundaryMode::GridConstant, _, _) => 0.0,
                    _ => {
                        let yy = sy.clamp(0, height as isize - 1) as usize;
                        let xx = sx.clamp(0, width as isize - 1) as usize;
                        values[yy * width + xx].to_f64()
                    }
                }
            })
        };

        let mut resampler = Self {
            coeffs,
            pad,
            height,
            width,
            order,
            mode,
        };
        if degree > 1 {
            spline::prefilter_2d(&mut resampler.coeffs, degree, mode.filter_extension());
        }
        Ok(resampler)
    }

    pub fn order(&self) -> InterpolationOrder {
        self.order
    }

    pub fn mode(&self) -> BoundaryMode {
        self.mode
    }

    /// Samples the field at row `y`, column `x`.
    pub fn sample(&self, y: f64, x: f64) -> f64 {
        let (Some(y), Some(x)) = (
            fold_coordinate(y, self.height, self.mode),
            fold_coordinate(x, self.width, self.mode),
        ) else {
            return 0.0;
        };
        let (y, x) = (y + self.pad as f64, x + self.pad as f64);
        let (ph, pw) = (self.coeffs.height(), self.coeffs.width());

        let degree = self.order.degree();
        let mut wy = [0.0f64; 6];
        let mut wx = [0.0f64; 6];
        let y0 = spline::weights(y, degree, &mut wy);
        let x0 = spline::weights(x, degree, &mut wx);

        let mut cols = [None; 6];
        for (i, col) in cols.iter_mut().enumerate().take(degree + 1) {
            *col = fold_tap(x0 + i as isize, pw, self.mode);
        }

        let mut acc = 0.0;
        for (i, &weight_y) in wy.iter().enumerate().take(degree + 1) {
            let Some(row) = fold_tap(y0 + i as isize, ph, self.mode) else {
                continue;
            };
            let row = self.coeffs.row(row);
            let mut line = 0.0;
            for (j, &weight_x) in wx.iter().enumerate().take(degree + 1) {
                if let Some(col) = cols[j] {
                    line += weight_x * row[col];
                }
            }
            acc += weight_y * line;
        }
        acc
    }

    /// Samples at every `(rows[i], cols[i])` and writes the result converted to `T`.
    pub fn resample_into<T: Voxel>(
        &self,
        rows: &[f32],
        cols: &[f32],
        output: &mut [T],
    ) -> Result<()> {
        if rows.len() != cols.len() {
            return Err(Error::invalid_parameter(
                "cols",
                format!("{} row coordinates but {} column coordinates", rows.len(), cols.len()),
            ));
        }
        if rows.len() != output.len() {
            return Err(Error::invalid_parameter(
                "output",
                format!("{} coordinates but room for {} samples", rows.len(), output.len()),
            ));
        }
        for ((out, &y), &x) in output.iter_mut().zip(rows).zip(cols) {
            *out = T::from_f64(self.sample(y as f64, x as f64));
        }
        Ok(())
    }
}

/// Resamples `values` (`height × width`) at the given coordinates.
pub fn map_coordinates<T: Voxel>(
    values: &[T],
    height: usize,
    width: usize,
    rows: &[f32],
    cols: &[f32],
    order: InterpolationOrder,
    mode: BoundaryMode,
) -> Result<Vec<T>> {
    let resampler = Resampler::new(values, height, width, order, mode)?;
    let mut output = vec![T::default(); rows.len()];
    resampler.resample_into(rows, cols, &mut output)?;
    Ok(output)
}
