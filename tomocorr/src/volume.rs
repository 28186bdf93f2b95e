//! Dense row-major volumes and their element types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Element type tag of a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Uint8,
    Uint16,
    Int16,
    Uint32,
    Float32,
    Float64,
}

impl DType {
    /// Size of one element in bytes.
    pub const fn itemsize(self) -> usize {
        match self {
            DType::Uint8 => 1,
            DType::Uint16 | DType::Int16 => 2,
            DType::Uint32 | DType::Float32 => 4,
            DType::Float64 => 8,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            DType::Uint8 => "uint8",
            DType::Uint16 => "uint16",
            DType::Int16 => "int16",
            DType::Uint32 => "uint32",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Plain-data element that a [`Volume`] can hold.
pub trait Element: bytemuck::Pod + Default + fmt::Debug + PartialEq + Send + Sync + 'static {
    const DTYPE: DType;
}

macro_rules! impl_element {
    ($($t:ty => $dtype:ident),* $(,)?) => {
        $(impl Element for $t {
            const DTYPE: DType = DType::$dtype;
        })*
    };
}

impl_element!(
    u8 => Uint8,
    u16 => Uint16,
    i16 => Int16,
    u32 => Uint32,
    f32 => Float32,
    f64 => Float64,
);

/// Element types the correction kernels process: `f32` and `u16`.
///
/// Integer conversion from `f64` rounds half up and saturates to the type range.
pub trait Voxel: Element + PartialOrd {
    /// `true` when two elements share one 32-bit word on the device.
    const PACKED: bool;

    fn to_f32(self) -> f32;
    fn to_f64(self) -> f64;
    fn from_f64(value: f64) -> Self;
}

impl Voxel for f32 {
    const PACKED: bool = false;

    #[inline]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

impl Voxel for u16 {
    const PACKED: bool = true;

    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        if value >= 0.0 {
            (value + 0.5) as u16
        } else {
            0
        }
    }
}

/// Dense array in row-major order with a dynamic shape.
///
/// Correction operations expect `[slice, height, width]`; other ranks are
/// representable so they can be rejected with a proper error.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume<T> {
    shape: Vec<usize>,
    data: Vec<T>,
}

impl<T: Element> Volume<T> {
    pub fn new(shape: Vec<usize>, data: Vec<T>) -> Result<Self> {
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| Error::InvalidShape {
                shape: shape.clone(),
                reason: "element count overflows",
            })?;
        if expected != data.len() {
            return Err(Error::InvalidShape {
                shape,
                reason: "data length does not match shape",
            });
        }
        Ok(Self { shape, data })
    }

    pub fn zeros(shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Self {
            shape,
            data: vec![T::default(); len],
        }
    }

    /// Builds a `[slices, height, width]` volume from `f(slice, y, x)`.
    pub fn from_fn(dims: [usize; 3], mut f: impl FnMut(usize, usize, usize) -> T) -> Self {
        let [s, h, w] = dims;
        let mut data = Vec::with_capacity(s * h * w);
        for z in 0..s {
            for y in 0..h {
                for x in 0..w {
                    data.push(f(z, y, x));
                }
            }
        }
        Self {
            shape: dims.to_vec(),
            data,
        }
    }

    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// A 2D `[height, width]` volume becomes `[1, height, width]`; other ranks are unchanged.
    pub fn promote_2d(mut self) -> Self {
        if self.shape.len() == 2 {
            self.shape.insert(0, 1);
        }
        self
    }

    /// Returns `[slices, height, width]`, rejecting other ranks and empty axes.
    pub fn dims3(&self) -> Result<[usize; 3]> {
        match self.shape.as_slice() {
            &[s, h, w] if s > 0 && h > 0 && w > 0 => Ok([s, h, w]),
            &[_, _, _] => Err(Error::InvalidShape {
                shape: self.shape.clone(),
                reason: "axes must not be empty",
            }),
            _ => Err(Error::InvalidShape {
                shape: self.shape.clone(),
                reason: "expected 3 axes [slice, height, width]",
            }),
        }
    }

    pub fn slice(&self, index: usize) -> &[T] {
        let plane = self.plane_len();
        &self.data[index * plane..(index + 1) * plane]
    }

    pub fn slice_mut(&mut self, index: usize) -> &mut [T] {
        let plane = self.plane_len();
        &mut self.data[index * plane..(index + 1) * plane]
    }

    pub fn get(&self, z: usize, y: usize, x: usize) -> T {
        let [_, h, w] = self.trailing3();
        self.data[(z * h + y) * w + x]
    }

    /// Keeps the central `[height - 2c, width - 2c]` window of every slice,
    /// compacting the data in place.
    pub(crate) fn crop_in_place(&mut self, crop: usize) {
        if crop == 0 {
            return;
        }
        let [s, h, w] = self.trailing3();
        let (out_h, out_w) = (h - 2 * crop, w - 2 * crop);
        let mut dst = 0;
        for z in 0..s {
            for y in crop..h - crop {
                let src = (z * h + y) * w + crop;
                self.data.copy_within(src..src + out_w, dst);
                dst += out_w;
            }
        }
        self.data.truncate(dst);
        self.shape = vec![s, out_h, out_w];
    }

    fn plane_len(&self) -> usize {
        let [_, h, w] = self.trailing3();
        h * w
    }

    fn trailing3(&self) -> [usize; 3] {
        let n = self.shape.len();
        assert!(n >= 2, "volume needs at least 2 axes");
        let s = if n >= 3 { self.shape[n - 3] } else { 1 };
        [s, self.shape[n - 2], self.shape[n - 1]]
    }
}

/// Type-erased volume handed over by an orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyVolume {
    U8(Volume<u8>),
    U16(Volume<u16>),
    I16(Volume<i16>),
    U32(Volume<u32>),
    F32(Volume<f32>),
    F64(Volume<f64>),
}

impl AnyVolume {
    pub fn dtype(&self) -> DType {
        match self {
            AnyVolume::U8(_) => DType::Uint8,
            AnyVolume::U16(_) => DType::Uint16,
            AnyVolume::I16(_) => DType::Int16,
            AnyVolume::U32(_) => DType::Uint32,
            AnyVolume::F32(_) => DType::Float32,
            AnyVolume::F64(_) => DType::Float64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            AnyVolume::U8(v) => v.shape(),
            AnyVolume::U16(v) => v.shape(),
            AnyVolume::I16(v) => v.shape(),
            AnyVolume::U32(v) => v.shape(),
            AnyVolume::F32(v) => v.shape(),
            AnyVolume::F64(v) => v.shape(),
        }
    }

    pub fn as_f32(&self) -> Option<&Volume<f32>> {
        match self {
            AnyVolume::F32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<&Volume<u16>> {
        match self {
            AnyVolume::U16(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! impl_from_volume {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(impl From<Volume<$t>> for AnyVolume {
            fn from(volume: Volume<$t>) -> Self {
                AnyVolume::$variant(volume)
            }
        })*
    };
}

impl_from_volume!(
    u8 => U8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    f32 => F32,
    f64 => F64,
);
