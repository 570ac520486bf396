//! In-memory raster used by every filter.
//!
//! A [`RasterBuffer`] wraps an owned `Array3<u8>` of shape
//! `(height, width, channels)` in standard (row-major) layout:
//! - **Grayscale**: (height, width, 1)
//! - **RGB**: (height, width, 3)
//!
//! Filters never mutate their input; each one builds a new buffer.

use ndarray::{Array2, Array3, ArrayView3};

use crate::border::BorderMode;
use crate::error::{DenoiseError, Result};

/// ITU-R BT.709 luminosity coefficients
const LUMA_R: f64 = 0.2126;
const LUMA_G: f64 = 0.7152;
const LUMA_B: f64 = 0.0722;

/// Owned 8-bit raster with 1 or 3 channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    data: Array3<u8>,
}

impl RasterBuffer {
    /// Build a raster from row-major samples.
    ///
    /// # Errors
    /// `InvalidShape` if `channels` is not 1 or 3, or if
    /// `data.len() != width * height * channels`, or if that product
    /// overflows.
    pub fn new(width: usize, height: usize, channels: usize, data: Vec<u8>) -> Result<Self> {
        let expected = sample_count(width, height, channels)?;
        if data.len() != expected {
            return Err(DenoiseError::InvalidShape(format!(
                "data length ({}) does not match {}x{}x{} ({})",
                data.len(),
                width,
                height,
                channels,
                expected
            )));
        }
        let data = Array3::from_shape_vec((height, width, channels), data)
            .map_err(|e| DenoiseError::InvalidShape(e.to_string()))?;
        Ok(Self { data })
    }

    /// Wrap an existing array of shape `(height, width, channels)`.
    pub fn from_array(data: Array3<u8>) -> Result<Self> {
        check_channels(data.dim().2)?;
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };
        Ok(Self { data })
    }

    /// Raster filled with a single intensity.
    pub fn filled(width: usize, height: usize, channels: usize, value: u8) -> Result<Self> {
        sample_count(width, height, channels)?;
        Ok(Self {
            data: Array3::from_elem((height, width, channels), value),
        })
    }

    /// Build a raster by evaluating `f(x, y, channel)` for every sample.
    pub fn from_fn<F>(width: usize, height: usize, channels: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, usize, usize) -> u8,
    {
        sample_count(width, height, channels)?;
        let data = Array3::from_shape_fn((height, width, channels), |(y, x, c)| f(x, y, c));
        Ok(Self { data })
    }

    pub(crate) fn from_array_unchecked(data: Array3<u8>) -> Self {
        debug_assert!(data.is_standard_layout());
        Self { data }
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn channels(&self) -> usize {
        self.data.dim().2
    }

    /// `(height, width, channels)`, matching the ndarray shape.
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Fail with `EmptyImage` when either dimension is zero.
    pub fn ensure_not_empty(&self) -> Result<()> {
        if self.is_empty() {
            return Err(DenoiseError::EmptyImage {
                width: self.width(),
                height: self.height(),
            });
        }
        Ok(())
    }

    pub fn view(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    /// Bounds-checked sample access.
    pub fn get(&self, x: usize, y: usize, channel: usize) -> Option<u8> {
        self.data.get([y, x, channel]).copied()
    }

    /// Sample access for any coordinate, routed through the border policy.
    pub fn sample(&self, x: isize, y: isize, channel: usize, border: BorderMode) -> u8 {
        crate::border::sample(&self.data.view(), x, y, channel, border)
    }

    /// Row-major copy of the samples.
    pub fn to_vec(&self) -> Vec<u8> {
        self.data.iter().copied().collect()
    }

    /// Consume the raster and return its row-major samples.
    pub fn into_raw(self) -> Vec<u8> {
        let len = self.data.len();
        let (mut raw, offset) = self.data.into_raw_vec_and_offset();
        if let Some(offset) = offset.filter(|&o| o > 0) {
            raw.drain(..offset);
        }
        raw.truncate(len);
        raw
    }

    pub fn into_array(self) -> Array3<u8> {
        self.data
    }

    /// Luminance plane in `f64`; grayscale rasters are copied as-is.
    pub fn luma_plane(&self) -> Array2<f64> {
        let (height, width, channels) = self.data.dim();
        Array2::from_shape_fn((height, width), |(y, x)| {
            if channels == 1 {
                self.data[[y, x, 0]] as f64
            } else {
                let r = self.data[[y, x, 0]] as f64;
                let g = self.data[[y, x, 1]] as f64;
                let b = self.data[[y, x, 2]] as f64;
                LUMA_R * r + LUMA_G * g + LUMA_B * b
            }
        })
    }

    /// Number of samples that sit at either extreme (0 or 255).
    pub fn count_extremes(&self) -> usize {
        self.data.iter().filter(|&&v| v == 0 || v == 255).count()
    }
}

/// Total sample count for a shape; ndarray rejects anything above `isize::MAX`.
fn sample_count(width: usize, height: usize, channels: usize) -> Result<usize> {
    check_channels(channels)?;
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(channels))
        .filter(|&n| n <= isize::MAX as usize)
        .ok_or_else(|| {
            DenoiseError::InvalidShape(format!(
                "{width}x{height}x{channels} exceeds the addressable sample count"
            ))
        })
}

fn check_channels(channels: usize) -> Result<()> {
    match channels {
        1 | 3 => Ok(()),
        n => Err(DenoiseError::InvalidShape(format!(
            "unsupported channel count {n}, expected 1 or 3"
        ))),
    }
}
