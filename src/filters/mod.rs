//! Denoising filter kernels.
//!
//! ## Supported Formats
//!
//! All filters accept rasters with 1 or 3 channels:
//!
//! | Format | Shape | Type | Description |
//! |--------|-------|------|-------------|
//! | Grayscale8 | (H, W, 1) | u8 | Single luminance channel, 0-255 |
//! | RGB8 | (H, W, 3) | u8 | Red, green, blue, 0-255 |
//!
//! ## Architecture
//!
//! All filters follow these principles:
//! - **Pure** - Input is borrowed, a new raster is returned
//! - **Border aware** - Every neighbourhood read goes through [`crate::border`]
//! - **Row parallel** - Output rows are independent and run on rayon unless
//!   [`ExecutionStrategy::Serial`] is selected
//!
//! ## Filter Categories
//!
//! - **Order statistics**: median, adaptive median
//! - **Morphology**: erode, dilate, opening + closing
//! - **Adaptive linear**: Wiener
//! - **Edge preserving**: bilateral

pub mod adaptive_median;
pub mod bilateral;
pub mod median;
pub mod morphology;
pub mod wiener;

use ndarray::parallel::prelude::*;
use ndarray::{Array3, ArrayViewMut2, Axis};
use serde::Deserialize;

use crate::border::BorderMode;
use crate::error::{DenoiseError, Result};

/// Controls how row work is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// Use the global rayon thread pool, one task per output row.
    #[default]
    ParallelRows,

    /// Run sequentially on the current thread.
    ///
    /// Useful for small images, debugging, or when the overhead of
    /// parallelization outweighs the benefits.
    Serial,
}

/// Options shared by every kernel invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct KernelOptions {
    pub border: BorderMode,
    pub execution: ExecutionStrategy,
}

/// Accepted kernel sizes for filters exposing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct KernelSizeRange {
    pub min: usize,
    pub max: usize,
    pub must_be_odd: bool,
}

/// Kernel sizes accepted at the service boundary: 3..=15, odd only.
pub const KERNEL_SIZE_RANGE: KernelSizeRange = KernelSizeRange {
    min: 3,
    max: 15,
    must_be_odd: true,
};

impl KernelSizeRange {
    pub fn contains(&self, size: usize) -> bool {
        size >= self.min && size <= self.max && (!self.must_be_odd || size % 2 == 1)
    }

    /// Return `size` unchanged if accepted, `InvalidParameter` otherwise.
    pub fn validate(&self, size: usize) -> Result<usize> {
        if self.must_be_odd && size % 2 == 0 {
            return Err(DenoiseError::InvalidParameter(format!(
                "kernel_size must be odd, got {size}"
            )));
        }
        if size < self.min || size > self.max {
            return Err(DenoiseError::InvalidParameter(format!(
                "kernel_size must be in {}..={}, got {size}",
                self.min, self.max
            )));
        }
        Ok(size)
    }
}

/// Allocate a `(height, width, channels)` output and fill it row by row.
///
/// `fill(y, row)` receives the row index and a `(width, channels)` view.
pub(crate) fn map_rows<F>(
    height: usize,
    width: usize,
    channels: usize,
    execution: ExecutionStrategy,
    fill: F,
) -> Array3<u8>
where
    F: Fn(usize, ArrayViewMut2<u8>) + Send + Sync,
{
    let mut output = Array3::<u8>::zeros((height, width, channels));
    match execution {
        ExecutionStrategy::ParallelRows => output
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(y, row)| fill(y, row)),
        ExecutionStrategy::Serial => output
            .axis_iter_mut(Axis(0))
            .enumerate()
            .for_each(|(y, row)| fill(y, row)),
    }
    output
}

#[inline]
pub(crate) fn clamp_to_u8(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
pub(crate) mod test_util {
    use crate::raster::RasterBuffer;

    /// Grayscale raster with a smooth diagonal ramp.
    pub fn gradient(width: usize, height: usize) -> RasterBuffer {
        RasterBuffer::from_fn(width, height, 1, |x, y, _| ((x * 7 + y * 5) % 200 + 20) as u8).unwrap()
    }

    /// Odd kernel sizes 3..=15.
    pub fn odd_sizes() -> impl Iterator<Item = usize> {
        (3..=15).step_by(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_range_accepts_odd_in_range() {
        for k in (3..=15).step_by(2) {
            assert_eq!(KERNEL_SIZE_RANGE.validate(k).unwrap(), k);
        }
    }

    #[test]
    fn test_kernel_range_rejects_even_and_out_of_range() {
        for k in [0, 1, 2, 4, 14, 16, 17, 99] {
            assert!(!KERNEL_SIZE_RANGE.contains(k));
            assert!(matches!(
                KERNEL_SIZE_RANGE.validate(k),
                Err(DenoiseError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_map_rows_serial_and_parallel_match() {
        let fill = |y: usize, mut row: ArrayViewMut2<u8>| {
            for ((x, c), v) in row.indexed_iter_mut() {
                *v = (y * 10 + x + c) as u8;
            }
        };
        let a = map_rows(4, 5, 3, ExecutionStrategy::Serial, fill);
        let b = map_rows(4, 5, 3, ExecutionStrategy::ParallelRows, fill);
        assert_eq!(a, b);
        assert_eq!(a[[3, 4, 2]], 36);
    }
}
