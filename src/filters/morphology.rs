//! Morphology filters: Erode, Dilate, Opening, Closing.
//!
//! All operations use a square structuring element of side `k` and are
//! computed separably (a horizontal pass followed by a vertical pass), which
//! is exact for square elements under both border modes.

use ndarray::{Array3, ArrayView3};

use crate::border::sample;
use crate::error::Result;
use crate::filters::{map_rows, KernelOptions, KERNEL_SIZE_RANGE};
use crate::raster::RasterBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extremum {
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Horizontal,
    Vertical,
}

fn line_pass(
    input: ArrayView3<u8>,
    radius: usize,
    direction: Direction,
    extremum: Extremum,
    options: KernelOptions,
) -> Array3<u8> {
    let (height, width, channels) = input.dim();
    let r = radius as isize;

    map_rows(height, width, channels, options.execution, |y, mut row| {
        for x in 0..width {
            for c in 0..channels {
                let mut acc = match extremum {
                    Extremum::Min => u8::MAX,
                    Extremum::Max => u8::MIN,
                };
                for d in -r..=r {
                    let (sx, sy) = match direction {
                        Direction::Horizontal => (x as isize + d, y as isize),
                        Direction::Vertical => (x as isize, y as isize + d),
                    };
                    let v = sample(&input, sx, sy, c, options.border);
                    acc = match extremum {
                        Extremum::Min => acc.min(v),
                        Extremum::Max => acc.max(v),
                    };
                }
                row[[x, c]] = acc;
            }
        }
    })
}

fn square_pass(
    input: ArrayView3<u8>,
    radius: usize,
    extremum: Extremum,
    options: KernelOptions,
) -> Array3<u8> {
    let horizontal = line_pass(input, radius, Direction::Horizontal, extremum, options);
    line_pass(horizontal.view(), radius, Direction::Vertical, extremum, options)
}

fn checked(input: &RasterBuffer, kernel_size: usize) -> Result<usize> {
    let kernel_size = KERNEL_SIZE_RANGE.validate(kernel_size)?;
    input.ensure_not_empty()?;
    Ok(kernel_size / 2)
}

/// Erode takes the minimum value in the neighborhood,
/// making dark regions grow and bright regions shrink.
pub fn erode(input: &RasterBuffer, kernel_size: usize, options: KernelOptions) -> Result<RasterBuffer> {
    let radius = checked(input, kernel_size)?;
    let out = square_pass(input.view(), radius, Extremum::Min, options);
    Ok(RasterBuffer::from_array_unchecked(out))
}

/// Dilate takes the maximum value in the neighborhood,
/// making bright regions grow and dark regions shrink.
pub fn dilate(input: &RasterBuffer, kernel_size: usize, options: KernelOptions) -> Result<RasterBuffer> {
    let radius = checked(input, kernel_size)?;
    let out = square_pass(input.view(), radius, Extremum::Max, options);
    Ok(RasterBuffer::from_array_unchecked(out))
}

/// Opening (erode then dilate) removes bright specks smaller than the element.
pub fn opening(input: &RasterBuffer, kernel_size: usize, options: KernelOptions) -> Result<RasterBuffer> {
    let radius = checked(input, kernel_size)?;
    let eroded = square_pass(input.view(), radius, Extremum::Min, options);
    let out = square_pass(eroded.view(), radius, Extremum::Max, options);
    Ok(RasterBuffer::from_array_unchecked(out))
}

/// Closing (dilate then erode) fills dark specks smaller than the element.
pub fn closing(input: &RasterBuffer, kernel_size: usize, options: KernelOptions) -> Result<RasterBuffer> {
    let radius = checked(input, kernel_size)?;
    let dilated = square_pass(input.view(), radius, Extremum::Max, options);
    let out = square_pass(dilated.view(), radius, Extremum::Min, options);
    Ok(RasterBuffer::from_array_unchecked(out))
}

/// Opening followed by closing with the same square element.
///
/// # Arguments
/// * `input` - Raster with 1 or 3 channels
/// * `kernel_size` - Odd structuring element side in `3..=15`
/// * `options` - Border policy and row scheduling
pub fn morphological(
    input: &RasterBuffer,
    kernel_size: usize,
    options: KernelOptions,
) -> Result<RasterBuffer> {
    let radius = checked(input, kernel_size)?;
    let mut stage = square_pass(input.view(), radius, Extremum::Min, options);
    for extremum in [Extremum::Max, Extremum::Max, Extremum::Min] {
        stage = square_pass(stage.view(), radius, extremum, options);
    }
    Ok(RasterBuffer::from_array_unchecked(stage))
}
