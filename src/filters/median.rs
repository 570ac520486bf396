//! Median filter.
//!
//! Removes salt-and-pepper noise while preserving edges. Each channel is
//! filtered independently over a square `k x k` window.

use crate::border::gather_window;
use crate::error::Result;
use crate::filters::{map_rows, KernelOptions, KERNEL_SIZE_RANGE};
use crate::raster::RasterBuffer;

/// Apply a median filter.
///
/// # Arguments
/// * `input` - Raster with 1 or 3 channels
/// * `kernel_size` - Odd window side in `3..=15`
/// * `options` - Border policy and row scheduling
///
/// # Returns
/// Median-filtered raster with the same shape
pub fn median(input: &RasterBuffer, kernel_size: usize, options: KernelOptions) -> Result<RasterBuffer> {
    let kernel_size = KERNEL_SIZE_RANGE.validate(kernel_size)?;
    input.ensure_not_empty()?;

    let (height, width, channels) = input.dim();
    let view = input.view();
    let radius = kernel_size / 2;

    let output = map_rows(height, width, channels, options.execution, |y, mut row| {
        let mut values: Vec<u8> = Vec::with_capacity(kernel_size * kernel_size);
        for x in 0..width {
            for c in 0..channels {
                gather_window(&view, x, y, c, radius, options.border, &mut values);
                values.sort_unstable();
                row[[x, c]] = values[values.len() / 2];
            }
        }
    });

    Ok(RasterBuffer::from_array_unchecked(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DenoiseError;
    use crate::filters::test_util::{gradient, odd_sizes};
    use crate::filters::ExecutionStrategy;
    use crate::noise::salt_and_pepper;

    #[test]
    fn test_median_flat_image_unchanged() {
        let img = RasterBuffer::filled(9, 7, 1, 128).unwrap();
        for k in odd_sizes() {
            let result = median(&img, k, KernelOptions::default()).unwrap();
            assert_eq!(result, img);
        }
    }

    #[test]
    fn test_median_rejects_even_kernel() {
        let img = RasterBuffer::filled(5, 5, 1, 10).unwrap();
        let err = median(&img, 4, KernelOptions::default()).unwrap_err();
        assert!(matches!(err, DenoiseError::InvalidParameter(_)));
        assert!(median(&img, 17, KernelOptions::default()).is_err());
    }

    #[test]
    fn test_median_removes_isolated_impulses() {
        // Flat background with impulses far enough apart that each 3x3 window
        // holds at most one of them.
        let clean = RasterBuffer::filled(12, 12, 1, 90).unwrap();
        let noisy = RasterBuffer::from_fn(12, 12, 1, |x, y, _| match (x, y) {
            (1, 1) | (6, 2) | (10, 9) => 255,
            (3, 7) | (8, 5) => 0,
            _ => 90,
        })
        .unwrap();

        let result = median(&noisy, 3, KernelOptions::default()).unwrap();
        assert_eq!(result, clean);
    }

    #[test]
    fn test_median_preserves_edge() {
        let img = RasterBuffer::from_fn(6, 6, 1, |x, _, _| if x < 3 { 0 } else { 200 }).unwrap();
        let result = median(&img, 3, KernelOptions::default()).unwrap();
        assert_eq!(result, img);
    }

    #[test]
    fn test_median_color_channels_independent() {
        let mut values = vec![0u8; 5 * 5 * 3];
        for px in values.chunks_exact_mut(3) {
            px.copy_from_slice(&[10, 120, 240]);
        }
        // salt in the red channel only
        values[(2 * 5 + 2) * 3] = 255;
        let img = RasterBuffer::new(5, 5, 3, values).unwrap();

        let result = median(&img, 3, KernelOptions::default()).unwrap();
        assert_eq!(result.get(2, 2, 0), Some(10));
        assert_eq!(result.get(2, 2, 1), Some(120));
        assert_eq!(result.get(2, 2, 2), Some(240));
    }

    #[test]
    fn test_median_serial_matches_parallel() {
        let img = gradient(17, 11);
        let serial = KernelOptions {
            execution: ExecutionStrategy::Serial,
            ..KernelOptions::default()
        };
        assert_eq!(
            median(&img, 5, serial).unwrap(),
            median(&img, 5, KernelOptions::default()).unwrap()
        );
    }

    #[test]
    fn test_median_salt_and_pepper_scenario() {
        // 100x100 retina-like gradient with exactly 5% impulses.
        let clean = RasterBuffer::from_fn(100, 100, 1, |x, y, _| (60 + (x + y) / 2) as u8).unwrap();
        let noisy = salt_and_pepper(&clean, 0.05, 7).unwrap();
        let before = noisy.count_extremes();
        assert_eq!(before, 500);

        let result = median(&noisy, 3, KernelOptions::default()).unwrap();
        let after = result.count_extremes();
        assert!(
            after * 10 <= before,
            "expected >= 90% impulse reduction, {before} -> {after}"
        );
    }
}
