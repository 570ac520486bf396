//! Adaptive median filter.
//!
//! Grows the window around each pixel only as far as needed to find a
//! non-impulse median, so thin structures (vessels) survive better than
//! with a fixed window of the same maximum size.

use crate::border::gather_window;
use crate::error::Result;
use crate::filters::{map_rows, KernelOptions, KERNEL_SIZE_RANGE};
use crate::raster::RasterBuffer;

/// Smallest window examined at every pixel.
pub const MIN_WINDOW: usize = 3;

/// Outcome of the window-growth loop for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdaptiveDecision {
    pub value: u8,
    /// Side of the last window examined.
    pub window: usize,
    pub window_min: u8,
    pub window_max: u8,
}

/// Run the growth loop for one sample.
///
/// `scratch` is reused between calls to avoid per-pixel allocation.
pub fn decide(
    view: &ndarray::ArrayView3<u8>,
    x: usize,
    y: usize,
    channel: usize,
    max_window: usize,
    options: KernelOptions,
    scratch: &mut Vec<u8>,
) -> AdaptiveDecision {
    let center = view[[y, x, channel]];
    let mut window = MIN_WINDOW;
    loop {
        gather_window(view, x, y, channel, window / 2, options.border, scratch);
        scratch.sort_unstable();
        let z_min = scratch[0];
        let z_max = scratch[scratch.len() - 1];
        let z_med = scratch[scratch.len() / 2];

        if z_min < z_med && z_med < z_max {
            // median is not an impulse; keep the center unless it is one
            let value = if z_min < center && center < z_max {
                center
            } else {
                z_med
            };
            return AdaptiveDecision {
                value,
                window,
                window_min: z_min,
                window_max: z_max,
            };
        }

        if window + 2 > max_window {
            return AdaptiveDecision {
                value: z_med,
                window,
                window_min: z_min,
                window_max: z_max,
            };
        }
        window += 2;
    }
}

/// Apply the adaptive median filter.
///
/// # Arguments
/// * `input` - Raster with 1 or 3 channels
/// * `max_kernel_size` - Largest window side tried, odd in `3..=15`
/// * `options` - Border policy and row scheduling
pub fn adaptive_median(
    input: &RasterBuffer,
    max_kernel_size: usize,
    options: KernelOptions,
) -> Result<RasterBuffer> {
    let max_kernel_size = KERNEL_SIZE_RANGE.validate(max_kernel_size)?;
    input.ensure_not_empty()?;

    let (height, width, channels) = input.dim();
    let view = input.view();

    let output = map_rows(height, width, channels, options.execution, |y, mut row| {
        let mut scratch = Vec::with_capacity(max_kernel_size * max_kernel_size);
        for x in 0..width {
            for c in 0..channels {
                row[[x, c]] = decide(&view, x, y, c, max_kernel_size, options, &mut scratch).value;
            }
        }
    });

    Ok(RasterBuffer::from_array_unchecked(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::test_util::odd_sizes;
    use crate::noise::salt_and_pepper;

    #[test]
    fn test_adaptive_flat_image_unchanged() {
        let img = RasterBuffer::filled(8, 8, 3, 77).unwrap();
        for k in odd_sizes() {
            assert_eq!(adaptive_median(&img, k, KernelOptions::default()).unwrap(), img);
        }
    }

    #[test]
    fn test_adaptive_keeps_non_impulse_center() {
        // A faint one-pixel vessel over a gradient is not at the window
        // extremes, so it survives where a plain median would flatten it.
        let img = RasterBuffer::from_fn(9, 9, 1, |x, y, _| {
            let base = 40 + 2 * x + 3 * y;
            (if x == 4 { base + 5 } else { base }) as u8
        })
        .unwrap();
        let result = adaptive_median(&img, 7, KernelOptions::default()).unwrap();
        assert_eq!(result.get(4, 4, 0), Some(65));

        let view = img.view();
        let mut scratch = Vec::new();
        let d = decide(&view, 4, 4, 0, 7, KernelOptions::default(), &mut scratch);
        assert_eq!(d.window, 3);
        assert_eq!((d.window_min, d.window_max), (55, 68));
    }

    #[test]
    fn test_adaptive_replaces_impulse() {
        let img = RasterBuffer::from_fn(7, 7, 1, |x, y, _| {
            if (x, y) == (3, 3) {
                255
            } else {
                (40 + x * 3 + y * 2) as u8
            }
        })
        .unwrap();
        let result = adaptive_median(&img, 5, KernelOptions::default()).unwrap();
        let v = result.get(3, 3, 0).unwrap();
        assert!(v < 255);
        assert!((40..=70).contains(&v));
    }

    #[test]
    fn test_adaptive_output_within_last_window_range() {
        let clean = RasterBuffer::from_fn(40, 30, 1, |x, y, _| (50 + x + y) as u8).unwrap();
        let noisy = salt_and_pepper(&clean, 0.3, 11).unwrap();
        let view = noisy.view();
        let mut scratch = Vec::new();
        for y in 0..30 {
            for x in 0..40 {
                let d = decide(&view, x, y, 0, 9, KernelOptions::default(), &mut scratch);
                assert!(d.window_min <= d.value && d.value <= d.window_max);
                assert!(d.window <= 9);
            }
        }
    }

    #[test]
    fn test_adaptive_grows_window_in_dense_noise() {
        // Every window's median sits at its minimum, so the loop runs to the
        // size limit and falls back to the median there.
        let img = RasterBuffer::from_fn(7, 7, 1, |x, y, _| {
            let near = (2..=4).contains(&x) && (2..=4).contains(&y);
            if near && (x, y) != (2, 2) {
                255
            } else {
                120
            }
        })
        .unwrap();
        let view = img.view();
        let mut scratch = Vec::new();
        let d = decide(&view, 3, 3, 0, 7, KernelOptions::default(), &mut scratch);
        assert_eq!(d.window, 7);
        assert_eq!(d.value, 120);
    }

    #[test]
    fn test_adaptive_rejects_even_max() {
        let img = RasterBuffer::filled(4, 4, 1, 0).unwrap();
        assert!(adaptive_median(&img, 6, KernelOptions::default()).is_err());
    }
}
