//! Out-of-bounds pixel access shared by all windowed filters.

use ndarray::{Array2, ArrayView3};
use serde::Deserialize;

/// Border handling modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderMode {
    /// Replicate the value of the nearest border pixel.
    /// Corresponds to OpenCV's `BORDER_REPLICATE`.
    #[default]
    Replicate,

    /// Reflect the image across the border, including the border pixel.
    /// Corresponds to OpenCV's `BORDER_REFLECT`.
    Reflect,
}

impl BorderMode {
    /// Map any index onto `[0, len)`. `len` must be non-zero.
    #[inline]
    pub fn resolve(self, idx: isize, len: usize) -> usize {
        let len = len as isize;
        if len <= 1 {
            return 0;
        }
        match self {
            BorderMode::Replicate => idx.clamp(0, len - 1) as usize,
            BorderMode::Reflect => {
                let period = 2 * len;
                let m = idx.rem_euclid(period);
                if m >= len {
                    (period - 1 - m) as usize
                } else {
                    m as usize
                }
            }
        }
    }
}

/// Read a sample at any `(x, y)`, including out-of-bounds coordinates.
#[inline]
pub fn sample(view: &ArrayView3<u8>, x: isize, y: isize, channel: usize, mode: BorderMode) -> u8 {
    let (height, width, _) = view.dim();
    let sx = mode.resolve(x, width);
    let sy = mode.resolve(y, height);
    view[[sy, sx, channel]]
}

/// Collect the `(2 * radius + 1)^2` neighbourhood of `(x, y)` into `out`.
///
/// `out` is cleared first so callers can reuse one allocation per row.
pub fn gather_window(
    view: &ArrayView3<u8>,
    x: usize,
    y: usize,
    channel: usize,
    radius: usize,
    mode: BorderMode,
    out: &mut Vec<u8>,
) {
    out.clear();
    let r = radius as isize;
    for dy in -r..=r {
        for dx in -r..=r {
            out.push(sample(view, x as isize + dx, y as isize + dy, channel, mode));
        }
    }
}

/// Copy one channel into an `f64` plane padded by `radius` on every side.
///
/// Padded pixel `(py, px)` corresponds to source `(py - radius, px - radius)`.
pub fn padded_plane(
    view: &ArrayView3<u8>,
    channel: usize,
    radius: usize,
    mode: BorderMode,
) -> Array2<f64> {
    let (height, width, _) = view.dim();
    let r = radius as isize;
    Array2::from_shape_fn((height + 2 * radius, width + 2 * radius), |(py, px)| {
        sample(view, px as isize - r, py as isize - r, channel, mode) as f64
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn ramp() -> Array3<u8> {
        // 3x4 single channel, value = 10 * y + x
        Array3::from_shape_fn((3, 4, 1), |(y, x, _)| (10 * y + x) as u8)
    }

    #[test]
    fn test_replicate_clamps() {
        let img = ramp();
        let view = img.view();
        assert_eq!(sample(&view, -5, -5, 0, BorderMode::Replicate), 0);
        assert_eq!(sample(&view, 10, 1, 0, BorderMode::Replicate), 13);
        assert_eq!(sample(&view, 2, 7, 0, BorderMode::Replicate), 22);
    }

    #[test]
    fn test_reflect_mirrors_including_edge() {
        assert_eq!(BorderMode::Reflect.resolve(-1, 4), 0);
        assert_eq!(BorderMode::Reflect.resolve(-2, 4), 1);
        assert_eq!(BorderMode::Reflect.resolve(4, 4), 3);
        assert_eq!(BorderMode::Reflect.resolve(5, 4), 2);
        // far out of range folds back into the image
        assert_eq!(BorderMode::Reflect.resolve(-9, 4), 0);
        assert!(BorderMode::Reflect.resolve(1000, 4) < 4);
    }

    #[test]
    fn test_single_pixel_axis() {
        assert_eq!(BorderMode::Reflect.resolve(-3, 1), 0);
        assert_eq!(BorderMode::Replicate.resolve(3, 1), 0);
    }

    #[test]
    fn test_gather_window_corner() {
        let img = ramp();
        let mut out = Vec::new();
        gather_window(&img.view(), 0, 0, 0, 1, BorderMode::Replicate, &mut out);
        assert_eq!(out, vec![0, 0, 1, 0, 0, 1, 10, 10, 11]);
    }

    #[test]
    fn test_padded_plane_shape() {
        let img = ramp();
        let plane = padded_plane(&img.view(), 0, 2, BorderMode::Replicate);
        assert_eq!(plane.dim(), (7, 8));
        assert_eq!(plane[[2, 2]], 0.0);
        assert_eq!(plane[[0, 0]], 0.0);
        assert_eq!(plane[[6, 7]], 23.0);
    }
}
