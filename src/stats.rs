//! Image statistics: mean, standard deviation, range and blur score.
//!
//! The blur score is the variance of the 4-neighbour Laplacian response on
//! the luminance plane. Sharp images have strong second-derivative
//! responses and score high; blurred images score low.
//!
//! Edge pixels read their missing neighbours through the configured
//! [`BorderMode`] (replicate by default). OpenCV's `Laplacian` defaults to
//! reflect-101, so scores agree with it in the interior and can differ on
//! the outermost rows and columns.

use ndarray::{Array2, Axis};
use serde::Serialize;

use crate::border::BorderMode;
use crate::error::Result;
use crate::raster::RasterBuffer;

/// 4-neighbour Laplacian
const LAPLACIAN: [[f64; 3]; 3] = [[0.0, 1.0, 0.0], [1.0, -4.0, 1.0], [0.0, 1.0, 0.0]];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImageStatistics {
    pub mean: f64,
    pub std: f64,
    pub min: u8,
    pub max: u8,
    pub blur_score: f64,
}

/// Compute statistics for `input`.
///
/// Mean and standard deviation are computed per channel and averaged across
/// channels; min and max span all samples.
///
/// # Errors
/// `EmptyImage` for zero width or height.
pub fn analyze(input: &RasterBuffer, border: BorderMode) -> Result<ImageStatistics> {
    input.ensure_not_empty()?;

    let view = input.view();
    let channels = input.channels();
    let mut mean_sum = 0.0;
    let mut std_sum = 0.0;
    for lane in view.axis_iter(Axis(2)) {
        let (m, v) = mean_variance(lane.iter().map(|&v| v as f64));
        mean_sum += m;
        std_sum += v.sqrt();
    }

    let min = view.iter().copied().min().unwrap_or(0);
    let max = view.iter().copied().max().unwrap_or(0);

    Ok(ImageStatistics {
        mean: mean_sum / channels as f64,
        std: std_sum / channels as f64,
        min,
        max,
        blur_score: blur_score(&input.luma_plane(), border),
    })
}

/// Laplacian response of a plane, border handled by `border`.
pub fn laplacian(plane: &Array2<f64>, border: BorderMode) -> Array2<f64> {
    let (height, width) = plane.dim();
    Array2::from_shape_fn((height, width), |(y, x)| {
        let mut sum = 0.0;
        for (ky, row) in LAPLACIAN.iter().enumerate() {
            for (kx, &k) in row.iter().enumerate() {
                if k == 0.0 {
                    continue;
                }
                let sy = border.resolve(y as isize + ky as isize - 1, height);
                let sx = border.resolve(x as isize + kx as isize - 1, width);
                sum += k * plane[[sy, sx]];
            }
        }
        sum
    })
}

/// Variance of the Laplacian response.
pub fn blur_score(plane: &Array2<f64>, border: BorderMode) -> f64 {
    if plane.is_empty() {
        return 0.0;
    }
    let response = laplacian(plane, border);
    mean_variance(response.iter().copied()).1
}

/// Population mean and variance (Welford).
fn mean_variance(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut n = 0usize;
    let mut mean = 0.0;
    let mut m2 = 0.0;
    for v in values {
        n += 1;
        let delta = v - mean;
        mean += delta / n as f64;
        m2 += delta * (v - mean);
    }
    if n == 0 {
        (0.0, 0.0)
    } else {
        (mean, m2 / n as f64)
    }
}
