//! Local adaptive Wiener filter.
//!
//! Computed in explicit stages:
//! 1. [`local_moments`] - per-channel local mean and variance over `k x k`
//!    windows (padded plane + summed-area table)
//! 2. [`estimate_noise_variance`] - one global scalar per channel
//! 3. [`apply_gain`] - per-pixel `mu + gain * (center - mu)`

use ndarray::{s, Array2};
use serde::Deserialize;

use crate::border::padded_plane;
use crate::error::{DenoiseError, Result};
use crate::filters::{clamp_to_u8, map_rows, KernelOptions, KERNEL_SIZE_RANGE};
use crate::raster::RasterBuffer;

/// How the global noise variance is estimated from local statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseEstimate {
    /// Minimum local variance over the image.
    #[default]
    MinLocalVariance,
    /// Mean local variance over the image.
    MeanLocalVariance,
    /// Variance of the whole channel.
    GlobalVariance,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct WienerConfig {
    pub noise_estimate: NoiseEstimate,
    /// Lower bound for both the noise and the local variance.
    pub noise_floor: f64,
}

impl Default for WienerConfig {
    fn default() -> Self {
        Self {
            noise_estimate: NoiseEstimate::MinLocalVariance,
            noise_floor: 1e-5,
        }
    }
}

/// Local first and second moments of one channel.
#[derive(Debug, Clone)]
pub struct LocalMoments {
    pub mean: Array2<f64>,
    pub variance: Array2<f64>,
    /// Variance of the unpadded channel.
    pub channel_variance: f64,
}

fn integral(plane: &Array2<f64>, squared: bool) -> Array2<f64> {
    let (h, w) = plane.dim();
    let mut sat = Array2::<f64>::zeros((h + 1, w + 1));
    for y in 0..h {
        let mut row_sum = 0.0;
        for x in 0..w {
            let v = plane[[y, x]];
            row_sum += if squared { v * v } else { v };
            sat[[y + 1, x + 1]] = sat[[y, x + 1]] + row_sum;
        }
    }
    sat
}

#[inline]
fn box_sum(sat: &Array2<f64>, y: usize, x: usize, k: usize) -> f64 {
    sat[[y + k, x + k]] - sat[[y, x + k]] - sat[[y + k, x]] + sat[[y, x]]
}

/// Stage 1: local mean and variance for `channel`.
pub fn local_moments(
    input: &RasterBuffer,
    channel: usize,
    kernel_size: usize,
    options: KernelOptions,
) -> LocalMoments {
    let (height, width, _) = input.dim();
    let radius = kernel_size / 2;
    let plane = padded_plane(&input.view(), channel, radius, options.border);
    let sum = integral(&plane, false);
    let sum_sq = integral(&plane, true);
    let n = (kernel_size * kernel_size) as f64;

    let mut mean = Array2::<f64>::zeros((height, width));
    let mut variance = Array2::<f64>::zeros((height, width));
    for y in 0..height {
        for x in 0..width {
            let m = box_sum(&sum, y, x, kernel_size) / n;
            let m2 = box_sum(&sum_sq, y, x, kernel_size) / n;
            mean[[y, x]] = m;
            // cancellation can leave tiny negatives on flat windows
            variance[[y, x]] = (m2 - m * m).max(0.0);
        }
    }

    let interior = plane.slice(s![radius..radius + height, radius..radius + width]);
    let count = (height * width) as f64;
    let channel_mean = interior.sum() / count;
    let channel_variance = interior
        .iter()
        .map(|v| (v - channel_mean) * (v - channel_mean))
        .sum::<f64>()
        / count;

    LocalMoments {
        mean,
        variance,
        channel_variance,
    }
}

/// Stage 2: global noise variance for one channel.
pub fn estimate_noise_variance(moments: &LocalMoments, config: &WienerConfig) -> Result<f64> {
    let estimate = match config.noise_estimate {
        NoiseEstimate::MinLocalVariance => moments.variance.iter().copied().fold(f64::INFINITY, f64::min),
        NoiseEstimate::MeanLocalVariance => moments.variance.mean().unwrap_or(0.0),
        NoiseEstimate::GlobalVariance => moments.channel_variance,
    };
    if !estimate.is_finite() {
        return Err(DenoiseError::FilterExecution {
            filter: "wiener".into(),
            reason: format!("noise variance estimate is not finite ({estimate})"),
        });
    }
    Ok(estimate.max(config.noise_floor))
}

/// Stage 3 for a single sample.
#[inline]
pub fn apply_gain(center: f64, mean: f64, local_variance: f64, noise_variance: f64, floor: f64) -> f64 {
    if local_variance < floor {
        return mean;
    }
    let gain = ((local_variance - noise_variance) / local_variance).max(0.0);
    mean + gain * (center - mean)
}

/// Apply the Wiener filter.
///
/// # Arguments
/// * `input` - Raster with 1 or 3 channels
/// * `kernel_size` - Odd window side in `3..=15`
/// * `config` - Noise estimation strategy and variance floor
/// * `options` - Border policy and row scheduling
pub fn wiener(
    input: &RasterBuffer,
    kernel_size: usize,
    config: &WienerConfig,
    options: KernelOptions,
) -> Result<RasterBuffer> {
    let kernel_size = KERNEL_SIZE_RANGE.validate(kernel_size)?;
    input.ensure_not_empty()?;
    if !(config.noise_floor.is_finite() && config.noise_floor > 0.0) {
        return Err(DenoiseError::InvalidParameter(format!(
            "noise_floor must be positive, got {}",
            config.noise_floor
        )));
    }

    let (height, width, channels) = input.dim();
    let mut stats = Vec::with_capacity(channels);
    for c in 0..channels {
        let moments = local_moments(input, c, kernel_size, options);
        let noise = estimate_noise_variance(&moments, config)?;
        log::debug!("wiener channel {c}: noise variance {noise:.4}");
        stats.push((moments, noise));
    }

    let view = input.view();
    let floor = config.noise_floor;
    let output = map_rows(height, width, channels, options.execution, |y, mut row| {
        for x in 0..width {
            for (c, (moments, noise)) in stats.iter().enumerate() {
                let v = apply_gain(
                    view[[y, x, c]] as f64,
                    moments.mean[[y, x]],
                    moments.variance[[y, x]],
                    *noise,
                    floor,
                );
                row[[x, c]] = clamp_to_u8(v);
            }
        }
    });

    Ok(RasterBuffer::from_array_unchecked(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::test_util::odd_sizes;
    use approx::assert_relative_eq;

    #[test]
    fn test_wiener_flat_image_unchanged() {
        let img = RasterBuffer::filled(10, 6, 1, 140).unwrap();
        for k in odd_sizes() {
            let result = wiener(&img, k, &WienerConfig::default(), KernelOptions::default()).unwrap();
            assert_eq!(result, img);
        }
    }

    #[test]
    fn test_local_moments_known_window() {
        // 3x3 image with values 0..9, center window covers the whole image.
        let img = RasterBuffer::new(3, 3, 1, (0..9).collect()).unwrap();
        let m = local_moments(&img, 0, 3, KernelOptions::default());
        assert_relative_eq!(m.mean[[1, 1]], 4.0, epsilon = 1e-12);
        // population variance of 0..=8
        assert_relative_eq!(m.variance[[1, 1]], 60.0 / 9.0, epsilon = 1e-9);
        assert_relative_eq!(m.channel_variance, 60.0 / 9.0, epsilon = 1e-9);
    }

    #[test]
    fn test_noise_estimate_strategies() {
        let img = RasterBuffer::from_fn(8, 8, 1, |x, _, _| if x < 4 { 50 } else { 150 }).unwrap();
        let m = local_moments(&img, 0, 3, KernelOptions::default());

        let min = estimate_noise_variance(&m, &WienerConfig::default()).unwrap();
        // flat halves give zero local variance, so the floor applies
        assert_relative_eq!(min, 1e-5);

        let global = estimate_noise_variance(
            &m,
            &WienerConfig {
                noise_estimate: NoiseEstimate::GlobalVariance,
                ..WienerConfig::default()
            },
        )
        .unwrap();
        assert_relative_eq!(global, 2500.0, epsilon = 1e-9);

        let mean = estimate_noise_variance(
            &m,
            &WienerConfig {
                noise_estimate: NoiseEstimate::MeanLocalVariance,
                ..WienerConfig::default()
            },
        )
        .unwrap();
        assert!(mean > min && mean < global);
    }

    #[test]
    fn test_apply_gain_limits() {
        // no signal beyond noise: output the local mean
        assert_relative_eq!(apply_gain(200.0, 100.0, 50.0, 80.0, 1e-5), 100.0);
        // noise negligible: output the center
        assert_relative_eq!(apply_gain(200.0, 100.0, 1e6, 1e-5, 1e-5), 200.0, epsilon = 1e-6);
        // flat window
        assert_relative_eq!(apply_gain(90.0, 90.0, 0.0, 1e-5, 1e-5), 90.0);
    }

    #[test]
    fn test_wiener_global_estimate_smooths_impulse() {
        let img = RasterBuffer::from_fn(9, 9, 1, |x, y, _| {
            if (x, y) == (4, 4) {
                255
            } else {
                (100 + (x + y) % 3) as u8
            }
        })
        .unwrap();
        let config = WienerConfig {
            noise_estimate: NoiseEstimate::GlobalVariance,
            ..WienerConfig::default()
        };
        let result = wiener(&img, 3, &config, KernelOptions::default()).unwrap();
        assert!(result.get(4, 4, 0).unwrap() < 255);
    }

    #[test]
    fn test_wiener_rejects_non_positive_floor() {
        let img = RasterBuffer::filled(4, 4, 1, 1).unwrap();
        let config = WienerConfig {
            noise_floor: 0.0,
            ..WienerConfig::default()
        };
        let err = wiener(&img, 3, &config, KernelOptions::default()).unwrap_err();
        assert_eq!(err.kind(), "invalid_parameter");
    }
}
