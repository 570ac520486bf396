//! Bilateral filter (edge-preserving smoothing).
//!
//! Each neighbour is weighted by a spatial Gaussian on its distance to the
//! center and a range Gaussian on its intensity difference. For color
//! rasters the intensity difference is the Euclidean distance across
//! channels, and the same weight is applied to every channel.

use serde::Deserialize;

use crate::border::sample;
use crate::error::{DenoiseError, Result};
use crate::filters::{clamp_to_u8, map_rows, KernelOptions};
use crate::raster::RasterBuffer;

/// Upper bound for a radius derived from `sigma_space`.
pub const MAX_DERIVED_RADIUS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct BilateralConfig {
    /// Neighbourhood diameter; derived from `sigma_space` when `None`.
    pub diameter: Option<usize>,
    pub sigma_color: f64,
    pub sigma_space: f64,
}

impl Default for BilateralConfig {
    fn default() -> Self {
        Self {
            diameter: Some(9),
            sigma_color: 75.0,
            sigma_space: 75.0,
        }
    }
}

impl BilateralConfig {
    pub fn radius(&self) -> usize {
        match self.diameter {
            Some(d) => d / 2,
            None => ((self.sigma_space * 1.5).round() as usize).clamp(1, MAX_DERIVED_RADIUS),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, sigma) in [("sigma_color", self.sigma_color), ("sigma_space", self.sigma_space)] {
            if !(sigma.is_finite() && sigma > 0.0) {
                return Err(DenoiseError::InvalidParameter(format!(
                    "{name} must be positive, got {sigma}"
                )));
            }
        }
        if let Some(d) = self.diameter {
            if d == 0 || d > 2 * MAX_DERIVED_RADIUS + 1 {
                return Err(DenoiseError::InvalidParameter(format!(
                    "bilateral diameter must be in 1..={}, got {d}",
                    2 * MAX_DERIVED_RADIUS + 1
                )));
            }
        }
        Ok(())
    }
}

/// Spatial weights for offsets `-r..=r` in both axes, row-major.
fn spatial_weights(radius: usize, sigma_space: f64) -> Vec<f64> {
    let r = radius as isize;
    let denom = 2.0 * sigma_space * sigma_space;
    let mut weights = Vec::with_capacity((2 * radius + 1) * (2 * radius + 1));
    for dy in -r..=r {
        for dx in -r..=r {
            let d2 = (dx * dx + dy * dy) as f64;
            weights.push((-d2 / denom).exp());
        }
    }
    weights
}

/// Apply the bilateral filter with fixed parameters.
///
/// # Arguments
/// * `input` - Raster with 1 or 3 channels
/// * `config` - Diameter and Gaussian sigmas
/// * `options` - Border policy and row scheduling
pub fn bilateral(
    input: &RasterBuffer,
    config: &BilateralConfig,
    options: KernelOptions,
) -> Result<RasterBuffer> {
    config.validate()?;
    input.ensure_not_empty()?;

    let (height, width, channels) = input.dim();
    let view = input.view();
    let radius = config.radius();
    let r = radius as isize;
    let spatial = spatial_weights(radius, config.sigma_space);
    let range_denom = 2.0 * config.sigma_color * config.sigma_color;

    // Rows report a failure by leaving the flag set; checked after the join.
    let failed = std::sync::atomic::AtomicBool::new(false);

    let output = map_rows(height, width, channels, options.execution, |y, mut row| {
        let mut sum = [0.0f64; 3];
        let mut neighbour = [0.0f64; 3];
        for x in 0..width {
            sum[..channels].fill(0.0);
            let mut weight_sum = 0.0f64;

            for (i, (dy, dx)) in (-r..=r)
                .flat_map(|dy| (-r..=r).map(move |dx| (dy, dx)))
                .enumerate()
            {
                let sx = x as isize + dx;
                let sy = y as isize + dy;
                let mut diff2 = 0.0;
                for c in 0..channels {
                    let v = sample(&view, sx, sy, c, options.border) as f64;
                    let d = v - view[[y, x, c]] as f64;
                    diff2 += d * d;
                    neighbour[c] = v;
                }
                let weight = spatial[i] * (-diff2 / range_denom).exp();
                for c in 0..channels {
                    sum[c] += neighbour[c] * weight;
                }
                weight_sum += weight;
            }

            if weight_sum > 0.0 && weight_sum.is_finite() {
                for c in 0..channels {
                    row[[x, c]] = clamp_to_u8(sum[c] / weight_sum);
                }
            } else {
                failed.store(true, std::sync::atomic::Ordering::Relaxed);
            }
        }
    });

    if failed.into_inner() {
        return Err(DenoiseError::FilterExecution {
            filter: "bilateral".into(),
            reason: "neighbourhood weight sum vanished".into(),
        });
    }
    Ok(RasterBuffer::from_array_unchecked(output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bilateral_flat_image_unchanged() {
        let img = RasterBuffer::filled(12, 10, 3, 201).unwrap();
        let result = bilateral(&img, &BilateralConfig::default(), KernelOptions::default()).unwrap();
        assert_eq!(result, img);
    }

    #[test]
    fn test_bilateral_preserves_strong_edge() {
        let img = RasterBuffer::from_fn(12, 12, 1, |x, _, _| if x < 6 { 20 } else { 230 }).unwrap();
        let config = BilateralConfig {
            sigma_color: 20.0,
            ..BilateralConfig::default()
        };
        let result = bilateral(&img, &config, KernelOptions::default()).unwrap();
        assert_eq!(result.get(5, 6, 0), Some(20));
        assert_eq!(result.get(6, 6, 0), Some(230));
    }

    #[test]
    fn test_bilateral_smooths_small_variation() {
        let img = RasterBuffer::from_fn(9, 9, 1, |x, y, _| if (x + y) % 2 == 0 { 100 } else { 110 }).unwrap();
        let result = bilateral(&img, &BilateralConfig::default(), KernelOptions::default()).unwrap();
        let v = result.get(4, 4, 0).unwrap();
        assert!((101..=109).contains(&v), "got {v}");
    }

    #[test]
    fn test_radius_derivation() {
        assert_eq!(BilateralConfig::default().radius(), 4);
        let derived = BilateralConfig {
            diameter: None,
            sigma_space: 2.0,
            ..BilateralConfig::default()
        };
        assert_eq!(derived.radius(), 3);
        let capped = BilateralConfig {
            diameter: None,
            ..BilateralConfig::default()
        };
        assert_eq!(capped.radius(), MAX_DERIVED_RADIUS);
    }

    #[test]
    fn test_bilateral_underflowing_sigma_fails() {
        let img = RasterBuffer::filled(4, 4, 1, 80).unwrap();
        let config = BilateralConfig {
            sigma_color: 1e-200,
            ..BilateralConfig::default()
        };
        let err = bilateral(&img, &config, KernelOptions::default()).unwrap_err();
        assert_eq!(err.kind(), "filter_execution_failure");
    }

    #[test]
    fn test_bilateral_rejects_bad_sigma() {
        let img = RasterBuffer::filled(3, 3, 1, 0).unwrap();
        let config = BilateralConfig {
            sigma_color: -1.0,
            ..BilateralConfig::default()
        };
        assert!(bilateral(&img, &config, KernelOptions::default()).is_err());
    }
}
