//! Full-reference quality metrics between an original and a filtered image.

use ndarray::Array2;
use serde::Serialize;

use crate::error::{DenoiseError, Result};
use crate::raster::RasterBuffer;

const DATA_RANGE: f64 = 255.0;
/// SSIM window side length.
pub const SSIM_WINDOW: usize = 7;
const C1: f64 = (0.01 * DATA_RANGE) * (0.01 * DATA_RANGE);
const C2: f64 = (0.03 * DATA_RANGE) * (0.03 * DATA_RANGE);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityMetrics {
    /// Peak signal-to-noise ratio in dB. Infinite for identical inputs.
    pub psnr: f64,
    pub ssim: f64,
}

fn check_pair(a: &RasterBuffer, b: &RasterBuffer) -> Result<()> {
    a.ensure_not_empty()?;
    b.ensure_not_empty()?;
    if a.dim() != b.dim() {
        return Err(DenoiseError::DimensionMismatch {
            left: a.dim(),
            right: b.dim(),
        });
    }
    Ok(())
}

/// PSNR over all samples with a data range of 255.
pub fn psnr(a: &RasterBuffer, b: &RasterBuffer) -> Result<f64> {
    check_pair(a, b)?;
    let va = a.view();
    let vb = b.view();
    let sq: f64 = va
        .iter()
        .zip(vb.iter())
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum();
    let mse = sq / va.len() as f64;
    if mse == 0.0 {
        return Ok(f64::INFINITY);
    }
    Ok(10.0 * (DATA_RANGE * DATA_RANGE / mse).log10())
}

/// Summed-area table with a zero row and column in front.
fn integral(plane: &Array2<f64>) -> Array2<f64> {
    let (h, w) = plane.dim();
    let mut table = Array2::<f64>::zeros((h + 1, w + 1));
    for y in 0..h {
        let mut row = 0.0;
        for x in 0..w {
            row += plane[[y, x]];
            table[[y + 1, x + 1]] = table[[y, x + 1]] + row;
        }
    }
    table
}

fn window_sum(table: &Array2<f64>, y: usize, x: usize, n: usize) -> f64 {
    table[[y + n, x + n]] - table[[y, x + n]] - table[[y + n, x]] + table[[y, x]]
}

/// Mean SSIM over every fully contained 7x7 window of the luma planes.
///
/// # Errors
/// `DimensionMismatch` when sizes differ, `InvalidParameter` when either side
/// is smaller than the window.
pub fn ssim(a: &RasterBuffer, b: &RasterBuffer) -> Result<f64> {
    check_pair(a, b)?;
    if a.width() < SSIM_WINDOW || a.height() < SSIM_WINDOW {
        return Err(DenoiseError::InvalidParameter(format!(
            "ssim needs at least {SSIM_WINDOW}x{SSIM_WINDOW} pixels, got {}x{}",
            a.width(),
            a.height()
        )));
    }

    let pa = a.luma_plane();
    let pb = b.luma_plane();
    let sa = integral(&pa);
    let sb = integral(&pb);
    let saa = integral(&(&pa * &pa));
    let sbb = integral(&(&pb * &pb));
    let sab = integral(&(&pa * &pb));

    let n = SSIM_WINDOW;
    let count = (n * n) as f64;
    // sample covariance
    let norm = count / (count - 1.0);
    let (h, w) = pa.dim();
    let mut total = 0.0;
    let mut windows = 0usize;
    for y in 0..=h - n {
        for x in 0..=w - n {
            let mu_a = window_sum(&sa, y, x, n) / count;
            let mu_b = window_sum(&sb, y, x, n) / count;
            let var_a = (window_sum(&saa, y, x, n) / count - mu_a * mu_a) * norm;
            let var_b = (window_sum(&sbb, y, x, n) / count - mu_b * mu_b) * norm;
            let cov = (window_sum(&sab, y, x, n) / count - mu_a * mu_b) * norm;

            let num = (2.0 * mu_a * mu_b + C1) * (2.0 * cov + C2);
            let den = (mu_a * mu_a + mu_b * mu_b + C1) * (var_a + var_b + C2);
            total += num / den;
            windows += 1;
        }
    }
    Ok(total / windows as f64)
}

/// Both metrics at once.
pub fn evaluate(original: &RasterBuffer, filtered: &RasterBuffer) -> Result<QualityMetrics> {
    Ok(QualityMetrics {
        psnr: psnr(original, filtered)?,
        ssim: ssim(original, filtered)?,
    })
}
