//! Salt-and-pepper noise injection.
//!
//! Deterministic for a given seed, so fixtures and demo inputs are
//! reproducible across runs and platforms.

use crate::error::{DenoiseError, Result};
use crate::raster::RasterBuffer;

// ============================================================================
// Simple RNG (deterministic for parity testing)
// ============================================================================

/// Simple linear congruential generator for deterministic noise.
/// Uses MINSTD parameters.
struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        SimpleRng {
            state: seed.wrapping_add(1), // Avoid zero
        }
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(48271).wrapping_add(1) % 2147483647;
        self.state as u32
    }

    /// Uniform index in `0..bound`.
    fn next_below(&mut self, bound: usize) -> usize {
        (self.next_u32() as u64 * bound as u64 / 2147483647) as usize
    }
}

// ============================================================================
// Salt and pepper
// ============================================================================

/// Force exactly `round(fraction * width * height)` distinct pixels to 0 or
/// 255 (all channels of a chosen pixel get the same extreme).
///
/// # Arguments
/// * `input` - Raster with 1 or 3 channels
/// * `fraction` - Share of pixels to corrupt, `0.0..=1.0`
/// * `seed` - Random seed for deterministic results
pub fn salt_and_pepper(input: &RasterBuffer, fraction: f64, seed: u64) -> Result<RasterBuffer> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(DenoiseError::InvalidParameter(format!(
            "noise fraction must be in 0..=1, got {fraction}"
        )));
    }

    let (height, width, channels) = input.dim();
    let pixels = width * height;
    let count = (fraction * pixels as f64).round() as usize;
    let mut rng = SimpleRng::new(seed);

    // Partial Fisher-Yates: the first `count` slots are the chosen pixels.
    let mut order: Vec<usize> = (0..pixels).collect();
    for i in 0..count {
        let j = i + rng.next_below(pixels - i);
        order.swap(i, j);
    }

    let mut data = input.clone().into_array();
    for &idx in &order[..count] {
        let (y, x) = (idx / width, idx % width);
        let value = if rng.next_below(2) == 0 { 0 } else { 255 };
        for c in 0..channels {
            data[[y, x, c]] = value;
        }
    }

    RasterBuffer::from_array(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salt_and_pepper_deterministic() {
        let img = RasterBuffer::filled(20, 20, 1, 128).unwrap();
        let a = salt_and_pepper(&img, 0.1, 12345).unwrap();
        let b = salt_and_pepper(&img, 0.1, 12345).unwrap();
        assert_eq!(a, b);
        let c = salt_and_pepper(&img, 0.1, 54321).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_salt_and_pepper_exact_count() {
        let img = RasterBuffer::filled(100, 100, 1, 128).unwrap();
        let noisy = salt_and_pepper(&img, 0.05, 3).unwrap();
        assert_eq!(noisy.count_extremes(), 500);
        let salt = noisy.view().iter().filter(|&&v| v == 255).count();
        assert!(salt > 0 && salt < 500);
    }

    #[test]
    fn test_salt_and_pepper_color_pixels_uniform() {
        let img = RasterBuffer::filled(10, 10, 3, 60).unwrap();
        let noisy = salt_and_pepper(&img, 0.2, 9).unwrap();
        assert_eq!(noisy.count_extremes(), 20 * 3);
        for y in 0..10 {
            for x in 0..10 {
                let px: Vec<u8> = (0..3).map(|c| noisy.get(x, y, c).unwrap()).collect();
                assert!(px.iter().all(|&v| v == px[0]));
            }
        }
    }

    #[test]
    fn test_salt_and_pepper_rejects_bad_fraction() {
        let img = RasterBuffer::filled(2, 2, 1, 0).unwrap();
        assert!(salt_and_pepper(&img, 1.5, 0).is_err());
    }
}
