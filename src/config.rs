//! Runtime configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config:
//!
//! ```json
//! {
//!   "default_kernel_size": 5,
//!   "kernel": { "border": "replicate", "execution": "parallel_rows" },
//!   "color_mode": "grayscale",
//!   "output_format": { "format": "png" },
//!   "wiener": { "noise_estimate": "min_local_variance", "noise_floor": 1e-5 },
//!   "bilateral": { "diameter": 9, "sigma_color": 75.0, "sigma_space": 75.0 }
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::codec::{ColorMode, OutputFormat};
use crate::error::{DenoiseError, Result};
use crate::filters::bilateral::BilateralConfig;
use crate::filters::wiener::WienerConfig;
use crate::filters::{KernelOptions, KERNEL_SIZE_RANGE};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DenoiseConfig {
    /// Kernel size used when a request does not name one, and for every
    /// kernel-sized filter in a comparison run.
    pub default_kernel_size: usize,
    pub kernel: KernelOptions,
    pub color_mode: ColorMode,
    pub output_format: OutputFormat,
    pub wiener: WienerConfig,
    pub bilateral: BilateralConfig,
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            default_kernel_size: 5,
            kernel: KernelOptions::default(),
            color_mode: ColorMode::default(),
            output_format: OutputFormat::default(),
            wiener: WienerConfig::default(),
            bilateral: BilateralConfig::default(),
        }
    }
}

impl DenoiseConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: DenoiseConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        KERNEL_SIZE_RANGE
            .validate(self.default_kernel_size)
            .map_err(|e| DenoiseError::Config(format!("default_kernel_size: {e}")))?;
        self.bilateral
            .validate()
            .map_err(|e| DenoiseError::Config(format!("bilateral: {e}")))?;
        if !(self.wiener.noise_floor.is_finite() && self.wiener.noise_floor > 0.0) {
            return Err(DenoiseError::Config(format!(
                "wiener.noise_floor must be positive, got {}",
                self.wiener.noise_floor
            )));
        }
        if let OutputFormat::Jpeg { quality } = self.output_format {
            if !(1..=100).contains(&quality) {
                return Err(DenoiseError::Config(format!(
                    "jpeg quality must be in 1..=100, got {quality}"
                )));
            }
        }
        Ok(())
    }
}

/// Read and validate a JSON config file.
pub fn load_config(path: &Path) -> Result<DenoiseConfig> {
    let data = fs::read_to_string(path)
        .map_err(|e| DenoiseError::Config(format!("failed to read config {}: {e}", path.display())))?;
    DenoiseConfig::from_json_str(&data)
}
