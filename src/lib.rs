//! Retinal image denoising core.
//!
//! Impulse-noise removal for fundus images with Python bindings via PyO3 and
//! WASM bindings for JavaScript.
//!
//! ## Image Format
//! Rasters are 8-bit, row-major `(height, width, channels)`:
//! - **Grayscale**: (height, width, 1) - the default decode mode
//! - **RGB**: (height, width, 3) - when color is preserved on decode
//!
//! ## Layout
//! - [`filters`]: median, adaptive median, morphological, Wiener and bilateral kernels
//! - [`catalog`]: id-based registry with parameter validation
//! - [`stats`] / [`metrics`]: image statistics and PSNR/SSIM
//! - [`compare`]: run every filter concurrently over one input
//! - [`api`]: byte-level service operations returning serde responses

pub mod api;
pub mod border;
pub mod catalog;
pub mod codec;
pub mod compare;
pub mod config;
pub mod error;
pub mod filters;
pub mod metrics;
pub mod noise;
pub mod raster;
pub mod stats;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use api::{respond, DenoiseService};
pub use border::BorderMode;
pub use catalog::{FilterCatalog, FilterDescriptor, FilterKind, FilterParameters};
pub use codec::{decode, encode, ColorMode, OutputFormat};
pub use compare::{compare_all, compare_all_with_cancel, CancellationToken, ComparisonResult, FilterFailure};
pub use config::{load_config, DenoiseConfig};
pub use error::{DenoiseError, Result};
pub use filters::{ExecutionStrategy, KernelOptions};
pub use metrics::{psnr, ssim, QualityMetrics};
pub use raster::RasterBuffer;
pub use stats::{analyze, ImageStatistics};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use std::sync::OnceLock;

    use numpy::{IntoPyArray, PyArray3, PyReadonlyArray3};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    use crate::api::{respond, DenoiseService};
    use crate::catalog::FilterParameters;
    use crate::error::DenoiseError;
    use crate::raster::RasterBuffer;

    static SERVICE: OnceLock<DenoiseService> = OnceLock::new();

    fn service() -> &'static DenoiseService {
        SERVICE.get_or_init(DenoiseService::default)
    }

    impl From<DenoiseError> for PyErr {
        fn from(err: DenoiseError) -> PyErr {
            PyValueError::new_err(format!("{} ({})", err, err.kind()))
        }
    }

    fn to_raster(image: PyReadonlyArray3<'_, u8>) -> Result<RasterBuffer, DenoiseError> {
        RasterBuffer::from_array(image.as_array().to_owned())
    }

    // ========================================================================
    // Array-level filters
    // ========================================================================

    /// Apply filter `filter_id` to a (height, width, 1|3) u8 array.
    #[pyfunction]
    #[pyo3(signature = (image, filter_id, kernel_size=None))]
    pub fn apply_filter<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        filter_id: &str,
        kernel_size: Option<usize>,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let input = to_raster(image)?;
        let params = FilterParameters { kernel_size };
        let result = service().catalog().apply(filter_id, &input, &params)?;
        Ok(result.into_array().into_pyarray(py))
    }

    /// Force `fraction` of the pixels to 0 or 255.
    #[pyfunction]
    #[pyo3(signature = (image, fraction, seed=0))]
    pub fn salt_and_pepper<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        fraction: f64,
        seed: u64,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let input = to_raster(image)?;
        let result = crate::noise::salt_and_pepper(&input, fraction, seed)?;
        Ok(result.into_array().into_pyarray(py))
    }

    // ========================================================================
    // Service operations (encoded bytes in, JSON out)
    // ========================================================================

    #[pyfunction]
    pub fn list_filters() -> PyResult<String> {
        Ok(respond(Ok(service().list_filters()))?)
    }

    #[pyfunction]
    pub fn analyze(image: &[u8]) -> PyResult<String> {
        Ok(respond(service().analyze(image))?)
    }

    #[pyfunction]
    #[pyo3(signature = (image, filter_type="median", kernel_size=None))]
    pub fn denoise(image: &[u8], filter_type: &str, kernel_size: Option<usize>) -> PyResult<String> {
        Ok(respond(service().denoise(image, filter_type, kernel_size))?)
    }

    #[pyfunction]
    pub fn compare_all(py: Python<'_>, image: &[u8]) -> PyResult<String> {
        let response = py.allow_threads(|| service().compare_all(image));
        Ok(respond(response)?)
    }

    #[pyfunction]
    pub fn evaluate(original: &[u8], denoised: &[u8]) -> PyResult<String> {
        Ok(respond(service().evaluate(original, denoised))?)
    }

    #[pyfunction]
    pub fn info() -> PyResult<String> {
        Ok(respond(Ok(service().info()))?)
    }

    #[pyfunction]
    pub fn health() -> PyResult<String> {
        Ok(respond(Ok(service().health()))?)
    }

    /// Retinal denoising extension module
    #[pymodule]
    pub fn retinal_denoise(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(apply_filter, m)?)?;
        m.add_function(wrap_pyfunction!(salt_and_pepper, m)?)?;

        m.add_function(wrap_pyfunction!(list_filters, m)?)?;
        m.add_function(wrap_pyfunction!(analyze, m)?)?;
        m.add_function(wrap_pyfunction!(denoise, m)?)?;
        m.add_function(wrap_pyfunction!(compare_all, m)?)?;
        m.add_function(wrap_pyfunction!(evaluate, m)?)?;
        m.add_function(wrap_pyfunction!(info, m)?)?;
        m.add_function(wrap_pyfunction!(health, m)?)?;
        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::retinal_denoise;
