//! WebAssembly exports for the denoising core.
//!
//! These functions are exposed to JavaScript via wasm-bindgen.
//!
//! Two flavours:
//! - **raw**: flat row-major u8 samples plus width/height/channels, returns
//!   flat samples of the same shape
//! - **encoded**: PNG/JPEG bytes in, the JSON response body out
//!
//! Rows are processed serially; the browser main thread has no rayon pool.

use wasm_bindgen::prelude::*;

use crate::api::{respond, DenoiseService};
use crate::catalog::FilterParameters;
use crate::config::DenoiseConfig;
use crate::error::DenoiseError;
use crate::filters::{ExecutionStrategy, KernelOptions};
use crate::raster::RasterBuffer;

fn to_js(err: DenoiseError) -> JsValue {
    JsValue::from_str(&format!("{} ({})", err, err.kind()))
}

fn service() -> Result<DenoiseService, JsValue> {
    let config = DenoiseConfig {
        kernel: KernelOptions {
            execution: ExecutionStrategy::Serial,
            ..KernelOptions::default()
        },
        ..DenoiseConfig::default()
    };
    DenoiseService::new(config).map_err(to_js)
}

// ============================================================================
// Raw samples
// ============================================================================

/// Apply one filter to raw samples.
///
/// # Arguments
/// * `data` - Flat array of bytes (length = width * height * channels)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `channels` - 1 (grayscale) or 3 (RGB)
/// * `filter_id` - One of `median`, `adaptive`, `morphological`, `wiener`, `bilateral`
/// * `kernel_size` - Odd size in 3..=15; `undefined` uses the default
///
/// # Returns
/// Flat array of filtered bytes with the input's shape
#[wasm_bindgen]
pub fn apply_filter_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    filter_id: &str,
    kernel_size: Option<usize>,
) -> Result<Vec<u8>, JsValue> {
    let input = RasterBuffer::new(width, height, channels, data.to_vec()).map_err(to_js)?;
    let params = FilterParameters { kernel_size };
    let result = service()?
        .catalog()
        .apply(filter_id, &input, &params)
        .map_err(to_js)?;
    Ok(result.into_raw())
}

/// Add deterministic salt-and-pepper noise to raw samples.
#[wasm_bindgen]
pub fn salt_and_pepper_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    fraction: f64,
    seed: u64,
) -> Result<Vec<u8>, JsValue> {
    let input = RasterBuffer::new(width, height, channels, data.to_vec()).map_err(to_js)?;
    let result = crate::noise::salt_and_pepper(&input, fraction, seed).map_err(to_js)?;
    Ok(result.into_raw())
}

// ============================================================================
// Encoded images, JSON responses
// ============================================================================

#[wasm_bindgen]
pub fn list_filters_wasm() -> Result<String, JsValue> {
    respond(Ok(service()?.list_filters())).map_err(to_js)
}

#[wasm_bindgen]
pub fn analyze_wasm(image: &[u8]) -> Result<String, JsValue> {
    respond(service()?.analyze(image)).map_err(to_js)
}

#[wasm_bindgen]
pub fn denoise_wasm(image: &[u8], filter_type: &str, kernel_size: Option<usize>) -> Result<String, JsValue> {
    respond(service()?.denoise(image, filter_type, kernel_size)).map_err(to_js)
}

#[wasm_bindgen]
pub fn compare_all_wasm(image: &[u8]) -> Result<String, JsValue> {
    respond(service()?.compare_all(image)).map_err(to_js)
}

#[wasm_bindgen]
pub fn evaluate_wasm(original: &[u8], denoised: &[u8]) -> Result<String, JsValue> {
    respond(service()?.evaluate(original, denoised)).map_err(to_js)
}

#[wasm_bindgen]
pub fn info_wasm() -> Result<String, JsValue> {
    respond(Ok(service()?.info())).map_err(to_js)
}

#[wasm_bindgen]
pub fn health_wasm() -> Result<String, JsValue> {
    respond(Ok(service()?.health())).map_err(to_js)
}
