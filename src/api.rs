//! Service operations over encoded image bytes.
//!
//! [`DenoiseService`] owns one [`FilterCatalog`] and the configuration it was
//! built from. Each operation decodes its input, runs the core, encodes the
//! output and returns a serde response struct. [`respond`] turns any
//! operation result into the JSON body a transport would send, with failures
//! rendered as `{ "success": false, "error": ..., "kind": ... }`.
//!
//! Encoded images (`denoised`, the values of `results`) are written as JSON
//! arrays of byte values. Wire encodings such as base64 belong to the
//! transport layer, which re-encodes these bytes before sending them.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::catalog::{FilterCatalog, FilterParameters};
use crate::codec::{decode, encode};
use crate::compare::{compare_all_with_cancel, CancellationToken, FilterFailure};
use crate::config::DenoiseConfig;
use crate::error::{DenoiseError, Result};
use crate::metrics::{evaluate, QualityMetrics};
use crate::raster::RasterBuffer;
use crate::stats::{analyze, ImageStatistics};

pub const SERVICE_NAME: &str = "Retinal Image Denoiser API";

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct FilterSummary {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub parameters: &'static [&'static str],
    pub default_kernel_size: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterListResponse {
    pub success: bool,
    pub filters: Vec<FilterSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub statistics: ImageStatistics,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenoiseResponse {
    pub success: bool,
    /// Encoded output image.
    pub denoised: Vec<u8>,
    pub filter_applied: String,
    pub message: String,
}

/// Encoded outputs keyed by filter id, serialized as a map in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedResults(pub Vec<(String, Vec<u8>)>);

impl EncodedResults {
    pub fn get(&self, id: &str) -> Option<&[u8]> {
        self.0.iter().find(|(k, _)| k == id).map(|(_, v)| v.as_slice())
    }
}

impl Serialize for EncodedResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, bytes) in &self.0 {
            map.serialize_entry(id, bytes)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareResponse {
    pub success: bool,
    pub results: EncodedResults,
    pub diagnostics: Vec<FilterFailure>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluateResponse {
    pub success: bool,
    /// `psnr` is infinite for identical images and serializes as `null`.
    pub metrics: QualityMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct InfoResponse {
    pub message: &'static str,
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub kind: &'static str,
}

impl From<&DenoiseError> for ErrorResponse {
    fn from(err: &DenoiseError) -> Self {
        Self {
            success: false,
            error: err.to_string(),
            kind: err.kind(),
        }
    }
}

/// Serialize an operation result, rendering errors as [`ErrorResponse`].
pub fn respond<T: Serialize>(result: Result<T>) -> Result<String> {
    let body = match result {
        Ok(value) => serde_json::to_string(&value)?,
        Err(err) => {
            log::warn!("request failed ({}): {}", err.kind(), err);
            serde_json::to_string(&ErrorResponse::from(&err))?
        }
    };
    Ok(body)
}

// ============================================================================
// Service
// ============================================================================

#[derive(Debug, Clone)]
pub struct DenoiseService {
    catalog: FilterCatalog,
    config: DenoiseConfig,
}

impl DenoiseService {
    pub fn new(config: DenoiseConfig) -> Result<Self> {
        let catalog = FilterCatalog::new(&config)?;
        Ok(Self { catalog, config })
    }

    pub fn catalog(&self) -> &FilterCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &DenoiseConfig {
        &self.config
    }

    fn decode(&self, bytes: &[u8]) -> Result<RasterBuffer> {
        decode(bytes, self.config.color_mode)
    }

    fn encode(&self, raster: &RasterBuffer) -> Result<Vec<u8>> {
        encode(raster, self.config.output_format)
    }

    pub fn list_filters(&self) -> FilterListResponse {
        FilterListResponse {
            success: true,
            filters: self
                .catalog
                .list()
                .map(|d| FilterSummary {
                    name: d.id,
                    display_name: d.display_name,
                    description: d.description,
                    parameters: d.parameter_names,
                    default_kernel_size: d.default_kernel_size,
                })
                .collect(),
        }
    }

    pub fn analyze(&self, image: &[u8]) -> Result<AnalyzeResponse> {
        let raster = self.decode(image)?;
        let statistics = analyze(&raster, self.config.kernel.border)?;
        log::info!(
            "analyzed {}x{} image: mean={:.2} std={:.2} blur={:.2}",
            raster.width(),
            raster.height(),
            statistics.mean,
            statistics.std,
            statistics.blur_score
        );
        Ok(AnalyzeResponse {
            success: true,
            statistics,
            message: "Image analysis completed".to_string(),
        })
    }

    /// Apply one filter. `kernel_size` falls back to the configured default.
    pub fn denoise(&self, image: &[u8], filter_type: &str, kernel_size: Option<usize>) -> Result<DenoiseResponse> {
        let raster = self.decode(image)?;
        let params = FilterParameters { kernel_size };
        let output = self.catalog.apply(filter_type, &raster, &params)?;
        log::info!(
            "applied '{}' to {}x{} image",
            filter_type,
            raster.width(),
            raster.height()
        );
        Ok(DenoiseResponse {
            success: true,
            denoised: self.encode(&output)?,
            filter_applied: filter_type.to_string(),
            message: format!("{filter_type} filter applied successfully"),
        })
    }

    pub fn compare_all(&self, image: &[u8]) -> Result<CompareResponse> {
        self.compare_all_with_cancel(image, &CancellationToken::new())
    }

    pub fn compare_all_with_cancel(&self, image: &[u8], cancel: &CancellationToken) -> Result<CompareResponse> {
        let raster = self.decode(image)?;
        let comparison = compare_all_with_cancel(&self.catalog, &raster, cancel)?;

        let mut diagnostics = comparison.diagnostics;
        let mut results = Vec::with_capacity(comparison.results.len());
        for (id, output) in comparison.results {
            match self.encode(&output) {
                Ok(bytes) => results.push((id, bytes)),
                Err(err) => {
                    log::warn!("failed to encode '{}' output: {}", id, err);
                    diagnostics.push(FilterFailure {
                        filter_id: id,
                        kind: err.kind(),
                        error: err.to_string(),
                    });
                }
            }
        }

        let message = if diagnostics.is_empty() {
            "All filters applied successfully".to_string()
        } else {
            format!("{} of {} filters applied", results.len(), self.catalog.len())
        };
        log::info!("comparison finished: {}", message);
        Ok(CompareResponse {
            success: true,
            results: EncodedResults(results),
            diagnostics,
            message,
        })
    }

    /// PSNR and SSIM between an original and a denoised image.
    pub fn evaluate(&self, original: &[u8], denoised: &[u8]) -> Result<EvaluateResponse> {
        let original = self.decode(original)?;
        let denoised = self.decode(denoised)?;
        let metrics = evaluate(&original, &denoised)?;
        log::info!("evaluated pair: psnr={:.2} ssim={:.4}", metrics.psnr, metrics.ssim);
        Ok(EvaluateResponse { success: true, metrics })
    }

    pub fn info(&self) -> InfoResponse {
        InfoResponse {
            message: SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION"),
            status: "running",
        }
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "API is running",
            message: "All systems operational",
        }
    }
}

impl Default for DenoiseService {
    fn default() -> Self {
        Self {
            catalog: FilterCatalog::default(),
            config: DenoiseConfig::default(),
        }
    }
}
