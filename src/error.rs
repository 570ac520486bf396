//! Error type shared by every denoising operation.

/// Errors produced by the codec, the filter kernels and the service boundary.
#[derive(thiserror::Error, Debug)]
pub enum DenoiseError {
    /// The input bytes could not be decoded into a raster.
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// The raster could not be encoded.
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    /// The raster has zero width or height.
    #[error("image is empty ({width}x{height})")]
    EmptyImage { width: usize, height: usize },

    /// No filter is registered under this id.
    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    /// A filter parameter violates its descriptor.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Data length does not match `width * height * channels`, or the
    /// channel count is unsupported.
    #[error("invalid raster shape: {0}")]
    InvalidShape(String),

    /// Two rasters that must match in size do not.
    #[error("dimension mismatch: {left:?} vs {right:?}")]
    DimensionMismatch {
        left: (usize, usize, usize),
        right: (usize, usize, usize),
    },

    /// A kernel hit an internal guard (non-finite value, empty weight sum).
    #[error("filter '{filter}' failed: {reason}")]
    FilterExecution { filter: String, reason: String },

    /// The operation was cancelled before it started.
    #[error("filter '{0}' was cancelled")]
    Cancelled(String),

    /// Configuration could not be read or is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl DenoiseError {
    /// Stable snake_case tag used in JSON responses and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            DenoiseError::Decode(_) => "decode_error",
            DenoiseError::Encode(_) => "encode_error",
            DenoiseError::EmptyImage { .. } => "empty_image",
            DenoiseError::UnknownFilter(_) => "unknown_filter",
            DenoiseError::InvalidParameter(_) => "invalid_parameter",
            DenoiseError::InvalidShape(_) => "invalid_shape",
            DenoiseError::DimensionMismatch { .. } => "dimension_mismatch",
            DenoiseError::FilterExecution { .. } => "filter_execution_failure",
            DenoiseError::Cancelled(_) => "cancelled",
            DenoiseError::Config(_) => "config_error",
            DenoiseError::Json(_) => "config_error",
        }
    }

    /// Errors on the input itself abort a whole comparison batch.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            DenoiseError::Decode(_) | DenoiseError::EmptyImage { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DenoiseError>;
