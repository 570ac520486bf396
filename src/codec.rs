//! Encoded image bytes <-> [`RasterBuffer`].
//!
//! Decoding accepts anything the `image` crate recognises from the byte
//! signature. Encoding writes PNG (lossless) or JPEG.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use serde::Deserialize;

use crate::error::{DenoiseError, Result};
use crate::raster::RasterBuffer;

/// Channel layout produced by [`decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    /// Always decode to a single luminance channel.
    #[default]
    Grayscale,
    /// Keep grayscale inputs single-channel, decode anything with color as RGB.
    /// Alpha is dropped.
    Preserve,
}

/// Container written by [`encode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg { quality: u8 },
}

fn into_raster(image: DynamicImage, mode: ColorMode) -> Result<RasterBuffer> {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let keep_color = mode == ColorMode::Preserve && image.color().has_color();
    let raster = if keep_color {
        RasterBuffer::new(width, height, 3, image.into_rgb8().into_raw())?
    } else {
        RasterBuffer::new(width, height, 1, image.into_luma8().into_raw())?
    };
    raster.ensure_not_empty()?;
    Ok(raster)
}

/// Decode encoded image bytes.
///
/// # Errors
/// `Decode` for unrecognised or corrupt data, `EmptyImage` for zero-size
/// images.
pub fn decode(bytes: &[u8], mode: ColorMode) -> Result<RasterBuffer> {
    let image = image::load_from_memory(bytes).map_err(DenoiseError::Decode)?;
    into_raster(image, mode)
}

/// Encode a raster into `format`.
pub fn encode(raster: &RasterBuffer, format: OutputFormat) -> Result<Vec<u8>> {
    raster.ensure_not_empty()?;
    let color = match raster.channels() {
        1 => ExtendedColorType::L8,
        _ => ExtendedColorType::Rgb8,
    };
    let (width, height) = (raster.width() as u32, raster.height() as u32);
    let samples = raster.to_vec();

    let mut bytes = Vec::new();
    let written = match format {
        OutputFormat::Png => PngEncoder::new(&mut bytes).write_image(&samples, width, height, color),
        OutputFormat::Jpeg { quality } => {
            JpegEncoder::new_with_quality(&mut bytes, quality).write_image(&samples, width, height, color)
        }
    };
    written.map_err(DenoiseError::Encode)?;
    Ok(bytes)
}
