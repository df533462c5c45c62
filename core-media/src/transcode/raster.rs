//! Still-image transcoding with the `image` crate.

use crate::error::{MediaError, Result};
use core_runtime::config::ImageSettings;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Dimensions after fitting `width`x`height` inside `max_width`x`max_height`.
///
/// Aspect ratio is preserved and images are never upscaled.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let scale = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );
    let fitted_width = ((width as f64 * scale).round() as u32).clamp(1, max_width);
    let fitted_height = ((height as f64 * scale).round() as u32).clamp(1, max_height);
    (fitted_width, fitted_height)
}

/// Decode, convert to RGB8, optionally downscale, and encode as JPEG.
///
/// Blocking; call from the blocking pool.
pub(crate) fn transcode_image(
    source: &Path,
    output: &Path,
    settings: &ImageSettings,
    no_resize: bool,
) -> Result<(u32, u32)> {
    let data = std::fs::read(source).map_err(|e| MediaError::source_read(source, e))?;

    let decoded = image::load_from_memory(&data)
        .map_err(|e| MediaError::transcode(source, format!("Failed to decode image: {}", e)))?;

    // JPEG has no alpha channel
    let mut img = DynamicImage::ImageRgb8(decoded.to_rgb8());

    if !no_resize {
        let (width, height) =
            fit_within(img.width(), img.height(), settings.max_width, settings.max_height);
        if (width, height) != (img.width(), img.height()) {
            img = img.resize_exact(width, height, FilterType::Lanczos3);
        }
    }

    let mut writer = BufWriter::new(File::create(output)?);
    let encoder = JpegEncoder::new_with_quality(&mut writer, settings.jpeg_quality);
    img.write_with_encoder(encoder)?;

    Ok((img.width(), img.height()))
}
