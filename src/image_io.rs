//! Reading and writing 3-channel display images.
//!
//! Images live in memory as `(row, column, channel)` arrays of `f64` in
//! `[0, 1]`, the same shape the colorimetric transform produces.

use std::io::Cursor;
use std::path::Path;

use hsitools_spectral::SrgbImage;
use image::{ImageFormat, RgbImage};
use ndarray::Array3;
use thiserror::Error;

use crate::format::atomic::write_atomic;

/// Errors that can occur while encoding or decoding images.
#[derive(Error, Debug)]
pub enum ImageError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding or decoding failure
    #[error("Image codec error: {0}")]
    Codec(#[from] image::ImageError),

    /// Array is not a `(rows, columns, 3)` image
    #[error("Expected a (rows, columns, 3) image, got {0:?}")]
    Shape(Vec<usize>),
}

/// Quantize a `[0, 1]` value to 8 bits. NaN maps to 0.
fn to_u8(value: f64) -> u8 {
    if value.is_nan() {
        0
    } else {
        (value.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

/// Convert a float image to an 8-bit RGB buffer.
pub fn to_rgb8(image: &SrgbImage) -> Result<RgbImage, ImageError> {
    let (rows, cols, channels) = image.dim();
    if channels != 3 {
        return Err(ImageError::Shape(image.shape().to_vec()));
    }
    let pixels: Vec<u8> = image.iter().map(|&v| to_u8(v)).collect();
    RgbImage::from_raw(cols as u32, rows as u32, pixels)
        .ok_or_else(|| ImageError::Shape(image.shape().to_vec()))
}

/// Encode an image in the format implied by the path's extension and write
/// it atomically.
pub fn save_srgb(path: &Path, image: &SrgbImage) -> Result<(), ImageError> {
    let format = ImageFormat::from_path(path)?;
    let rgb = to_rgb8(image)?;

    let mut encoded = Cursor::new(Vec::new());
    rgb.write_to(&mut encoded, format)?;
    write_atomic(path, encoded.get_ref())?;

    log::debug!("Saved {}x{} image to {:?}", rgb.width(), rgb.height(), path);
    Ok(())
}

/// Load an image file as a `(rows, columns, 3)` array scaled to `[0, 1]`.
pub fn load_rgb(path: &Path) -> Result<Array3<f64>, ImageError> {
    let img = image::open(path)?.to_rgb8();
    let (width, height) = img.dimensions();
    let values: Vec<f64> = img.into_raw().into_iter().map(|v| f64::from(v) / 255.0).collect();
    Array3::from_shape_vec((height as usize, width as usize, 3), values)
        .map_err(|_| ImageError::Shape(vec![height as usize, width as usize, 3]))
}
