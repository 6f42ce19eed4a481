//! Error type for per-file pipeline failures.

use std::path::PathBuf;

use hsitools_spectral::SpectralError;
use thiserror::Error;

use crate::format::FormatError;
use crate::image_io::ImageError;

/// Errors that fail the processing of a single file.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Cube could not be read or written
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Curve and cube disagree on dimensions
    #[error(transparent)]
    Spectral(#[from] SpectralError),

    /// Image could not be encoded or written
    #[error(transparent)]
    Image(#[from] ImageError),

    /// I/O error outside the format layer
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Path without a usable UTF-8 file name
    #[error("Invalid file name: {0:?}")]
    InvalidPath(PathBuf),
}
