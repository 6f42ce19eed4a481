//! Error types for cube file operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing cube files.
#[derive(Error, Debug)]
pub enum FormatError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Header text that does not follow the expected syntax
    #[error("Invalid header: {message}")]
    InvalidHeader {
        /// Description of the problem
        message: String,
    },

    /// Required header field is missing
    #[error("Missing required field: {field}")]
    MissingField {
        /// Name of the missing field
        field: String,
    },

    /// Declared dimensions disagree with the binary payload
    #[error("Payload size mismatch: header declares {expected} bytes, file holds {found}")]
    DimensionMismatch {
        /// Bytes implied by the header
        expected: u64,
        /// Bytes actually available
        found: u64,
    },

    /// Wavelength list length differs from the band count
    #[error("Wavelength count mismatch: {bands} bands but {wavelengths} wavelengths")]
    WavelengthCount {
        /// Number of bands in the data
        bands: usize,
        /// Number of wavelengths available
        wavelengths: usize,
    },

    /// ENVI data type code this reader does not handle
    #[error("Unsupported data type code: {0}")]
    UnsupportedDataType(u32),

    /// ENVI interleave this reader does not handle
    #[error("Unsupported interleave: {0}")]
    UnsupportedInterleave(String),

    /// No registered format handles this path
    #[error("No cube format registered for {path:?}")]
    UnsupportedExtension {
        /// The rejected path
        path: PathBuf,
    },

    /// Raw data file next to a header could not be found
    #[error("Raw data file not found for header {header:?}")]
    RawFileNotFound {
        /// Header that was being read
        header: PathBuf,
    },

    /// Dataset inside a container has an unusable shape or type
    #[error("Invalid dataset: {message}")]
    InvalidDataset {
        /// Description of the problem
        message: String,
    },

    /// Operation not available in this build
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Error from the HDF5 library
    #[cfg(feature = "hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
}

impl FormatError {
    /// Create an invalid header error with a message.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Create a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create an invalid dataset error.
    pub fn invalid_dataset(message: impl Into<String>) -> Self {
        Self::InvalidDataset {
            message: message.into(),
        }
    }
}
