use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpectralError {
    #[error("Curve needs at least two samples, got {0}")]
    TooFewSamples(usize),

    #[error("Curve has {wavelengths} wavelengths but {values} value rows")]
    LengthMismatch { wavelengths: usize, values: usize },

    #[error("Curve has no value channels")]
    NoChannels,

    #[error("Curve wavelengths must be finite and strictly increasing (index {index})")]
    NotIncreasing { index: usize },

    #[error("Dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },
}

impl SpectralError {
    /// Create a dimension mismatch error.
    pub fn mismatch(context: &'static str, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            context,
            expected,
            found,
        }
    }
}

pub type Result<T> = std::result::Result<T, SpectralError>;
