//! Non-fatal numeric diagnostics raised by resampling and transforms.

use std::fmt;

/// A not-a-number condition detected during a transform.
///
/// Warnings never abort processing. They are logged when raised and
/// collected in the transform reports so callers can surface them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumericWarning {
    /// Resampling produced NaN values.
    NanInCurve { count: usize },
    /// A transmission coefficient was NaN; the band was left unchanged.
    NanCoefficient { band: usize },
    /// The transformed cube or image contains NaN values.
    NanInOutput { count: usize },
}

impl NumericWarning {
    /// Emit the warning through the `log` facade.
    pub fn log(&self) {
        log::warn!("{}", self);
    }
}

impl fmt::Display for NumericWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericWarning::NanInCurve { count } => {
                write!(f, "{} NaN values in resampled curve", count)
            }
            NumericWarning::NanCoefficient { band } => {
                write!(f, "Transmission value for band index {} is NaN, band left unchanged", band)
            }
            NumericWarning::NanInOutput { count } => {
                write!(f, "{} NaN values found in transform output", count)
            }
        }
    }
}
