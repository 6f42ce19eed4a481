//! Per-band attenuation of a cube by a transmission curve.

use ndarray::{Array3, Axis};

use crate::error::{Result, SpectralError};
use crate::warning::NumericWarning;

/// Outcome of applying a transmission curve to a cube.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransmissionReport {
    /// Bands left unchanged because their coefficient was NaN.
    pub skipped_bands: Vec<usize>,
    /// Number of NaN values in the cube after the transform.
    pub output_nan_count: usize,
}

impl TransmissionReport {
    /// All warnings raised by the transform, in band order.
    pub fn warnings(&self) -> Vec<NumericWarning> {
        let mut warnings: Vec<NumericWarning> = self
            .skipped_bands
            .iter()
            .map(|&band| NumericWarning::NanCoefficient { band })
            .collect();
        if self.output_nan_count > 0 {
            warnings.push(NumericWarning::NanInOutput {
                count: self.output_nan_count,
            });
        }
        warnings
    }
}

/// Multiply each band plane of `cube` by the matching transmission coefficient.
///
/// A NaN coefficient leaves its band untouched so that one bad sample never
/// corrupts the rest of the cube. NaN values already present in the output
/// are counted and logged but not corrected.
///
/// # Errors
/// Returns [`SpectralError::DimensionMismatch`] if `transmission.len()` differs
/// from the band count. The cube is not modified in that case.
pub fn apply_transmission(cube: &mut Array3<f32>, transmission: &[f64]) -> Result<TransmissionReport> {
    let bands = cube.len_of(Axis(2));
    if transmission.len() != bands {
        return Err(SpectralError::mismatch("transmission", bands, transmission.len()));
    }

    let mut report = TransmissionReport::default();
    for (band, mut plane) in cube.axis_iter_mut(Axis(2)).enumerate() {
        let coefficient = transmission[band];
        if coefficient.is_nan() {
            let warning = NumericWarning::NanCoefficient { band };
            warning.log();
            report.skipped_bands.push(band);
            continue;
        }
        let coefficient = coefficient as f32;
        plane.mapv_inplace(|v| v * coefficient);
    }

    report.output_nan_count = cube.iter().filter(|v| v.is_nan()).count();
    if report.output_nan_count > 0 {
        NumericWarning::NanInOutput {
            count: report.output_nan_count,
        }
        .log();
    }

    Ok(report)
}
