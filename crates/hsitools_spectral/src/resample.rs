//! Projection of spectral curves onto a cube's wavelength grid.
//!
//! # Interpolation
//!
//! For a target wavelength λ inside segment `[λᵢ, λᵢ₊₁]`:
//! `v(λ) = vᵢ + (vᵢ₊₁ - vᵢ) × (λ - λᵢ) / (λᵢ₊₁ - λᵢ)`
//!
//! Outside the sampled range the behavior depends on [`Extrapolation`]:
//! - `Linear` extends the nearest boundary segment with its slope. Values may
//!   leave the physically meaningful range (negative, or above 1 for a
//!   transmission); they are not clamped.
//! - `Clamp` holds the boundary sample value.
//!
//! When the curve is already tabulated on the target grid the values are
//! returned untouched, so no interpolation rounding is introduced.

use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::curve::SpectralCurve;
use crate::error::Result;
use crate::warning::NumericWarning;

/// Policy for target wavelengths outside a curve's sampled range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extrapolation {
    /// Extend the boundary segment linearly.
    #[default]
    Linear,
    /// Repeat the boundary value.
    Clamp,
}

impl std::str::FromStr for Extrapolation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(Extrapolation::Linear),
            "clamp" => Ok(Extrapolation::Clamp),
            other => Err(format!("unknown extrapolation '{}' (expected linear or clamp)", other)),
        }
    }
}

/// A curve re-expressed on a target wavelength grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampledCurve {
    values: Array2<f64>,
    nan_count: usize,
}

impl ResampledCurve {
    /// Wrap values already tabulated on a cube's grid.
    pub fn from_values(values: Array2<f64>) -> Self {
        let nan_count = values.iter().filter(|v| v.is_nan()).count();
        Self { values, nan_count }
    }

    /// The `(targets, channels)` value matrix.
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Values of one channel.
    ///
    /// # Panics
    /// Panics if `index >= self.channels()`.
    pub fn channel(&self, index: usize) -> ArrayView1<'_, f64> {
        self.values.index_axis(Axis(1), index)
    }

    /// First channel as a vector, the usual shape for transmission curves.
    pub fn to_vec(&self) -> Vec<f64> {
        self.channel(0).to_vec()
    }

    /// Number of target wavelengths.
    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    /// Whether the target grid was empty.
    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    /// Number of channels carried over from the source curve.
    pub fn channels(&self) -> usize {
        self.values.ncols()
    }

    /// Number of NaN values in the resampled result.
    pub fn nan_count(&self) -> usize {
        self.nan_count
    }

    /// Warning describing NaN values in the result, if any.
    pub fn warning(&self) -> Option<NumericWarning> {
        (self.nan_count > 0).then_some(NumericWarning::NanInCurve {
            count: self.nan_count,
        })
    }
}

/// Resample `curve` onto `target` wavelengths.
///
/// Returns one row per target wavelength and one column per curve channel.
/// NaN values in the result are logged and counted, never rejected.
pub fn resample(
    curve: &SpectralCurve,
    target: &[f64],
    extrapolation: Extrapolation,
) -> Result<ResampledCurve> {
    let values = if curve.wavelengths() == target {
        log::trace!("Curve grid matches target grid, skipping interpolation");
        curve.values().clone()
    } else {
        interpolate(curve, target, extrapolation)
    };

    let resampled = ResampledCurve::from_values(values);
    if let Some(warning) = resampled.warning() {
        warning.log();
    }
    Ok(resampled)
}

fn interpolate(curve: &SpectralCurve, target: &[f64], extrapolation: Extrapolation) -> Array2<f64> {
    let wavelengths = curve.wavelengths();
    let values = curve.values();
    let n = wavelengths.len();
    let (first, last) = curve.range();

    let mut out = Array2::zeros((target.len(), curve.channels()));
    for (row, &lambda) in target.iter().enumerate() {
        if extrapolation == Extrapolation::Clamp && (lambda <= first || lambda >= last) {
            let edge = if lambda <= first { 0 } else { n - 1 };
            out.row_mut(row).assign(&values.row(edge));
            continue;
        }

        // Segment i spans [λi, λi+1]; boundary segments extend outward.
        let i = wavelengths
            .partition_point(|&w| w <= lambda)
            .saturating_sub(1)
            .min(n - 2);
        let t = (lambda - wavelengths[i]) / (wavelengths[i + 1] - wavelengths[i]);

        for channel in 0..curve.channels() {
            let lo = values[[i, channel]];
            let hi = values[[i + 1, channel]];
            out[[row, channel]] = lo + (hi - lo) * t;
        }
    }
    out
}
