//! Arbitrarily sampled spectral functions.
//!
//! Filter transmissions and illuminants are single-channel curves; color
//! matching functions carry three channels (X, Y, Z). Curves are tabulated at
//! whatever wavelengths the source data uses, which rarely match a sensor's
//! band centers, so they are resampled per cube before use.

use ndarray::{Array2, ArrayView1, Axis};

use crate::error::{Result, SpectralError};

/// A spectral function sampled at strictly increasing wavelengths (nm).
///
/// Values are stored as a `(samples, channels)` matrix. NaN values are
/// allowed; they are detected and reported when the curve is resampled.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralCurve {
    wavelengths: Vec<f64>,
    values: Array2<f64>,
    names: Vec<String>,
}

impl SpectralCurve {
    /// Create a curve from a wavelength vector and a `(samples, channels)` value matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - There are fewer than two samples
    /// - The number of value rows differs from the number of wavelengths
    /// - The matrix has no columns
    /// - Wavelengths are not finite and strictly increasing
    pub fn from_table(wavelengths: Vec<f64>, values: Array2<f64>) -> Result<Self> {
        if values.nrows() != wavelengths.len() {
            return Err(SpectralError::LengthMismatch {
                wavelengths: wavelengths.len(),
                values: values.nrows(),
            });
        }
        if wavelengths.len() < 2 {
            return Err(SpectralError::TooFewSamples(wavelengths.len()));
        }
        if values.ncols() == 0 {
            return Err(SpectralError::NoChannels);
        }
        if let Some(index) = wavelengths.iter().position(|w| !w.is_finite()) {
            return Err(SpectralError::NotIncreasing { index });
        }
        for i in 1..wavelengths.len() {
            if wavelengths[i] <= wavelengths[i - 1] {
                return Err(SpectralError::NotIncreasing { index: i });
            }
        }

        let names = (0..values.ncols())
            .map(|i| format!("channel{}", i + 1))
            .collect();

        Ok(Self {
            wavelengths,
            values,
            names,
        })
    }

    /// Create a single-channel curve (transmission, illuminant).
    pub fn single(wavelengths: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        let rows = values.len();
        let values = Array2::from_shape_vec((rows, 1), values).map_err(|_| {
            SpectralError::LengthMismatch {
                wavelengths: wavelengths.len(),
                values: rows,
            }
        })?;
        Self::from_table(wavelengths, values)
    }

    /// Create a curve from per-channel columns of equal length.
    pub fn from_columns(wavelengths: Vec<f64>, columns: &[Vec<f64>]) -> Result<Self> {
        if columns.is_empty() {
            return Err(SpectralError::NoChannels);
        }
        let rows = wavelengths.len();
        if let Some(bad) = columns.iter().find(|c| c.len() != rows) {
            return Err(SpectralError::LengthMismatch {
                wavelengths: rows,
                values: bad.len(),
            });
        }
        let values = Array2::from_shape_fn((rows, columns.len()), |(r, c)| columns[c][r]);
        Self::from_table(wavelengths, values)
    }

    /// Attach channel names (e.g. filter column headers, or X/Y/Z).
    pub fn with_names(mut self, names: Vec<String>) -> Self {
        if names.len() == self.channels() {
            self.names = names;
        } else {
            log::warn!(
                "Ignoring {} channel names for a curve with {} channels",
                names.len(),
                self.channels()
            );
        }
        self
    }

    /// Sampled wavelengths in nanometers.
    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    /// The `(samples, channels)` value matrix.
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Values of one channel, or `None` if the index is out of range.
    pub fn channel(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.channels()).then(|| self.values.index_axis(Axis(1), index))
    }

    /// Channel names, one per column.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.wavelengths.len()
    }

    /// Curves always hold at least two samples.
    pub fn is_empty(&self) -> bool {
        self.wavelengths.is_empty()
    }

    /// Number of value channels.
    pub fn channels(&self) -> usize {
        self.values.ncols()
    }

    /// Sampled wavelength range `(first, last)`.
    pub fn range(&self) -> (f64, f64) {
        (self.wavelengths[0], self.wavelengths[self.wavelengths.len() - 1])
    }

    /// Split a multi-channel curve into one single-channel curve per channel.
    pub fn split_channels(&self) -> Vec<SpectralCurve> {
        (0..self.channels())
            .map(|c| SpectralCurve {
                wavelengths: self.wavelengths.clone(),
                values: self.values.slice(ndarray::s![.., c..c + 1]).to_owned(),
                names: vec![self.names[c].clone()],
            })
            .collect()
    }
}
