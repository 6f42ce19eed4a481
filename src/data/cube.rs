//! In-memory hyperspectral cube.
//!
//! A cube holds:
//! - Pixel spectra as an `(row, column, band)` array of `f32`
//! - One wavelength (nm) per band
//! - The header metadata of the file it came from, round-tripped unchanged

use hsitools_spectral::{
    Extrapolation, Gamma, ResampledCurve, SpectralCurve, SpectralError, SrgbImage,
    TransmissionReport, apply_transmission, resample, to_srgb,
};
use ndarray::{Array3, ArrayView2, Axis, s};

use crate::data::metadata::HeaderMetadata;
use crate::format::error::FormatError;

/// A hyperspectral cube with its wavelength grid and header metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Cube {
    data: Array3<f32>,
    wavelengths: Vec<f64>,
    metadata: HeaderMetadata,
}

/// Pixel-space rectangle `[row0, row1) × [col0, col1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub row0: usize,
    pub row1: usize,
    pub col0: usize,
    pub col1: usize,
}

impl Cube {
    /// Create a cube, checking that there is one wavelength per band.
    pub fn new(
        data: Array3<f32>,
        wavelengths: Vec<f64>,
        metadata: HeaderMetadata,
    ) -> Result<Self, FormatError> {
        let bands = data.len_of(Axis(2));
        if wavelengths.len() != bands {
            return Err(FormatError::WavelengthCount {
                bands,
                wavelengths: wavelengths.len(),
            });
        }
        Ok(Self {
            data,
            wavelengths,
            metadata,
        })
    }

    /// Pixel data, `(row, column, band)`.
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// Mutable pixel data. The shape must not change.
    pub fn data_mut(&mut self) -> &mut Array3<f32> {
        &mut self.data
    }

    /// Wavelength of each band in nanometers.
    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    /// Header metadata from the source file.
    pub fn metadata(&self) -> &HeaderMetadata {
        &self.metadata
    }

    /// Mutable header metadata.
    pub fn metadata_mut(&mut self) -> &mut HeaderMetadata {
        &mut self.metadata
    }

    /// Number of rows (image lines).
    pub fn rows(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// Number of columns (samples per line).
    pub fn cols(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    /// Number of spectral bands.
    pub fn bands(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// A single band plane.
    pub fn band(&self, index: usize) -> Option<ArrayView2<'_, f32>> {
        (index < self.bands()).then(|| self.data.index_axis(Axis(2), index))
    }

    /// Band labels such as `"550.0nm"`.
    pub fn band_labels(&self) -> Vec<String> {
        self.wavelengths.iter().map(|w| format!("{:.1}nm", w)).collect()
    }

    /// Largest non-NaN value in the cube.
    pub fn max_value(&self) -> Option<f32> {
        self.data
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .reduce(f32::max)
    }

    /// Divide every value by the cube's maximum so the brightest sample is 1.
    ///
    /// Leaves the cube unchanged if the maximum is not positive.
    pub fn normalize_by_max(&mut self) {
        match self.max_value() {
            Some(max) if max > 0.0 => self.data.mapv_inplace(|v| v / max),
            other => log::debug!("Cube maximum is {:?}, skipping normalization", other),
        }
    }

    /// Resample a curve onto this cube's wavelength grid.
    pub fn resample(
        &self,
        curve: &SpectralCurve,
        extrapolation: Extrapolation,
    ) -> Result<ResampledCurve, SpectralError> {
        resample(curve, &self.wavelengths, extrapolation)
    }

    /// Copy of this cube attenuated by a single-channel transmission curve
    /// already on its grid.
    pub fn filtered(
        &self,
        transmission: &ResampledCurve,
    ) -> Result<(Cube, TransmissionReport), SpectralError> {
        if transmission.channels() != 1 {
            return Err(SpectralError::mismatch(
                "transmission channels",
                1,
                transmission.channels(),
            ));
        }
        let mut cube = self.clone();
        let report = apply_transmission(&mut cube.data, &transmission.to_vec())?;
        Ok((cube, report))
    }

    /// Render this cube to sRGB with CMF and illuminant already on its grid.
    pub fn to_srgb(
        &self,
        cmf: &ResampledCurve,
        illuminant: Option<&ResampledCurve>,
        gamma: Gamma,
    ) -> Result<SrgbImage, SpectralError> {
        to_srgb(&self.data, cmf, illuminant, gamma)
    }

    /// Copy of a spatial region, keeping all bands and the metadata.
    ///
    /// The region is clipped to the cube bounds; `None` if nothing remains.
    pub fn crop(&self, region: Region) -> Option<Cube> {
        let row1 = region.row1.min(self.rows());
        let col1 = region.col1.min(self.cols());
        if region.row0 >= row1 || region.col0 >= col1 {
            return None;
        }
        Some(Cube {
            data: self
                .data
                .slice(s![region.row0..row1, region.col0..col1, ..])
                .to_owned(),
            wavelengths: self.wavelengths.clone(),
            metadata: self.metadata.clone(),
        })
    }
}
