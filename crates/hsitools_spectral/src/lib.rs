//! Spectral curve resampling and cube transforms.
//!
//! This crate holds the numerical core shared by the batch tools:
//! - [`SpectralCurve`]: an arbitrarily sampled spectral function with one or more channels
//! - [`resample`]: projection of a curve onto a cube's wavelength grid
//! - [`apply_transmission`]: per-band attenuation of a cube by a filter curve
//! - [`to_srgb`]: reduction of a cube to a gamma-encoded sRGB image through CIE XYZ
//!
//! Cubes are `ndarray::Array3<f32>` indexed `(row, column, band)`.

pub mod colorimetric;
pub mod curve;
pub mod error;
pub mod radiometric;
pub mod resample;
pub mod warning;

pub use colorimetric::{
    Gamma, SrgbImage, XYZ_TO_SRGB, normalize_global_max, to_srgb, to_xyz, xyz_to_linear_srgb,
};
pub use curve::SpectralCurve;
pub use error::{Result, SpectralError};
pub use radiometric::{TransmissionReport, apply_transmission};
pub use resample::{Extrapolation, ResampledCurve, resample};
pub use warning::NumericWarning;
