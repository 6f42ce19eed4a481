//! Reduction of a hyperspectral cube to a display sRGB image.
//!
//! The pipeline, in order:
//! 1. Optional illuminant: reflectance × illuminant(λ) = radiance
//! 2. Integration against the color matching functions: one matrix product
//!    of the `(pixels, bands)` radiance matrix with the `(bands, 3)` CMF
//! 3. Division of the whole XYZ image by its single global maximum, clip to [0, 1]
//! 4. Fixed XYZ → linear sRGB matrix, clip to [0, 1]
//! 5. Power-law gamma with a caller-chosen exponent
//!
//! Step 3 couples brightness across the image: one abnormally bright pixel
//! darkens every other pixel.

use ndarray::{Array2, Array3, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectralError};
use crate::resample::ResampledCurve;
use crate::warning::NumericWarning;

/// CIE XYZ (D65) to linear sRGB.
pub const XYZ_TO_SRGB: [[f64; 3]; 3] = [
    [3.2406, -1.5372, -0.4986],
    [-0.9689, 1.8758, 0.0415],
    [0.0557, -0.2040, 1.0570],
];

/// `(row, column, channel)` image with values in [0, 1] (NaN where the input was NaN).
pub type SrgbImage = Array3<f64>;

/// Power-law applied as the last step: `out = value ^ exponent`.
///
/// Has no `Default`. Approximate display encoding is `Exponent(0.4)`; true
/// sRGB encoding is `Encode(2.2)`, i.e. `1/2.2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "RawGamma")]
pub enum Gamma {
    /// No gamma, values stay linear.
    Linear,
    /// Raw exponent, `value ^ p`.
    Exponent(f64),
    /// Encoding for a display gamma `g`, `value ^ (1 / g)`.
    Encode(f64),
    /// Decoding with gamma `g`, `value ^ g`.
    Decode(f64),
}

/// Unchecked serde form of [`Gamma`].
#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawGamma {
    Linear,
    Exponent(f64),
    Encode(f64),
    Decode(f64),
}

impl TryFrom<RawGamma> for Gamma {
    type Error = String;

    fn try_from(raw: RawGamma) -> std::result::Result<Self, Self::Error> {
        let gamma = match raw {
            RawGamma::Linear => Gamma::Linear,
            RawGamma::Exponent(p) => Gamma::Exponent(p),
            RawGamma::Encode(g) => Gamma::Encode(g),
            RawGamma::Decode(g) => Gamma::Decode(g),
        };
        gamma.validate()
    }
}

impl Gamma {
    /// Check that the parameter is finite and positive.
    pub fn validate(self) -> std::result::Result<Self, String> {
        match self {
            Gamma::Linear => Ok(self),
            Gamma::Exponent(v) | Gamma::Encode(v) | Gamma::Decode(v) => {
                if v.is_finite() && v > 0.0 {
                    Ok(self)
                } else {
                    Err(format!("invalid gamma value {}", v))
                }
            }
        }
    }

    /// The effective power applied to each value.
    pub fn exponent(&self) -> f64 {
        match *self {
            Gamma::Linear => 1.0,
            Gamma::Exponent(p) => p,
            Gamma::Encode(g) => 1.0 / g,
            Gamma::Decode(g) => g,
        }
    }

    /// Apply the power law in place.
    pub fn apply(&self, image: &mut Array3<f64>) {
        let exponent = self.exponent();
        if exponent != 1.0 {
            image.mapv_inplace(|v| v.powf(exponent));
        }
    }
}

impl std::str::FromStr for Gamma {
    type Err = String;

    /// Parse `linear`, a bare exponent such as `0.4`, `encode:2.2` or `decode:2.2`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "linear" || s == "none" {
            return Ok(Gamma::Linear);
        }
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v > 0.0)
                .ok_or_else(|| format!("invalid gamma value '{}'", v))
        };
        match s.split_once(':') {
            Some(("encode", v)) => Ok(Gamma::Encode(parse(v)?)),
            Some(("decode", v)) => Ok(Gamma::Decode(parse(v)?)),
            Some((kind, _)) => Err(format!("unknown gamma kind '{}'", kind)),
            None => Ok(Gamma::Exponent(parse(&s)?)),
        }
    }
}

/// Integrate the cube against the color matching functions.
///
/// Returns unnormalized XYZ with shape `(rows, columns, 3)`. With an
/// illuminant the cube is treated as reflectance and converted to radiance
/// first; without one it is treated as radiance.
///
/// # Errors
/// [`SpectralError::DimensionMismatch`] if the CMF is not `(bands, 3)` or the
/// illuminant is not `(bands, 1)`.
pub fn to_xyz(
    cube: &Array3<f32>,
    cmf: &ResampledCurve,
    illuminant: Option<&ResampledCurve>,
) -> Result<Array3<f64>> {
    let (rows, cols, bands) = cube.dim();
    if cmf.len() != bands {
        return Err(SpectralError::mismatch("color matching function rows", bands, cmf.len()));
    }
    if cmf.channels() != 3 {
        return Err(SpectralError::mismatch("color matching function channels", 3, cmf.channels()));
    }

    let weights = match illuminant {
        Some(illuminant) => {
            if illuminant.len() != bands {
                return Err(SpectralError::mismatch("illuminant rows", bands, illuminant.len()));
            }
            if illuminant.channels() != 1 {
                return Err(SpectralError::mismatch("illuminant channels", 1, illuminant.channels()));
            }
            illuminant.to_vec()
        }
        None => vec![1.0; bands],
    };

    // Logical iteration order is (row, column, band), so consecutive runs of
    // `bands` values form one pixel's spectrum.
    let radiance: Vec<f64> = cube
        .iter()
        .enumerate()
        .map(|(k, &v)| f64::from(v) * weights[k % bands])
        .collect();
    let radiance = Array2::from_shape_vec((rows * cols, bands), radiance)
        .map_err(|_| SpectralError::mismatch("cube samples", rows * cols * bands, cube.len()))?;

    let xyz = radiance.dot(cmf.values());
    xyz.into_shape_with_order((rows, cols, 3))
        .map_err(|_| SpectralError::mismatch("XYZ pixels", rows * cols, 0))
}

/// Divide by the global maximum (one scalar for all pixels and channels) and clip to [0, 1].
///
/// NaN values are ignored when finding the maximum and stay NaN. If the
/// maximum is not positive the image is only clipped. Returns the divisor used.
pub fn normalize_global_max(xyz: &mut Array3<f64>) -> f64 {
    let max = xyz
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f64::NEG_INFINITY, f64::max);

    if max > 0.0 {
        xyz.mapv_inplace(|v| (v / max).clamp(0.0, 1.0));
        max
    } else {
        log::debug!("XYZ maximum is {}, skipping normalization", max);
        xyz.mapv_inplace(|v| v.clamp(0.0, 1.0));
        1.0
    }
}

/// Convert XYZ to linear sRGB (`RGB = XYZ · Mᵗ`) and clip to [0, 1].
pub fn xyz_to_linear_srgb(xyz: &Array3<f64>) -> Array3<f64> {
    let mut rgb = Array3::zeros(xyz.dim());
    for (xyz_px, mut rgb_px) in xyz.lanes(Axis(2)).into_iter().zip(rgb.lanes_mut(Axis(2))) {
        for (channel, row) in XYZ_TO_SRGB.iter().enumerate() {
            let value = row[0] * xyz_px[0] + row[1] * xyz_px[1] + row[2] * xyz_px[2];
            rgb_px[channel] = value.clamp(0.0, 1.0);
        }
    }
    rgb
}

/// Full reduction of a cube to a gamma-encoded sRGB image.
///
/// `cmf` and `illuminant` must already be resampled onto the cube's grid.
pub fn to_srgb(
    cube: &Array3<f32>,
    cmf: &ResampledCurve,
    illuminant: Option<&ResampledCurve>,
    gamma: Gamma,
) -> Result<SrgbImage> {
    let mut xyz = to_xyz(cube, cmf, illuminant)?;
    let max = normalize_global_max(&mut xyz);
    log::trace!("XYZ normalized by global maximum {}", max);

    let mut rgb = xyz_to_linear_srgb(&xyz);
    gamma.apply(&mut rgb);

    let nan_count = rgb.iter().filter(|v| v.is_nan()).count();
    if nan_count > 0 {
        NumericWarning::NanInOutput { count: nan_count }.log();
    }
    Ok(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn one_hot_cmf(bands: usize, band: usize, channel: usize) -> ResampledCurve {
        let mut values = Array2::zeros((bands, 3));
        values[[band, channel]] = 1.0;
        ResampledCurve::from_values(values)
    }

    #[test]
    fn test_flat_cube_with_one_hot_cmf_has_single_channel() {
        let cube = Array3::from_elem((3, 2, 5), 0.8f32);
        let mut xyz = to_xyz(&cube, &one_hot_cmf(5, 2, 1), None).unwrap();
        assert_eq!(xyz.dim(), (3, 2, 3));

        normalize_global_max(&mut xyz);
        for px in xyz.lanes(Axis(2)) {
            assert_eq!(px[0], 0.0);
            assert_relative_eq!(px[1], 1.0);
            assert_eq!(px[2], 0.0);
        }
    }

    #[test]
    fn test_cmf_integration() {
        let cube = Array3::from_shape_vec((1, 1, 3), vec![1.0f32, 2.0, 3.0]).unwrap();
        let cmf = ResampledCurve::from_values(ndarray::array![
            [1.0, 0.0, 0.5],
            [0.0, 1.0, 0.5],
            [1.0, 1.0, 0.0]
        ]);
        let xyz = to_xyz(&cube, &cmf, None).unwrap();
        assert_relative_eq!(xyz[[0, 0, 0]], 4.0);
        assert_relative_eq!(xyz[[0, 0, 1]], 5.0);
        assert_relative_eq!(xyz[[0, 0, 2]], 1.5);
    }

    #[test]
    fn test_illuminant_converts_reflectance() {
        let cube = Array3::from_elem((1, 2, 2), 0.5f32);
        let cmf = ResampledCurve::from_values(ndarray::array![[1.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
        let illuminant = ResampledCurve::from_values(ndarray::array![[2.0], [4.0]]);

        let xyz = to_xyz(&cube, &cmf, Some(&illuminant)).unwrap();
        assert_relative_eq!(xyz[[0, 1, 0]], 0.5 * 2.0 + 0.5 * 4.0);
    }

    #[test]
    fn test_global_max_couples_pixels() {
        let mut cube = Array3::from_elem((2, 2, 1), 1.0f32);
        cube[[0, 0, 0]] = 10.0;
        let cmf = ResampledCurve::from_values(ndarray::array![[1.0, 1.0, 1.0]]);

        let mut xyz = to_xyz(&cube, &cmf, None).unwrap();
        let max = normalize_global_max(&mut xyz);
        assert_relative_eq!(max, 10.0);
        assert_relative_eq!(xyz[[0, 0, 0]], 1.0);
        assert_relative_eq!(xyz[[1, 1, 2]], 0.1);
    }

    #[test]
    fn test_srgb_matrix_and_clip() {
        let cube = Array3::from_elem((1, 1, 2), 1.0f32);
        let rgb = to_srgb(&cube, &one_hot_cmf(2, 0, 0), None, Gamma::Linear).unwrap();
        // Pure X maps to the first matrix column, clipped to [0, 1].
        assert_relative_eq!(rgb[[0, 0, 0]], 1.0);
        assert_relative_eq!(rgb[[0, 0, 1]], 0.0);
        assert_relative_eq!(rgb[[0, 0, 2]], 0.0557);
    }

    #[test]
    fn test_gamma_exponents() {
        assert_eq!(Gamma::Linear.exponent(), 1.0);
        assert_eq!(Gamma::Exponent(0.4).exponent(), 0.4);
        assert_relative_eq!(Gamma::Encode(2.2).exponent(), 1.0 / 2.2);
        assert_eq!(Gamma::Decode(2.2).exponent(), 2.2);

        let cube = Array3::from_elem((1, 1, 2), 1.0f32);
        let encoded = to_srgb(&cube, &one_hot_cmf(2, 0, 0), None, Gamma::Exponent(0.4)).unwrap();
        assert_relative_eq!(encoded[[0, 0, 2]], 0.0557f64.powf(0.4), epsilon = 1e-12);

        let encoded = to_srgb(&cube, &one_hot_cmf(2, 0, 0), None, Gamma::Encode(2.2)).unwrap();
        assert_relative_eq!(encoded[[0, 0, 2]], 0.0557f64.powf(1.0 / 2.2), epsilon = 1e-12);
    }

    #[test]
    fn test_parse_gamma() {
        assert_eq!("linear".parse::<Gamma>(), Ok(Gamma::Linear));
        assert_eq!("0.4".parse::<Gamma>(), Ok(Gamma::Exponent(0.4)));
        assert_eq!("encode:2.2".parse::<Gamma>(), Ok(Gamma::Encode(2.2)));
        assert_eq!("Decode: 2.2".parse::<Gamma>(), Ok(Gamma::Decode(2.2)));
        assert!("encode:-1".parse::<Gamma>().is_err());
        assert!("blend:2".parse::<Gamma>().is_err());
        assert!("".parse::<Gamma>().is_err());
    }

    #[test]
    fn test_deserialize_gamma_checks_value() {
        let parse = |json: &str| serde_json::from_str::<Gamma>(json);
        assert_eq!(parse(r#""linear""#).unwrap(), Gamma::Linear);
        assert_eq!(parse(r#"{ "encode": 2.2 }"#).unwrap(), Gamma::Encode(2.2));
        assert!(parse(r#"{ "encode": 0 }"#).is_err());
        assert!(parse(r#"{ "exponent": -1 }"#).is_err());
        assert!(parse(r#"{ "decode": 0.0 }"#).is_err());

        let json = serde_json::to_string(&Gamma::Exponent(0.4)).unwrap();
        assert_eq!(json, r#"{"exponent":0.4}"#);
        assert_eq!(parse(&json).unwrap(), Gamma::Exponent(0.4));
    }

    #[test]
    fn test_nan_pixel_propagates() {
        let mut cube = Array3::from_elem((1, 2, 2), 1.0f32);
        cube[[0, 0, 1]] = f32::NAN;
        let cmf = ResampledCurve::from_values(ndarray::array![[0.0, 1.0, 0.0], [0.0, 1.0, 0.0]]);

        let rgb = to_srgb(&cube, &cmf, None, Gamma::Linear).unwrap();
        assert!(rgb[[0, 0, 0]].is_nan());
        assert!(!rgb[[0, 1, 0]].is_nan());
        assert_relative_eq!(rgb[[0, 1, 1]], 1.0);
    }

    #[test]
    fn test_dark_cube_stays_dark() {
        let cube = Array3::zeros((2, 2, 3));
        let rgb = to_srgb(&cube, &one_hot_cmf(3, 1, 1), None, Gamma::Encode(2.2)).unwrap();
        assert!(rgb.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_dimension_mismatch() {
        let cube = Array3::from_elem((1, 1, 4), 1.0f32);
        let err = to_xyz(&cube, &one_hot_cmf(3, 0, 0), None).unwrap_err();
        assert_eq!(err, SpectralError::mismatch("color matching function rows", 4, 3));

        let two_channels = ResampledCurve::from_values(Array2::zeros((4, 2)));
        assert!(to_xyz(&cube, &two_channels, None).is_err());

        let illuminant = ResampledCurve::from_values(Array2::ones((3, 1)));
        let err = to_xyz(&cube, &one_hot_cmf(4, 0, 0), Some(&illuminant)).unwrap_err();
        assert_eq!(err, SpectralError::mismatch("illuminant rows", 4, 3));
    }
}
