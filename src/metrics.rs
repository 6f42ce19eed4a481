//! Global contrast of a rendered image.

use ndarray::{Array2, Array3, Axis};
use serde::Serialize;

/// Added to denominators so black images stay finite.
pub const CONTRAST_EPSILON: f64 = 1e-6;

/// Rec. 709 luma weights for R, G, B.
pub const LUMINANCE_WEIGHTS: [f64; 3] = [0.2125, 0.7154, 0.0721];

/// Whole-image contrast figures computed on luminance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GlobalContrast {
    /// `max / (min + ε)`
    pub max_min_ratio: f64,
    /// `(max - min) / (min + ε)`
    pub weber: f64,
    /// `(max - min) / (max + min + ε)`
    pub michelson: f64,
    /// Standard deviation of luminance
    pub rms: f64,
}

/// Luminance of a `(rows, columns, 3)` image with values in `[0, 1]`.
pub fn luminance(image: &Array3<f64>) -> Array2<f64> {
    image.map_axis(Axis(2), |px| {
        px.iter()
            .zip(LUMINANCE_WEIGHTS)
            .map(|(v, w)| v * w)
            .sum()
    })
}

/// Contrast figures for one image, `None` if it has no pixels.
pub fn global_contrast(image: &Array3<f64>) -> Option<GlobalContrast> {
    let lum = luminance(image);
    let mean = lum.mean()?;
    let (min, max) = lum
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let rms = lum.mapv(|v| (v - mean).powi(2)).mean()?.sqrt();

    Some(GlobalContrast {
        max_min_ratio: max / (min + CONTRAST_EPSILON),
        weber: (max - min) / (min + CONTRAST_EPSILON),
        michelson: (max - min) / (max + min + CONTRAST_EPSILON),
        rms,
    })
}
