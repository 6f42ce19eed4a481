//! HDF5 container cube format (MATLAB v7.3 `.mat`, `.h5`).
//!
//! The file holds a single named 3-D dataset and no wavelength information;
//! every cube in a batch is assumed to share one linear wavelength grid
//! given in [`Hdf5Options`].
//!
//! Reading and writing need the `hdf5` cargo feature. Without it the format
//! is still registered, so HDF5 files are discovered and reported as
//! failures instead of being silently ignored.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::Cube;
use crate::format::error::FormatError;
use crate::format::traits::CubeFormat;

/// Axis order of the dataset as seen through the HDF5 API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hdf5Layout {
    /// `[bands, columns, rows]`: a MATLAB `rows × columns × bands` array
    /// stored column-major.
    #[default]
    Matlab,
    /// `[rows, columns, bands]`.
    RowMajor,
}

/// Inclusive linear wavelength grid: `count` points from `start` to `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearGrid {
    /// First wavelength (nm)
    pub start: f64,
    /// Last wavelength (nm)
    pub stop: f64,
    /// Number of points
    pub count: usize,
}

impl Default for LinearGrid {
    fn default() -> Self {
        Self {
            start: 410.0,
            stop: 1000.0,
            count: 160,
        }
    }
}

impl LinearGrid {
    /// The grid's wavelengths.
    pub fn values(&self) -> Vec<f64> {
        match self.count {
            0 => Vec::new(),
            1 => vec![self.start],
            n => {
                let step = (self.stop - self.start) / (n - 1) as f64;
                (0..n).map(|i| self.start + step * i as f64).collect()
            }
        }
    }
}

/// Where to find the cube inside an HDF5 file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hdf5Options {
    /// Dataset name
    pub dataset: String,
    /// Axis order of the dataset
    pub layout: Hdf5Layout,
    /// Wavelength grid shared by every file
    pub wavelengths: LinearGrid,
}

impl Default for Hdf5Options {
    fn default() -> Self {
        Self {
            dataset: "hsi".to_string(),
            layout: Hdf5Layout::default(),
            wavelengths: LinearGrid::default(),
        }
    }
}

/// HDF5 single-dataset cube format.
#[derive(Debug, Clone, Default)]
pub struct Hdf5Format {
    options: Hdf5Options,
}

impl Hdf5Format {
    /// Create the format with the given dataset options.
    pub fn new(options: Hdf5Options) -> Self {
        Self { options }
    }

    /// Dataset options in use.
    pub fn options(&self) -> &Hdf5Options {
        &self.options
    }
}

impl CubeFormat for Hdf5Format {
    fn id(&self) -> &'static str {
        "hdf5"
    }

    fn display_name(&self) -> &'static str {
        "HDF5 (MAT v7.3)"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["mat", "h5", "hdf5"]
    }

    #[cfg(feature = "hdf5")]
    fn load(&self, path: &Path) -> Result<Cube, FormatError> {
        backend::load(&self.options, path)
    }

    #[cfg(not(feature = "hdf5"))]
    fn load(&self, path: &Path) -> Result<Cube, FormatError> {
        Err(FormatError::Unsupported(format!(
            "cannot read {:?}: built without the `hdf5` feature",
            path
        )))
    }

    #[cfg(feature = "hdf5")]
    fn save(&self, path: &Path, cube: &Cube) -> Result<Vec<PathBuf>, FormatError> {
        backend::save(&self.options, path, cube)?;
        Ok(vec![path.to_path_buf()])
    }

    #[cfg(not(feature = "hdf5"))]
    fn save(&self, path: &Path, _cube: &Cube) -> Result<Vec<PathBuf>, FormatError> {
        Err(FormatError::Unsupported(format!(
            "cannot write {:?}: built without the `hdf5` feature",
            path
        )))
    }
}

#[cfg(feature = "hdf5")]
mod backend {
    use std::path::Path;

    use hdf5::types::{FloatSize, IntSize, TypeDescriptor};
    use ndarray::Array3;

    use super::{Hdf5Layout, Hdf5Options};
    use crate::data::{Cube, HeaderMetadata};
    use crate::format::atomic::parent_dir;
    use crate::format::error::FormatError;

    fn read_f32(dataset: &hdf5::Dataset) -> Result<Vec<f32>, FormatError> {
        Ok(match dataset.dtype()?.to_descriptor()? {
            TypeDescriptor::Float(FloatSize::U4) => dataset.read_raw::<f32>()?,
            TypeDescriptor::Float(FloatSize::U8) => dataset
                .read_raw::<f64>()?
                .into_iter()
                .map(|v| v as f32)
                .collect(),
            TypeDescriptor::Unsigned(IntSize::U1) => dataset
                .read_raw::<u8>()?
                .into_iter()
                .map(f32::from)
                .collect(),
            TypeDescriptor::Unsigned(IntSize::U2) => dataset
                .read_raw::<u16>()?
                .into_iter()
                .map(f32::from)
                .collect(),
            TypeDescriptor::Integer(IntSize::U2) => dataset
                .read_raw::<i16>()?
                .into_iter()
                .map(f32::from)
                .collect(),
            TypeDescriptor::Integer(IntSize::U4) => dataset
                .read_raw::<i32>()?
                .into_iter()
                .map(|v| v as f32)
                .collect(),
            other => {
                return Err(FormatError::invalid_dataset(format!(
                    "unsupported element type {:?}",
                    other
                )));
            }
        })
    }

    pub(super) fn load(options: &Hdf5Options, path: &Path) -> Result<Cube, FormatError> {
        let file = hdf5::File::open(path)?;
        let dataset = file.dataset(&options.dataset)?;
        let shape = dataset.shape();
        let [d0, d1, d2] = shape[..] else {
            return Err(FormatError::invalid_dataset(format!(
                "dataset '{}' has {} dimensions, expected 3",
                options.dataset,
                shape.len()
            )));
        };

        let values = read_f32(&dataset)?;
        let array = Array3::from_shape_vec((d0, d1, d2), values)
            .map_err(|e| FormatError::invalid_dataset(e.to_string()))?;
        let data = match options.layout {
            Hdf5Layout::RowMajor => array,
            Hdf5Layout::Matlab => array.permuted_axes([2, 1, 0]).as_standard_layout().into_owned(),
        };

        log::debug!(
            "Loaded HDF5 cube {:?} dataset '{}': {:?}",
            path,
            options.dataset,
            data.dim()
        );
        Cube::new(data, options.wavelengths.values(), HeaderMetadata::new())
    }

    pub(super) fn save(options: &Hdf5Options, path: &Path, cube: &Cube) -> Result<(), FormatError> {
        let (rows, cols, bands) = cube.data().dim();
        let (shape, values): (Vec<usize>, Vec<f32>) = match options.layout {
            Hdf5Layout::RowMajor => (vec![rows, cols, bands], cube.data().iter().copied().collect()),
            Hdf5Layout::Matlab => (
                vec![bands, cols, rows],
                cube.data().view().permuted_axes([2, 1, 0]).iter().copied().collect(),
            ),
        };

        let temp = tempfile::Builder::new()
            .suffix(".h5")
            .tempfile_in(parent_dir(path))?
            .into_temp_path();
        {
            let file = hdf5::File::create(&temp)?;
            let dataset = file
                .new_dataset::<f32>()
                .shape(shape)
                .create(options.dataset.as_str())?;
            dataset.write_raw(&values)?;
        }
        temp.persist(path).map_err(|e| e.error)?;

        log::debug!("Saved HDF5 cube to {:?}", path);
        Ok(())
    }
}
