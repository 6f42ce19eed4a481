//! Trait definitions for cube file formats.

use std::path::{Path, PathBuf};

use crate::data::Cube;
use crate::format::error::FormatError;
use crate::format::formats::Hdf5Options;

/// Trait for cube file format implementations.
///
/// Each on-disk encoding (ENVI header + raw, HDF5 container) implements this
/// trait to convert between files and the in-memory [`Cube`].
pub trait CubeFormat: Send + Sync {
    /// Unique identifier for this format (e.g., "envi", "hdf5").
    fn id(&self) -> &'static str;

    /// Human-readable name for log messages.
    fn display_name(&self) -> &'static str;

    /// File extensions this format is addressed by (lowercase, without dots).
    fn extensions(&self) -> &'static [&'static str];

    /// Load a cube from the given path.
    fn load(&self, path: &Path) -> Result<Cube, FormatError>;

    /// Save a cube to the given path, returning every file written.
    ///
    /// Implementations must never leave a partially written file at a
    /// destination path.
    fn save(&self, path: &Path, cube: &Cube) -> Result<Vec<PathBuf>, FormatError>;

    /// Files that `save` would create for `path`.
    fn output_paths(&self, path: &Path) -> Vec<PathBuf> {
        vec![path.to_path_buf()]
    }

    /// Priority when several formats claim an extension (higher wins).
    fn priority(&self) -> i32 {
        0
    }
}

/// Options shared by the built-in formats.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Fail when an ENVI header has no `wavelength` field.
    pub require_wavelengths: bool,

    /// Dataset name, layout and wavelength grid for HDF5 containers.
    pub hdf5: Hdf5Options,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            require_wavelengths: true,
            hdf5: Hdf5Options::default(),
        }
    }
}

impl StoreOptions {
    /// Create new store options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether headers must carry a wavelength list.
    pub fn require_wavelengths(mut self, require: bool) -> Self {
        self.require_wavelengths = require;
        self
    }

    /// Set HDF5 options.
    pub fn hdf5(mut self, options: Hdf5Options) -> Self {
        self.hdf5 = options;
        self
    }
}
