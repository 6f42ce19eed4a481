//! Extension-dispatched registry of cube formats.

use std::path::{Path, PathBuf};

use crate::data::Cube;
use crate::format::error::FormatError;
use crate::format::formats::{EnviFormat, Hdf5Format};
use crate::format::traits::{CubeFormat, StoreOptions};

/// Registry of available cube formats.
///
/// Dispatch is by file extension only; there is no content sniffing.
pub struct CubeStore {
    formats: Vec<Box<dyn CubeFormat>>,
}

impl Default for CubeStore {
    fn default() -> Self {
        Self::new(StoreOptions::default())
    }
}

impl CubeStore {
    /// Create a store with all built-in formats registered.
    pub fn new(options: StoreOptions) -> Self {
        let mut store = Self {
            formats: Vec::new(),
        };
        store.register(Box::new(EnviFormat::new(options.require_wavelengths)));
        store.register(Box::new(Hdf5Format::new(options.hdf5)));
        store
    }

    /// Register a format implementation.
    pub fn register(&mut self, format: Box<dyn CubeFormat>) {
        log::trace!("Registering cube format '{}'", format.id());
        self.formats.push(format);
        // Stable sort keeps registration order for equal priorities.
        self.formats.sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    /// Get a format by its ID.
    pub fn get(&self, id: &str) -> Option<&dyn CubeFormat> {
        self.formats
            .iter()
            .find(|f| f.id() == id)
            .map(|f| f.as_ref())
    }

    /// All supported file extensions, sorted.
    pub fn supported_extensions(&self) -> Vec<&'static str> {
        let mut extensions: Vec<&'static str> = self
            .formats
            .iter()
            .flat_map(|f| f.extensions().iter().copied())
            .collect();
        extensions.sort_unstable();
        extensions.dedup();
        extensions
    }

    /// The format that handles `path`, if any.
    pub fn format_for(&self, path: &Path) -> Result<&dyn CubeFormat, FormatError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        extension
            .and_then(|ext| {
                self.formats
                    .iter()
                    .find(|f| f.extensions().contains(&ext.as_str()))
            })
            .map(|f| f.as_ref())
            .ok_or_else(|| FormatError::UnsupportedExtension {
                path: path.to_path_buf(),
            })
    }

    /// Whether `path` names a cube file this store can address.
    pub fn is_cube_file(&self, path: &Path) -> bool {
        self.format_for(path).is_ok()
    }

    /// Load a cube, choosing the format by extension.
    pub fn load(&self, path: &Path) -> Result<Cube, FormatError> {
        let format = self.format_for(path)?;
        log::debug!("Loading {:?} as {}", path, format.display_name());
        format.load(path)
    }

    /// Save a cube, choosing the format by extension. Returns the files written.
    pub fn save(&self, path: &Path, cube: &Cube) -> Result<Vec<PathBuf>, FormatError> {
        let format = self.format_for(path)?;
        log::debug!("Saving {:?} as {}", path, format.display_name());
        format.save(path, cube)
    }

    /// Files that saving to `path` would produce.
    pub fn output_paths(&self, path: &Path) -> Result<Vec<PathBuf>, FormatError> {
        Ok(self.format_for(path)?.output_paths(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_formats_registered() {
        let store = CubeStore::default();
        assert!(store.get("envi").is_some());
        assert!(store.get("hdf5").is_some());
        assert!(store.get("coco").is_none());
        assert_eq!(store.supported_extensions(), vec!["h5", "hdf5", "hdr", "mat"]);
    }

    #[test]
    fn test_dispatch_by_extension() {
        let store = CubeStore::default();
        assert_eq!(store.format_for(Path::new("a/scene.HDR")).unwrap().id(), "envi");
        assert_eq!(store.format_for(Path::new("scene.mat")).unwrap().id(), "hdf5");
        assert!(store.is_cube_file(Path::new("x.h5")));
        assert!(!store.is_cube_file(Path::new("scene.img")));
        assert!(!store.is_cube_file(Path::new("README")));
        assert!(matches!(
            store.load(Path::new("notes.txt")),
            Err(FormatError::UnsupportedExtension { .. })
        ));
    }

    #[test]
    fn test_output_paths() {
        let store = CubeStore::default();
        assert_eq!(
            store.output_paths(Path::new("out/AMP_scene.hdr")).unwrap(),
            vec![
                PathBuf::from("out/AMP_scene.hdr"),
                PathBuf::from("out/AMP_scene.img")
            ]
        );
        assert_eq!(
            store.output_paths(Path::new("out/scene.mat")).unwrap(),
            vec![PathBuf::from("out/scene.mat")]
        );
    }
}
