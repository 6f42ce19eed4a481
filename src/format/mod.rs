//! Cube file reading and writing.
//!
//! This module provides a trait-based store for hyperspectral cube files.
//! New encodings can be added by implementing the `CubeFormat` trait and
//! registering the implementation with a `CubeStore`.
//!
//! ## Supported Formats
//!
//! - **ENVI**: `.hdr` text header with a raw binary sibling (`.img`, `.dat`, ...)
//! - **HDF5**: `.mat` (v7.3) / `.h5` container with one 3-D dataset (needs the `hdf5` feature)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hsitools::format::{CubeStore, StoreOptions};
//!
//! let store = CubeStore::new(StoreOptions::default());
//! let cube = store.load(Path::new("scene.hdr"))?;
//! store.save(Path::new("out/scene.hdr"), &cube)?;
//! ```

pub(crate) mod atomic;
pub(crate) mod error;
pub mod formats;
mod store;
mod traits;

pub use error::FormatError;
pub use store::CubeStore;
pub use traits::{CubeFormat, StoreOptions};
