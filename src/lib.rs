//! hsitools - batch processing of hyperspectral cubes
//!
//! Loads ENVI and HDF5 cubes, applies transmission filters or renders them
//! to sRGB through CIE XYZ, and writes the results into output trees that
//! mirror the input tree. The numerical core lives in `hsitools_spectral`.

pub mod batch;
pub mod config;
pub mod constants;
pub mod crop;
pub mod data;
pub mod format;
pub mod image_io;
pub mod metrics;
pub mod pipeline;

pub use batch::{Batch, BatchError, BatchReport, InputLayout};
pub use config::{ConfigError, LogLevel, PipelineConfig};
pub use data::{Cube, CurveTable};
pub use format::{CubeStore, FormatError};
pub use hsitools_spectral as spectral;
