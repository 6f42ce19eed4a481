//! Cube and curve data structures.
//!
//! This module provides:
//! - `Cube`: an in-memory hyperspectral cube with its wavelength grid and header metadata
//! - `HeaderMetadata`: ordered header fields carried through transforms unchanged
//! - `CurveTable`: CSV or spreadsheet tables of filter, illuminant and colour-matching curves

mod cube;
mod curve_table;
mod metadata;

#[cfg(test)]
pub(crate) use cube::test_gen;
pub use cube::{Cube, Region};
pub use curve_table::{CurveTable, CurveTableError};
pub use metadata::{HeaderMetadata, WAVELENGTH_KEY};
