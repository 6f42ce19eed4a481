//! Cube format implementations.

mod envi;
mod hdf5_cube;

#[cfg(test)]
mod tests;

pub use envi::{EnviFormat, Interleave, parse_header};
pub use hdf5_cube::{Hdf5Format, Hdf5Layout, Hdf5Options, LinearGrid};
