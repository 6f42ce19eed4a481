//! Unit tests for cube format implementations.
//!
//! These tests write small cubes to temporary directories and check the
//! decoded values, header round-tripping and error reporting.

mod envi_tests;
