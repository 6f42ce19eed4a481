//! Per-file transforms driven by the batch orchestrator.
//!
//! A [`CubeTask`] turns one input cube file into one or more output files.
//! The orchestrator decides *which* files to process and mirrors the
//! directory layout; the task decides *what* to write and where inside each
//! mirrored directory.
//!
//! - [`FilterTask`]: attenuates the cube by one or more transmission curves,
//!   writing one filtered cube per curve
//! - [`RgbTask`]: renders the cube to an sRGB image

mod error;
mod filter;
mod rgb;

use std::path::{Path, PathBuf};

use hsitools_spectral::NumericWarning;

use crate::format::CubeStore;

pub use error::PipelineError;
pub use filter::{FilterSpec, FilterTask};
pub use rgb::{RgbOptions, RgbTask};

/// One discovered input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CubeJob {
    /// Path of the cube file
    pub input: PathBuf,
    /// Directory of the file relative to the input root, mirrored under
    /// every output root
    pub relative_dir: PathBuf,
}

impl CubeJob {
    /// Create a job.
    pub fn new(input: impl Into<PathBuf>, relative_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            relative_dir: relative_dir.into(),
        }
    }

    /// File name of the input, for building output names.
    pub fn file_name(&self) -> Result<&str, PipelineError> {
        self.input
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PipelineError::InvalidPath(self.input.clone()))
    }

    /// File name of the input without its extension.
    pub fn file_stem(&self) -> Result<&str, PipelineError> {
        self.input
            .file_stem()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PipelineError::InvalidPath(self.input.clone()))
    }

    /// The mirrored directory under `root`.
    pub fn output_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.relative_dir)
    }
}

/// What a task produced for one file.
#[derive(Debug, Default)]
pub struct TaskOutcome {
    /// Files written
    pub files_written: Vec<PathBuf>,
    /// Numeric problems encountered but not treated as failures
    pub warnings: Vec<NumericWarning>,
}

/// A transform applied to every cube file of a batch.
pub trait CubeTask: Send + Sync {
    /// Short name used in log messages.
    fn name(&self) -> &str;

    /// Output roots this task writes into.
    fn output_roots(&self) -> Vec<&Path>;

    /// Files `process` would write for `job`.
    fn outputs_for(&self, store: &CubeStore, job: &CubeJob) -> Result<Vec<PathBuf>, PipelineError>;

    /// Load, transform and save one file.
    ///
    /// The mirrored output directories already exist when this is called.
    fn process(&self, store: &CubeStore, job: &CubeJob) -> Result<TaskOutcome, PipelineError>;
}
