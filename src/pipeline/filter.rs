//! Radiometric filtering of cubes by transmission curves.

use std::path::{Path, PathBuf};

use hsitools_spectral::{Extrapolation, SpectralCurve};

use crate::format::CubeStore;
use crate::pipeline::{CubeJob, CubeTask, PipelineError, TaskOutcome};

/// One transmission curve and where its filtered cubes go.
#[derive(Debug, Clone)]
pub struct FilterSpec {
    /// Name used in log messages (usually the table column)
    pub name: String,
    /// Single-channel transmission curve
    pub curve: SpectralCurve,
    /// Root of the mirrored output tree
    pub output_root: PathBuf,
    /// Prepended to the input file name, e.g. `AMP_`
    pub prefix: String,
}

impl FilterSpec {
    /// Create a filter spec.
    pub fn new(
        name: impl Into<String>,
        curve: SpectralCurve,
        output_root: impl Into<PathBuf>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            curve,
            output_root: output_root.into(),
            prefix: prefix.into(),
        }
    }

    fn output_path(&self, job: &CubeJob) -> Result<PathBuf, PipelineError> {
        Ok(job
            .output_dir(&self.output_root)
            .join(format!("{}{}", self.prefix, job.file_name()?)))
    }
}

/// Applies every configured filter to each cube.
///
/// The cube is loaded once; each filter works on its own copy of the
/// unmodified original.
#[derive(Debug, Clone)]
pub struct FilterTask {
    filters: Vec<FilterSpec>,
    extrapolation: Extrapolation,
}

impl FilterTask {
    /// Create a task from filter specs.
    pub fn new(filters: Vec<FilterSpec>, extrapolation: Extrapolation) -> Self {
        Self {
            filters,
            extrapolation,
        }
    }

    /// Configured filters.
    pub fn filters(&self) -> &[FilterSpec] {
        &self.filters
    }
}

impl CubeTask for FilterTask {
    fn name(&self) -> &str {
        "filter"
    }

    fn output_roots(&self) -> Vec<&Path> {
        self.filters.iter().map(|f| f.output_root.as_path()).collect()
    }

    fn outputs_for(&self, store: &CubeStore, job: &CubeJob) -> Result<Vec<PathBuf>, PipelineError> {
        let mut outputs = Vec::new();
        for filter in &self.filters {
            outputs.extend(store.output_paths(&filter.output_path(job)?)?);
        }
        Ok(outputs)
    }

    fn process(&self, store: &CubeStore, job: &CubeJob) -> Result<TaskOutcome, PipelineError> {
        let cube = store.load(&job.input)?;
        let mut outcome = TaskOutcome::default();

        for filter in &self.filters {
            let transmission = cube.resample(&filter.curve, self.extrapolation)?;
            outcome.warnings.extend(transmission.warning());

            let (filtered, report) = cube.filtered(&transmission)?;
            outcome.warnings.extend(report.warnings());

            let output = filter.output_path(job)?;
            outcome.files_written.extend(store.save(&output, &filtered)?);
            log::info!("Applied filter '{}' to {:?} -> {:?}", filter.name, job.input, output);
        }
        Ok(outcome)
    }
}
