//! Batch orchestration over directory trees of cubes.
//!
//! A [`Batch`] discovers cube files under an input root, mirrors their
//! directories under every output root of a [`CubeTask`], and runs the task
//! on each file in a rayon worker pool. A failure on one file is logged and
//! counted; it never stops the others. Only problems that would make every
//! file fail (a missing input root, an output root that cannot be created)
//! abort the run.

mod layout;
mod report;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use thiserror::Error;

use crate::format::CubeStore;
use crate::pipeline::{CubeJob, CubeTask, PipelineError};

pub use layout::{InputLayout, discover};
pub use report::{BatchReport, FileFailure};

/// Errors that abort a whole batch.
#[derive(Error, Debug)]
pub enum BatchError {
    /// Input root is missing or not a directory
    #[error("Input root {0:?} is not a directory")]
    InputRoot(PathBuf),

    /// An output root could not be created
    #[error("Cannot create output root {path:?}: {source}")]
    OutputRoot {
        /// The output root
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Worker pool could not be started
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result of one file.
enum FileOutcome {
    Processed { warnings: usize },
    Skipped,
    Failed(PipelineError),
}

/// A configured batch run over one input root.
pub struct Batch {
    store: CubeStore,
    input_root: PathBuf,
    layout: InputLayout,
    skip_existing: bool,
    threads: Option<usize>,
}

impl Batch {
    /// Create a batch over `input_root` with recursive discovery.
    pub fn new(store: CubeStore, input_root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            input_root: input_root.into(),
            layout: InputLayout::default(),
            skip_existing: false,
            threads: None,
        }
    }

    /// Set the input layout.
    pub fn layout(mut self, layout: InputLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Skip files whose outputs all exist already.
    pub fn skip_existing(mut self, skip: bool) -> Self {
        self.skip_existing = skip;
        self
    }

    /// Number of worker threads (`None` = rayon default).
    pub fn threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads.filter(|&n| n > 0);
        self
    }

    /// The cube store used for loading and saving.
    pub fn store(&self) -> &CubeStore {
        &self.store
    }

    /// Run `task` over every discovered cube file.
    pub fn run(&self, task: &dyn CubeTask) -> Result<BatchReport, BatchError> {
        if !self.input_root.is_dir() {
            return Err(BatchError::InputRoot(self.input_root.clone()));
        }

        let output_roots = task.output_roots();
        for root in &output_roots {
            std::fs::create_dir_all(root).map_err(|source| BatchError::OutputRoot {
                path: root.to_path_buf(),
                source,
            })?;
        }

        let jobs = discover(&self.store, &self.input_root, &self.layout, &output_roots);
        log::info!(
            "Running '{}' on {} cube files from {:?}",
            task.name(),
            jobs.len(),
            self.input_root
        );

        let done = AtomicUsize::new(0);
        let total = jobs.len();
        let work = || -> Vec<FileOutcome> {
            jobs.par_iter()
                .map(|job| {
                    let outcome = self.process_one(task, &output_roots, job);
                    let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                    log::debug!("[{}/{}] {:?}", n, total, job.input);
                    outcome
                })
                .collect()
        };
        let outcomes = match self.threads {
            Some(threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()?
                .install(work),
            None => work(),
        };

        let mut report = BatchReport::new(total);
        for (job, outcome) in jobs.iter().zip(outcomes) {
            match outcome {
                FileOutcome::Processed { warnings } => {
                    report.processed += 1;
                    report.warnings += warnings;
                }
                FileOutcome::Skipped => report.skipped += 1,
                FileOutcome::Failed(error) => report.add_failure(&job.input, &error),
            }
        }

        log::info!("Processed {}/{} cube files", report.processed, report.discovered);
        if report.failed > 0 {
            log::warn!("{} cube files failed", report.failed);
        }
        Ok(report)
    }

    fn process_one(&self, task: &dyn CubeTask, output_roots: &[&Path], job: &CubeJob) -> FileOutcome {
        match self.try_process(task, output_roots, job) {
            Ok(outcome) => outcome,
            Err(error) => {
                log::error!("Failed to process {:?}: {}", job.input, error);
                FileOutcome::Failed(error)
            }
        }
    }

    fn try_process(
        &self,
        task: &dyn CubeTask,
        output_roots: &[&Path],
        job: &CubeJob,
    ) -> Result<FileOutcome, PipelineError> {
        if self.skip_existing {
            let outputs = task.outputs_for(&self.store, job)?;
            if !outputs.is_empty() && outputs.iter().all(|p| p.exists()) {
                log::info!("Skipping {:?}: outputs exist", job.input);
                return Ok(FileOutcome::Skipped);
            }
        }

        // create_dir_all treats an existing directory as success, so
        // concurrent workers may race on the same path.
        for root in output_roots {
            std::fs::create_dir_all(job.output_dir(root))?;
        }

        let outcome = task.process(&self.store, job)?;
        Ok(FileOutcome::Processed {
            warnings: outcome.warnings.len(),
        })
    }
}

#[cfg(test)]
mod tests;
