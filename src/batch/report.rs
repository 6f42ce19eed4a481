//! Summary of a batch run.

use std::fmt;
use std::path::{Path, PathBuf};

/// A file that failed, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    /// Input file
    pub path: PathBuf,
    /// Error message
    pub message: String,
}

/// Counts of what happened to each discovered file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Cube files found under the input root
    pub discovered: usize,
    /// Files transformed and saved
    pub processed: usize,
    /// Files left alone because their outputs already existed
    pub skipped: usize,
    /// Files that failed
    pub failed: usize,
    /// Numeric warnings raised by processed files
    pub warnings: usize,
    /// Details of every failure, in discovery order
    pub failures: Vec<FileFailure>,
}

impl BatchReport {
    /// Create an empty report for `discovered` files.
    pub fn new(discovered: usize) -> Self {
        Self {
            discovered,
            ..Self::default()
        }
    }

    /// Record a failed file.
    pub fn add_failure(&mut self, path: &Path, error: &dyn std::error::Error) {
        self.failed += 1;
        self.failures.push(FileFailure {
            path: path.to_path_buf(),
            message: error.to_string(),
        });
    }

    /// Whether any file failed.
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: BatchReport) {
        self.discovered += other.discovered;
        self.processed += other.processed;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.warnings += other.warnings;
        self.failures.extend(other.failures);
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} discovered, {} processed, {} skipped, {} failed",
            self.discovered, self.processed, self.skipped, self.failed
        )?;
        if self.warnings > 0 {
            write!(f, " ({} numeric warnings)", self.warnings)?;
        }
        Ok(())
    }
}
