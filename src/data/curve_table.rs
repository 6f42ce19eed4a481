//! Tabulated spectral curves loaded from CSV or spreadsheet workbooks.
//!
//! The first column holds wavelengths in nanometers, every other column one
//! response channel (a filter transmission, an illuminant, or the X/Y/Z
//! colour-matching functions). A header row is optional: when the first cell
//! parses as a number the file is treated as headerless and the channels are
//! named `column1`, `column2`, ...
//!
//! Empty cells are read as NaN so that a gap in a transmission column turns
//! into a pass-through band instead of a load failure.

use std::io::Read;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, open_workbook_auto};
use hsitools_spectral::{SpectralCurve, SpectralError};
use thiserror::Error;

/// Errors that can occur while reading a curve table.
#[derive(Error, Debug)]
pub enum CurveTableError {
    /// I/O error opening the file
    #[error("IO error reading {path:?}: {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// CSV syntax error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Spreadsheet workbook could not be read
    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    /// A data row with a different number of cells than the first one
    #[error("Row on line {line} has {found} cells, expected {expected}")]
    RowLength {
        /// 1-based line (or sheet row) number
        line: u64,
        /// Cells in the first data row
        expected: usize,
        /// Cells in this row
        found: usize,
    },

    /// A cell that is neither a number nor empty
    #[error("Invalid number '{value}' on line {line}, column {column}")]
    InvalidNumber {
        /// The offending cell text
        value: String,
        /// 1-based line number
        line: u64,
        /// 1-based column number
        column: usize,
    },

    /// The table has no data rows or no value columns
    #[error("Curve table has no data: {0}")]
    Empty(String),

    /// A requested channel is not in the table
    #[error("Unknown column '{name}' (available: {})", available.join(", "))]
    UnknownColumn {
        /// Requested name
        name: String,
        /// Names present in the table
        available: Vec<String>,
    },

    /// The rows do not form a valid spectral curve
    #[error(transparent)]
    Spectral(#[from] SpectralError),
}

/// A wavelength column plus one or more named value columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveTable {
    source: Option<PathBuf>,
    wavelengths: Vec<f64>,
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl CurveTable {
    /// Load a table from disk.
    ///
    /// `.xlsx`, `.xlsm`, `.xls` and `.ods` workbooks are read from their
    /// first sheet, `.tsv` as tab-separated text, anything else as CSV.
    pub fn from_path(path: &Path) -> Result<Self, CurveTableError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let mut table = match extension.as_deref() {
            Some("xlsx" | "xlsm" | "xls" | "ods") => Self::from_workbook(path)?,
            ext => {
                let file = std::fs::File::open(path).map_err(|source| CurveTableError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                let delimiter = if ext == Some("tsv") { b'\t' } else { b',' };
                Self::from_reader(file, delimiter)?
            }
        };
        log::debug!(
            "Loaded curve table {:?}: {} rows, channels {:?}",
            path,
            table.wavelengths.len(),
            table.names
        );
        table.source = Some(path.to_path_buf());
        Ok(table)
    }

    /// Parse a table from any reader with the given delimiter.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self, CurveTableError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(delimiter)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut rows = RowCollector::default();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map_or(0, |p| p.line());
            let cells: Vec<&str> = record.iter().collect();
            rows.push(&cells, line)?;
        }
        rows.finish()
    }

    /// Read the first worksheet of a spreadsheet workbook.
    ///
    /// Cells are laid out as in a CSV table; empty cells read as NaN and
    /// fully empty rows are skipped.
    pub fn from_workbook(path: &Path) -> Result<Self, CurveTableError> {
        let mut workbook = open_workbook_auto(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| CurveTableError::Empty(format!("{:?} has no worksheets", path)))??;
        let first_row = range.start().map_or(0, |(row, _)| u64::from(row));

        let mut rows = RowCollector::default();
        for (index, row) in range.rows().enumerate() {
            let cells: Vec<String> = row.iter().map(cell_text).collect();
            if cells.iter().all(|c| c.is_empty()) {
                continue;
            }
            let cells: Vec<&str> = cells.iter().map(String::as_str).collect();
            rows.push(&cells, first_row + index as u64 + 1)?;
        }
        rows.finish()
    }

    /// File the table was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Wavelength column.
    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    /// Names of the value columns in file order.
    pub fn channel_names(&self) -> &[String] {
        &self.names
    }

    fn column_index(&self, name: &str) -> Result<usize, CurveTableError> {
        let wanted = name.trim();
        self.names
            .iter()
            .position(|n| n == wanted)
            .or_else(|| {
                self.names
                    .iter()
                    .position(|n| n.eq_ignore_ascii_case(wanted))
            })
            .ok_or_else(|| CurveTableError::UnknownColumn {
                name: name.to_string(),
                available: self.names.clone(),
            })
    }

    /// Curve made of the named columns, in the order given.
    pub fn curve(&self, names: &[&str]) -> Result<SpectralCurve, CurveTableError> {
        let indices = names
            .iter()
            .map(|name| self.column_index(name))
            .collect::<Result<Vec<_>, _>>()?;
        self.curve_by_index(&indices)
    }

    /// Curve made of the columns at the given 0-based value-column indices.
    pub fn curve_by_index(&self, indices: &[usize]) -> Result<SpectralCurve, CurveTableError> {
        let mut columns = Vec::with_capacity(indices.len());
        let mut names = Vec::with_capacity(indices.len());
        for &index in indices {
            let column = self.columns.get(index).ok_or_else(|| CurveTableError::UnknownColumn {
                name: format!("#{}", index),
                available: self.names.clone(),
            })?;
            columns.push(column.clone());
            names.push(self.names[index].clone());
        }
        Ok(SpectralCurve::from_columns(self.wavelengths.clone(), &columns)?.with_names(names))
    }

    /// Curve made of every value column.
    pub fn all_channels(&self) -> Result<SpectralCurve, CurveTableError> {
        let indices: Vec<usize> = (0..self.columns.len()).collect();
        self.curve_by_index(&indices)
    }

    /// Colour-matching functions: the first three value columns as X, Y, Z.
    pub fn cmf(&self) -> Result<SpectralCurve, CurveTableError> {
        if self.columns.len() < 3 {
            return Err(SpectralError::mismatch("CMF channels", 3, self.columns.len()).into());
        }
        self.curve_by_index(&[0, 1, 2])
    }
}

/// Rows accumulated from either a text or a workbook source.
#[derive(Debug, Default)]
struct RowCollector {
    names: Option<Vec<String>>,
    wavelengths: Vec<f64>,
    columns: Vec<Vec<f64>>,
}

impl RowCollector {
    fn push(&mut self, cells: &[&str], line: u64) -> Result<(), CurveTableError> {
        let first = cells.first().copied().unwrap_or_default();
        if self.names.is_none() && self.wavelengths.is_empty() && first.parse::<f64>().is_err() {
            self.names = Some(cells.iter().skip(1).map(|c| c.to_string()).collect());
            return Ok(());
        }

        let width = cells.len().saturating_sub(1);
        if self.wavelengths.is_empty() {
            self.columns = vec![Vec::new(); width];
        } else if width != self.columns.len() {
            return Err(CurveTableError::RowLength {
                line,
                expected: self.columns.len() + 1,
                found: cells.len(),
            });
        }

        self.wavelengths.push(parse_cell(first, line, 1)?);
        for (index, cell) in cells.iter().skip(1).enumerate() {
            self.columns[index].push(parse_cell(cell, line, index + 2)?);
        }
        Ok(())
    }

    fn finish(self) -> Result<CurveTable, CurveTableError> {
        if self.wavelengths.is_empty() || self.columns.is_empty() {
            return Err(CurveTableError::Empty(
                "expected a wavelength column and at least one value column".to_string(),
            ));
        }

        let names = match self.names {
            Some(names) if names.len() == self.columns.len() => names,
            Some(names) => {
                log::warn!(
                    "Curve table header has {} names for {} columns, using generated names",
                    names.len(),
                    self.columns.len()
                );
                generated_names(self.columns.len())
            }
            None => generated_names(self.columns.len()),
        };

        Ok(CurveTable {
            source: None,
            wavelengths: self.wavelengths,
            names,
            columns: self.columns,
        })
    }
}

/// Text of a worksheet cell, as it would appear in a CSV export.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(v) => v.to_string(),
        Data::Int(v) => v.to_string(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn generated_names(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("column{}", i)).collect()
}

fn parse_cell(cell: &str, line: u64, column: usize) -> Result<f64, CurveTableError> {
    if cell.is_empty() {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>()
        .map_err(|_| CurveTableError::InvalidNumber {
            value: cell.to_string(),
            line,
            column,
        })
}
