//! Pipeline job configuration.
//!
//! A job file describes one batch run: where the cubes are, how the input
//! tree is laid out, and which transforms to apply. It is JSON, versioned,
//! and can be loaded from an explicit path or from the user config
//! directory.
//!
//! ```json
//! {
//!   "version": 1,
//!   "input": { "root": "data/Original", "layout": { "kind": "recursive" } },
//!   "filter": {
//!     "table": "filters.csv",
//!     "filters": [{ "column": "AMP PRO", "output_root": "data/DBAMP", "prefix": "AMP_" }]
//!   },
//!   "rgb": { "cmf": "cie1931.csv", "gamma": { "encode": 2.2 } }
//! }
//! ```

use std::path::{Path, PathBuf};

use hsitools_spectral::{Extrapolation, Gamma};
use serde::{Deserialize, Serialize};

use crate::batch::{Batch, InputLayout};
use crate::constants::{
    DEFAULT_CONFIG_FILENAME, DEFAULT_RGB_EXTENSION, DEFAULT_RGB_SUFFIX, RGB_ROOT_PREFIX,
};
use crate::data::{CurveTable, CurveTableError};
use crate::format::formats::Hdf5Options;
use crate::format::{CubeStore, StoreOptions};
use crate::pipeline::{CubeTask, FilterSpec, FilterTask, RgbOptions, RgbTask};

/// Log level setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Get the display name for this log level.
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// Current job file format version.
/// Increment this when making breaking changes to the format.
pub const CONFIG_VERSION: u32 = 1;

/// One batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Version of the job file format
    pub version: u32,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Worker threads (`None` = one per core)
    #[serde(default)]
    pub threads: Option<usize>,

    /// Skip files whose outputs already exist
    #[serde(default)]
    pub skip_existing: bool,

    /// Input tree
    pub input: InputConfig,

    /// Dataset settings for HDF5 cubes
    #[serde(default)]
    pub hdf5: Hdf5Options,

    /// Fail on ENVI headers without a wavelength field
    #[serde(default = "default_require_wavelengths")]
    pub require_wavelengths: bool,

    /// Radiometric filtering job
    #[serde(default)]
    pub filter: Option<FilterConfig>,

    /// sRGB rendering job
    #[serde(default)]
    pub rgb: Option<RgbConfig>,
}

fn default_require_wavelengths() -> bool {
    true
}

/// Input tree section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Root folder of the cube files
    pub root: PathBuf,

    /// Folder layout below the root
    #[serde(default)]
    pub layout: InputLayout,
}

/// Filtering job section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// CSV or Excel table with a wavelength column and one column per filter
    pub table: PathBuf,

    /// Out-of-range policy when resampling transmissions
    #[serde(default)]
    pub extrapolation: Extrapolation,

    /// Filters to apply, each written to its own output root
    pub filters: Vec<FilterEntry>,
}

/// One filter of a filtering job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterEntry {
    /// Column name in the table
    pub column: String,

    /// Output root (default: sibling of the input root named after the column)
    #[serde(default)]
    pub output_root: Option<PathBuf>,

    /// Output file name prefix (default: `<column>_`)
    #[serde(default)]
    pub prefix: Option<String>,
}

/// Rendering job section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RgbConfig {
    /// CSV or Excel table of colour-matching functions (wavelength, X, Y, Z)
    pub cmf: PathBuf,

    /// CSV or Excel table of an illuminant (wavelength, value); cubes are then
    /// treated as reflectance
    #[serde(default)]
    pub illuminant: Option<PathBuf>,

    /// Gamma applied to linear sRGB; required
    pub gamma: Gamma,

    /// Out-of-range policy when resampling the CMF and illuminant
    #[serde(default)]
    pub extrapolation: Extrapolation,

    /// Divide each cube by its maximum before rendering
    #[serde(default)]
    pub normalize_input: bool,

    /// Output root (default: sibling of the input root named `rgb_<cmf name>`)
    #[serde(default)]
    pub output_root: Option<PathBuf>,

    /// Appended to the cube file stem
    #[serde(default = "default_rgb_suffix")]
    pub suffix: String,

    /// Image file extension
    #[serde(default = "default_rgb_extension")]
    pub extension: String,
}

fn default_rgb_suffix() -> String {
    DEFAULT_RGB_SUFFIX.to_string()
}

fn default_rgb_extension() -> String {
    DEFAULT_RGB_EXTENSION.to_string()
}

impl RgbConfig {
    /// Rendering section with default naming.
    pub fn new(cmf: impl Into<PathBuf>, gamma: Gamma) -> Self {
        Self {
            cmf: cmf.into(),
            illuminant: None,
            gamma,
            extrapolation: Extrapolation::default(),
            normalize_input: false,
            output_root: None,
            suffix: default_rgb_suffix(),
            extension: default_rgb_extension(),
        }
    }
}

/// Replace characters that are awkward in file names with `_`.
fn file_safe(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// `<parent of root>/<name>`, so outputs sit next to the input tree.
pub fn sibling_root(input_root: &Path, name: &str) -> PathBuf {
    let parent = match input_root.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    parent.join(name)
}

fn resolve(base: &Path, path: &mut PathBuf) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

impl PipelineConfig {
    /// A job over `input_root` with no transforms configured.
    pub fn new(input_root: impl Into<PathBuf>) -> Self {
        Self {
            version: CONFIG_VERSION,
            log_level: LogLevel::default(),
            threads: None,
            skip_existing: false,
            input: InputConfig {
                root: input_root.into(),
                layout: InputLayout::default(),
            },
            hdf5: Hdf5Options::default(),
            require_wavelengths: default_require_wavelengths(),
            filter: None,
            rgb: None,
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Load a job file. Relative paths inside it are resolved against the
    /// file's directory.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_json(&std::fs::read_to_string(path)?)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        log::info!("Loaded job configuration from {:?}", path);
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        resolve(base, &mut self.input.root);
        if let Some(filter) = &mut self.filter {
            resolve(base, &mut filter.table);
            for entry in &mut filter.filters {
                if let Some(root) = &mut entry.output_root {
                    resolve(base, root);
                }
            }
        }
        if let Some(rgb) = &mut self.rgb {
            resolve(base, &mut rgb.cmf);
            if let Some(illuminant) = &mut rgb.illuminant {
                resolve(base, illuminant);
            }
            if let Some(root) = &mut rgb.output_root {
                resolve(base, root);
            }
        }
    }

    /// Default job file path in the user config directory.
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("hsitools").join(DEFAULT_CONFIG_FILENAME))
        } else {
            dirs::home_dir().map(|home| {
                home.join(".config")
                    .join("hsitools")
                    .join(DEFAULT_CONFIG_FILENAME)
            })
        }
    }

    /// Cube store options for this job.
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions::new()
            .require_wavelengths(self.require_wavelengths)
            .hdf5(self.hdf5.clone())
    }

    /// A batch runner for this job.
    pub fn batch(&self) -> Batch {
        Batch::new(CubeStore::new(self.store_options()), &self.input.root)
            .layout(self.input.layout.clone())
            .skip_existing(self.skip_existing)
            .threads(self.threads)
    }

    /// Build the filtering task, loading its curve table.
    pub fn filter_task(&self) -> Result<Option<FilterTask>, ConfigError> {
        let Some(filter) = &self.filter else {
            return Ok(None);
        };
        if filter.filters.is_empty() {
            return Err(ConfigError::Invalid("filter section lists no filters".to_string()));
        }

        let table = CurveTable::from_path(&filter.table)?;
        let specs = filter
            .filters
            .iter()
            .map(|entry| -> Result<FilterSpec, ConfigError> {
                let safe = file_safe(&entry.column);
                Ok(FilterSpec::new(
                    entry.column.clone(),
                    table.curve(&[entry.column.as_str()])?,
                    entry
                        .output_root
                        .clone()
                        .unwrap_or_else(|| sibling_root(&self.input.root, &safe)),
                    entry.prefix.clone().unwrap_or_else(|| format!("{}_", safe)),
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(FilterTask::new(specs, filter.extrapolation)))
    }

    /// Build the rendering task, loading its curve tables.
    pub fn rgb_task(&self) -> Result<Option<RgbTask>, ConfigError> {
        let Some(rgb) = &self.rgb else {
            return Ok(None);
        };

        let cmf = CurveTable::from_path(&rgb.cmf)?.cmf()?;
        let illuminant = rgb
            .illuminant
            .as_deref()
            .map(|path| CurveTable::from_path(path)?.curve_by_index(&[0]))
            .transpose()?;

        let output_root = rgb.output_root.clone().unwrap_or_else(|| {
            let cmf_name = rgb
                .cmf
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            sibling_root(&self.input.root, &format!("{}{}", RGB_ROOT_PREFIX, cmf_name))
        });
        let options = RgbOptions::new(rgb.gamma, output_root)
            .extrapolation(rgb.extrapolation)
            .normalize_input(rgb.normalize_input)
            .naming(rgb.suffix.clone(), rgb.extension.clone());
        Ok(Some(RgbTask::new(cmf, illuminant, options)))
    }

    /// Every configured task, filtering first.
    pub fn tasks(&self) -> Result<Vec<Box<dyn CubeTask>>, ConfigError> {
        let mut tasks: Vec<Box<dyn CubeTask>> = Vec::new();
        if let Some(task) = self.filter_task()? {
            tasks.push(Box::new(task));
        }
        if let Some(task) = self.rgb_task()? {
            tasks.push(Box::new(task));
        }
        if tasks.is_empty() {
            return Err(ConfigError::Invalid(
                "no 'filter' or 'rgb' section configured".to_string(),
            ));
        }
        Ok(tasks)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A referenced curve table could not be used
    #[error("Curve table error: {0}")]
    CurveTable(#[from] CurveTableError),

    /// Settings that cannot form a job
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
