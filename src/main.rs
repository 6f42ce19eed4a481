//! hsitools command-line entry point.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use hsitools::config::{FilterConfig, FilterEntry, RgbConfig};
use hsitools::constants::DEFAULT_SCENE_SUBDIR;
use hsitools::crop::{CropSession, Point, PointerEvent};
use hsitools::image_io::load_rgb;
use hsitools::metrics::global_contrast;
use hsitools::spectral::{Extrapolation, Gamma};
use hsitools::{BatchReport, CubeStore, InputLayout, LogLevel, PipelineConfig};

#[derive(Parser, Debug)]
#[command(name = "hsitools", version, about = "Batch filtering and sRGB rendering of hyperspectral cubes")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

/// Options shared by all subcommands
#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// Log verbosity (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Worker threads (default: one per core)
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Only process these scene folders below the input root (comma separated)
    #[arg(long, global = true, value_delimiter = ',')]
    scenes: Vec<String>,

    /// Folder inside each scene that holds the cubes
    #[arg(long, global = true, default_value = DEFAULT_SCENE_SUBDIR)]
    scene_subdir: String,

    /// Skip cubes whose outputs already exist
    #[arg(long, global = true, default_value_t = false)]
    skip_existing: bool,
}

impl CommonArgs {
    /// Apply command-line overrides on top of a job configuration.
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if self.threads.is_some() {
            config.threads = self.threads;
        }
        config.skip_existing |= self.skip_existing;
        if !self.scenes.is_empty() {
            config.input.layout = InputLayout::Scenes {
                scenes: self.scenes.clone(),
                input_subdir: self.scene_subdir.clone(),
            };
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply transmission filters to every cube under a folder
    Filter {
        /// Input root folder
        #[arg(long)]
        input: PathBuf,

        /// CSV or Excel table with a wavelength column and one column per filter
        #[arg(long)]
        table: PathBuf,

        /// Filter column names to apply
        #[arg(long = "column", required = true, num_args = 1..)]
        columns: Vec<String>,

        /// Output root per column, in the same order
        #[arg(long = "output-root", num_args = 1..)]
        output_roots: Vec<PathBuf>,

        /// File name prefix per column, in the same order
        #[arg(long = "prefix", num_args = 1..)]
        prefixes: Vec<String>,

        /// Out-of-range policy (linear or clamp)
        #[arg(long, default_value = "linear")]
        extrapolation: Extrapolation,
    },

    /// Render every cube under a folder to an sRGB image
    Rgb {
        /// Input root folder
        #[arg(long)]
        input: PathBuf,

        /// CSV or Excel table of colour-matching functions (wavelength, X, Y, Z)
        #[arg(long)]
        cmf: PathBuf,

        /// CSV or Excel table of an illuminant (wavelength, value)
        #[arg(long)]
        illuminant: Option<PathBuf>,

        /// Gamma: linear, an exponent such as 0.4, encode:2.2 or decode:2.2
        #[arg(long)]
        gamma: Gamma,

        /// Output root (default: rgb_<cmf name> next to the input root)
        #[arg(long)]
        output_root: Option<PathBuf>,

        /// Divide each cube by its maximum before rendering
        #[arg(long, default_value_t = false)]
        normalize_input: bool,

        /// Out-of-range policy (linear or clamp)
        #[arg(long, default_value = "linear")]
        extrapolation: Extrapolation,
    },

    /// Run a JSON job file
    Run {
        /// Job file (default: hsitools-pipeline.json in the user config directory)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Crop a rectangle out of one cube
    Crop {
        /// ENVI header or HDF5 file
        #[arg(long)]
        cube: PathBuf,

        /// Corners as X0,Y0,X1,Y1 in pixels
        #[arg(long, value_parser = parse_rect)]
        rect: (Point, Point),

        /// Output folder (default: `crop` next to the cube)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print global contrast figures of RGB images
    Contrast {
        /// Image files
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Print one JSON object per image
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

/// Parse a rectangle string in format "x0,y0,x1,y1"
fn parse_rect(s: &str) -> Result<(Point, Point), String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid rectangle '{}': {}", s, e))?;
    match values.as_slice() {
        &[x0, y0, x1, y1] => Ok(((x0, y0), (x1, y1))),
        _ => Err("Rectangle must be in format 'x0,y0,x1,y1'".to_string()),
    }
}

fn init_logging(level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(level.to_level_filter())
        .parse_default_env()
        .init();
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = match cli.command {
        Command::Filter {
            input,
            table,
            columns,
            output_roots,
            prefixes,
            extrapolation,
        } => {
            let mut config = PipelineConfig::new(input);
            config.filter = Some(FilterConfig {
                table,
                extrapolation,
                filters: columns
                    .into_iter()
                    .enumerate()
                    .map(|(i, column)| FilterEntry {
                        column,
                        output_root: output_roots.get(i).cloned(),
                        prefix: prefixes.get(i).cloned(),
                    })
                    .collect(),
            });
            config
        }
        Command::Rgb {
            input,
            cmf,
            illuminant,
            gamma,
            output_root,
            normalize_input,
            extrapolation,
        } => {
            let mut rgb = RgbConfig::new(cmf, gamma);
            rgb.illuminant = illuminant;
            rgb.output_root = output_root;
            rgb.normalize_input = normalize_input;
            rgb.extrapolation = extrapolation;

            let mut config = PipelineConfig::new(input);
            config.rgb = Some(rgb);
            config
        }
        Command::Run { config } => {
            let path = match config.or_else(PipelineConfig::default_path) {
                Some(path) => path,
                None => bail!("No job file given and no user config directory found"),
            };
            PipelineConfig::from_path(&path)
                .with_context(|| format!("Failed to load job file {:?}", path))?
        }
        Command::Crop { cube, rect, output } => {
            init_logging(cli.common.log_level.unwrap_or_default());
            return crop(&cube, rect, output);
        }
        Command::Contrast { images, json } => {
            init_logging(cli.common.log_level.unwrap_or_default());
            return contrast(&images, json);
        }
    };

    cli.common.apply(&mut config);
    init_logging(config.log_level);
    run_job(&config)
}

fn run_job(config: &PipelineConfig) -> anyhow::Result<ExitCode> {
    let tasks = config.tasks()?;
    let batch = config.batch();

    let mut total = BatchReport::default();
    for task in &tasks {
        let report = batch
            .run(task.as_ref())
            .with_context(|| format!("Task '{}' aborted", task.name()))?;
        log::info!("{}: {}", task.name(), report);
        total.merge(report);
    }

    for failure in &total.failures {
        eprintln!("FAILED {}: {}", failure.path.display(), failure.message);
    }
    Ok(if total.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn crop(path: &Path, (a, b): (Point, Point), output: Option<PathBuf>) -> anyhow::Result<ExitCode> {
    let store = CubeStore::default();
    let cube = store
        .load(path)
        .with_context(|| format!("Failed to load cube {:?}", path))?;

    let mut session = CropSession::new()
        .handle(PointerEvent::Press(a))
        .handle(PointerEvent::Release(b));
    if session.selection().is_none() {
        bail!("Crop rectangle has no area");
    }

    let folder = output.unwrap_or_else(|| {
        path.parent()
            .unwrap_or_else(|| Path::new("."))
            .join("crop")
    });
    for written in session.save_selection(&cube, &folder, &store)? {
        println!("{}", written.display());
    }
    Ok(ExitCode::SUCCESS)
}

fn contrast(images: &[PathBuf], json: bool) -> anyhow::Result<ExitCode> {
    let mut failed = false;
    if !json {
        println!("image\tmax_min_ratio\tweber\tmichelson\trms");
    }
    for path in images {
        let image = match load_rgb(path) {
            Ok(image) => image,
            Err(e) => {
                log::error!("Failed to load {:?}: {}", path, e);
                failed = true;
                continue;
            }
        };
        let Some(c) = global_contrast(&image) else {
            log::warn!("Skipping empty image {:?}", path);
            continue;
        };
        if json {
            let line = serde_json::json!({ "image": path, "contrast": c });
            println!("{}", line);
        } else {
            println!(
                "{}\t{:.4}\t{:.4}\t{:.4}\t{:.4}",
                path.display(),
                c.max_min_ratio,
                c.weber,
                c.michelson,
                c.rms
            );
        }
    }
    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
