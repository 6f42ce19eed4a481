//! Colorimetric rendering of cubes to sRGB images.

use std::path::{Path, PathBuf};

use hsitools_spectral::{Extrapolation, Gamma, SpectralCurve};

use crate::format::CubeStore;
use crate::image_io::save_srgb;
use crate::pipeline::{CubeJob, CubeTask, PipelineError, TaskOutcome};

/// Rendering settings for [`RgbTask`].
#[derive(Debug, Clone)]
pub struct RgbOptions {
    /// Gamma applied after the XYZ to sRGB conversion
    pub gamma: Gamma,
    /// Out-of-range policy when resampling the CMF and illuminant
    pub extrapolation: Extrapolation,
    /// Divide the cube by its own maximum before integration
    pub normalize_input: bool,
    /// Root of the mirrored output tree
    pub output_root: PathBuf,
    /// Appended to the input file stem, e.g. `_rgb`
    pub suffix: String,
    /// Image file extension, which selects the encoder
    pub extension: String,
}

impl RgbOptions {
    /// Options with the default `_rgb.png` naming and linear extrapolation.
    pub fn new(gamma: Gamma, output_root: impl Into<PathBuf>) -> Self {
        Self {
            gamma,
            extrapolation: Extrapolation::Linear,
            normalize_input: false,
            output_root: output_root.into(),
            suffix: crate::constants::DEFAULT_RGB_SUFFIX.to_string(),
            extension: crate::constants::DEFAULT_RGB_EXTENSION.to_string(),
        }
    }

    /// Set the extrapolation policy.
    pub fn extrapolation(mut self, extrapolation: Extrapolation) -> Self {
        self.extrapolation = extrapolation;
        self
    }

    /// Set whether the cube is normalized by its maximum first.
    pub fn normalize_input(mut self, normalize: bool) -> Self {
        self.normalize_input = normalize;
        self
    }

    /// Set the output file suffix and extension.
    pub fn naming(mut self, suffix: impl Into<String>, extension: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self.extension = extension.into();
        self
    }
}

/// Renders each cube to a display image through CIE XYZ.
#[derive(Debug, Clone)]
pub struct RgbTask {
    cmf: SpectralCurve,
    illuminant: Option<SpectralCurve>,
    options: RgbOptions,
}

impl RgbTask {
    /// Create a task. `cmf` must have three channels (X, Y, Z); `illuminant`
    /// one.
    pub fn new(cmf: SpectralCurve, illuminant: Option<SpectralCurve>, options: RgbOptions) -> Self {
        Self {
            cmf,
            illuminant,
            options,
        }
    }

    fn output_path(&self, job: &CubeJob) -> Result<PathBuf, PipelineError> {
        Ok(job.output_dir(&self.options.output_root).join(format!(
            "{}{}.{}",
            job.file_stem()?,
            self.options.suffix,
            self.options.extension
        )))
    }
}

impl CubeTask for RgbTask {
    fn name(&self) -> &str {
        "rgb"
    }

    fn output_roots(&self) -> Vec<&Path> {
        vec![self.options.output_root.as_path()]
    }

    fn outputs_for(&self, _store: &CubeStore, job: &CubeJob) -> Result<Vec<PathBuf>, PipelineError> {
        Ok(vec![self.output_path(job)?])
    }

    fn process(&self, store: &CubeStore, job: &CubeJob) -> Result<TaskOutcome, PipelineError> {
        let mut cube = store.load(&job.input)?;
        if self.options.normalize_input {
            cube.normalize_by_max();
        }

        let mut outcome = TaskOutcome::default();
        let cmf = cube.resample(&self.cmf, self.options.extrapolation)?;
        outcome.warnings.extend(cmf.warning());
        let illuminant = self
            .illuminant
            .as_ref()
            .map(|curve| cube.resample(curve, self.options.extrapolation))
            .transpose()?;
        outcome
            .warnings
            .extend(illuminant.as_ref().and_then(|i| i.warning()));

        let image = cube.to_srgb(&cmf, illuminant.as_ref(), self.options.gamma)?;
        let output = self.output_path(job)?;
        save_srgb(&output, &image)?;
        log::info!("Rendered {:?} -> {:?}", job.input, output);

        outcome.files_written.push(output);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_gen::gradient_cube;
    use crate::image_io::load_rgb;
    use tempfile::TempDir;

    fn flat_cmf() -> SpectralCurve {
        SpectralCurve::from_columns(
            vec![400.0, 700.0],
            &[vec![1.0, 1.0], vec![1.0, 1.0], vec![1.0, 1.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_render_writes_png() {
        let dir = TempDir::new().unwrap();
        let store = CubeStore::default();
        let input = dir.path().join("scene.hdr");
        store
            .save(&input, &gradient_cube(2, 3, &[500.0, 550.0, 600.0]))
            .unwrap();

        let root = dir.path().join("rgb_cmf");
        std::fs::create_dir(&root).unwrap();
        let task = RgbTask::new(
            flat_cmf(),
            None,
            RgbOptions::new(Gamma::Encode(2.2), &root).normalize_input(true),
        );
        let job = CubeJob::new(&input, "");
        assert_eq!(task.outputs_for(&store, &job).unwrap(), vec![root.join("scene_rgb.png")]);

        let outcome = task.process(&store, &job).unwrap();
        assert_eq!(outcome.files_written, vec![root.join("scene_rgb.png")]);

        let image = load_rgb(&root.join("scene_rgb.png")).unwrap();
        assert_eq!(image.dim(), (2, 3, 3));
        // Equal X, Y, Z: the brightest pixel has XYZ = (1, 1, 1), whose red
        // channel saturates.
        assert_eq!(image[[1, 2, 0]], 1.0);
    }

    #[test]
    fn test_cmf_channel_mismatch_fails_file() {
        let dir = TempDir::new().unwrap();
        let store = CubeStore::default();
        let input = dir.path().join("scene.hdr");
        store.save(&input, &gradient_cube(1, 1, &[500.0, 600.0])).unwrap();

        let one_channel = SpectralCurve::single(vec![400.0, 700.0], vec![1.0, 1.0]).unwrap();
        let task = RgbTask::new(one_channel, None, RgbOptions::new(Gamma::Linear, dir.path()));
        assert!(matches!(
            task.process(&store, &CubeJob::new(&input, "")),
            Err(PipelineError::Spectral(_))
        ));
    }
}
