//! Tests for batch orchestration.

use std::path::Path;

use approx::assert_relative_eq;
use hsitools_spectral::{Extrapolation, Gamma, SpectralCurve};
use tempfile::TempDir;

use super::*;
use crate::data::test_gen::gradient_cube;
use crate::pipeline::{FilterSpec, FilterTask, RgbOptions, RgbTask};

fn ramp() -> SpectralCurve {
    SpectralCurve::single(vec![400.0, 700.0], vec![0.5, 1.0]).unwrap()
}

fn filter_task(out: &Path) -> FilterTask {
    FilterTask::new(
        vec![FilterSpec::new("AMP PRO", ramp(), out, "AMP_")],
        Extrapolation::Linear,
    )
}

/// Write a valid cube at `path` (relative to `root`).
fn write_cube(root: &Path, path: &str) {
    let full = root.join(path);
    std::fs::create_dir_all(full.parent().unwrap()).unwrap();
    CubeStore::default()
        .save(&full, &gradient_cube(2, 2, &[500.0, 550.0, 600.0]))
        .unwrap();
}

#[test]
fn test_one_bad_file_does_not_abort_batch() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input");
    write_cube(&input, "good.hdr");

    // Valid header and payload, but no wavelength field.
    std::fs::write(
        input.join("nowave.hdr"),
        "ENVI\nsamples = 2\nlines = 2\nbands = 3\ndata type = 1\ninterleave = bsq\n",
    )
    .unwrap();
    std::fs::write(input.join("nowave.img"), [1u8; 12]).unwrap();

    let out = dir.path().join("DBAMP");
    let report = Batch::new(CubeStore::default(), &input)
        .run(&filter_task(&out))
        .unwrap();

    assert_eq!(report.discovered, 2);
    assert_eq!(report.processed, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.skipped, 0);
    assert!(report.has_failures());
    assert_eq!(report.failures[0].path, input.join("nowave.hdr"));
    assert!(report.failures[0].message.contains("wavelength"));

    assert!(out.join("AMP_good.hdr").is_file());
    assert!(out.join("AMP_good.img").is_file());
    assert!(!out.join("AMP_nowave.hdr").exists());
    assert!(!out.join("AMP_nowave.img").exists());
}

#[test]
fn test_overflowing_header_fails_only_its_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input");
    write_cube(&input, "good.hdr");
    std::fs::write(
        input.join("huge.hdr"),
        "ENVI\nsamples = 4611686018427387904\nlines = 4\nbands = 1\ndata type = 4\n\
         wavelength = {550}\n",
    )
    .unwrap();
    std::fs::write(input.join("huge.img"), b"").unwrap();

    let out = dir.path().join("DBAMP");
    let report = Batch::new(CubeStore::default(), &input)
        .run(&filter_task(&out))
        .unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].path, input.join("huge.hdr"));
    assert!(out.join("AMP_good.hdr").is_file());
}

#[test]
fn test_filter_batch_mirrors_directories() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input");
    write_cube(&input, "day1/plot_a/scene.hdr");
    write_cube(&input, "day2/scene.hdr");

    let out = dir.path().join("DBAMP");
    let report = Batch::new(CubeStore::default(), &input)
        .threads(Some(2))
        .run(&filter_task(&out))
        .unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.failed, 0);

    let store = CubeStore::default();
    let filtered = store.load(&out.join("day1/plot_a/AMP_scene.hdr")).unwrap();
    let original = store.load(&input.join("day1/plot_a/scene.hdr")).unwrap();
    let transmission = [0.5 + 0.5 / 3.0, 0.75, 0.5 + 0.5 * 2.0 / 3.0];
    assert_eq!(filtered.data().dim(), (2, 2, 3));
    for ((r, c, b), v) in original.data().indexed_iter() {
        assert_relative_eq!(
            filtered.data()[[r, c, b]],
            v * transmission[b] as f32,
            epsilon = 1e-5
        );
    }
    assert!(out.join("day2/AMP_scene.hdr").is_file());
}

#[test]
fn test_skip_existing_outputs() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input");
    write_cube(&input, "a.hdr");
    write_cube(&input, "b.hdr");
    let out = dir.path().join("out");
    let task = filter_task(&out);

    let batch = Batch::new(CubeStore::default(), &input).skip_existing(true);
    assert_eq!(batch.run(&task).unwrap().processed, 2);

    std::fs::remove_file(out.join("AMP_b.img")).unwrap();
    let report = batch.run(&task).unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.processed, 1);
    assert!(out.join("AMP_b.img").is_file());
}

#[test]
fn test_uncreatable_output_root_aborts() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input");
    write_cube(&input, "a.hdr");
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let err = Batch::new(CubeStore::default(), &input)
        .run(&filter_task(&blocker.join("out")))
        .unwrap_err();
    assert!(matches!(err, BatchError::OutputRoot { .. }));
}

#[test]
fn test_missing_input_root() {
    let dir = TempDir::new().unwrap();
    let err = Batch::new(CubeStore::default(), dir.path().join("nope"))
        .run(&filter_task(&dir.path().join("out")))
        .unwrap_err();
    assert!(matches!(err, BatchError::InputRoot(_)));
}

#[test]
fn test_rgb_batch_over_scenes() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input");
    write_cube(&input, "Scene1/Original images/shot.hdr");
    write_cube(&input, "Scene2/Original images/shot.hdr");
    write_cube(&input, "Scene3/Original images/shot.hdr");

    let cmf = SpectralCurve::from_columns(
        vec![400.0, 700.0],
        &[vec![1.0, 0.0], vec![0.5, 0.5], vec![0.0, 1.0]],
    )
    .unwrap();
    let out = dir.path().join("rgb_cie");
    let task = RgbTask::new(cmf, None, RgbOptions::new(Gamma::Exponent(0.4), &out));

    let report = Batch::new(CubeStore::default(), &input)
        .layout(InputLayout::scenes(["Scene1", "Scene3"]))
        .run(&task)
        .unwrap();
    assert_eq!(report.discovered, 2);
    assert_eq!(report.processed, 2);
    assert!(out.join("Scene1/shot_rgb.png").is_file());
    assert!(!out.join("Scene2").exists());
    assert!(out.join("Scene3/shot_rgb.png").is_file());
}

#[test]
fn test_report_display_and_merge() {
    let mut report = BatchReport::new(3);
    report.processed = 2;
    report.add_failure(Path::new("x.hdr"), &std::io::Error::other("disk full"));
    assert_eq!(report.to_string(), "3 discovered, 2 processed, 0 skipped, 1 failed");

    let mut total = BatchReport::default();
    total.merge(report.clone());
    total.merge(report);
    assert_eq!(total.failed, 2);
    assert_eq!(total.failures.len(), 2);
}
