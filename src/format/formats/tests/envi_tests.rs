//! Tests for the ENVI format.

use std::path::{Path, PathBuf};

use ndarray::Array3;
use tempfile::TempDir;

use crate::data::{Cube, HeaderMetadata, WAVELENGTH_KEY};
use crate::format::error::FormatError;
use crate::format::formats::{EnviFormat, parse_header};
use crate::format::traits::CubeFormat;

/// Write a header and raw file pair, returning the header path.
fn write_pair(dir: &Path, name: &str, header: &str, raw: &[u8], raw_ext: &str) -> PathBuf {
    let header_path = dir.join(format!("{}.hdr", name));
    std::fs::write(&header_path, header).unwrap();
    let raw_path = if raw_ext.is_empty() {
        dir.join(name)
    } else {
        dir.join(format!("{}.{}", name, raw_ext))
    };
    std::fs::write(raw_path, raw).unwrap();
    header_path
}

/// Value at (line, sample, band) used to fill test payloads.
fn expected(line: usize, sample: usize, band: usize) -> f32 {
    (line * 100 + sample * 10 + band) as f32
}

#[test]
fn test_envi_format_metadata() {
    let format = EnviFormat::default();
    assert_eq!(format.id(), "envi");
    assert_eq!(format.display_name(), "ENVI (HDR + raw)");
    assert_eq!(format.extensions(), &["hdr"]);
}

#[test]
fn test_parse_header_multiline_values() {
    let text = "ENVI\n\
description = {\n  Specim IQ capture}\n\
samples = 2\n\
Wavelength = { 500.00,\n 550.0 , 600 }\n\
; comment line\n";
    let meta = parse_header(text).unwrap();
    assert_eq!(meta.get("description"), Some("{\n  Specim IQ capture}"));
    assert_eq!(meta.get("samples"), Some("2"));
    assert_eq!(meta.get(WAVELENGTH_KEY), Some("{ 500.00,\n 550.0 , 600 }"));
    assert_eq!(meta.len(), 3);
}

#[test]
fn test_parse_header_requires_magic() {
    assert!(matches!(
        parse_header("samples = 2\n"),
        Err(FormatError::InvalidHeader { .. })
    ));
    assert!(matches!(
        parse_header("ENVI\nwavelength = {500,\n600\n"),
        Err(FormatError::InvalidHeader { .. })
    ));
}

#[test]
fn test_load_bsq_u16_big_endian_with_offset() {
    let dir = TempDir::new().unwrap();
    let (lines, samples, bands) = (2, 3, 2);

    let mut raw = vec![0xAB; 16];
    for b in 0..bands {
        for l in 0..lines {
            for s in 0..samples {
                raw.extend_from_slice(&(expected(l, s, b) as u16).to_be_bytes());
            }
        }
    }
    let header = "ENVI\nsamples = 3\nlines = 2\nbands = 2\nheader offset = 16\n\
data type = 12\ninterleave = bsq\nbyte order = 1\nwavelength = {500, 600}\n";
    let path = write_pair(dir.path(), "scene", header, &raw, "img");

    let cube = EnviFormat::default().load(&path).unwrap();
    assert_eq!(cube.data().dim(), (2, 3, 2));
    assert_eq!(cube.wavelengths(), &[500.0, 600.0]);
    for ((l, s, b), v) in cube.data().indexed_iter() {
        assert_eq!(*v, expected(l, s, b), "value at ({}, {}, {})", l, s, b);
    }
}

#[test]
fn test_load_bil_i16_without_raw_extension() {
    let dir = TempDir::new().unwrap();
    let (lines, samples, bands) = (2, 2, 3);

    let mut raw = Vec::new();
    for l in 0..lines {
        for b in 0..bands {
            for s in 0..samples {
                raw.extend_from_slice(&(-(expected(l, s, b) as i16)).to_le_bytes());
            }
        }
    }
    let header = "ENVI\nsamples = 2\nlines = 2\nbands = 3\ndata type = 2\n\
interleave = bil\nwavelength = {450, 500, 550}\n";
    let path = write_pair(dir.path(), "scene", header, &raw, "");

    let cube = EnviFormat::default().load(&path).unwrap();
    for ((l, s, b), v) in cube.data().indexed_iter() {
        assert_eq!(*v, -expected(l, s, b));
    }
}

#[test]
fn test_load_bip_f64_dat() {
    let dir = TempDir::new().unwrap();
    let mut raw = Vec::new();
    for l in 0..2 {
        for s in 0..2 {
            for b in 0..2 {
                raw.extend_from_slice(&(f64::from(expected(l, s, b)) + 0.5).to_le_bytes());
            }
        }
    }
    let header = "ENVI\nsamples = 2\nlines = 2\nbands = 2\ndata type = 5\n\
interleave = bip\nwavelength = {500, 510}\n";
    let path = write_pair(dir.path(), "leaf", header, &raw, "dat");

    let cube = EnviFormat::default().load(&path).unwrap();
    assert_eq!(cube.data()[[1, 0, 1]], expected(1, 0, 1) + 0.5);
}

#[test]
fn test_save_roundtrip_preserves_wavelength_text() {
    let dir = TempDir::new().unwrap();
    let header = "ENVI\ndescription = {demo}\nsamples = 2\nlines = 1\nbands = 3\n\
data type = 1\ninterleave = bsq\nsensor type = Specim IQ\n\
wavelength = { 500.00,\n  550.0 , 600 }\nwavelength units = Nanometers\n";
    let raw: Vec<u8> = vec![1, 2, 3, 4, 5, 6];
    let path = write_pair(dir.path(), "scene", header, &raw, "img");

    let format = EnviFormat::default();
    let cube = format.load(&path).unwrap();

    let out_dir = dir.path().join("out");
    std::fs::create_dir(&out_dir).unwrap();
    let written = format.save(&out_dir.join("AMP_scene.hdr"), &cube).unwrap();
    assert_eq!(
        written,
        vec![out_dir.join("AMP_scene.hdr"), out_dir.join("AMP_scene.img")]
    );

    let text = std::fs::read_to_string(&written[0]).unwrap();
    assert!(text.starts_with("ENVI\n"));
    assert!(
        text.contains("wavelength = { 500.00,\n  550.0 , 600 }\n"),
        "wavelength text must be carried verbatim:\n{}",
        text
    );
    assert!(text.contains("data type = 4\n"), "saved as f32");
    assert!(text.contains("interleave = bip\n"));
    assert!(text.contains("sensor type = Specim IQ\n"));
    assert!(text.contains("wavelength units = Nanometers\n"));

    // Raw payload is f32, 4 bytes per sample.
    assert_eq!(std::fs::metadata(&written[1]).unwrap().len(), 6 * 4);

    let reloaded = format.load(&written[0]).unwrap();
    assert_eq!(reloaded.data(), cube.data());
    assert_eq!(reloaded.wavelengths(), cube.wavelengths());
    assert_eq!(reloaded.metadata().get("description"), Some("{demo}"));
}

#[test]
fn test_save_generates_missing_wavelength_field() {
    let dir = TempDir::new().unwrap();
    let cube = Cube::new(Array3::zeros((1, 1, 2)), vec![410.0, 1000.0], HeaderMetadata::new())
        .unwrap();
    let format = EnviFormat::default();
    let written = format.save(&dir.path().join("converted.hdr"), &cube).unwrap();

    let text = std::fs::read_to_string(&written[0]).unwrap();
    assert!(text.contains("wavelength = {410, 1000}\n"));
    assert_eq!(format.load(&written[0]).unwrap().wavelengths(), &[410.0, 1000.0]);
}

#[test]
fn test_missing_wavelength_field() {
    let dir = TempDir::new().unwrap();
    let header = "ENVI\nsamples = 1\nlines = 1\nbands = 2\ndata type = 1\n";
    let path = write_pair(dir.path(), "bare", header, &[7, 8], "img");

    let err = EnviFormat::default().load(&path).unwrap_err();
    assert!(matches!(err, FormatError::MissingField { ref field } if field == "wavelength"));

    let cube = EnviFormat::new(false).load(&path).unwrap();
    assert_eq!(cube.wavelengths(), &[0.0, 1.0]);
}

#[test]
fn test_payload_size_mismatch() {
    let dir = TempDir::new().unwrap();
    let header = "ENVI\nsamples = 2\nlines = 2\nbands = 1\ndata type = 4\nwavelength = {500}\n";
    let path = write_pair(dir.path(), "short", header, &[0; 12], "img");

    assert!(matches!(
        EnviFormat::default().load(&path),
        Err(FormatError::DimensionMismatch {
            expected: 16,
            found: 12
        })
    ));
}

#[test]
fn test_overflowing_dimensions_are_rejected() {
    let dir = TempDir::new().unwrap();
    let header = "ENVI\nsamples = 4611686018427387904\nlines = 4\nbands = 1\n\
                  data type = 4\nwavelength = {500}\n";
    let path = write_pair(dir.path(), "huge", header, &[], "img");
    assert!(matches!(
        EnviFormat::default().load(&path),
        Err(FormatError::InvalidHeader { .. })
    ));

    let header = "ENVI\nsamples = 1\nlines = 1\nbands = 1\ndata type = 4\n\
                  header offset = 18446744073709551615\nwavelength = {500}\n";
    let path = write_pair(dir.path(), "offset", header, &[0; 4], "img");
    assert!(matches!(
        EnviFormat::default().load(&path),
        Err(FormatError::InvalidHeader { .. })
    ));
}

#[test]
fn test_wavelength_count_mismatch() {
    let dir = TempDir::new().unwrap();
    let header = "ENVI\nsamples = 1\nlines = 1\nbands = 2\ndata type = 1\nwavelength = {500}\n";
    let path = write_pair(dir.path(), "scene", header, &[1, 2], "img");

    assert!(matches!(
        EnviFormat::default().load(&path),
        Err(FormatError::WavelengthCount {
            bands: 2,
            wavelengths: 1
        })
    ));
}

#[test]
fn test_missing_raw_and_bad_fields() {
    let dir = TempDir::new().unwrap();
    let header_path = dir.path().join("lonely.hdr");
    std::fs::write(
        &header_path,
        "ENVI\nsamples = 1\nlines = 1\nbands = 1\ndata type = 1\nwavelength = {500}\n",
    )
    .unwrap();
    assert!(matches!(
        EnviFormat::default().load(&header_path),
        Err(FormatError::RawFileNotFound { .. })
    ));

    let complex = "ENVI\nsamples = 1\nlines = 1\nbands = 1\ndata type = 6\nwavelength = {500}\n";
    let path = write_pair(dir.path(), "complex", complex, &[0; 8], "img");
    assert!(matches!(
        EnviFormat::default().load(&path),
        Err(FormatError::UnsupportedDataType(6))
    ));

    let no_lines = "ENVI\nsamples = 1\nbands = 1\ndata type = 1\nwavelength = {500}\n";
    let path = write_pair(dir.path(), "nolines", no_lines, &[0], "img");
    assert!(matches!(
        EnviFormat::default().load(&path),
        Err(FormatError::MissingField { ref field }) if field == "lines"
    ));
}
