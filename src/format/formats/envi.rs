//! ENVI header + raw binary cube format.
//!
//! The `.hdr` file is plain text: a first line reading `ENVI`, followed by
//! `key = value` lines. Values wrapped in `{ ... }` may span several lines.
//! The raw samples live in a sibling file (`<stem>`, `<stem>.img`, ...) as a
//! flat array in `bsq`, `bil` or `bip` order.
//!
//! Cubes are always written as little-endian `f32` in `bip` order with a zero
//! header offset. All other header fields, including the wavelength list,
//! are written back exactly as they were read.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use ndarray::Array3;

use crate::data::{Cube, HeaderMetadata, WAVELENGTH_KEY};
use crate::format::atomic::write_atomic;
use crate::format::error::FormatError;
use crate::format::traits::CubeFormat;

/// Extensions tried, in order, for the raw file next to a header.
const RAW_EXTENSIONS: &[&str] = &["img", "dat", "raw", "bin"];

/// Raw layout fields that are rewritten on save.
const SAMPLES: &str = "samples";
const LINES: &str = "lines";
const BANDS: &str = "bands";
const HEADER_OFFSET: &str = "header offset";
const DATA_TYPE: &str = "data type";
const INTERLEAVE: &str = "interleave";
const BYTE_ORDER: &str = "byte order";
const FILE_TYPE: &str = "file type";

/// Data type code for 32-bit float.
const DATA_TYPE_F32: u32 = 4;

/// Order of samples in the raw file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interleave {
    /// Band sequential: `[band][line][sample]`
    Bsq,
    /// Band interleaved by line: `[line][band][sample]`
    Bil,
    /// Band interleaved by pixel: `[line][sample][band]`
    Bip,
}

impl Interleave {
    fn parse(value: &str) -> Result<Self, FormatError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bsq" => Ok(Self::Bsq),
            "bil" => Ok(Self::Bil),
            "bip" => Ok(Self::Bip),
            other => Err(FormatError::UnsupportedInterleave(other.to_string())),
        }
    }
}

/// Size in bytes of one sample for an ENVI data type code.
fn data_type_size(code: u32) -> Result<usize, FormatError> {
    match code {
        1 => Ok(1),
        2 | 12 => Ok(2),
        3 | 4 | 13 => Ok(4),
        5 | 14 | 15 => Ok(8),
        other => Err(FormatError::UnsupportedDataType(other)),
    }
}

/// Bytes of sample data declared by a header, `None` on overflow.
fn payload_size(samples: usize, lines: usize, bands: usize, sample_size: usize) -> Option<u64> {
    let bytes = samples
        .checked_mul(lines)?
        .checked_mul(bands)?
        .checked_mul(sample_size)?;
    u64::try_from(bytes).ok()
}

/// Decode raw samples of the given type to `f32`.
fn decode_samples(bytes: &[u8], code: u32, big_endian: bool) -> Result<Vec<f32>, FormatError> {
    macro_rules! decode {
        ($ty:ty, $convert:expr) => {
            bytes
                .chunks_exact(std::mem::size_of::<$ty>())
                .map(|chunk| {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(chunk);
                    let value = if big_endian {
                        <$ty>::from_be_bytes(buf)
                    } else {
                        <$ty>::from_le_bytes(buf)
                    };
                    $convert(value)
                })
                .collect()
        };
    }

    Ok(match code {
        1 => bytes.iter().map(|&b| f32::from(b)).collect(),
        2 => decode!(i16, f32::from),
        3 => decode!(i32, |v: i32| v as f32),
        4 => decode!(f32, std::convert::identity),
        5 => decode!(f64, |v: f64| v as f32),
        12 => decode!(u16, f32::from),
        13 => decode!(u32, |v: u32| v as f32),
        14 => decode!(i64, |v: i64| v as f32),
        15 => decode!(u64, |v: u64| v as f32),
        other => return Err(FormatError::UnsupportedDataType(other)),
    })
}

/// Parse header text into ordered metadata.
///
/// Keys are lower-cased. Brace values are kept verbatim, including any line
/// breaks inside them.
pub fn parse_header(text: &str) -> Result<HeaderMetadata, FormatError> {
    let mut lines = text.lines();
    let magic = lines
        .by_ref()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    if !magic.starts_with("ENVI") {
        return Err(FormatError::invalid_header(
            "header does not start with 'ENVI'",
        ));
    }

    let mut metadata = HeaderMetadata::new();
    while let Some(line) = lines.next() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            log::trace!("Ignoring header line without '=': {}", trimmed);
            continue;
        };

        let mut value = value.trim().to_string();
        if value.starts_with('{') {
            while !value.contains('}') {
                let Some(next) = lines.next() else {
                    return Err(FormatError::invalid_header(format!(
                        "unterminated '{{' in field '{}'",
                        key.trim()
                    )));
                };
                value.push('\n');
                value.push_str(next);
            }
        }
        metadata.set(key, value);
    }
    Ok(metadata)
}

fn required<T: FromStr>(metadata: &HeaderMetadata, key: &str) -> Result<T, FormatError> {
    let value = metadata
        .get(key)
        .ok_or_else(|| FormatError::missing_field(key))?;
    value
        .trim()
        .parse()
        .map_err(|_| FormatError::invalid_header(format!("invalid '{}' value: {}", key, value)))
}

fn optional<T: FromStr>(metadata: &HeaderMetadata, key: &str, default: T) -> Result<T, FormatError> {
    if metadata.contains(key) {
        required(metadata, key)
    } else {
        Ok(default)
    }
}

/// Parse the `wavelength` field into numbers.
fn parse_wavelengths(value: &str) -> Result<Vec<f64>, FormatError> {
    HeaderMetadata::list_items(value)
        .into_iter()
        .map(|item| {
            item.parse::<f64>().map_err(|_| {
                FormatError::invalid_header(format!("invalid wavelength value '{}'", item))
            })
        })
        .collect()
}

/// ENVI header + raw binary format.
#[derive(Debug, Clone)]
pub struct EnviFormat {
    require_wavelengths: bool,
}

impl Default for EnviFormat {
    fn default() -> Self {
        Self {
            require_wavelengths: true,
        }
    }
}

impl EnviFormat {
    /// Create the format; `require_wavelengths` makes a missing wavelength
    /// field an error instead of falling back to band indices.
    pub fn new(require_wavelengths: bool) -> Self {
        Self {
            require_wavelengths,
        }
    }

    /// Locate the raw data file belonging to a header.
    pub fn raw_path(header: &Path) -> Result<PathBuf, FormatError> {
        std::iter::once(header.with_extension(""))
            .chain(RAW_EXTENSIONS.iter().map(|ext| header.with_extension(ext)))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| FormatError::RawFileNotFound {
                header: header.to_path_buf(),
            })
    }

    fn wavelengths(&self, metadata: &HeaderMetadata, bands: usize) -> Result<Vec<f64>, FormatError> {
        match metadata.get(WAVELENGTH_KEY) {
            Some(value) => parse_wavelengths(value),
            None if self.require_wavelengths => Err(FormatError::missing_field(WAVELENGTH_KEY)),
            None => {
                log::warn!("Header has no wavelength field, using band indices");
                Ok((0..bands).map(|b| b as f64).collect())
            }
        }
    }
}

impl CubeFormat for EnviFormat {
    fn id(&self) -> &'static str {
        "envi"
    }

    fn display_name(&self) -> &'static str {
        "ENVI (HDR + raw)"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["hdr"]
    }

    fn load(&self, path: &Path) -> Result<Cube, FormatError> {
        let metadata = parse_header(&std::fs::read_to_string(path)?)?;

        let samples: usize = required(&metadata, SAMPLES)?;
        let lines: usize = required(&metadata, LINES)?;
        let bands: usize = required(&metadata, BANDS)?;
        let data_type: u32 = required(&metadata, DATA_TYPE)?;
        let offset: u64 = optional(&metadata, HEADER_OFFSET, 0)?;
        let big_endian = optional::<u8>(&metadata, BYTE_ORDER, 0)? == 1;
        let interleave = metadata
            .get(INTERLEAVE)
            .map_or(Ok(Interleave::Bsq), Interleave::parse)?;

        let wavelengths = self.wavelengths(&metadata, bands)?;
        if wavelengths.len() != bands {
            return Err(FormatError::WavelengthCount {
                bands,
                wavelengths: wavelengths.len(),
            });
        }

        let raw_path = Self::raw_path(path)?;
        let expected = payload_size(samples, lines, bands, data_type_size(data_type)?)
            .and_then(|payload| payload.checked_add(offset))
            .ok_or_else(|| {
                FormatError::invalid_header(format!(
                    "{} x {} x {} samples of type {} overflow the addressable size",
                    samples, lines, bands, data_type
                ))
            })?;
        let bytes = std::fs::read(&raw_path)?;
        if bytes.len() as u64 != expected {
            return Err(FormatError::DimensionMismatch {
                expected,
                found: bytes.len() as u64,
            });
        }

        let values = decode_samples(&bytes[offset as usize..], data_type, big_endian)?;
        let shape_error = |e: ndarray::ShapeError| FormatError::invalid_header(e.to_string());
        let data = match interleave {
            Interleave::Bip => Array3::from_shape_vec((lines, samples, bands), values)
                .map_err(shape_error)?,
            Interleave::Bsq => Array3::from_shape_vec((bands, lines, samples), values)
                .map_err(shape_error)?
                .permuted_axes([1, 2, 0])
                .as_standard_layout()
                .into_owned(),
            Interleave::Bil => Array3::from_shape_vec((lines, bands, samples), values)
                .map_err(shape_error)?
                .permuted_axes([0, 2, 1])
                .as_standard_layout()
                .into_owned(),
        };

        log::debug!(
            "Loaded ENVI cube {:?}: {}x{}x{} ({:?}, type {})",
            path,
            lines,
            samples,
            bands,
            interleave,
            data_type
        );
        Cube::new(data, wavelengths, metadata)
    }

    fn save(&self, path: &Path, cube: &Cube) -> Result<Vec<PathBuf>, FormatError> {
        let header_path = path.with_extension("hdr");
        let raw_path = path.with_extension("img");

        let mut metadata = cube.metadata().clone();
        metadata.set(SAMPLES, cube.cols().to_string());
        metadata.set(LINES, cube.rows().to_string());
        metadata.set(BANDS, cube.bands().to_string());
        metadata.set(HEADER_OFFSET, "0");
        if !metadata.contains(FILE_TYPE) {
            metadata.set(FILE_TYPE, "ENVI Standard");
        }
        metadata.set(DATA_TYPE, DATA_TYPE_F32.to_string());
        metadata.set(INTERLEAVE, "bip");
        metadata.set(BYTE_ORDER, "0");
        if !metadata.contains(WAVELENGTH_KEY) {
            metadata.set(WAVELENGTH_KEY, HeaderMetadata::format_list(cube.wavelengths()));
        }

        // Logical (row, column, band) order is bip.
        let mut bytes = Vec::with_capacity(cube.data().len() * 4);
        for value in cube.data().iter() {
            bytes.extend_from_slice(&value.to_le_bytes());
        }

        // Raw first, so a header on disk always has complete data behind it.
        write_atomic(&raw_path, &bytes)?;
        write_atomic(&header_path, format!("ENVI\n{}", metadata).as_bytes())?;

        log::debug!("Saved ENVI cube to {:?}", header_path);
        Ok(vec![header_path, raw_path])
    }

    fn output_paths(&self, path: &Path) -> Vec<PathBuf> {
        vec![path.with_extension("hdr"), path.with_extension("img")]
    }

    fn priority(&self) -> i32 {
        10
    }
}
