//! Rectangular cropping of cubes driven by pointer events.
//!
//! [`CropSession`] is a plain value: each pointer event consumes the old
//! session and returns the next one, so the caller (an image viewer, or the
//! CLI with a fixed rectangle) owns all state.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::constants::CROP_FILE_STEM;
use crate::data::{Cube, Region};
use crate::format::{CubeStore, FormatError};

/// Pixel position, `x` = column, `y` = row.
pub type Point = (usize, usize);

/// Pointer input relevant to cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    /// Primary button pressed at a point
    Press(Point),
    /// Pointer moved to a point
    Move(Point),
    /// Primary button released at a point
    Release(Point),
}

/// A normalized, non-empty selection `[x0, x1) × [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl CropRect {
    /// Rectangle spanned by two corners in any order, `None` if it has no area.
    pub fn from_corners(a: Point, b: Point) -> Option<Self> {
        let rect = Self {
            x0: a.0.min(b.0),
            y0: a.1.min(b.1),
            x1: a.0.max(b.0),
            y1: a.1.max(b.1),
        };
        (rect.x1 > rect.x0 && rect.y1 > rect.y0).then_some(rect)
    }

    pub fn width(&self) -> usize {
        self.x1 - self.x0
    }

    pub fn height(&self) -> usize {
        self.y1 - self.y0
    }

    /// The same rectangle in cube (row, column) terms.
    pub fn region(&self) -> Region {
        Region {
            row0: self.y0,
            row1: self.y1,
            col0: self.x0,
            col1: self.x1,
        }
    }
}

/// Errors that can occur when saving a selection.
#[derive(Error, Debug)]
pub enum CropError {
    /// No valid selection has been made
    #[error("No crop selection")]
    NoSelection,

    /// The selection lies outside the cube
    #[error("Selection {rect:?} is outside the {rows}x{cols} cube")]
    OutOfBounds {
        rect: CropRect,
        rows: usize,
        cols: usize,
    },

    /// Output folder could not be created
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing the cropped cube failed
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Drag state and save counter of an interactive crop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropSession {
    start: Option<Point>,
    end: Option<Point>,
    dragging: bool,
    selection: Option<CropRect>,
    next_index: usize,
}

impl Default for CropSession {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            dragging: false,
            selection: None,
            next_index: 1,
        }
    }
}

impl CropSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the session by one pointer event.
    pub fn handle(self, event: PointerEvent) -> Self {
        match event {
            PointerEvent::Press(point) => Self {
                start: Some(point),
                end: None,
                dragging: true,
                ..self
            },
            PointerEvent::Move(point) if self.dragging => Self {
                end: Some(point),
                ..self
            },
            PointerEvent::Move(_) => self,
            PointerEvent::Release(point) => {
                let Some(start) = self.start.filter(|_| self.dragging) else {
                    return self;
                };
                let selection = CropRect::from_corners(start, point);
                if selection.is_none() {
                    log::warn!("Invalid crop area {:?} -> {:?}", start, point);
                }
                Self {
                    end: Some(point),
                    dragging: false,
                    selection,
                    ..self
                }
            }
        }
    }

    /// Whether a drag is in progress.
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Rectangle being dragged, for drawing a rubber band.
    pub fn preview(&self) -> Option<CropRect> {
        match (self.dragging, self.start, self.end) {
            (true, Some(start), Some(end)) => CropRect::from_corners(start, end),
            _ => None,
        }
    }

    /// The completed selection, if the last drag spanned a non-empty area.
    pub fn selection(&self) -> Option<CropRect> {
        self.selection
    }

    /// Number used for the next saved file.
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Path the next save will write to.
    pub fn next_path(&self, folder: &Path) -> PathBuf {
        folder.join(format!("{}_{}.hdr", CROP_FILE_STEM, self.next_index))
    }

    /// Crop `cube` to the selection and save it as `cropped_cube_<n>.hdr`
    /// in `folder`. NaN values are written as 0.
    ///
    /// Returns the written files; the counter advances only on success.
    pub fn save_selection(
        &mut self,
        cube: &Cube,
        folder: &Path,
        store: &CubeStore,
    ) -> Result<Vec<PathBuf>, CropError> {
        let rect = self.selection.ok_or(CropError::NoSelection)?;
        let mut cropped = cube
            .crop(rect.region())
            .ok_or(CropError::OutOfBounds {
                rect,
                rows: cube.rows(),
                cols: cube.cols(),
            })?;

        let nan_count = cropped.data().iter().filter(|v| v.is_nan()).count();
        if nan_count > 0 {
            log::warn!("{} NaN values in cropped cube replaced with zero", nan_count);
            cropped.data_mut().mapv_inplace(|v| if v.is_nan() { 0.0 } else { v });
        }

        std::fs::create_dir_all(folder)?;
        let path = self.next_path(folder);
        let written = store.save(&path, &cropped)?;
        log::info!(
            "Saved {}x{} crop to {:?}",
            cropped.rows(),
            cropped.cols(),
            path
        );
        self.next_index += 1;
        Ok(written)
    }
}
