//! Coarse source/destination correspondence grid
//!
//! The top and bottom caps are sampled at the same number of columns and
//! joined by straight segments, giving `rows x columns` points in the source
//! image. The same lattice laid out regularly over the flattened canvas gives
//! the destination points.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::ellipse::sample_arc;
use crate::error::{Result, UnwrapError};
use crate::geometry::Point;
use crate::landmarks::Landmarks;

pub const DEFAULT_COLUMNS: usize = 30;
pub const DEFAULT_ROWS: usize = 20;

/// Resolution of the coarse grid fed into dense interpolation.
///
/// More columns and rows cost interpolation time but reduce warping
/// artifacts; too few produce visible bending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSettings {
    #[serde(default = "default_columns")]
    pub columns: usize,
    #[serde(default = "default_rows")]
    pub rows: usize,
}

fn default_columns() -> usize {
    DEFAULT_COLUMNS
}

fn default_rows() -> usize {
    DEFAULT_ROWS
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            rows: DEFAULT_ROWS,
        }
    }
}

impl GridSettings {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self { columns, rows }
    }

    pub fn validate(&self) -> Result<()> {
        if self.columns < 2 || self.rows < 2 {
            return Err(UnwrapError::Configuration(format!(
                "grid needs at least 2 columns and 2 rows, got {}x{}",
                self.columns, self.rows
            )));
        }
        Ok(())
    }
}

/// Size of the flattened canvas in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LabelSize {
    pub width: u32,
    pub height: u32,
}

impl LabelSize {
    /// Width is the mean chord length scaled by pi/2 (half-ellipse arc
    /// approximation), height the mean seam length.
    pub fn from_landmarks(landmarks: &Landmarks) -> Result<Self> {
        let top = landmarks.a().distance(landmarks.c());
        let bottom = landmarks.f().distance(landmarks.d());
        let left = landmarks.a().distance(landmarks.f());
        let right = landmarks.c().distance(landmarks.d());

        let width = ((top + bottom) * PI / 4.0).round();
        let height = ((left + right) / 2.0).round();

        if !(width >= 1.0 && height >= 1.0) || width > u32::MAX as f64 || height > u32::MAX as f64
        {
            return Err(UnwrapError::DegenerateGeometry(format!(
                "label collapses to a {}x{} canvas",
                width, height
            )));
        }

        Ok(Self {
            width: width as u32,
            height: height as u32,
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Index-aligned source and destination lattices, stored row-major.
///
/// `source(r, c)` in the photograph maps to `dest(r, c)` on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrespondenceGrid {
    rows: usize,
    columns: usize,
    source: Vec<Point>,
    dest: Vec<Point>,
    size: LabelSize,
}

impl CorrespondenceGrid {
    pub fn build(landmarks: &Landmarks, settings: GridSettings) -> Result<Self> {
        settings.validate()?;
        let size = LabelSize::from_landmarks(landmarks)?;
        let source = source_map(landmarks, settings)?;
        let dest = dest_map(size, settings);

        Ok(Self {
            rows: settings.rows,
            columns: settings.columns,
            source,
            dest,
            size,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn size(&self) -> LabelSize {
        self.size
    }

    pub fn source(&self, row: usize, column: usize) -> Point {
        self.source[row * self.columns + column]
    }

    pub fn dest(&self, row: usize, column: usize) -> Point {
        self.dest[row * self.columns + column]
    }

    /// All source points, row-major
    pub fn source_points(&self) -> &[Point] {
        &self.source
    }

    /// All destination points, row-major
    pub fn dest_points(&self) -> &[Point] {
        &self.dest
    }
}

/// Source-image lattice: row 0 is the top cap, the last row the bottom cap,
/// each column a straight segment between matching cap samples.
pub fn source_map(landmarks: &Landmarks, settings: GridSettings) -> Result<Vec<Point>> {
    settings.validate()?;
    let GridSettings { columns, rows } = settings;

    let top = sample_arc(landmarks.a(), landmarks.b(), landmarks.c(), columns)?;
    // Bottom cap is stored D, E, F; sampled left-to-right as F, E, D
    let bottom = sample_arc(landmarks.f(), landmarks.e(), landmarks.d(), columns)?;

    let mut points = Vec::with_capacity(rows * columns);
    for row in 0..rows {
        for (top_point, bottom_point) in top.iter().zip(&bottom) {
            let delta = (*top_point - *bottom_point) / (rows - 1) as f64;
            points.push(*top_point - delta * row as f64);
        }
    }
    Ok(points)
}

/// Regular destination lattice spanning the flattened canvas
pub fn dest_map(size: LabelSize, settings: GridSettings) -> Vec<Point> {
    let GridSettings { columns, rows } = settings;
    let dx = size.width as f64 / (columns - 1) as f64;
    let dy = size.height as f64 / (rows - 1) as f64;

    (0..rows)
        .flat_map(|row| {
            (0..columns).map(move |column| Point::new(dx * column as f64, dy * row as f64))
        })
        .collect()
}
