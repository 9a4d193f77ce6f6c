//! The six boundary landmarks of a label
//!
//! Ordering convention, shared by every consumer of [`Landmarks`]:
//!
//! ```text
//!   A ---- B ---- C        A: top-left      D: bottom-right
//!   |             |        B: top apex      E: bottom apex
//!   |             |        C: top-right     F: bottom-left
//!   F ---- E ---- D
//! ```
//!
//! The points run clockwise, so the bottom cap is listed right-to-left
//! (`D, E, F`). Arc sampling reads it back as `(F, E, D)`. Swapping this
//! order silently mirrors the unwrapped output.

use serde::{Deserialize, Serialize};

use crate::error::{Result, UnwrapError};
use crate::geometry::{Line, Point, RoiRect};

pub const LANDMARK_COUNT: usize = 6;

/// Display names in landmark order
pub const LANDMARK_NAMES: [&str; LANDMARK_COUNT] = [
    "Top Left",
    "Top Center",
    "Top Right",
    "Bottom Right",
    "Bottom Center",
    "Bottom Left",
];

/// How landmark coordinates are expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateMode {
    /// Absolute pixel coordinates
    Pixel,
    /// Fractions of the image size, 0.0 to 1.0
    #[default]
    Percent,
}

/// Landmark set resolved to pixel coordinates. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Landmarks {
    points: [Point; LANDMARK_COUNT],
    center_line: Line,
}

impl Landmarks {
    /// Build from six pixel-coordinate points ordered A..F
    pub fn from_pixels(points: &[Point]) -> Result<Self> {
        let points = six_points(points)?;
        if let Some((i, _)) = points.iter().enumerate().find(|(_, p)| !p.is_finite()) {
            return Err(UnwrapError::Configuration(format!(
                "landmark {} is not a finite coordinate",
                LANDMARK_NAMES[i]
            )));
        }
        Ok(Self::build(points))
    }

    /// Build from six fractional points, scaled by the image dimensions
    pub fn from_percent(points: &[Point], width: u32, height: u32) -> Result<Self> {
        let points = six_points(points)?;
        for (i, p) in points.iter().enumerate() {
            let in_range = (0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y);
            if !in_range {
                return Err(UnwrapError::Configuration(format!(
                    "landmark {} ({}, {}) is outside the unit square",
                    LANDMARK_NAMES[i], p.x, p.y
                )));
            }
        }
        Ok(Self::build(points.map(|p| p.to_pixels(width, height))))
    }

    /// Resolve whichever representation was supplied; pixel points win when both are.
    pub fn resolve(
        pixel_points: Option<&[Point]>,
        percent_points: Option<&[Point]>,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        match (pixel_points, percent_points) {
            (Some(points), _) => Self::from_pixels(points),
            (None, Some(points)) => Self::from_percent(points, width, height),
            (None, None) => Err(UnwrapError::Configuration(
                "neither pixel nor percent landmark points were supplied".to_string(),
            )),
        }
    }

    /// Build from points expressed in `mode`
    pub fn from_mode(
        mode: CoordinateMode,
        points: &[Point],
        width: u32,
        height: u32,
    ) -> Result<Self> {
        match mode {
            CoordinateMode::Pixel => Self::from_pixels(points),
            CoordinateMode::Percent => Self::from_percent(points, width, height),
        }
    }

    fn build(points: [Point; LANDMARK_COUNT]) -> Self {
        let [a, _, c, d, _, f] = points;
        let center_top = a.midpoint(c);
        let center_bottom = d.midpoint(f);

        Self {
            points,
            center_line: Line::new(center_bottom, center_top),
        }
    }

    pub fn points(&self) -> &[Point; LANDMARK_COUNT] {
        &self.points
    }

    /// Top-left
    pub fn a(&self) -> Point {
        self.points[0]
    }

    /// Top apex
    pub fn b(&self) -> Point {
        self.points[1]
    }

    /// Top-right
    pub fn c(&self) -> Point {
        self.points[2]
    }

    /// Bottom-right
    pub fn d(&self) -> Point {
        self.points[3]
    }

    /// Bottom apex
    pub fn e(&self) -> Point {
        self.points[4]
    }

    /// Bottom-left
    pub fn f(&self) -> Point {
        self.points[5]
    }

    /// Line through the midpoints of the top and bottom chords
    pub fn center_line(&self) -> &Line {
        &self.center_line
    }

    /// Left (A-F) and right (C-D) seams
    pub fn seams(&self) -> (Line, Line) {
        (Line::new(self.f(), self.a()), Line::new(self.c(), self.d()))
    }

    /// Landmarks paired with their display names
    pub fn labeled(&self) -> impl Iterator<Item = (&'static str, Point)> + '_ {
        LANDMARK_NAMES.iter().copied().zip(self.points.iter().copied())
    }

    pub fn roi_rect(&self) -> RoiRect {
        let anchor = self.points[0];
        RoiRect::from_points(&self.points).unwrap_or(RoiRect {
            min: anchor,
            max: anchor,
        })
    }
}

fn six_points(points: &[Point]) -> Result<[Point; LANDMARK_COUNT]> {
    points.try_into().map_err(|_| {
        UnwrapError::Configuration(format!(
            "expected {} landmark points, got {}",
            LANDMARK_COUNT,
            points.len()
        ))
    })
}
