//! Planar geometry primitives shared by the unwrapping pipeline
//!
//! Coordinates are image coordinates: x grows to the right, y grows downward.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

use crate::error::{Result, UnwrapError};

/// A 2D point. Fractional during geometry, rounded when rasterized.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Convert a fractional (0.0 to 1.0) point to pixel coordinates
    pub fn to_pixels(&self, width: u32, height: u32) -> Self {
        Self {
            x: (self.x * width as f64).round(),
            y: (self.y * height as f64).round(),
        }
    }

    /// Euclidean distance to another point
    #[inline]
    pub fn distance(&self, other: Point) -> f64 {
        (*self - other).norm()
    }

    /// Length of the vector from the origin to this point
    #[inline]
    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Midpoint of the segment between two points
    #[inline]
    pub fn midpoint(&self, other: Point) -> Self {
        (*self + other) / 2.0
    }

    /// Round both coordinates to the nearest pixel
    #[inline]
    pub fn round(&self) -> Self {
        Self::new(self.x.round(), self.y.round())
    }

    /// 2D cross product (z component of the 3D cross product)
    #[inline]
    pub fn cross(&self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Integer pixel position, as used by the drawing routines
    pub fn to_i32(&self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Point {
    type Output = Point;

    fn div(self, rhs: f64) -> Point {
        Point::new(self.x / rhs, self.y / rhs)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self::new(x, y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LineKind {
    /// y = k * x + b
    Sloped { k: f64, b: f64 },
    /// x = const
    Vertical { x: f64 },
}

/// Infinite line through two points.
///
/// The angle of the line's normal is computed once on construction, along
/// with its cosine and sine, for perpendicular offsets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    point1: Point,
    point2: Point,
    kind: LineKind,
    normal_angle: f64,
    normal_cos: f64,
    normal_sin: f64,
}

impl Line {
    pub fn new(point1: Point, point2: Point) -> Self {
        let dx = point2.x - point1.x;

        let (kind, k_normal) = if dx != 0.0 {
            let k = (point2.y - point1.y) / dx;
            let b = point2.y - k * point2.x;
            // A horizontal line yields -inf here and a normal angle of -pi/2
            (LineKind::Sloped { k, b }, -1.0 / k)
        } else {
            (LineKind::Vertical { x: point2.x }, 0.0)
        };

        let normal_angle = k_normal.atan();

        Self {
            point1,
            point2,
            kind,
            normal_angle,
            normal_cos: normal_angle.cos(),
            normal_sin: normal_angle.sin(),
        }
    }

    pub fn points(&self) -> (Point, Point) {
        (self.point1, self.point2)
    }

    pub fn is_vertical(&self) -> bool {
        matches!(self.kind, LineKind::Vertical { .. })
    }

    /// Slope `k`, or `None` for a vertical line
    pub fn slope(&self) -> Option<f64> {
        match self.kind {
            LineKind::Sloped { k, .. } => Some(k),
            LineKind::Vertical { .. } => None,
        }
    }

    /// Intercept `b`, or `None` for a vertical line
    pub fn intercept(&self) -> Option<f64> {
        match self.kind {
            LineKind::Sloped { b, .. } => Some(b),
            LineKind::Vertical { .. } => None,
        }
    }

    /// Angle of the line's normal in radians
    pub fn normal_angle(&self) -> f64 {
        self.normal_angle
    }

    pub fn normal_cos(&self) -> f64 {
        self.normal_cos
    }

    pub fn normal_sin(&self) -> f64 {
        self.normal_sin
    }

    /// Move a point `distance` pixels along the line's normal
    pub fn offset(&self, point: Point, distance: f64) -> Point {
        Point::new(
            point.x + distance * self.normal_cos,
            point.y + distance * self.normal_sin,
        )
    }

    /// X coordinate at height `y`, rounded to a whole pixel.
    ///
    /// Fails for horizontal lines, which cross every x or none.
    pub fn x_at(&self, y: f64) -> Result<f64> {
        match self.kind {
            LineKind::Vertical { x } => Ok(x),
            LineKind::Sloped { k, .. } if k == 0.0 => Err(UnwrapError::DegenerateGeometry(
                "x_at called on a horizontal line".to_string(),
            )),
            LineKind::Sloped { k, b } => Ok(((y - b) / k).round()),
        }
    }

    /// Y coordinate at `x`. Fails for vertical lines.
    pub fn y_at(&self, x: f64) -> Result<f64> {
        match self.kind {
            LineKind::Sloped { k, b } => Ok(k * x + b),
            LineKind::Vertical { .. } => Err(UnwrapError::DegenerateGeometry(
                "y_at called on a vertical line".to_string(),
            )),
        }
    }
}

/// Axis-aligned bounding rectangle of a point set
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RoiRect {
    pub min: Point,
    pub max: Point,
}

impl RoiRect {
    /// Bounding box of `points`, or `None` when empty
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = *points.first()?;
        let (min, max) = points.iter().fold((first, first), |(min, max), p| {
            (
                Point::new(min.x.min(p.x), min.y.min(p.y)),
                Point::new(max.x.max(p.x), max.y.max(p.y)),
            )
        });
        Some(Self { min, max })
    }

    /// Corners in order: top-left, top-right, bottom-right, bottom-left
    pub fn corners(&self) -> [Point; 4] {
        [
            self.min,
            Point::new(self.max.x, self.min.y),
            self.max,
            Point::new(self.min.x, self.max.y),
        ]
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_4;

    #[test]
    fn test_point_arithmetic() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(4.0, 6.0);
        assert_eq!(a.distance(b), 5.0);
        assert_eq!(a.midpoint(b), Point::new(2.5, 4.0));
        assert_eq!((b - a) * 2.0, Point::new(6.0, 8.0));
        assert_eq!(Point::new(2.5, -2.5).round(), Point::new(3.0, -3.0));
    }

    #[test]
    fn test_percent_to_pixels() {
        let p = Point::new(0.5, 0.25).to_pixels(640, 480);
        assert_eq!(p, Point::new(320.0, 120.0));

        // rounds rather than truncates
        let p = Point::new(0.999, 0.0).to_pixels(401, 300);
        assert_eq!(p.x, 401.0);
    }

    #[test]
    fn test_sloped_line() {
        let line = Line::new(Point::new(0.0, 1.0), Point::new(2.0, 5.0));
        assert!(!line.is_vertical());
        assert_eq!(line.slope(), Some(2.0));
        assert_eq!(line.intercept(), Some(1.0));
        assert_eq!(line.y_at(3.0).unwrap(), 7.0);
        assert_eq!(line.x_at(4.0).unwrap(), 2.0); // 1.5 rounds to 2

        let expected = (-0.5f64).atan();
        assert!((line.normal_angle() - expected).abs() < 1e-12);
        assert!((line.normal_cos() - expected.cos()).abs() < 1e-12);
        assert!((line.normal_sin() - expected.sin()).abs() < 1e-12);
    }

    #[test]
    fn test_diagonal_normal_is_perpendicular() {
        let line = Line::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        assert!((line.normal_angle() + FRAC_PI_4).abs() < 1e-12);

        let moved = line.offset(Point::new(5.0, 5.0), 2.0f64.sqrt());
        assert!((moved.x - 6.0).abs() < 1e-9);
        assert!((moved.y - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_vertical_line() {
        let line = Line::new(Point::new(3.0, 0.0), Point::new(3.0, 10.0));
        assert!(line.is_vertical());
        assert_eq!(line.slope(), None);
        assert_eq!(line.normal_angle(), 0.0);
        assert_eq!(line.normal_cos(), 1.0);
        assert_eq!(line.x_at(123.0).unwrap(), 3.0);
        assert!(matches!(
            line.y_at(1.0),
            Err(UnwrapError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_horizontal_line() {
        let line = Line::new(Point::new(0.0, 4.0), Point::new(8.0, 4.0));
        assert_eq!(line.y_at(100.0).unwrap(), 4.0);
        assert!(line.x_at(4.0).is_err());
        assert!((line.normal_angle().abs() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_roi_rect() {
        let points = [
            Point::new(10.0, 20.0),
            Point::new(50.0, 5.0),
            Point::new(90.0, 20.0),
            Point::new(90.0, 80.0),
        ];
        let roi = RoiRect::from_points(&points).unwrap();
        assert_eq!(roi.min, Point::new(10.0, 5.0));
        assert_eq!(roi.max, Point::new(90.0, 80.0));
        assert_eq!(roi.corners()[1], Point::new(90.0, 5.0));
        assert_eq!(roi.width(), 80.0);
        assert!(RoiRect::from_points(&[]).is_none());
    }
}
