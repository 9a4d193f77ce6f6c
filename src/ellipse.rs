//! Semi-elliptical caps defined by three landmarks
//!
//! A cap is given as `(left, apex, right)`. The chord `left -> right` is the
//! major axis, its midpoint the center, and the apex distance from the center
//! the semi-minor axis. Which half of the ellipse is the cap is decided by the
//! side of the chord the apex lies on.

use serde::Serialize;
use std::f64::consts::{PI, TAU};

use crate::error::{Result, UnwrapError};
use crate::geometry::Point;

/// Chords shorter than this are treated as collapsed
const MIN_SEMI_AXIS: f64 = 1e-9;

/// Ellipse descriptor derived from a three-point cap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipseArc {
    center: Point,
    /// Semi-major axis, half the chord length
    a: f64,
    /// Semi-minor axis, center to apex
    b: f64,
    cos_rot: f64,
    sin_rot: f64,
    /// Apex lies on the clockwise side of `center -> right`, i.e. below a
    /// left-to-right chord in image coordinates
    is_lower: bool,
}

/// Drawing parameters of a cap, rounded the way raster routines expect
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct EllipseParams {
    pub center: (i32, i32),
    pub axes: (u32, u32),
    /// Rotation of the major axis in degrees
    pub angle: f64,
    pub is_lower: bool,
}

impl EllipseArc {
    pub fn from_points(left: Point, apex: Point, right: Point) -> Result<Self> {
        let center = left.midpoint(right);
        let a = left.distance(right) / 2.0;
        let b = center.distance(apex);

        if !(a.is_finite() && b.is_finite()) {
            return Err(UnwrapError::DegenerateGeometry(
                "cap landmarks are not finite".to_string(),
            ));
        }
        if a < MIN_SEMI_AXIS {
            return Err(UnwrapError::DegenerateGeometry(format!(
                "cap endpoints coincide at ({}, {})",
                left.x, left.y
            )));
        }

        let axis = (right - center) / a;
        let is_lower = (right - center).cross(apex - center) > 0.0;

        Ok(Self {
            center,
            a,
            b,
            cos_rot: axis.x,
            sin_rot: axis.y,
            is_lower,
        })
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn semi_major(&self) -> f64 {
        self.a
    }

    pub fn semi_minor(&self) -> f64 {
        self.b
    }

    pub fn is_lower(&self) -> bool {
        self.is_lower
    }

    /// Rotation of the major axis in radians
    pub fn rotation(&self) -> f64 {
        self.sin_rot.atan2(self.cos_rot)
    }

    /// Point at parametric angle `phi`, unrounded
    #[inline]
    pub fn point_at(&self, phi: f64) -> Point {
        let dx = self.a * phi.cos();
        let dy = self.b * phi.sin();

        Point::new(
            self.center.x + dx * self.cos_rot - dy * self.sin_rot,
            self.center.y + dx * self.sin_rot + dy * self.cos_rot,
        )
    }

    /// Sample `count` pixel positions along the cap.
    ///
    /// The sweep runs from `right` to `left` and is returned reversed, so
    /// index 0 is the `left` end. Top and bottom caps sampled this way line up
    /// column by column.
    pub fn sample(&self, count: usize) -> Result<Vec<Point>> {
        if count < 2 {
            return Err(UnwrapError::Configuration(format!(
                "arc sampling needs at least 2 points, got {}",
                count
            )));
        }

        let step = PI / (count - 1) as f64;
        let delta = if self.is_lower { step } else { -step };

        let mut points: Vec<Point> = (0..count)
            .map(|i| self.point_at(i as f64 * delta).round())
            .collect();

        points.reverse();
        Ok(points)
    }

    /// Closed outline of the full ellipse, `count` points, last != first
    pub fn outline(&self, count: usize) -> Vec<Point> {
        let step = TAU / count.max(1) as f64;
        (0..count).map(|i| self.point_at(i as f64 * step)).collect()
    }

    pub fn params(&self) -> EllipseParams {
        EllipseParams {
            center: self.center.to_i32(),
            axes: (self.a as u32, self.b as u32),
            angle: self.rotation().to_degrees(),
            is_lower: self.is_lower,
        }
    }
}

/// Sample `count` points along the cap through `(left, apex, right)`
pub fn sample_arc(left: Point, apex: Point, right: Point, count: usize) -> Result<Vec<Point>> {
    EllipseArc::from_points(left, apex, right)?.sample(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOP: [Point; 3] = [
        Point::new(40.0, 30.0),
        Point::new(200.0, 15.0),
        Point::new(360.0, 30.0),
    ];

    fn assert_near(a: Point, b: Point, tol: f64) {
        assert!(
            (a.x - b.x).abs() <= tol && (a.y - b.y).abs() <= tol,
            "{:?} vs {:?}",
            a,
            b
        );
    }

    #[test]
    fn test_descriptor() {
        let [left, apex, right] = TOP;
        let arc = EllipseArc::from_points(left, apex, right).unwrap();
        assert_eq!(arc.center(), Point::new(200.0, 30.0));
        assert_eq!(arc.semi_major(), 160.0);
        assert_eq!(arc.semi_minor(), 15.0);
        assert_eq!(arc.rotation(), 0.0);
        assert!(!arc.is_lower());
    }

    #[test]
    fn test_sample_endpoints_and_apex() {
        let [left, apex, right] = TOP;
        let points = sample_arc(left, apex, right, 31).unwrap();
        assert_eq!(points.len(), 31);
        assert_eq!(points[0], left);
        assert_eq!(points[30], right);
        assert_eq!(points[15], apex);
        // upper cap stays above the chord
        assert!(points.iter().all(|p| p.y <= 30.0));
    }

    #[test]
    fn test_sampling_reversed_chord_matches() {
        let [left, apex, right] = TOP;
        let forward = sample_arc(left, apex, right, 30).unwrap();
        let mut backward = sample_arc(right, apex, left, 30).unwrap();
        backward.reverse();

        for (f, b) in forward.iter().zip(&backward) {
            assert_near(*f, *b, 1.0);
        }
    }

    #[test]
    fn test_top_and_bottom_caps_mirror() {
        let [left, apex, right] = TOP;
        let mirror = |p: Point| Point::new(p.x, 300.0 - p.y);

        let top = sample_arc(left, apex, right, 30).unwrap();
        let bottom = sample_arc(mirror(left), mirror(apex), mirror(right), 30).unwrap();

        for (t, b) in top.iter().zip(&bottom) {
            assert_near(mirror(*t), *b, 1.0);
        }
        assert!(bottom.iter().all(|p| p.y >= 270.0));
    }

    #[test]
    fn test_rotated_cap() {
        let left = Point::new(0.0, 0.0);
        let right = Point::new(100.0, 100.0);
        let apex = Point::new(40.0, 60.0);
        let arc = EllipseArc::from_points(left, apex, right).unwrap();
        assert!((arc.rotation() - PI / 4.0).abs() < 1e-12);
        assert!(arc.is_lower());

        let points = arc.sample(9).unwrap();
        assert_eq!(points[0], left);
        assert_eq!(points[8], right);
        assert_eq!(points[4], apex);
    }

    #[test]
    fn test_coincident_endpoints_rejected() {
        let p = Point::new(50.0, 50.0);
        let err = sample_arc(p, Point::new(50.0, 20.0), p, 30).unwrap_err();
        assert!(matches!(err, UnwrapError::DegenerateGeometry(_)));
    }

    #[test]
    fn test_too_few_samples() {
        let [left, apex, right] = TOP;
        assert!(matches!(
            sample_arc(left, apex, right, 1),
            Err(UnwrapError::Configuration(_))
        ));
    }

    #[test]
    fn test_outline_and_params() {
        let [left, apex, right] = TOP;
        let arc = EllipseArc::from_points(left, apex, right).unwrap();
        let outline = arc.outline(4);
        assert_near(outline[0], right, 1e-9);
        assert_near(outline[1], Point::new(200.0, 45.0), 1e-9);
        assert_near(outline[2], left, 1e-9);

        let params = arc.params();
        assert_eq!(params.center, (200, 30));
        assert_eq!(params.axes, (160, 15));
        assert!(!params.is_lower);
    }
}
