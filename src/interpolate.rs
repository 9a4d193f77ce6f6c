//! Dense interpolation of the correspondence grid
//!
//! The coarse grid pairs destination lattice points with source-image
//! coordinates. A thin-plate spline through those pairs
//!
//! ```text
//! f(p) = a0 + a1 x + a2 y + sum_i w_i U(|p - p_i|),   U(r) = r^2 log r
//! ```
//!
//! interpolates them exactly and smoothly, and is then evaluated once per
//! destination pixel to give the dense mapping.

use nalgebra::DMatrix;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{Result, UnwrapError};
use crate::geometry::Point;
use crate::grid::{CorrespondenceGrid, LabelSize};

/// Thin-plate spline from destination-canvas points to source-image points.
///
/// Control points are shifted and scaled into the unit square before fitting
/// to keep the system well conditioned.
#[derive(Debug, Clone)]
pub struct ThinPlateSpline {
    centers: Vec<Point>,
    weights: Vec<Point>,
    /// Constant, x and y coefficients of the affine part, one point per term
    affine: [Point; 3],
    origin: Point,
    scale: f64,
}

impl ThinPlateSpline {
    /// Fit a spline through `controls[i] -> values[i]`
    pub fn fit(controls: &[Point], values: &[Point]) -> Result<Self> {
        let n = controls.len();
        if n < 3 {
            return Err(UnwrapError::Interpolation(format!(
                "thin-plate spline needs at least 3 control points, got {}",
                n
            )));
        }
        if values.len() != n {
            return Err(UnwrapError::Interpolation(format!(
                "{} control points but {} values",
                n,
                values.len()
            )));
        }

        let (origin, scale) = normalization(controls);
        let centers: Vec<Point> = controls.iter().map(|p| (*p - origin) / scale).collect();

        // [K P] [w]   [v]
        // [P' 0] [a] = [0]
        let size = n + 3;
        let mut system = DMatrix::<f64>::zeros(size, size);
        for i in 0..n {
            for j in (i + 1)..n {
                let u = kernel(centers[i], centers[j]);
                system[(i, j)] = u;
                system[(j, i)] = u;
            }

            let p = centers[i];
            system[(i, n)] = 1.0;
            system[(i, n + 1)] = p.x;
            system[(i, n + 2)] = p.y;
            system[(n, i)] = 1.0;
            system[(n + 1, i)] = p.x;
            system[(n + 2, i)] = p.y;
        }

        let mut rhs = DMatrix::<f64>::zeros(size, 2);
        for (i, v) in values.iter().enumerate() {
            rhs[(i, 0)] = v.x;
            rhs[(i, 1)] = v.y;
        }

        let solution = system.lu().solve(&rhs).ok_or_else(|| {
            UnwrapError::Interpolation("thin-plate spline system is singular".to_string())
        })?;

        if solution.iter().any(|v| !v.is_finite()) {
            return Err(UnwrapError::Interpolation(
                "thin-plate spline coefficients are not finite".to_string(),
            ));
        }

        let coefficient = |row: usize| Point::new(solution[(row, 0)], solution[(row, 1)]);
        let weights = (0..n).map(coefficient).collect();
        let affine = [coefficient(n), coefficient(n + 1), coefficient(n + 2)];

        debug!("Fitted thin-plate spline through {} control points", n);

        Ok(Self {
            centers,
            weights,
            affine,
            origin,
            scale,
        })
    }

    pub fn control_count(&self) -> usize {
        self.centers.len()
    }

    /// Evaluate the spline at a destination-canvas point
    pub fn evaluate(&self, p: Point) -> Point {
        let q = (p - self.origin) / self.scale;
        let [a0, ax, ay] = self.affine;
        let mut result = a0 + ax * q.x + ay * q.y;

        for (center, weight) in self.centers.iter().zip(&self.weights) {
            result = result + *weight * kernel(q, *center);
        }
        result
    }
}

/// `U(r) = r^2 log r`, written in terms of `r^2` to skip the square root
#[inline]
fn kernel(p: Point, q: Point) -> f64 {
    let d = p - q;
    let r2 = d.x * d.x + d.y * d.y;
    if r2 < 1e-20 {
        0.0
    } else {
        0.5 * r2 * r2.ln()
    }
}

fn normalization(points: &[Point]) -> (Point, f64) {
    let mut min = Point::new(f64::INFINITY, f64::INFINITY);
    let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in points {
        min = Point::new(min.x.min(p.x), min.y.min(p.y));
        max = Point::new(max.x.max(p.x), max.y.max(p.y));
    }
    let extent = (max.x - min.x).max(max.y - min.y);
    let scale = if extent > 1e-12 { extent } else { 1.0 };
    (min, scale)
}

/// Per-pixel source coordinates for the flattened canvas.
///
/// Stored x-major: all `height` entries of destination column 0 first, then
/// column 1, and so on. Each run of `height` values becomes one row of the
/// remapped image before its final transpose.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMapping {
    width: u32,
    height: u32,
    map_x: Vec<f32>,
    map_y: Vec<f32>,
}

impl DenseMapping {
    /// Interpolate the grid's source points over every canvas pixel
    pub fn from_grid(grid: &CorrespondenceGrid) -> Result<Self> {
        let spline = ThinPlateSpline::fit(grid.dest_points(), grid.source_points())?;
        Self::from_spline(&spline, grid.size())
    }

    pub fn from_spline(spline: &ThinPlateSpline, size: LabelSize) -> Result<Self> {
        let LabelSize { width, height } = size;
        let column_len = height as usize;
        let mut map_x = vec![0.0f32; size.pixel_count()];
        let mut map_y = vec![0.0f32; size.pixel_count()];

        map_x
            .par_chunks_mut(column_len)
            .zip(map_y.par_chunks_mut(column_len))
            .enumerate()
            .for_each(|(x, (column_x, column_y))| {
                for (y, (mx, my)) in column_x.iter_mut().zip(column_y.iter_mut()).enumerate() {
                    let source = spline.evaluate(Point::new(x as f64, y as f64));
                    *mx = source.x as f32;
                    *my = source.y as f32;
                }
            });

        if let Some(index) = map_x
            .iter()
            .zip(&map_y)
            .position(|(x, y)| !(x.is_finite() && y.is_finite()))
        {
            return Err(UnwrapError::Interpolation(format!(
                "no finite source coordinate for pixel ({}, {})",
                index / column_len,
                index % column_len
            )));
        }

        Ok(Self {
            width,
            height,
            map_x,
            map_y,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Source coordinate for destination pixel `(x, y)`
    #[inline]
    pub fn source_at(&self, x: u32, y: u32) -> Point {
        let index = x as usize * self.height as usize + y as usize;
        Point::new(self.map_x[index] as f64, self.map_y[index] as f64)
    }

    /// Source coordinates for destination column `x`, top to bottom
    pub fn column(&self, x: u32) -> (&[f32], &[f32]) {
        let start = x as usize * self.height as usize;
        let end = start + self.height as usize;
        (&self.map_x[start..end], &self.map_y[start..end])
    }
}
