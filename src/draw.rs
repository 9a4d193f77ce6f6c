//! Debug drawing on top of the label geometry
//!
//! Mesh overlay, landmark polygon, label contour and the filled label mask.

use image::{imageops, GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_polygon_mut};
use std::f64::consts::PI;

use crate::ellipse::EllipseArc;
use crate::error::Result;
use crate::geometry::{Point, RoiRect};
use crate::grid::CorrespondenceGrid;
use crate::landmarks::Landmarks;

pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);

const MASK_ON: Luma<u8> = Luma([255]);
const MASK_OFF: Luma<u8> = Luma([0]);

/// Roughly one arc sample per two pixels of arc length
fn arc_sample_count(arc: &EllipseArc) -> usize {
    let half_perimeter = PI * (arc.semi_major() + arc.semi_minor()) / 2.0;
    ((half_perimeter / 2.0).ceil() as usize).max(8)
}

fn to_f32(p: Point) -> (f32, f32) {
    (p.x as f32, p.y as f32)
}

fn draw_polyline(img: &mut RgbImage, points: &[Point], color: Rgb<u8>) {
    for pair in points.windows(2) {
        draw_line_segment_mut(img, to_f32(pair[0]), to_f32(pair[1]), color);
    }
}

/// Mark every source point of the correspondence grid
pub fn draw_mesh(img: &mut RgbImage, grid: &CorrespondenceGrid, color: Rgb<u8>, thickness: u32) {
    let (width, height) = img.dimensions();
    for point in grid.source_points() {
        let (x, y) = point.to_i32();
        if thickness > 1 {
            draw_filled_circle_mut(img, (x, y), (thickness / 2) as i32, color);
        } else if x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height {
            img.put_pixel(x as u32, y as u32, color);
        }
    }
}

/// Closed outline through the six landmarks in order
pub fn draw_poly_mask(img: &mut RgbImage, landmarks: &Landmarks, color: Rgb<u8>) {
    let points = landmarks.points();
    let mut closed = points.to_vec();
    closed.push(points[0]);
    draw_polyline(img, &closed, color);
}

/// Label contour: both seams plus the two elliptical caps
pub fn draw_mask(img: &mut RgbImage, landmarks: &Landmarks, color: Rgb<u8>) -> Result<()> {
    draw_line_segment_mut(img, to_f32(landmarks.f()), to_f32(landmarks.a()), color);
    draw_line_segment_mut(img, to_f32(landmarks.c()), to_f32(landmarks.d()), color);

    for arc in [
        EllipseArc::from_points(landmarks.a(), landmarks.b(), landmarks.c())?,
        EllipseArc::from_points(landmarks.d(), landmarks.e(), landmarks.f())?,
    ] {
        let points = arc.sample(arc_sample_count(&arc))?;
        draw_polyline(img, &points, color);
    }
    Ok(())
}

/// Blank image of the given size with only the label contour drawn
pub fn label_contour(
    landmarks: &Landmarks,
    width: u32,
    height: u32,
    color: Rgb<u8>,
) -> Result<RgbImage> {
    let mut img = RgbImage::from_pixel(width, height, BLACK);
    draw_mask(&mut img, landmarks, color)?;
    Ok(img)
}

/// Binary mask covering the whole label.
///
/// The quad A, C, D, F is filled first. Each cap's ellipse is then filled
/// on or off: a cap bulging away from the label adds its half, a cap bulging
/// into the label carves it out.
pub fn label_mask(landmarks: &Landmarks, width: u32, height: u32) -> Result<GrayImage> {
    let mut mask = GrayImage::from_pixel(width, height, MASK_OFF);

    let quad = [landmarks.a(), landmarks.c(), landmarks.d(), landmarks.f()];
    fill_polygon(&mut mask, &quad, MASK_ON);

    let caps = [
        (landmarks.a(), landmarks.b(), landmarks.c(), true),
        (landmarks.f(), landmarks.e(), landmarks.d(), false),
    ];
    for (left, apex, right, is_top) in caps {
        let arc = EllipseArc::from_points(left, apex, right)?;
        let color = if arc.is_lower() ^ is_top {
            MASK_ON
        } else {
            MASK_OFF
        };
        fill_polygon(&mut mask, &arc.outline(2 * arc_sample_count(&arc)), color);
    }
    Ok(mask)
}

/// Fill a polygon, skipping shapes that collapse to fewer than three pixels
fn fill_polygon(img: &mut GrayImage, points: &[Point], color: Luma<u8>) {
    let mut poly: Vec<imageproc::point::Point<i32>> = Vec::with_capacity(points.len());
    for p in points {
        let (x, y) = p.to_i32();
        let vertex = imageproc::point::Point::new(x, y);
        if poly.last() != Some(&vertex) {
            poly.push(vertex);
        }
    }
    while poly.len() > 1 && poly.first() == poly.last() {
        poly.pop();
    }
    if poly.len() >= 3 {
        draw_polygon_mut(img, &poly, color);
    }
}

/// Crop to the landmark bounding box, widened to whole pixels
pub fn crop_roi(img: &RgbImage, roi: &RoiRect) -> RgbImage {
    let (width, height) = img.dimensions();
    let x0 = (roi.min.x.floor().max(0.0) as u32).min(width);
    let y0 = (roi.min.y.floor().max(0.0) as u32).min(height);
    let x1 = (roi.max.x.ceil().max(0.0) as u32).min(width);
    let y1 = (roi.max.y.ceil().max(0.0) as u32).min(height);

    imageops::crop_imm(img, x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0)).to_image()
}
