//! End-to-end label unwrapping
//!
//! Landmarks -> cap sampling -> correspondence grid -> dense mapping ->
//! bicubic remap -> transpose. Every call recomputes the grid and mapping;
//! nothing is cached between calls.

use image::{DynamicImage, ImageBuffer, Pixel, Rgb, RgbImage};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};

use crate::ellipse::{EllipseArc, EllipseParams};
use crate::error::{Result, UnwrapError};
use crate::geometry::{Point, RoiRect};
use crate::grid::{CorrespondenceGrid, GridSettings, LabelSize};
use crate::interpolate::DenseMapping;
use crate::landmarks::Landmarks;
use crate::transform::{remap, transpose};

/// Flattens the label described by a landmark set
#[derive(Debug, Clone)]
pub struct LabelUnwrapper {
    landmarks: Landmarks,
    settings: GridSettings,
}

impl LabelUnwrapper {
    pub fn new(landmarks: Landmarks) -> Self {
        Self {
            landmarks,
            settings: GridSettings::default(),
        }
    }

    /// Landmarks given as fractions of a `width x height` image
    pub fn from_percent(points: &[Point], width: u32, height: u32) -> Result<Self> {
        Ok(Self::new(Landmarks::from_percent(points, width, height)?))
    }

    pub fn with_grid(mut self, settings: GridSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn landmarks(&self) -> &Landmarks {
        &self.landmarks
    }

    pub fn grid_settings(&self) -> GridSettings {
        self.settings
    }

    pub fn label_size(&self) -> Result<LabelSize> {
        LabelSize::from_landmarks(&self.landmarks)
    }

    pub fn correspondence_grid(&self) -> Result<CorrespondenceGrid> {
        CorrespondenceGrid::build(&self.landmarks, self.settings)
    }

    pub fn dense_mapping(&self) -> Result<DenseMapping> {
        let grid = self.correspondence_grid()?;
        DenseMapping::from_grid(&grid)
    }

    /// Flatten the label in `image`.
    ///
    /// Canvas pixels that map outside the photograph are filled with `border`.
    pub fn unwrap<P>(
        &self,
        image: &ImageBuffer<P, Vec<u8>>,
        border: P,
    ) -> Result<ImageBuffer<P, Vec<u8>>>
    where
        P: Pixel<Subpixel = u8> + Sync,
    {
        if image.width() == 0 || image.height() == 0 {
            return Err(UnwrapError::Configuration(
                "source image is empty".to_string(),
            ));
        }

        let grid_start = Instant::now();
        let grid = self.correspondence_grid()?;
        let size = grid.size();
        info!(
            "Unwrapping {}x{} label from {}x{} image ({}x{} grid)",
            size.width,
            size.height,
            image.width(),
            image.height(),
            grid.columns(),
            grid.rows()
        );
        debug!("Grid built in {}us", grid_start.elapsed().as_micros());

        let interpolate_start = Instant::now();
        let mapping = DenseMapping::from_grid(&grid)?;
        debug!(
            "Dense mapping interpolated in {}us",
            interpolate_start.elapsed().as_micros()
        );

        let remap_start = Instant::now();
        let warped = remap(image, &mapping, border);
        let flattened = transpose(&warped);
        debug!("Remapped in {}us", remap_start.elapsed().as_micros());

        Ok(flattened)
    }

    /// Geometry summary of the label
    pub fn describe(&self) -> Result<LabelDescription> {
        let l = &self.landmarks;
        let top = EllipseArc::from_points(l.a(), l.b(), l.c())?;
        let bottom = EllipseArc::from_points(l.f(), l.e(), l.d())?;
        let center_line = l.center_line();
        let (center_bottom, center_top) = center_line.points();

        Ok(LabelDescription {
            size: self.label_size()?,
            grid: self.settings,
            landmarks: l
                .labeled()
                .map(|(name, point)| NamedPoint { name, point })
                .collect(),
            top_cap: top.params(),
            bottom_cap: bottom.params(),
            center_line: CenterLine {
                top: center_top,
                bottom: center_bottom,
                vertical: center_line.is_vertical(),
                normal_angle: center_line.normal_angle(),
            },
            roi: l.roi_rect(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NamedPoint {
    pub name: &'static str,
    #[serde(flatten)]
    pub point: Point,
}

#[derive(Debug, Clone, Serialize)]
pub struct CenterLine {
    pub top: Point,
    pub bottom: Point,
    pub vertical: bool,
    pub normal_angle: f64,
}

/// Serializable geometry summary of an unwrap
#[derive(Debug, Clone, Serialize)]
pub struct LabelDescription {
    pub size: LabelSize,
    pub grid: GridSettings,
    pub landmarks: Vec<NamedPoint>,
    pub top_cap: EllipseParams,
    pub bottom_cap: EllipseParams,
    pub center_line: CenterLine,
    pub roi: RoiRect,
}

/// Flatten a label from fractional landmarks, dropping any alpha channel
pub fn unwarp_label(image: &DynamicImage, percent_points: &[Point]) -> Result<RgbImage> {
    let rgb = image.to_rgb8();
    let unwrapper = LabelUnwrapper::from_percent(percent_points, rgb.width(), rgb.height())?;
    unwrapper.unwrap(&rgb, Rgb([0, 0, 0]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn scenario_points() -> Vec<Point> {
        vec![
            Point::new(0.1, 0.1),
            Point::new(0.5, 0.05),
            Point::new(0.9, 0.1),
            Point::new(0.9, 0.9),
            Point::new(0.5, 0.95),
            Point::new(0.1, 0.9),
        ]
    }

    /// Smooth synthetic photograph so bicubic sampling stays predictable
    fn synthetic_image() -> RgbImage {
        RgbImage::from_fn(400, 300, |x, y| {
            Rgb([(x * 255 / 399) as u8, (y * 255 / 299) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn test_end_to_end_scenario() {
        let image = synthetic_image();
        let unwrapper = LabelUnwrapper::from_percent(&scenario_points(), 400, 300).unwrap();
        let output = unwrapper.unwrap(&image, Rgb([0, 0, 0])).unwrap();

        // (320 + 320) * pi / 4 = 502.65, seams are 240 long
        assert_eq!(output.dimensions(), (503, 240));

        // canvas center maps to the middle of the label at (200, 150)
        let center = output.get_pixel(251, 120);
        let expected = image.get_pixel(200, 150);
        for c in 0..2 {
            let diff = (center[c] as i32 - expected[c] as i32).abs();
            assert!(diff <= 3, "channel {}: {:?} vs {:?}", c, center, expected);
        }
    }

    #[test]
    fn test_unwrap_is_deterministic() {
        let image = synthetic_image();
        let unwrapper = LabelUnwrapper::from_percent(&scenario_points(), 400, 300)
            .unwrap()
            .with_grid(GridSettings::new(12, 8));

        let first = unwrapper.unwrap(&image, Rgb([0, 0, 0])).unwrap();
        let second = unwrapper.unwrap(&image, Rgb([0, 0, 0])).unwrap();
        assert_eq!(first.as_raw(), second.as_raw());
    }

    #[test]
    fn test_flat_caps_keep_vertical_scale() {
        // zero-height caps: the label is the plain rectangle (40..360, 30..270)
        let landmarks = Landmarks::from_pixels(&[
            Point::new(40.0, 30.0),
            Point::new(200.0, 30.0),
            Point::new(360.0, 30.0),
            Point::new(360.0, 270.0),
            Point::new(200.0, 270.0),
            Point::new(40.0, 270.0),
        ])
        .unwrap();
        let unwrapper = LabelUnwrapper::new(landmarks).with_grid(GridSettings::new(8, 5));
        let mapping = unwrapper.dense_mapping().unwrap();

        let corner = mapping.source_at(0, 0);
        assert!(corner.distance(Point::new(40.0, 30.0)) < 0.01);
        let bottom = mapping.source_at(0, 239);
        assert!((bottom.y - 269.0).abs() < 0.01);
    }

    #[test]
    fn test_rgba_border_is_transparent() {
        let image = RgbaImage::from_pixel(100, 100, Rgba([10, 20, 30, 255]));
        // bottom cap hangs below the image
        let landmarks = Landmarks::from_pixels(&[
            Point::new(10.0, 10.0),
            Point::new(50.0, 5.0),
            Point::new(90.0, 10.0),
            Point::new(90.0, 95.0),
            Point::new(50.0, 130.0),
            Point::new(10.0, 95.0),
        ])
        .unwrap();
        let output = LabelUnwrapper::new(landmarks)
            .with_grid(GridSettings::new(10, 6))
            .unwrap(&image, Rgba([0, 0, 0, 0]))
            .unwrap();

        let (w, h) = output.dimensions();
        assert_eq!(*output.get_pixel(w / 2, h / 2), Rgba([10, 20, 30, 255]));
        assert_eq!(*output.get_pixel(w / 2, h - 1), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_degenerate_top_cap() {
        let mut points = scenario_points();
        points[2] = points[0];
        let unwrapper = LabelUnwrapper::from_percent(&points, 400, 300).unwrap();
        let err = unwrapper.unwrap(&synthetic_image(), Rgb([0, 0, 0])).unwrap_err();
        assert!(matches!(err, UnwrapError::DegenerateGeometry(_)));
    }

    #[test]
    fn test_empty_image_rejected() {
        let unwrapper = LabelUnwrapper::from_percent(&scenario_points(), 400, 300).unwrap();
        let err = unwrapper.unwrap(&RgbImage::new(0, 0), Rgb([0, 0, 0])).unwrap_err();
        assert!(matches!(err, UnwrapError::Configuration(_)));
    }

    #[test]
    fn test_unwarp_label_drops_alpha() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(80, 60, Rgba([1, 2, 3, 4])));
        let output = unwarp_label(&image, &scenario_points()).unwrap();
        let (w, h) = output.dimensions();
        assert_eq!(*output.get_pixel(w / 2, h / 2), Rgb([1, 2, 3]));
    }

    #[test]
    fn test_describe() {
        let unwrapper = LabelUnwrapper::from_percent(&scenario_points(), 400, 300).unwrap();
        let description = unwrapper.describe().unwrap();
        assert_eq!(description.size, LabelSize { width: 503, height: 240 });
        assert_eq!(description.landmarks.len(), 6);
        assert!(!description.top_cap.is_lower);
        assert!(description.bottom_cap.is_lower);
        assert!(description.center_line.vertical);

        let json = serde_json::to_value(&description).unwrap();
        assert_eq!(json["landmarks"][0]["name"], "Top Left");
        assert_eq!(json["landmarks"][0]["x"], 40.0);
        assert_eq!(json["size"]["width"], 503);
    }
}
