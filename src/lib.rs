//! label-unwrap - flatten photographed labels on round containers
//!
//! Six landmarks outline a label on a cylindrical or conical container: the
//! two ends of each elliptical cap plus the cap's apex. The label is
//! sampled along both caps into a coarse grid of correspondences, densified
//! with a thin-plate spline and resampled bicubically into a flat image.

pub mod config;
pub mod draw;
pub mod ellipse;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod interpolate;
pub mod landmarks;
pub mod transform;
pub mod unwrap;

pub use config::Config;
pub use ellipse::{sample_arc, EllipseArc, EllipseParams};
pub use error::{Result, UnwrapError};
pub use geometry::{Line, Point, RoiRect};
pub use grid::{CorrespondenceGrid, GridSettings, LabelSize};
pub use interpolate::{DenseMapping, ThinPlateSpline};
pub use landmarks::{CoordinateMode, Landmarks, LANDMARK_COUNT, LANDMARK_NAMES};
pub use unwrap::{unwarp_label, LabelDescription, LabelUnwrapper};
