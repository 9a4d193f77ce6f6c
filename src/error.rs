//! Error types for the unwrapping pipeline

use thiserror::Error;

/// Errors raised by a single unwrap call.
///
/// Every error is local to the call that produced it; no partial output is
/// returned alongside one.
#[derive(Debug, Error)]
pub enum UnwrapError {
    /// Landmarks or grid settings were missing or malformed
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The landmarks describe a shape the model cannot represent
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// Dense interpolation of the correspondence grid failed
    #[error("interpolation error: {0}")]
    Interpolation(String),
}

pub type Result<T, E = UnwrapError> = std::result::Result<T, E>;
