//! Error types for the camera core
//!
//! Only conditions that make a result meaningless are errors. Misses in ray
//! queries and degenerate surface normals are ordinary outcomes and are
//! returned as `Option` / [`crate::visibility::ViewFactor`] instead.

use thiserror::Error;

/// Result type alias for camera operations
pub type Result<T> = std::result::Result<T, PincamError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PincamError {
    /// Focal length outside the sensor's supported range
    #[error("focal length {focal_length} is outside [{min}, {max}]")]
    InvalidFocalLength { focal_length: f64, min: f64, max: f64 },

    /// A point landed on the camera's depth plane, so the perspective divide
    /// is undefined
    #[error("point {point} of polygon {polygon} has projective depth {depth}")]
    DegenerateProjection {
        polygon: usize,
        point: usize,
        depth: f64,
    },
}

impl PincamError {
    /// Translate the polygon index of a projection error, e.g. from a
    /// sub-batch back to the caller's batch
    pub(crate) fn remap_polygon<F>(self, remap: F) -> Self
    where
        F: FnOnce(usize) -> usize,
    {
        match self {
            PincamError::DegenerateProjection {
                polygon,
                point,
                depth,
            } => PincamError::DegenerateProjection {
                polygon: remap(polygon),
                point,
                depth,
            },
            other => other,
        }
    }
}
