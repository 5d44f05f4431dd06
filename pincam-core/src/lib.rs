//! Pincam Core - pinhole camera projection
//!
//! Projects batches of world-space polygons through a pinhole camera onto a
//! 2D sensor, orders them for back-to-front drawing, and answers ray queries
//! against the same polygons.

pub mod camera;
pub mod error;
pub mod frustum;
pub mod geometry;
pub mod homogeneous;
pub mod projection;
pub mod ray;
pub mod transform;
pub mod visibility;

// Re-export commonly used types
pub use camera::Camera;
pub use error::{PincamError, Result};
pub use geometry::{Bounds, Plane, Polygon, Polygon2, Ray};
pub use projection::ProjectedPolygon;
pub use ray::{nearest_hit, ray_hit_plane, ray_hit_polygon};
pub use transform::SensorConfig;
pub use visibility::{FaceVisibility, LayeredProjection, ViewFactor};
