//! Mapping camera-local geometry back into the world

use nalgebra::{Matrix3x4, Matrix4, Point2, Point3};

use crate::error::Result;
use crate::geometry::{Polygon, Polygon2};
use crate::projection::project3d_indexed;

/// Inverse of the translation part of an extrinsic matrix
fn invert_translation(rt: &Matrix4<f64>) -> Matrix4<f64> {
    let mut inverse = Matrix4::identity();
    let t = rt.fixed_view::<3, 1>(0, 3);
    inverse.fixed_view_mut::<3, 1>(0, 3).copy_from(&(-t));
    inverse
}

/// Inverse of the rotation part of an extrinsic matrix
fn invert_rotation(rt: &Matrix4<f64>) -> Matrix4<f64> {
    let mut inverse = Matrix4::identity();
    let r = rt.fixed_view::<3, 3>(0, 0);
    inverse.fixed_view_mut::<3, 3>(0, 0).copy_from(&r.transpose());
    inverse
}

/// Invert a rigid extrinsic matrix.
///
/// The translation is undone first and the rotation second. Both halves are
/// inverted separately, so `rt` must be a rotation followed by a translation
/// with no scale or shear.
pub fn invert_extrinsic(rt: &Matrix4<f64>) -> Matrix4<f64> {
    invert_rotation(rt) * invert_translation(rt)
}

/// Camera sensor outline in the camera's own 2D frame, as a closed square
pub fn sensor_plane_2d(half_width: f64) -> Polygon2 {
    [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0), (-1.0, -1.0)]
        .iter()
        .map(|&(x, y)| Point2::new(x * half_width, y * half_width))
        .collect()
}

/// Camera sensor outline standing in the camera's y = 0 plane, as a closed
/// square
pub fn sensor_plane_3d(half_width: f64) -> Polygon {
    [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0), (-1.0, -1.0)]
        .iter()
        .map(|&(x, z)| Point3::new(x * half_width, 0.0, z * half_width))
        .collect()
}

/// Place camera-local sensor geometry in the world using an inverse extrinsic
pub fn project_camera_sensor_geometry(
    inverse_extrinsic: &Matrix4<f64>,
    sensor_plane: &[Point3<f64>],
) -> Polygon {
    sensor_plane
        .iter()
        .map(|p| inverse_extrinsic.transform_point(p))
        .collect()
}

/// Perspective-distort a batch with [`crate::projection::project3d`] and move
/// it back through `inverse_extrinsic`, so the view frustum can be drawn
/// around the camera.
pub fn view_frustum_geometry(
    p: &Matrix3x4<f64>,
    inverse_extrinsic: &Matrix4<f64>,
    polygons: &[Polygon],
) -> Result<Vec<Polygon>> {
    polygons
        .iter()
        .enumerate()
        .map(|(i, polygon)| {
            let distorted = project3d_indexed(p, polygon, i)?;
            Ok(project_camera_sensor_geometry(inverse_extrinsic, &distorted))
        })
        .collect()
}

/// Perspective-distort a batch with [`crate::projection::project3d`], leaving
/// it in the distorted frame
pub fn perspective_geometry(p: &Matrix3x4<f64>, polygons: &[Polygon]) -> Result<Vec<Polygon>> {
    polygons
        .iter()
        .enumerate()
        .map(|(i, polygon)| project3d_indexed(p, polygon, i))
        .collect()
}
