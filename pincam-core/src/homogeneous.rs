//! Conversion between Euclidean point lists and homogeneous column vectors

use nalgebra::{Matrix3xX, Matrix4xX, Point2, Point3, Vector4};

use crate::error::{PincamError, Result};

/// Smallest projective depth that can be divided through
pub const MIN_PROJECTIVE_DEPTH: f64 = 1e-10;

/// Convert N points into a 4×N matrix of homogeneous column vectors (w = 1)
pub fn to_projective(points: &[Point3<f64>]) -> Matrix4xX<f64> {
    let columns: Vec<Vector4<f64>> = points.iter().map(|p| p.to_homogeneous()).collect();
    if columns.is_empty() {
        return Matrix4xX::zeros(0);
    }
    Matrix4xX::from_columns(&columns)
}

/// Perspective-divide a 3×N projective matrix into N Euclidean 2D points.
///
/// Zero depth is not checked here and yields infinities; run [`depth_guard`]
/// first when the input may touch the camera's depth plane.
pub fn to_euclidean(projected: &Matrix3xX<f64>) -> Vec<Point2<f64>> {
    projected
        .column_iter()
        .map(|column| Point2::new(column[0] / column[2], column[1] / column[2]))
        .collect()
}

/// Reject the first depth of `polygon` that is too close to zero to divide by
pub fn depth_guard<I>(depths: I, polygon: usize) -> Result<()>
where
    I: IntoIterator<Item = f64>,
{
    for (point, depth) in depths.into_iter().enumerate() {
        if depth.abs() < MIN_PROJECTIVE_DEPTH {
            return Err(PincamError::DegenerateProjection {
                polygon,
                point,
                depth,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_to_projective_appends_ones() {
        let points = [Point3::new(1.0, 2.0, 3.0), Point3::new(-4.0, 5.0, 6.0)];
        let projective = to_projective(&points);
        assert_eq!(projective.ncols(), 2);
        assert_eq!(projective.column(0).into_owned(), Vector4::new(1.0, 2.0, 3.0, 1.0));
        assert_eq!(projective.column(1).into_owned(), Vector4::new(-4.0, 5.0, 6.0, 1.0));
        assert_eq!(to_projective(&[]).ncols(), 0);
    }

    #[test]
    fn test_round_trip_restores_points() {
        // Take x, y and use the homogeneous 1 as depth.
        let points = [
            Point3::new(1.5, -2.0, 0.0),
            Point3::new(0.0, 7.25, 0.0),
            Point3::new(-3.0, 1e-3, 0.0),
        ];
        let projective = to_projective(&points);
        let rows = projective.select_rows(&[0, 1, 3]);
        let planar = Matrix3xX::from_iterator(rows.ncols(), rows.iter().copied());
        let restored = to_euclidean(&planar);

        for (original, restored) in points.iter().zip(&restored) {
            assert_relative_eq!(original.x, restored.x, epsilon = 1e-12);
            assert_relative_eq!(original.y, restored.y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_to_euclidean_divides_by_depth() {
        let projected = Matrix3xX::from_column_slice(&[10.0, 20.0, 5.0, -3.0, 6.0, 3.0]);
        let points = to_euclidean(&projected);
        assert_eq!(points, vec![Point2::new(2.0, 4.0), Point2::new(-1.0, 2.0)]);
    }

    #[test]
    fn test_depth_guard_names_point() {
        let projected = Matrix3xX::from_column_slice(&[1.0, 1.0, 2.0, 1.0, 1.0, 0.0]);
        assert_eq!(
            depth_guard(projected.row(2).iter().copied(), 4),
            Err(PincamError::DegenerateProjection {
                polygon: 4,
                point: 1,
                depth: 0.0
            })
        );

        assert!(depth_guard([2.0, -0.5, 1e-9], 0).is_ok());
    }
}
