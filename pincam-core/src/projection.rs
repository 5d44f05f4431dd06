//! Batch projection and painter's-algorithm ordering

use log::trace;
use nalgebra::{Matrix3x4, Matrix4xX, Point2, Point3};

use crate::error::Result;
use crate::geometry::Polygon;
use crate::homogeneous::{depth_guard, to_euclidean, to_projective};
use crate::transform::camera_to_world_flip;

/// A polygon after projection onto the sensor
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedPolygon {
    /// Position of the polygon in the batch it was projected from
    pub source_index: usize,
    /// Largest projective depth among the polygon's points
    pub max_depth: f64,
    /// Perspective-divided sensor coordinates, in input order
    pub points: Vec<Point2<f64>>,
}

impl ProjectedPolygon {
    /// The boundary as a closed ring, repeating the first point at the end
    /// unless it already is.
    pub fn closed_ring(&self) -> Vec<Point2<f64>> {
        let mut ring = self.points.clone();
        if let (Some(first), Some(last)) = (ring.first().copied(), ring.last()) {
            if first != *last {
                ring.push(first);
            }
        }
        ring
    }
}

/// Concatenate a batch into one homogeneous point matrix.
///
/// Returns the matrix and the exclusive end column of every polygon, i.e. the
/// running total of point counts.
pub fn stack(polygons: &[Polygon]) -> (Matrix4xX<f64>, Vec<usize>) {
    let ends = polygons
        .iter()
        .scan(0, |total, polygon| {
            *total += polygon.len();
            Some(*total)
        })
        .collect();
    let points: Vec<Point3<f64>> = polygons.iter().flatten().copied().collect();

    (to_projective(&points), ends)
}

/// Project a batch with one matrix multiply and order it far to near.
///
/// Polygons are sorted by descending maximum depth; equal depths keep batch
/// order. An empty polygon has depth `-inf` and so is drawn last. Any point
/// on the camera's depth plane fails the whole batch, naming the polygon.
pub fn project_batch(p: &Matrix3x4<f64>, polygons: &[Polygon]) -> Result<Vec<ProjectedPolygon>> {
    let (stacked, ends) = stack(polygons);
    trace!(
        "projecting {} polygons ({} points)",
        polygons.len(),
        stacked.ncols()
    );

    if stacked.ncols() == 0 {
        return Ok((0..polygons.len())
            .map(|source_index| ProjectedPolygon {
                source_index,
                max_depth: f64::NEG_INFINITY,
                points: Vec::new(),
            })
            .collect());
    }

    let projected = p * stacked;

    let mut start = 0;
    let mut depths = Vec::with_capacity(ends.len());
    for (index, &end) in ends.iter().enumerate() {
        let row = projected.row(2);
        let polygon_depths = row.columns(start, end - start);
        depth_guard(polygon_depths.iter().copied(), index)?;
        depths.push(polygon_depths.iter().copied().fold(f64::NEG_INFINITY, f64::max));
        start = end;
    }

    let euclidean = to_euclidean(&projected);

    let mut start = 0;
    let mut ordered: Vec<ProjectedPolygon> = ends
        .iter()
        .zip(depths)
        .enumerate()
        .map(|(source_index, (&end, max_depth))| {
            let points = euclidean[start..end].to_vec();
            start = end;
            ProjectedPolygon {
                source_index,
                max_depth,
                points,
            }
        })
        .collect();

    ordered.sort_by(|a, b| b.max_depth.total_cmp(&a.max_depth));
    Ok(ordered)
}

/// Project one polygon into the perspective-distorted 3D frame.
///
/// x and y are divided by depth and the raw depth is kept as the third
/// coordinate, then the result is flipped back to world axes: each point
/// becomes `(-u/w, w, v/w)`. Depth therefore always runs along world y.
pub fn project3d(p: &Matrix3x4<f64>, polygon: &[Point3<f64>]) -> Result<Vec<Point3<f64>>> {
    project3d_indexed(p, polygon, 0)
}

/// [`project3d`] reporting failures against `index` in the caller's batch
pub(crate) fn project3d_indexed(
    p: &Matrix3x4<f64>,
    polygon: &[Point3<f64>],
    index: usize,
) -> Result<Vec<Point3<f64>>> {
    if polygon.is_empty() {
        return Ok(Vec::new());
    }

    let projected = p * to_projective(polygon);
    depth_guard(projected.row(2).iter().copied(), index)?;

    let flip = camera_to_world_flip();
    Ok(projected
        .column_iter()
        .map(|column| {
            let w = column[2];
            flip.transform_point(&Point3::new(column[0] / w, column[1] / w, w))
        })
        .collect())
}
