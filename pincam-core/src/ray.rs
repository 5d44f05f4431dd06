//! Ray queries against planes and polygons in world space

use log::debug;
use nalgebra::{Matrix3, Point2, Point3, Unit, Vector3};

use crate::geometry::{centroid, planar_normal, Plane, Polygon, Ray};

/// Where `ray` crosses `plane`.
///
/// `None` when the ray runs parallel to the plane (including rays lying in
/// it) or the crossing is behind the origin. A ray starting on the plane hits
/// at its own origin.
pub fn ray_hit_plane(ray: &Ray, plane: &Plane) -> Option<Point3<f64>> {
    let denom = plane.normal.dot(&ray.direction);
    if denom.abs() <= f64::EPSILON * plane.normal.norm() * ray.direction.norm() {
        return None;
    }

    let t = plane.normal.dot(&(plane.origin - ray.origin)) / denom;
    if t < 0.0 {
        return None;
    }

    Some(ray.at(t))
}

/// Orthonormal frame lying in a polygon's plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneBasis {
    pub origin: Point3<f64>,
    pub x: Unit<Vector3<f64>>,
    pub y: Unit<Vector3<f64>>,
    /// `x × y`, equal to the plane normal
    pub z: Unit<Vector3<f64>>,
}

impl PlaneBasis {
    /// Frame at `origin` whose x axis follows the polygon's first edge that is
    /// not parallel to `normal`
    pub fn new(
        origin: Point3<f64>,
        normal: &Unit<Vector3<f64>>,
        polygon: &[Point3<f64>],
    ) -> Option<Self> {
        let x = polygon.windows(2).find_map(|edge| {
            let direction = edge[1] - edge[0];
            let in_plane = direction - normal.into_inner() * normal.dot(&direction);
            Unit::try_new(in_plane, f64::EPSILON)
        })?;
        let y = Unit::new_normalize(normal.cross(&x.into_inner()));
        let z = Unit::new_normalize(x.cross(&y.into_inner()));

        Some(Self { origin, x, y, z })
    }

    /// Coordinates of `point` in this frame, dropping the out-of-plane axis.
    ///
    /// The basis is orthonormal, so its transpose is its inverse.
    pub fn to_local(&self, point: &Point3<f64>) -> Point2<f64> {
        let basis = Matrix3::from_columns(&[
            self.x.into_inner(),
            self.y.into_inner(),
            self.z.into_inner(),
        ]);
        let local = basis.transpose() * (point - self.origin);
        Point2::new(local.x, local.y)
    }
}

/// Even-odd test of `point` against a closed or open 2D boundary.
///
/// Points exactly on an edge may land either side.
pub fn point_in_polygon(point: &Point2<f64>, boundary: &[Point2<f64>]) -> bool {
    let mut inside = false;
    for (i, a) in boundary.iter().enumerate() {
        let b = boundary[(i + 1) % boundary.len()];
        if (a.y > point.y) != (b.y > point.y) {
            let crossing = a.x + (point.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if point.x < crossing {
                inside = !inside;
            }
        }
    }
    inside
}

/// Where `ray` hits the inside of `polygon`.
///
/// The ray is first intersected with the polygon's supporting plane (through
/// the vertex centroid), then the hit is tested against the boundary in the
/// plane's own 2D frame.
pub fn ray_hit_polygon(ray: &Ray, polygon: &[Point3<f64>]) -> Option<Point3<f64>> {
    let (Some(normal), Some(origin)) = (planar_normal(polygon), centroid(polygon)) else {
        debug!("polygon with {} points has no plane", polygon.len());
        return None;
    };

    let hit = ray_hit_plane(ray, &Plane::new(origin, normal.into_inner()))?;

    let basis = PlaneBasis::new(origin, &normal, polygon)?;
    let boundary: Vec<Point2<f64>> = polygon.iter().map(|p| basis.to_local(p)).collect();

    point_in_polygon(&basis.to_local(&hit), &boundary).then_some(hit)
}

/// Closest polygon hit along `ray`, as the polygon's batch index and the point
pub fn nearest_hit(ray: &Ray, polygons: &[Polygon]) -> Option<(usize, Point3<f64>)> {
    polygons
        .iter()
        .enumerate()
        .filter_map(|(i, polygon)| ray_hit_polygon(ray, polygon).map(|hit| (i, hit)))
        .min_by(|(_, a), (_, b)| {
            let da = (a - ray.origin).norm_squared();
            let db = (b - ray.origin).norm_squared();
            da.total_cmp(&db)
        })
}

/// Grid of `(resolution + 1)²` points covering a square sensor lying in the
/// y = 0 plane, row by row along x.
pub fn sensor_ray_grid(sensor_plane: &[Point3<f64>], resolution: usize) -> Vec<Point3<f64>> {
    if resolution == 0 || sensor_plane.is_empty() {
        return Vec::new();
    }

    let (low, high) = sensor_plane
        .iter()
        .flat_map(|p| [p.x, p.z])
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), v| {
            (low.min(v), high.max(v))
        });
    let step = (high - low) / resolution as f64;

    (0..=resolution)
        .flat_map(|row| {
            (0..=resolution).map(move |col| {
                Point3::new(low + col as f64 * step, 0.0, low + row as f64 * step)
            })
        })
        .collect()
}
