//! Geometry primitives shared by the projection and ray modules

use nalgebra::{Point2, Point3, Unit, Vector3};

/// An ordered boundary of 3D points. The loop may be closed by repeating the
/// first point; callers should be consistent within a batch.
pub type Polygon = Vec<Point3<f64>>;

/// An ordered boundary of 2D points
pub type Polygon2 = Vec<Point2<f64>>;

/// A half-line starting at `origin`. `direction` does not need to be unit length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f64>,
    pub direction: Vector3<f64>,
}

impl Ray {
    pub fn new(origin: Point3<f64>, direction: Vector3<f64>) -> Self {
        Self { origin, direction }
    }

    /// Point at parameter `t` along the ray
    pub fn at(&self, t: f64) -> Point3<f64> {
        self.origin + self.direction * t
    }
}

/// An infinite plane through `origin`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub origin: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl Plane {
    pub fn new(origin: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self { origin, normal }
    }
}

/// Axis-aligned bounds of a point set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Bounds {
    /// Bounds of every point in every polygon, or `None` for an empty set
    pub fn of_polygons<'a, I>(polygons: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Polygon>,
    {
        let mut points = polygons.into_iter().flat_map(|polygon| polygon.iter());
        let first = *points.next()?;

        Some(points.fold(
            Self {
                min: first,
                max: first,
            },
            |bounds, p| Self {
                min: bounds.min.inf(p),
                max: bounds.max.sup(p),
            },
        ))
    }
}

/// Mean of the polygon's vertices
pub fn centroid(polygon: &[Point3<f64>]) -> Option<Point3<f64>> {
    if polygon.is_empty() {
        return None;
    }

    let sum = polygon
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum / polygon.len() as f64))
}

/// Mean z of the polygon's vertices, the default key for grouping levels
pub fn mean_elevation(polygon: &[Point3<f64>]) -> f64 {
    centroid(polygon).map_or(0.0, |c| c.z)
}

/// Plane normal of a (possibly non-convex) polygon using Newell's method.
///
/// Returns `None` when the polygon encloses no area. A repeated closing point
/// contributes nothing, so open and closed loops give the same normal.
pub fn planar_normal(polygon: &[Point3<f64>]) -> Option<Unit<Vector3<f64>>> {
    if polygon.len() < 3 {
        return None;
    }

    let mut normal = Vector3::zeros();
    for (i, current) in polygon.iter().enumerate() {
        let next = polygon[(i + 1) % polygon.len()];
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }

    Unit::try_new(normal, f64::EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> Polygon {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_planar_normal_follows_winding() {
        let square = unit_square();
        let normal = planar_normal(&square).unwrap();
        assert_relative_eq!(normal.into_inner(), Vector3::z(), epsilon = 1e-12);

        let reversed: Polygon = square.into_iter().rev().collect();
        let normal = planar_normal(&reversed).unwrap();
        assert_relative_eq!(normal.into_inner(), -Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_planar_normal_ignores_closing_point() {
        let mut closed = unit_square();
        closed.push(closed[0]);
        let normal = planar_normal(&closed).unwrap();
        assert_relative_eq!(normal.into_inner(), Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_planar_normal_rejects_collinear() {
        let line = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        assert!(planar_normal(&line).is_none());
        assert!(planar_normal(&line[..2]).is_none());
    }

    #[test]
    fn test_centroid_and_bounds() {
        let square = unit_square();
        assert_eq!(centroid(&square), Some(Point3::new(0.5, 0.5, 0.0)));
        assert_eq!(centroid(&[]), None);

        let raised: Polygon = square.iter().map(|p| p + Vector3::new(0.0, 0.0, 3.0)).collect();
        let bounds = Bounds::of_polygons([&square, &raised]).unwrap();
        assert_eq!(bounds.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(bounds.max, Point3::new(1.0, 1.0, 3.0));
        assert_eq!(mean_elevation(&raised), 3.0);
    }

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -2.0));
        assert_eq!(ray.at(2.5), Point3::origin());
    }
}
