//! Draw ordering without a depth buffer
//!
//! [`crate::projection::project_batch`] already sorts a batch far to near by
//! maximum depth. That breaks down for stacked horizontal levels (building
//! storeys, slabs) whose faces share a depth range, so levels are ordered
//! with the view-factor heuristic here: the inside faces of a level's
//! bounding box tell whether the camera looks down on it, up at it, or is
//! level with it.
//!
//! The heuristic works in the frame produced by
//! [`crate::projection::project3d`], where projective depth always runs along
//! +y. The forward vector is therefore the fixed `(0, 1, 0)` whatever the
//! camera's heading and pitch.

use log::{debug, trace, warn};
use nalgebra::{Matrix3x4, Point3, Unit, Vector3};

use crate::error::Result;
use crate::geometry::{mean_elevation, Bounds, Polygon};
use crate::projection::{project3d, project_batch, ProjectedPolygon};

/// Cross products shorter than this have no usable direction
pub const NORMAL_TOLERANCE: f64 = 1e-10;

/// Grouping keys closer than this belong to the same level
pub const LEVEL_TOLERANCE: f64 = 1e-10;

/// Forward direction of the camera in the perspective-distorted frame
pub fn camera_forward() -> Vector3<f64> {
    Vector3::y()
}

/// Unit normal from the first three points, `(p1 - p0) x (p2 - p1)`.
///
/// `None` when there are fewer than three points or they are (nearly)
/// collinear.
pub fn surface_normal(surface: &[Point3<f64>]) -> Option<Unit<Vector3<f64>>> {
    let [p0, p1, p2] = surface.get(..3)? else {
        return None;
    };

    let normal = (p1 - p0).cross(&(p2 - p1));
    Unit::try_new(normal, NORMAL_TOLERANCE)
}

/// How directly a surface faces the camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewFactor {
    /// Dot product of the surface normal with the reversed forward vector,
    /// in `[-1, 1]`; positive means the surface faces the camera
    Facing(f64),
    /// The projected surface had no usable normal.
    ///
    /// Treated as visible. This is a heuristic: a zero-area projection says
    /// nothing about orientation.
    Degenerate,
    /// A corner of the surface lies on the camera's depth plane, so it has no
    /// perspective image. Never visible.
    Unprojectable,
}

impl ViewFactor {
    /// Scalar stand-in for [`ViewFactor::Degenerate`]
    pub const DEGENERATE_VALUE: f64 = 1.0;

    pub fn value(&self) -> f64 {
        match self {
            ViewFactor::Facing(value) => *value,
            ViewFactor::Degenerate => Self::DEGENERATE_VALUE,
            ViewFactor::Unprojectable => f64::NAN,
        }
    }

    /// NaN for [`ViewFactor::Unprojectable`], so it compares below everything
    pub fn is_visible(&self) -> bool {
        self.value() > 0.0
    }
}

/// View factor of a world-space surface under projection `p`.
///
/// Assumes a 180 degree field of view: anything facing the camera counts,
/// even if it is outside the sensor.
pub fn view_factor(p: &Matrix3x4<f64>, surface: &[Point3<f64>]) -> Result<ViewFactor> {
    let distorted = project3d(p, surface)?;

    Ok(match surface_normal(&distorted) {
        Some(normal) => ViewFactor::Facing(normal.dot(&-camera_forward())),
        None => {
            debug!("degenerate projected normal, treating surface as visible");
            ViewFactor::Degenerate
        }
    })
}

/// Bottom and top faces of an axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxFaces {
    pub bottom: [Point3<f64>; 4],
    pub top: [Point3<f64>; 4],
}

impl BoxFaces {
    /// The same faces wound so their normals point into the box
    pub fn inward(&self) -> Self {
        let mut bottom = self.bottom;
        let mut top = self.top;
        bottom.reverse();
        top.reverse();
        Self { bottom, top }
    }
}

/// Bottom and top faces of the bounding box of a batch, with normals pointing
/// out of the box. `None` for a batch without points.
pub fn bounding_box_faces(polygons: &[Polygon]) -> Option<BoxFaces> {
    let Bounds { min, max } = Bounds::of_polygons(polygons)?;

    Some(BoxFaces {
        bottom: [
            Point3::new(min.x, max.y, min.z),
            Point3::new(max.x, max.y, min.z),
            Point3::new(max.x, min.y, min.z),
            Point3::new(min.x, min.y, min.z),
        ],
        top: [
            Point3::new(min.x, min.y, max.z),
            Point3::new(max.x, min.y, max.z),
            Point3::new(max.x, max.y, max.z),
            Point3::new(min.x, max.y, max.z),
        ],
    })
}

/// Which inside faces of a bounding box the camera can see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceVisibility {
    /// Camera sits between the bottom and top
    Both,
    /// Camera looks down onto the floor
    Bottom,
    /// Camera looks up at the ceiling
    Top,
    /// Neither face is oriented toward the camera, usually because the camera
    /// is too close to the geometry
    Neither,
}

impl FaceVisibility {
    pub fn from_flags(bottom: bool, top: bool) -> Self {
        match (bottom, top) {
            (true, true) => FaceVisibility::Both,
            (true, false) => FaceVisibility::Bottom,
            (false, true) => FaceVisibility::Top,
            (false, false) => FaceVisibility::Neither,
        }
    }
}

/// View factors of the inside bottom and top faces of a bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceView {
    pub bottom: ViewFactor,
    pub top: ViewFactor,
}

impl FaceView {
    pub fn visibility(&self) -> FaceVisibility {
        FaceVisibility::from_flags(self.bottom.is_visible(), self.top.is_visible())
    }
}

/// View factors for the bounding box of `polygons`, `None` without points.
///
/// Box corners are not caller geometry, so a face that can't be projected is
/// reported as [`ViewFactor::Unprojectable`] rather than as an error.
pub fn face_view(p: &Matrix3x4<f64>, polygons: &[Polygon]) -> Option<FaceView> {
    let inward = bounding_box_faces(polygons)?.inward();

    Some(FaceView {
        bottom: box_face_factor(p, &inward.bottom),
        top: box_face_factor(p, &inward.top),
    })
}

fn box_face_factor(p: &Matrix3x4<f64>, face: &[Point3<f64>]) -> ViewFactor {
    view_factor(p, face).unwrap_or_else(|err| {
        debug!("bounding box face not projectable ({}), treating as hidden", err);
        ViewFactor::Unprojectable
    })
}

/// Polygons sharing a grouping key, e.g. one storey of a building
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    /// Key of the first polygon assigned to the level
    pub key: f64,
    /// Indices into the batch, ascending
    pub members: Vec<usize>,
}

/// Group a batch by `key`, merging keys within `tolerance`.
///
/// Levels come out in ascending key order.
pub fn group_levels<F>(polygons: &[Polygon], key: F, tolerance: f64) -> Vec<Level>
where
    F: Fn(&[Point3<f64>]) -> f64,
{
    let mut keyed: Vec<(usize, f64)> = polygons
        .iter()
        .enumerate()
        .map(|(i, polygon)| (i, key(polygon.as_slice())))
        .collect();
    keyed.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut levels: Vec<Level> = Vec::new();
    for (index, value) in keyed {
        let current = levels
            .last_mut()
            .filter(|level| (value - level.key).abs() <= tolerance);
        if let Some(level) = current {
            level.members.push(index);
        } else {
            levels.push(Level {
                key: value,
                members: vec![index],
            });
        }
    }

    for level in &mut levels {
        level.members.sort_unstable();
    }
    levels
}

/// Draw order of the levels in a batch
#[derive(Debug, Clone, PartialEq)]
pub struct LevelOrdering {
    /// Visibility of the whole batch's bounding box
    pub visibility: FaceVisibility,
    /// Levels in draw order
    pub levels: Vec<Level>,
}

/// Arrange levels (given in ascending key order) into draw order.
///
/// With both faces in view each level is classified on its own and the
/// levels are bucketed: levels seen from above are drawn top-down, levels seen
/// from below next to them, and levels the camera is inside last. Which of the
/// first two buckets leads is decided by which face the camera sees more of.
pub fn arrange_levels<F>(
    view: &FaceView,
    levels: Vec<Level>,
    mut classify: F,
) -> Result<Vec<Level>>
where
    F: FnMut(&Level) -> Result<FaceVisibility>,
{
    match view.visibility() {
        FaceVisibility::Both => {
            let mut below = Vec::new();
            let mut above = Vec::new();
            let mut inside = Vec::new();
            for level in levels {
                match classify(&level)? {
                    FaceVisibility::Both => inside.push(level),
                    FaceVisibility::Top => above.push(level),
                    FaceVisibility::Bottom | FaceVisibility::Neither => below.push(level),
                }
            }
            below.reverse();

            let mut ordered = if view.top.value() > view.bottom.value() {
                above.into_iter().chain(below).collect::<Vec<_>>()
            } else {
                below.into_iter().chain(above).collect::<Vec<_>>()
            };
            ordered.extend(inside);
            Ok(ordered)
        }
        FaceVisibility::Bottom => Ok(levels),
        FaceVisibility::Top => Ok(levels.into_iter().rev().collect()),
        FaceVisibility::Neither => {
            warn!("nothing in view, check whether the camera is too close to the geometry");
            Ok(levels)
        }
    }
}

/// Group a batch into levels by `key` and put the levels in draw order
pub fn order_levels<F>(p: &Matrix3x4<f64>, polygons: &[Polygon], key: F) -> Result<LevelOrdering>
where
    F: Fn(&[Point3<f64>]) -> f64,
{
    let levels = group_levels(polygons, key, LEVEL_TOLERANCE);
    let Some(view) = face_view(p, polygons) else {
        return Ok(LevelOrdering {
            visibility: FaceVisibility::Neither,
            levels,
        });
    };

    let visibility = view.visibility();
    trace!(
        "{} levels, bottom factor {}, top factor {}, {:?}",
        levels.len(),
        view.bottom.value(),
        view.top.value(),
        visibility
    );

    let levels = arrange_levels(&view, levels, |level| {
        let members = subset(polygons, &level.members);
        Ok(face_view(p, &members).map_or(FaceVisibility::Neither, |view| view.visibility()))
    })?;

    Ok(LevelOrdering { visibility, levels })
}

/// Projected batch ordered level by level
#[derive(Debug, Clone, PartialEq)]
pub struct LayeredProjection {
    /// [`FaceVisibility::Neither`] means nothing was found facing the
    /// camera; the polygons are still projected so the caller can decide
    pub visibility: FaceVisibility,
    /// Draw order; each level is itself ordered far to near
    pub polygons: Vec<ProjectedPolygon>,
}

/// Order a batch by level, then project each level far to near.
///
/// Source indices and errors refer to positions in `polygons`.
pub fn project_by_level<F>(
    p: &Matrix3x4<f64>,
    polygons: &[Polygon],
    key: F,
) -> Result<LayeredProjection>
where
    F: Fn(&[Point3<f64>]) -> f64,
{
    let ordering = order_levels(p, polygons, key)?;

    let mut projected = Vec::with_capacity(polygons.len());
    for level in &ordering.levels {
        let members = subset(polygons, &level.members);
        let level_projection = project_batch(p, &members)
            .map_err(|err| err.remap_polygon(|local| level.members[local]))?;

        projected.extend(level_projection.into_iter().map(|mut polygon| {
            polygon.source_index = level.members[polygon.source_index];
            polygon
        }));
    }

    Ok(LayeredProjection {
        visibility: ordering.visibility,
        polygons: projected,
    })
}

/// [`project_by_level`] grouping by mean elevation
pub fn project_by_elevation(p: &Matrix3x4<f64>, polygons: &[Polygon]) -> Result<LayeredProjection> {
    project_by_level(p, polygons, mean_elevation)
}

fn subset(polygons: &[Polygon], members: &[usize]) -> Vec<Polygon> {
    members.iter().map(|&i| polygons[i].clone()).collect()
}
