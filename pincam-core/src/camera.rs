//! Pinhole camera parameters and the views derived from them

use std::f64::consts::FRAC_PI_4;
use std::fmt;

use nalgebra::{Matrix3x4, Matrix4, Point2, Point3};

use crate::error::Result;
use crate::frustum::{
    invert_extrinsic, perspective_geometry, project_camera_sensor_geometry, sensor_plane_2d,
    sensor_plane_3d, view_frustum_geometry,
};
use crate::geometry::{Polygon, Polygon2};
use crate::projection::{project3d, project_batch, ProjectedPolygon};
use crate::ray::sensor_ray_grid;
use crate::transform::{extrinsic, field_of_view, intrinsic_with, projection_with, SensorConfig};
use crate::visibility::{project_by_elevation, project_by_level, LayeredProjection};

/// A pinhole camera.
///
/// Matrices are never stored: every accessor rebuilds them from the current
/// parameters, so changing a field can't leave a stale projection behind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Point3<f64>,
    /// Rotation about world z (radians)
    pub heading: f64,
    /// Rotation about world x (radians), positive looks down
    pub pitch: f64,
    /// Focal length (mm), within the sensor's supported range
    pub focal_length: f64,
    pub sensor: SensorConfig,
}

impl Camera {
    pub const DEFAULT_HEADING: f64 = FRAC_PI_4;
    pub const DEFAULT_PITCH: f64 = FRAC_PI_4;
    pub const DEFAULT_FOCAL_LENGTH: f64 = 18.0;

    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            heading: Self::DEFAULT_HEADING,
            pitch: Self::DEFAULT_PITCH,
            focal_length: Self::DEFAULT_FOCAL_LENGTH,
            sensor: SensorConfig::default(),
        }
    }

    pub fn with_position(self, position: Point3<f64>) -> Self {
        Self { position, ..self }
    }

    pub fn with_heading(self, heading: f64) -> Self {
        Self { heading, ..self }
    }

    pub fn with_pitch(self, pitch: f64) -> Self {
        Self { pitch, ..self }
    }

    pub fn with_focal_length(self, focal_length: f64) -> Self {
        Self {
            focal_length,
            ..self
        }
    }

    pub fn with_sensor(self, sensor: SensorConfig) -> Self {
        Self { sensor, ..self }
    }

    /// World to camera-local transform
    pub fn extrinsic(&self) -> Matrix4<f64> {
        extrinsic(self.heading, self.pitch, &self.position)
    }

    /// Camera-local to world transform
    pub fn inverse_extrinsic(&self) -> Matrix4<f64> {
        invert_extrinsic(&self.extrinsic())
    }

    pub fn intrinsic(&self) -> Result<Matrix3x4<f64>> {
        intrinsic_with(&self.sensor, self.focal_length, Point2::origin())
    }

    /// World to sensor projection. Fails when the focal length is out of range.
    pub fn projection(&self) -> Result<Matrix3x4<f64>> {
        projection_with(
            &self.sensor,
            self.focal_length,
            self.heading,
            self.pitch,
            &self.position,
        )
    }

    pub fn field_of_view(&self) -> f64 {
        field_of_view(self.focal_length, &self.sensor)
    }

    /// Project a batch onto the sensor, farthest polygon first
    pub fn project(&self, polygons: &[Polygon]) -> Result<Vec<ProjectedPolygon>> {
        project_batch(&self.projection()?, polygons)
    }

    /// Perspective-distort one polygon, keeping depth on world y
    pub fn project3d(&self, polygon: &[Point3<f64>]) -> Result<Vec<Point3<f64>>> {
        project3d(&self.projection()?, polygon)
    }

    /// Project a batch level by level, grouping with `key`
    pub fn project_by_level<F>(&self, polygons: &[Polygon], key: F) -> Result<LayeredProjection>
    where
        F: Fn(&[Point3<f64>]) -> f64,
    {
        project_by_level(&self.projection()?, polygons, key)
    }

    /// Project a batch level by level, grouping by mean elevation
    pub fn project_by_elevation(&self, polygons: &[Polygon]) -> Result<LayeredProjection> {
        project_by_elevation(&self.projection()?, polygons)
    }

    pub fn sensor_plane_2d(&self) -> Polygon2 {
        sensor_plane_2d(self.sensor.sensor_plane_half_width)
    }

    pub fn sensor_plane_3d(&self) -> Polygon {
        sensor_plane_3d(self.sensor.sensor_plane_half_width)
    }

    /// Grid of `(resolution + 1)²` points across the camera-local sensor
    pub fn sensor_ray_grid(&self, resolution: usize) -> Vec<Point3<f64>> {
        sensor_ray_grid(&self.sensor_plane_3d(), resolution)
    }

    /// The batch perspective-distorted and placed back around the camera.
    ///
    /// With `show_camera` the camera's sensor is appended as a final surface.
    pub fn view_frustum_geometry(
        &self,
        polygons: &[Polygon],
        show_camera: bool,
    ) -> Result<Vec<Polygon>> {
        let inverse = self.inverse_extrinsic();
        let mut surfaces = view_frustum_geometry(&self.projection()?, &inverse, polygons)?;

        if show_camera {
            surfaces.push(project_camera_sensor_geometry(
                &inverse,
                &self.sensor_plane_3d(),
            ));
        }
        Ok(surfaces)
    }

    /// The batch perspective-distorted in place, with the sensor unmoved at
    /// the origin when `show_camera` is set
    pub fn perspective_geometry(
        &self,
        polygons: &[Polygon],
        show_camera: bool,
    ) -> Result<Vec<Polygon>> {
        let mut surfaces = perspective_geometry(&self.projection()?, polygons)?;
        if show_camera {
            surfaces.push(self.sensor_plane_3d());
        }
        Ok(surfaces)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Point3::origin())
    }
}

impl fmt::Display for Camera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Camera parameters:")?;
        writeln!(
            f,
            "Camera point: [{}, {}, {}]",
            self.position.x, self.position.y, self.position.z
        )?;
        writeln!(f, "Focal length: {}mm", self.focal_length)?;
        writeln!(f, "Heading: {:.2} deg", self.heading.to_degrees())?;
        write!(f, "Pitch: {:.2} deg", self.pitch.to_degrees())
    }
}
