//! Camera transformation matrices
//!
//! Every matrix here acts on homogeneous column vectors multiplied on the
//! right. World space is right-handed with "up" on z; camera space has "up"
//! on y and depth on z.

use nalgebra::{Matrix3x4, Matrix4, Point2, Point3, Rotation3, Unit, Vector3};

use crate::error::{PincamError, Result};

/// Shortest supported focal length (mm)
pub const MIN_FOCAL_LENGTH: f64 = 18.0;
/// Longest supported focal length (mm)
pub const MAX_FOCAL_LENGTH: f64 = 70.0;
/// Sensor width in world units (APS-C, 23.6mm)
pub const SENSOR_WORLD_WIDTH: f64 = 23.6;
/// Number of pixels across the sensor
pub const PIXEL_RESOLUTION: f64 = 100.0;
/// Half width of the square used to draw the camera's sensor
pub const SENSOR_PLANE_HALF_WIDTH: f64 = 50.0;

/// Sensor parameters used to build the intrinsic matrix.
///
/// Defaults describe an 18-70mm lens on a square 23.6mm sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorConfig {
    pub min_focal_length: f64,
    pub max_focal_length: f64,
    pub sensor_width: f64,
    pub pixel_resolution: f64,
    pub sensor_plane_half_width: f64,
}

impl SensorConfig {
    /// Fail unless `focal_length` lies within the lens range, inclusive
    pub fn check_focal_length(&self, focal_length: f64) -> Result<()> {
        if (self.min_focal_length..=self.max_focal_length).contains(&focal_length) {
            Ok(())
        } else {
            Err(PincamError::InvalidFocalLength {
                focal_length,
                min: self.min_focal_length,
                max: self.max_focal_length,
            })
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            min_focal_length: MIN_FOCAL_LENGTH,
            max_focal_length: MAX_FOCAL_LENGTH,
            sensor_width: SENSOR_WORLD_WIDTH,
            pixel_resolution: PIXEL_RESOLUTION,
            sensor_plane_half_width: SENSOR_PLANE_HALF_WIDTH,
        }
    }
}

/// Rotation by `angle` radians about the axis through `axis_origin` along
/// `axis_direction`. A zero-length axis gives the identity.
pub fn rotation(
    axis_origin: &Point3<f64>,
    axis_direction: &Vector3<f64>,
    angle: f64,
) -> Matrix4<f64> {
    let Some(axis) = Unit::try_new(*axis_direction, f64::EPSILON) else {
        return Matrix4::identity();
    };

    let rotate = Rotation3::from_axis_angle(&axis, angle).to_homogeneous();
    translation(&axis_origin.coords) * rotate * translation(&-axis_origin.coords)
}

/// Identity with the translation column set to `offset`
pub fn translation(offset: &Vector3<f64>) -> Matrix4<f64> {
    Matrix4::new_translation(offset)
}

/// Multiply transforms left to right, so the last one is applied first
pub fn chain(transforms: &[Matrix4<f64>]) -> Matrix4<f64> {
    transforms
        .iter()
        .fold(Matrix4::identity(), |acc, transform| acc * transform)
}

/// World to camera-local transform: move the camera to the origin, then
/// pitch about x, then turn by heading about z.
pub fn extrinsic(heading: f64, pitch: f64, camera_position: &Point3<f64>) -> Matrix4<f64> {
    let origin = Point3::origin();
    let rz = rotation(&origin, &Vector3::z(), heading);
    let rx = rotation(&origin, &Vector3::x(), pitch);
    let t = translation(&-camera_position.coords);

    chain(&[rz, rx, t])
}

/// Changes from world axes to camera axes: negates x and swaps y with z
#[rustfmt::skip]
pub fn world_to_camera_flip() -> Matrix4<f64> {
    Matrix4::new(
        -1.0, 0.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// The flip is a signed permutation that is its own inverse
pub fn camera_to_world_flip() -> Matrix4<f64> {
    world_to_camera_flip()
}

/// Angle `atan(focal_length / sensor_width)` on the configured sensor.
///
/// Grows with focal length.
pub fn field_of_view(focal_length: f64, config: &SensorConfig) -> f64 {
    (focal_length / config.sensor_width).atan()
}

/// Camera-local to sensor transform with the default sensor
pub fn intrinsic(focal_length: f64, principal_point: Point2<f64>) -> Result<Matrix3x4<f64>> {
    intrinsic_with(&SensorConfig::default(), focal_length, principal_point)
}

/// Camera-local to sensor transform.
///
/// ```text
/// u = x * s + z * px
/// v = y * s + z * py
/// w = z
/// ```
///
/// Pixels are square, so one scale `s` serves both axes.
pub fn intrinsic_with(
    config: &SensorConfig,
    focal_length: f64,
    principal_point: Point2<f64>,
) -> Result<Matrix3x4<f64>> {
    config.check_focal_length(focal_length)?;
    let pixel_width = config.sensor_width / config.pixel_resolution;
    let scale = focal_length * config.sensor_width * pixel_width;
    let (px, py) = (principal_point.x, principal_point.y);

    #[rustfmt::skip]
    let k = Matrix3x4::new(
        scale, 0.0, px, 0.0,
        0.0, scale, py, 0.0,
        0.0, 0.0, 1.0, 0.0,
    );
    Ok(k)
}

/// Full world to sensor projection with the default sensor
pub fn projection(
    focal_length: f64,
    heading: f64,
    pitch: f64,
    camera_position: &Point3<f64>,
) -> Result<Matrix3x4<f64>> {
    projection_with(
        &SensorConfig::default(),
        focal_length,
        heading,
        pitch,
        camera_position,
    )
}

/// `K * flip * Rt`: the single matrix taking homogeneous world points to
/// projective sensor coordinates
pub fn projection_with(
    config: &SensorConfig,
    focal_length: f64,
    heading: f64,
    pitch: f64,
    camera_position: &Point3<f64>,
) -> Result<Matrix3x4<f64>> {
    let k = intrinsic_with(config, focal_length, Point2::origin())?;
    let rt = extrinsic(heading, pitch, camera_position);

    Ok(k * world_to_camera_flip() * rt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    #[test]
    fn test_rotation_about_z() {
        let r = rotation(&Point3::origin(), &Vector3::z(), FRAC_PI_2);
        let p = r.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_about_offset_axis() {
        // Half turn about the vertical line through (1, 1, 0)
        let r = rotation(&Point3::new(1.0, 1.0, 0.0), &Vector3::new(0.0, 0.0, 2.0), PI);
        let p = r.transform_point(&Point3::new(2.0, 1.0, 5.0));
        assert_relative_eq!(p, Point3::new(0.0, 1.0, 5.0), epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_zero_axis_is_identity() {
        let r = rotation(&Point3::new(3.0, 2.0, 1.0), &Vector3::zeros(), 1.0);
        assert_eq!(r, Matrix4::identity());
    }

    #[test]
    fn test_translation() {
        let t = translation(&Vector3::new(1.0, -2.0, 3.0));
        let p = t.transform_point(&Point3::origin());
        assert_eq!(p, Point3::new(1.0, -2.0, 3.0));
    }

    #[test]
    fn test_chain_applies_last_first() {
        let t = translation(&Vector3::new(1.0, 0.0, 0.0));
        let r = rotation(&Point3::origin(), &Vector3::z(), FRAC_PI_2);
        let p = chain(&[r, t]).transform_point(&Point3::origin());
        assert_relative_eq!(p, Point3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
        assert_eq!(chain(&[]), Matrix4::identity());
    }

    #[test]
    fn test_extrinsic_moves_camera_to_origin() {
        let camera = Point3::new(4.0, -3.0, 7.5);
        let rt = extrinsic(0.7, -0.3, &camera);
        assert_relative_eq!(rt.transform_point(&camera), Point3::origin(), epsilon = 1e-12);
    }

    #[test]
    fn test_extrinsic_rotation_is_orthogonal() {
        let cases = [
            (0.0, 0.0, Point3::new(0.0, 0.0, 0.0)),
            (FRAC_PI_4, FRAC_PI_4, Point3::new(-10.0, -10.0, 10.0)),
            (2.5, -1.1, Point3::new(3.0, 14.0, -2.0)),
            (-0.4, 3.0, Point3::new(0.5, 0.25, 100.0)),
        ];

        for (heading, pitch, position) in cases {
            let rt = extrinsic(heading, pitch, &position);
            let r = rt.fixed_view::<3, 3>(0, 0);
            assert_relative_eq!(r * r.transpose(), nalgebra::Matrix3::identity(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_flip_is_self_inverse() {
        let flip = camera_to_world_flip();
        assert_eq!(flip * flip, Matrix4::identity());
        assert_eq!(flip, world_to_camera_flip());

        // World up becomes camera up
        let up = world_to_camera_flip().transform_vector(&Vector3::z());
        assert_eq!(up, Vector3::y());
    }

    #[test]
    fn test_intrinsic_focal_length_bounds() {
        for focal_length in [10.0, 100.0, 17.999, 70.001] {
            assert_eq!(
                intrinsic(focal_length, Point2::origin()),
                Err(PincamError::InvalidFocalLength {
                    focal_length,
                    min: 18.0,
                    max: 70.0
                })
            );
        }
        assert!(intrinsic(18.0, Point2::origin()).is_ok());
        assert!(intrinsic(70.0, Point2::origin()).is_ok());
    }

    #[test]
    fn test_intrinsic_layout() {
        let k = intrinsic(18.0, Point2::new(2.0, -3.0)).unwrap();
        let scale = 18.0 * 23.6 * 0.236;
        assert_relative_eq!(k[(0, 0)], scale, epsilon = 1e-9);
        assert_relative_eq!(k[(1, 1)], scale, epsilon = 1e-9);
        assert_eq!(k[(0, 2)], 2.0);
        assert_eq!(k[(1, 2)], -3.0);
        assert_eq!(k[(2, 2)], 1.0);
        assert_eq!(k.column(3).sum(), 0.0);
    }

    #[test]
    fn test_custom_sensor_config() {
        let config = SensorConfig {
            min_focal_length: 10.0,
            max_focal_length: 200.0,
            ..SensorConfig::default()
        };
        assert!(intrinsic_with(&config, 100.0, Point2::origin()).is_ok());
        assert!(intrinsic_with(&config, 5.0, Point2::origin()).is_err());
    }

    #[test]
    fn test_field_of_view_grows_with_focal_length() {
        let config = SensorConfig::default();
        assert!(field_of_view(18.0, &config) < field_of_view(70.0, &config));
        assert_relative_eq!(field_of_view(23.6, &config), FRAC_PI_4, epsilon = 1e-12);
    }

    #[test]
    fn test_projection_depth_is_forward_distance() {
        // Unrotated camera looks down world +y
        let p = projection(18.0, 0.0, 0.0, &Point3::new(0.0, -2.0, 0.0)).unwrap();
        let projected = p * Point3::new(0.0, 8.0, 0.0).to_homogeneous();
        assert_relative_eq!(projected[2], 10.0, epsilon = 1e-12);
        assert_relative_eq!(projected[0], 0.0, epsilon = 1e-12);

        assert!(projection(71.0, 0.0, 0.0, &Point3::origin()).is_err());
    }
}
