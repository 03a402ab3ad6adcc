//! Transform composition: (translation, rotation, scale) -> local bone matrix.
//!
//! Composition is `T × R × S`. Matrices cross the wire as row-major
//! `[f32; 16]`; `glam` stores column-major, so conversion happens here only.

use glam::{Mat3, Mat4, Quat, Vec3};
use rigport_shared::MATRIX_LEN;
use serde::Deserialize;

/// Order in which Euler axis rotations are applied to a point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EulerOrder {
    XYZ,
    XZY,
    YXZ,
    YZX,
    ZXY,
    ZYX,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum RotationMode {
    #[default]
    Quaternion,
    Euler(EulerOrder),
}

impl std::str::FromStr for RotationMode {
    type Err = String;

    /// Parse Blender's rotation mode names (`"QUATERNION"`, `"XYZ"`, ...)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let order = match s {
            "QUATERNION" => return Ok(RotationMode::Quaternion),
            "XYZ" => EulerOrder::XYZ,
            "XZY" => EulerOrder::XZY,
            "YXZ" => EulerOrder::YXZ,
            "YZX" => EulerOrder::YZX,
            "ZXY" => EulerOrder::ZXY,
            "ZYX" => EulerOrder::ZYX,
            other => return Err(format!("unsupported rotation mode '{other}'")),
        };
        Ok(RotationMode::Euler(order))
    }
}

impl TryFrom<String> for RotationMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Rotation channels of a bone at one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rotation {
    /// Radians about X, Y and Z
    Euler([f32; 3], EulerOrder),
    /// `[w, x, y, z]`, used as given
    Quaternion([f32; 4]),
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
    Z,
}

fn axis_rotation(axis: Axis, angle: f32) -> Mat3 {
    match axis {
        Axis::X => Mat3::from_rotation_x(angle),
        Axis::Y => Mat3::from_rotation_y(angle),
        Axis::Z => Mat3::from_rotation_z(angle),
    }
}

/// Rotation matrix for Euler angles. The first axis of `order` is applied first,
/// so `XYZ` gives `Rz · Ry · Rx`.
pub fn euler_matrix(angles: [f32; 3], order: EulerOrder) -> Mat3 {
    use Axis::*;
    let [x, y, z] = angles;
    let (first, second, third) = match order {
        EulerOrder::XYZ => ((X, x), (Y, y), (Z, z)),
        EulerOrder::XZY => ((X, x), (Z, z), (Y, y)),
        EulerOrder::YXZ => ((Y, y), (X, x), (Z, z)),
        EulerOrder::YZX => ((Y, y), (Z, z), (X, x)),
        EulerOrder::ZXY => ((Z, z), (X, x), (Y, y)),
        EulerOrder::ZYX => ((Z, z), (Y, y), (X, x)),
    };
    axis_rotation(third.0, third.1)
        * axis_rotation(second.0, second.1)
        * axis_rotation(first.0, first.1)
}

fn rotation_matrix(rotation: Rotation) -> Mat3 {
    match rotation {
        Rotation::Euler(angles, order) => euler_matrix(angles, order),
        Rotation::Quaternion([w, x, y, z]) => Mat3::from_quat(Quat::from_xyzw(x, y, z, w)),
    }
}

/// Compose a local bone matrix as `T × R × S`
pub fn compose(translation: [f32; 3], rotation: Rotation, scale: [f32; 3]) -> Mat4 {
    Mat4::from_translation(Vec3::from_array(translation))
        * Mat4::from_mat3(rotation_matrix(rotation))
        * Mat4::from_scale(Vec3::from_array(scale))
}

/// Flatten a matrix to 16 row-major floats
pub fn to_row_major(m: Mat4) -> [f32; MATRIX_LEN] {
    m.transpose().to_cols_array()
}

/// Build a matrix from 16 row-major floats
pub fn from_row_major(values: &[f32; MATRIX_LEN]) -> Mat4 {
    Mat4::from_cols_array(values).transpose()
}
