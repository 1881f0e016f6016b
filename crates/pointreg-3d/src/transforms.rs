use glam::{DMat3, DQuat, DVec3};

use crate::linalg::{array33_to_dmat3, dmat3_to_array33};

/// Compute the rotation matrix from an axis and angle.
///
/// # Arguments
///
/// * `axis` - The axis of rotation. It does not need to be normalized.
/// * `angle` - The angle of rotation in radians.
///
/// # Returns
///
/// The row-major rotation matrix, or an error if the axis is a zero vector.
///
/// Example:
///
/// ```
/// use pointreg_3d::transforms::axis_angle_to_rotation_matrix;
///
/// let axis = [1.0, 0.0, 0.0];
/// let angle = std::f64::consts::PI / 2.0;
/// let rotation = axis_angle_to_rotation_matrix(&axis, angle).unwrap();
/// assert!((rotation[1][2] + 1.0).abs() < 1e-12);
/// assert!((rotation[2][1] - 1.0).abs() < 1e-12);
/// ```
pub fn axis_angle_to_rotation_matrix(
    axis: &[f64; 3],
    angle: f64,
) -> Result<[[f64; 3]; 3], &'static str> {
    let axis = DVec3::from_array(*axis);
    let magnitude = axis.length();
    if !magnitude.is_finite() || magnitude < 1e-10 {
        return Err("cannot compute rotation matrix from a zero vector");
    }
    let rotation = DMat3::from_axis_angle(axis / magnitude, angle);
    Ok(dmat3_to_array33(&rotation))
}

/// Recover the axis and angle of a rotation matrix.
///
/// The angle is in `[0, pi]`. For the identity the axis is `[1, 0, 0]` by convention.
///
/// PRECONDITION: rotation is orthonormal with determinant +1.
pub fn rotation_matrix_to_axis_angle(rotation: &[[f64; 3]; 3]) -> ([f64; 3], f64) {
    let quat = DQuat::from_mat3(&array33_to_dmat3(rotation)).normalize();
    // keep the scalar part positive so the angle stays in [0, pi]
    let quat = if quat.w < 0.0 { -quat } else { quat };
    let sin_half = quat.xyz().length();
    let angle = 2.0 * sin_half.atan2(quat.w);
    if sin_half < 1e-15 {
        return ([1.0, 0.0, 0.0], 0.0);
    }
    ((quat.xyz() / sin_half).to_array(), angle)
}

/// Geodesic angle in radians between two rotation matrices.
pub fn rotation_angle_between(r1: &[[f64; 3]; 3], r2: &[[f64; 3]; 3]) -> f64 {
    let relative = array33_to_dmat3(r1).transpose() * array33_to_dmat3(r2);
    rotation_angle(&relative)
}

/// Angle in radians of the rotation represented by `rotation`.
pub(crate) fn rotation_angle(rotation: &DMat3) -> f64 {
    let cos_angle = 0.5 * (rotation.x_axis.x + rotation.y_axis.y + rotation.z_axis.z - 1.0);
    // trace based angles lose precision near zero, use the skew part there
    let skew = DVec3::new(
        rotation.y_axis.z - rotation.z_axis.y,
        rotation.z_axis.x - rotation.x_axis.z,
        rotation.x_axis.y - rotation.y_axis.x,
    );
    let sin_angle = 0.5 * skew.length();
    sin_angle.atan2(cos_angle.clamp(-1.0, 1.0))
}
