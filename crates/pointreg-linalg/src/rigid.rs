//! Rigid alignment of matched point sets (Kabsch / Arun and Horn)

use glam::{DMat3, DQuat, DVec3};
use pointreg_3d::rigid::RigidTransform;
use thiserror::Error;

use crate::eigen::symmetric_eigen4;
use crate::svd::svd3;

/// Ratio between the two largest principal spreads below which a point set is collinear.
const COLLINEAR_TOLERANCE: f64 = 1e-10;

/// Error type for rigid alignment operations.
#[derive(Debug, Error, PartialEq)]
pub enum RigidFitError {
    /// Source and destination arrays must have the same length
    #[error("Source and destination arrays must have the same length")]
    MismatchedInputLengths,

    /// At least three pairs are needed to fix a rotation
    #[error("Not enough point pairs to estimate a rigid motion ({0} < 3)")]
    NotEnoughPoints(usize),

    /// The points lie on a line and the rotation about it is undetermined
    #[error("Points are collinear, the rotation is not unique")]
    Collinear,

    /// Inputs or results hold NaN or infinite values
    #[error("Non finite values found while estimating the rigid motion")]
    NonFinite,
}

/// Centroids of both sets and the cross-covariance `H = sum (p - p_mean) * (q - q_mean)^T`.
fn cross_covariance(src: &[[f64; 3]], dst: &[[f64; 3]]) -> (DVec3, DVec3, DMat3) {
    let n = src.len() as f64;
    let src_mean = src.iter().map(|p| DVec3::from_array(*p)).sum::<DVec3>() / n;
    let dst_mean = dst.iter().map(|q| DVec3::from_array(*q)).sum::<DVec3>() / n;

    let mut h = DMat3::ZERO;
    for (p, q) in src.iter().zip(dst.iter()) {
        let p = DVec3::from_array(*p) - src_mean;
        let q = DVec3::from_array(*q) - dst_mean;
        // column j of p * q^T is p * q_j
        h.x_axis += p * q.x;
        h.y_axis += p * q.y;
        h.z_axis += p * q.z;
    }

    (src_mean, dst_mean, h)
}

fn is_finite_set(points: &[[f64; 3]]) -> bool {
    points.iter().flatten().all(|x| x.is_finite())
}

fn check_inputs(src: &[[f64; 3]], dst: &[[f64; 3]]) -> Result<(), RigidFitError> {
    if src.len() != dst.len() {
        return Err(RigidFitError::MismatchedInputLengths);
    }
    if src.len() < 3 {
        return Err(RigidFitError::NotEnoughPoints(src.len()));
    }
    if !is_finite_set(src) || !is_finite_set(dst) {
        return Err(RigidFitError::NonFinite);
    }
    if is_collinear(src) || is_collinear(dst) {
        return Err(RigidFitError::Collinear);
    }
    Ok(())
}

/// Whether all the points lie on a single line (or coincide).
///
/// The test compares the two largest singular values of the scatter matrix, so it does not
/// depend on the scale or position of the set. Sets with fewer than three points are collinear.
pub fn is_collinear(points: &[[f64; 3]]) -> bool {
    if points.len() < 3 {
        return true;
    }
    let (_, _, scatter) = cross_covariance(points, points);
    let sigma = svd3(&scatter).singular_values();
    sigma.x <= f64::MIN_POSITIVE || sigma.y <= COLLINEAR_TOLERANCE * sigma.x
}

/// Least squares rigid motion mapping `src[i]` onto `dst[i]`, using the SVD of the
/// cross-covariance (Arun et al., Kabsch).
///
/// A reflection is never returned: when `det(V * U^T) < 0` the right singular vector of the
/// smallest singular value is negated, which is the optimal proper rotation for coplanar and
/// noisy sets alike.
///
/// # Arguments
///
/// * `src` - The source points.
/// * `dst` - The destination points, matched by index with `src`.
///
/// # Returns
///
/// The transform `T` minimizing `sum |T * src[i] - dst[i]|^2`.
///
/// Example:
///
/// ```
/// use pointreg_linalg::rigid::fit_rigid_svd;
///
/// let src = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
/// let dst = [[1.0, 2.0, 3.0], [2.0, 2.0, 3.0], [1.0, 3.0, 3.0], [1.0, 2.0, 4.0]];
/// let transform = fit_rigid_svd(&src, &dst).unwrap();
/// assert!((transform.translation.x - 1.0).abs() < 1e-12);
/// assert!(transform.rotation_angle() < 1e-12);
/// ```
pub fn fit_rigid_svd(
    src: &[[f64; 3]],
    dst: &[[f64; 3]],
) -> Result<RigidTransform, RigidFitError> {
    check_inputs(src, dst)?;

    let (src_mean, dst_mean, h) = cross_covariance(src, dst);

    let svd = svd3(&h);
    let u = *svd.u();
    let mut v = *svd.v();

    if (v * u.transpose()).determinant() < 0.0 {
        // singular values are sorted, the last column belongs to the smallest one
        v.z_axis = -v.z_axis;
    }
    let rotation = v * u.transpose();
    let translation = dst_mean - rotation * src_mean;

    let transform = RigidTransform::from_parts(rotation, translation);
    if !transform.is_finite() {
        return Err(RigidFitError::NonFinite);
    }
    Ok(transform)
}

/// Least squares rigid motion mapping `src[i]` onto `dst[i]` with Horn's unit quaternion
/// method.
///
/// The rotation is the eigenvector of the largest eigenvalue of the symmetric 4x4 matrix built
/// from the cross-covariance. Unit quaternions only encode proper rotations, so no reflection
/// handling is needed.
pub fn fit_rigid_quaternion(
    src: &[[f64; 3]],
    dst: &[[f64; 3]],
) -> Result<RigidTransform, RigidFitError> {
    check_inputs(src, dst)?;

    let (src_mean, dst_mean, h) = cross_covariance(src, dst);

    // s[a][b] = sum p_a * q_b
    let s = |a: usize, b: usize| h.col(b)[a];
    let (sxx, sxy, sxz) = (s(0, 0), s(0, 1), s(0, 2));
    let (syx, syy, syz) = (s(1, 0), s(1, 1), s(1, 2));
    let (szx, szy, szz) = (s(2, 0), s(2, 1), s(2, 2));

    let n = [
        [sxx + syy + szz, syz - szy, szx - sxz, sxy - syx],
        [syz - szy, sxx - syy - szz, sxy + syx, szx + sxz],
        [szx - sxz, sxy + syx, -sxx + syy - szz, syz + szy],
        [sxy - syx, szx + sxz, syz + szy, -sxx - syy + szz],
    ];

    let (values, vectors) = symmetric_eigen4(&n);
    let best = values
        .iter()
        .enumerate()
        .fold(0, |best, (i, &value)| if value > values[best] { i } else { best });

    // eigenvector components are (w, x, y, z)
    let quat = DQuat::from_xyzw(
        vectors[1][best],
        vectors[2][best],
        vectors[3][best],
        vectors[0][best],
    );
    if !quat.is_finite() || quat.length_squared() <= f64::MIN_POSITIVE {
        return Err(RigidFitError::NonFinite);
    }

    let rotation = DMat3::from_quat(quat.normalize());
    let translation = dst_mean - rotation * src_mean;

    let transform = RigidTransform::from_parts(rotation, translation);
    if !transform.is_finite() {
        return Err(RigidFitError::NonFinite);
    }
    Ok(transform)
}
