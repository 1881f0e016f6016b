use pointreg_3d::rigid::RigidTransform;
use pointreg_linalg::rigid::{fit_rigid_quaternion, fit_rigid_svd, RigidFitError};

/// Closed-form estimation of the rigid motion between matched point sets.
pub trait MotionEstimator: Sync {
    /// The rigid motion that best maps `src[i]` onto `dst[i]` in the least squares sense.
    ///
    /// Implementations must return a proper rotation, never a reflection.
    fn estimate(
        &self,
        src: &[[f64; 3]],
        dst: &[[f64; 3]],
    ) -> Result<RigidTransform, RigidFitError>;
}

/// Arun / Kabsch estimation from the SVD of the cross-covariance.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvdEstimator;

impl MotionEstimator for SvdEstimator {
    fn estimate(
        &self,
        src: &[[f64; 3]],
        dst: &[[f64; 3]],
    ) -> Result<RigidTransform, RigidFitError> {
        fit_rigid_svd(src, dst)
    }
}

/// Horn's unit quaternion estimation.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuaternionEstimator;

impl MotionEstimator for QuaternionEstimator {
    fn estimate(
        &self,
        src: &[[f64; 3]],
        dst: &[[f64; 3]],
    ) -> Result<RigidTransform, RigidFitError> {
        fit_rigid_quaternion(src, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{DMat3, DVec3};

    #[test]
    fn test_estimators_agree() -> Result<(), RigidFitError> {
        let src = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
        ];
        let expected =
            RigidTransform::from_parts(DMat3::from_rotation_y(-0.4), DVec3::new(0.1, 0.2, -0.3));
        let mut dst = [[0.0; 3]; 5];
        expected.transform_points(&src, &mut dst);

        let estimators: [&dyn MotionEstimator; 2] = [&SvdEstimator, &QuaternionEstimator];
        for estimator in estimators {
            let estimated = estimator.estimate(&src, &dst)?;
            assert!(estimated.abs_diff_eq(&expected, 1e-10));
        }
        Ok(())
    }
}
