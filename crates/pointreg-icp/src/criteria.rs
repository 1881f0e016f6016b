use crate::error::IcpError;

/// Policy used to discard correspondences before estimating the motion.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OutlierRejection {
    /// Keep every correspondence.
    #[default]
    None,

    /// Keep correspondences whose distance is at most the given value.
    MaxDistance(f64),

    /// Keep correspondences whose distance is at most `median + k * sigma`, where `sigma` is
    /// the median absolute deviation of the distances scaled by 1.4826.
    MedianAbsoluteDeviation {
        /// Number of deviations above the median that are accepted.
        k: f64,
    },
}

/// Structure to define the ICP parameters.
///
/// The loop stops at the first of:
///
/// * `max_iterations` iterations (reported as not converged),
/// * two consecutive mean squared errors differing by less than `mse_tolerance`,
/// * an incremental motion closer than `rotation_tolerance` radians and
///   `translation_tolerance` units to identity.
///
/// Comparisons are strict, so a zero tolerance disables its criterion.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IcpConvergenceCriteria {
    /// Maximum number of iterations to perform.
    pub max_iterations: usize,
    /// Convergence tolerance on the change of the mean squared error, in squared units.
    ///
    /// The tolerance is absolute. The default of `1e-6` suits clouds spanning a few units;
    /// for a cloud whose extent is `s`, scale it with `s * s` or the loop stops while the
    /// errors themselves are still below the tolerance. A cloud a millimetre wide expressed
    /// in metres, for instance, has mean squared errors around `1e-8` from the start.
    pub mse_tolerance: f64,
    /// Convergence tolerance on the rotation angle of the incremental motion, in radians.
    pub rotation_tolerance: f64,
    /// Convergence tolerance on the translation norm of the incremental motion.
    pub translation_tolerance: f64,
    /// Correspondence rejection applied every iteration.
    pub outlier_rejection: OutlierRejection,
    /// Search the correspondences on the rayon thread pool.
    pub parallel: bool,
}

impl Default for IcpConvergenceCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            mse_tolerance: 1e-6,
            rotation_tolerance: 1e-8,
            translation_tolerance: 1e-8,
            outlier_rejection: OutlierRejection::None,
            parallel: false,
        }
    }
}

impl IcpConvergenceCriteria {
    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the tolerance on the change of the mean squared error.
    pub fn with_mse_tolerance(mut self, mse_tolerance: f64) -> Self {
        self.mse_tolerance = mse_tolerance;
        self
    }

    /// Set the tolerances on the incremental motion.
    pub fn with_transform_tolerance(
        mut self,
        rotation_tolerance: f64,
        translation_tolerance: f64,
    ) -> Self {
        self.rotation_tolerance = rotation_tolerance;
        self.translation_tolerance = translation_tolerance;
        self
    }

    /// Set the outlier rejection policy.
    pub fn with_outlier_rejection(mut self, outlier_rejection: OutlierRejection) -> Self {
        self.outlier_rejection = outlier_rejection;
        self
    }

    /// Enable or disable the parallel correspondence search.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check that every parameter is in range.
    pub fn validate(&self) -> Result<(), IcpError> {
        if self.max_iterations == 0 {
            return Err(IcpError::InvalidCriteria(
                "max_iterations must be at least 1".to_string(),
            ));
        }

        let tolerances = [
            ("mse_tolerance", self.mse_tolerance),
            ("rotation_tolerance", self.rotation_tolerance),
            ("translation_tolerance", self.translation_tolerance),
        ];
        for (name, value) in tolerances {
            if !value.is_finite() || value < 0.0 {
                return Err(IcpError::InvalidCriteria(format!(
                    "{name} must be finite and non negative, got {value}"
                )));
            }
        }

        let (name, value) = match self.outlier_rejection {
            OutlierRejection::None => return Ok(()),
            OutlierRejection::MaxDistance(distance) => ("maximum distance", distance),
            OutlierRejection::MedianAbsoluteDeviation { k } => ("deviation factor", k),
        };
        if !value.is_finite() || value <= 0.0 {
            return Err(IcpError::InvalidCriteria(format!(
                "{name} must be finite and positive, got {value}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_criteria() -> Result<(), IcpError> {
        let criteria = IcpConvergenceCriteria::default();
        assert_eq!(criteria.max_iterations, 50);
        assert_eq!(criteria.outlier_rejection, OutlierRejection::None);
        assert!(!criteria.parallel);
        criteria.validate()
    }

    #[test]
    fn test_builders() {
        let criteria = IcpConvergenceCriteria::default()
            .with_max_iterations(10)
            .with_mse_tolerance(0.0)
            .with_transform_tolerance(1e-3, 1e-4)
            .with_outlier_rejection(OutlierRejection::MaxDistance(0.5))
            .with_parallel(true);
        assert_eq!(criteria.max_iterations, 10);
        assert_eq!(criteria.mse_tolerance, 0.0);
        assert_eq!(criteria.rotation_tolerance, 1e-3);
        assert_eq!(criteria.translation_tolerance, 1e-4);
        assert_eq!(criteria.outlier_rejection, OutlierRejection::MaxDistance(0.5));
        assert!(criteria.parallel);
        assert!(criteria.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let invalid = [
            IcpConvergenceCriteria::default().with_max_iterations(0),
            IcpConvergenceCriteria::default().with_mse_tolerance(-1.0),
            IcpConvergenceCriteria::default().with_mse_tolerance(f64::NAN),
            IcpConvergenceCriteria::default().with_transform_tolerance(f64::INFINITY, 0.0),
            IcpConvergenceCriteria::default()
                .with_outlier_rejection(OutlierRejection::MaxDistance(0.0)),
            IcpConvergenceCriteria::default()
                .with_outlier_rejection(OutlierRejection::MedianAbsoluteDeviation { k: -3.0 }),
        ];
        for criteria in invalid {
            assert!(matches!(
                criteria.validate(),
                Err(IcpError::InvalidCriteria(_))
            ));
        }
    }
}
