use pointreg_3d::rigid::RigidTransform;
use pointreg_linalg::rigid::RigidFitError;

/// Identifies one of the two clouds of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cloud {
    /// The cloud being moved.
    Source,
    /// The fixed reference cloud.
    Target,
}

impl std::fmt::Display for Cloud {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cloud::Source => write!(f, "source"),
            Cloud::Target => write!(f, "target"),
        }
    }
}

/// An error type for the registration.
#[derive(thiserror::Error, Debug)]
pub enum IcpError {
    /// One of the input clouds has no points.
    #[error("The {0} point cloud is empty")]
    EmptyInput(Cloud),

    /// A parameter of the convergence criteria is out of range.
    #[error("Invalid convergence criteria: {0}")]
    InvalidCriteria(String),

    /// A point holds NaN or infinite coordinates.
    #[error("Point {index} of the {cloud} point cloud is not finite")]
    NonFinitePoint {
        /// The cloud holding the point.
        cloud: Cloud,
        /// Position of the point in the cloud.
        index: usize,
    },

    /// The spatial index was not built from the target cloud.
    #[error("Spatial index holds {index_len} points but the target holds {target_len}")]
    IndexSizeMismatch {
        /// Number of points in the index.
        index_len: usize,
        /// Number of points in the target cloud.
        target_len: usize,
    },

    /// The matched pairs cannot determine a unique rigid motion.
    #[error("Degenerate correspondences at iteration {iteration} ({num_correspondences} pairs)")]
    DegenerateCorrespondences {
        /// Zero based iteration that failed.
        iteration: usize,
        /// Number of usable correspondences found in that iteration.
        num_correspondences: usize,
        /// Mean squared error of those correspondences, infinite when there are none.
        mse: f64,
        /// The accumulated transform when the failure happened.
        best: RigidTransform,
    },

    /// The motion estimation produced no usable result.
    #[error("Numerical failure at iteration {iteration} (mse {mse})")]
    Numerical {
        /// Zero based iteration that failed.
        iteration: usize,
        /// Mean squared error of the correspondences of that iteration.
        mse: f64,
        /// The accumulated transform when the failure happened.
        best: RigidTransform,
        /// The estimator error.
        source: RigidFitError,
    },
}

impl IcpError {
    /// The best transform found before the registration aborted, if it got that far.
    pub fn best_transform(&self) -> Option<&RigidTransform> {
        match self {
            IcpError::DegenerateCorrespondences { best, .. } | IcpError::Numerical { best, .. } => {
                Some(best)
            }
            _ => None,
        }
    }
}
