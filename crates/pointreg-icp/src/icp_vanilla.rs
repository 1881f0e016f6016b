use glam::DVec3;
use pointreg_3d::{pointcloud::PointCloud, rigid::RigidTransform};
use pointreg_linalg::rigid::RigidFitError;

use crate::criteria::IcpConvergenceCriteria;
use crate::error::{Cloud, IcpError};
use crate::estimator::{MotionEstimator, SvdEstimator};
use crate::ops::{find_correspondences, mean_squared_error, reject_outliers};
use crate::spatial::{KdTreeIndex, SpatialIndex};

/// Why the ICP loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StopReason {
    /// The mean squared error changed less than the tolerance.
    MseDelta,
    /// The incremental motion was within the tolerances of identity.
    TransformDelta,
    /// The iteration cap was reached before any other criterion held.
    MaxIterations,
}

/// Result of the ICP algorithm.
///
/// The transformation is from the source to the target frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IcpResult {
    /// Estimated transformation, mapping source points onto the target.
    pub transform: RigidTransform,
    /// The total number of iterations performed.
    pub num_iterations: usize,
    /// Root of the last mean squared error, the residual of the final correspondences under
    /// `transform`.
    pub rmse: f64,
    /// Mean squared error of every iteration, measured on that iteration's correspondences
    /// after its update.
    pub mse_history: Vec<f64>,
    /// Number of correspondences used in the last iteration.
    pub num_correspondences: usize,
    /// Whether a convergence criterion held before the iteration cap.
    pub converged: bool,
    /// The criterion that stopped the loop.
    pub stop_reason: StopReason,
}

impl IcpResult {
    /// Estimated rotation matrix, row-major.
    pub fn rotation(&self) -> [[f64; 3]; 3] {
        self.transform.rotation_array()
    }

    /// Estimated translation vector.
    pub fn translation(&self) -> [f64; 3] {
        self.transform.translation_array()
    }

    /// The homogeneous matrix flattened row by row.
    pub fn to_row_major_array(&self) -> [f64; 16] {
        self.transform.to_row_major_array()
    }
}

fn check_cloud(cloud: &PointCloud, which: Cloud) -> Result<(), IcpError> {
    if cloud.is_empty() {
        return Err(IcpError::EmptyInput(which));
    }
    if let Some(index) = cloud
        .points()
        .iter()
        .position(|p| !p.iter().all(|x| x.is_finite()))
    {
        return Err(IcpError::NonFinitePoint {
            cloud: which,
            index,
        });
    }
    Ok(())
}

fn aligned_mse(delta: &RigidTransform, src: &[[f64; 3]], dst: &[[f64; 3]]) -> f64 {
    let sum = src
        .iter()
        .zip(dst.iter())
        .map(|(p, q)| {
            let p = DVec3::from_array(delta.transform_point(p));
            p.distance_squared(DVec3::from_array(*q))
        })
        .sum::<f64>();
    sum / src.len() as f64
}

/// Register two clouds with the default criteria and an identity initial guess.
///
/// # Arguments
///
/// * `source` - Source point cloud.
/// * `target` - Target point cloud.
/// * `max_iterations` - Maximum number of iterations to perform.
///
/// Example:
///
/// ```
/// use pointreg_3d::pointcloud::PointCloud;
/// use pointreg_icp::register;
///
/// let points = vec![
///     [0.0, 0.0, 0.0],
///     [1.0, 0.0, 0.0],
///     [0.0, 1.0, 0.0],
///     [0.0, 0.0, 1.0],
/// ];
/// let source = PointCloud::new(points.clone(), None, None);
/// let target = PointCloud::new(points, None, None);
///
/// let result = register(&source, &target, 50).unwrap();
/// assert!(result.converged);
/// assert!(result.rmse < 1e-9);
/// ```
pub fn register(
    source: &PointCloud,
    target: &PointCloud,
    max_iterations: usize,
) -> Result<IcpResult, IcpError> {
    let criteria = IcpConvergenceCriteria::default().with_max_iterations(max_iterations);
    icp_vanilla(source, target, RigidTransform::IDENTITY, &criteria)
}

/// Iterative Closest Point (ICP) algorithm using point to point distance.
///
/// Correspondences are found with a k-d tree over the target and the motion is estimated with
/// the SVD of the cross-covariance.
///
/// # Arguments
///
/// * `source` - Source point cloud.
/// * `target` - Target point cloud.
/// * `initial` - Initial transformation from the source to the target frame.
/// * `criteria` - Convergence criteria.
///
/// # Returns
///
/// * `result` - Result of the ICP algorithm containing the transformation, error and stop reason.
pub fn icp_vanilla(
    source: &PointCloud,
    target: &PointCloud,
    initial: RigidTransform,
    criteria: &IcpConvergenceCriteria,
) -> Result<IcpResult, IcpError> {
    // build kdtree for target points to speed up the nearest neighbor search
    let index = KdTreeIndex::new(target.points());
    icp_with(source, target, initial, criteria, &index, &SvdEstimator)
}

/// ICP with a caller provided spatial index and motion estimator.
///
/// `index` must have been built from `target.points()`: neighbor indices are resolved
/// against the target cloud.
pub fn icp_with<I, E>(
    source: &PointCloud,
    target: &PointCloud,
    initial: RigidTransform,
    criteria: &IcpConvergenceCriteria,
    index: &I,
    estimator: &E,
) -> Result<IcpResult, IcpError>
where
    I: SpatialIndex + ?Sized,
    E: MotionEstimator + ?Sized,
{
    criteria.validate()?;
    check_cloud(source, Cloud::Source)?;
    check_cloud(target, Cloud::Target)?;
    if index.len() != target.len() {
        return Err(IcpError::IndexSizeMismatch {
            index_len: index.len(),
            target_len: target.len(),
        });
    }
    if !initial.is_finite() {
        return Err(IcpError::InvalidCriteria(
            "initial transform holds non finite values".to_string(),
        ));
    }

    let source_points = source.points();
    let target_points = target.points();

    let mut transform = initial;
    let mut current_source = vec![[0.0; 3]; source_points.len()];
    let mut mse_history = Vec::new();
    let mut num_correspondences = 0;
    let mut stop_reason = StopReason::MaxIterations;

    // main icp loop
    for iteration in 0..criteria.max_iterations {
        let now = std::time::Instant::now();

        // always start from the original source so rounding does not pile up in the points
        transform.transform_points(source_points, &mut current_source);

        let correspondences = find_correspondences(&current_source, index, criteria.parallel);
        if correspondences.len() < source_points.len() {
            log::warn!(
                "Iteration {}: {} source points without a neighbor",
                iteration,
                source_points.len() - correspondences.len()
            );
        }

        let num_found = correspondences.len();
        let correspondences = reject_outliers(correspondences, &criteria.outlier_rejection);
        if correspondences.len() < num_found {
            log::debug!(
                "Iteration {}: rejected {} outliers",
                iteration,
                num_found - correspondences.len()
            );
        }

        let matched_mse = mean_squared_error(&correspondences).unwrap_or(f64::INFINITY);

        let (points_in_src, points_in_dst): (Vec<_>, Vec<_>) = correspondences
            .iter()
            .map(|c| (current_source[c.source_index], target_points[c.target_index]))
            .unzip();

        let delta = estimator
            .estimate(&points_in_src, &points_in_dst)
            .map_err(|err| match err {
                RigidFitError::NotEnoughPoints(_) | RigidFitError::Collinear => {
                    IcpError::DegenerateCorrespondences {
                        iteration,
                        num_correspondences: correspondences.len(),
                        mse: matched_mse,
                        best: transform,
                    }
                }
                err => IcpError::Numerical {
                    iteration,
                    mse: matched_mse,
                    best: transform,
                    source: err,
                },
            })?;

        // the increment acts on already transformed points, so it goes on the left
        transform = delta.compose(&transform).orthonormalize();

        // residual of this iteration's pairs once the increment is applied
        let mse = aligned_mse(&delta, &points_in_src, &points_in_dst);
        mse_history.push(mse);
        num_correspondences = correspondences.len();

        log::debug!(
            "Iteration {}: {} correspondences, mse {:e}, elapsed {:?}",
            iteration,
            num_correspondences,
            mse,
            now.elapsed()
        );

        // check convergence and exit if below tolerance
        if let [.., previous, current] = mse_history[..] {
            if (previous - current).abs() < criteria.mse_tolerance {
                stop_reason = StopReason::MseDelta;
                break;
            }
        }
        if delta.rotation_angle() < criteria.rotation_tolerance
            && delta.translation_norm() < criteria.translation_tolerance
        {
            stop_reason = StopReason::TransformDelta;
            break;
        }
    }

    let converged = stop_reason != StopReason::MaxIterations;
    let rmse = mse_history.last().map_or(f64::INFINITY, |mse| mse.sqrt());
    if converged {
        log::debug!(
            "ICP converged in {} iterations with rmse {:e} ({:?})",
            mse_history.len(),
            rmse,
            stop_reason
        );
    } else {
        log::warn!(
            "ICP did not converge in {} iterations, last rmse {:e}",
            criteria.max_iterations,
            rmse
        );
    }

    Ok(IcpResult {
        transform,
        num_iterations: mse_history.len(),
        rmse,
        mse_history,
        num_correspondences,
        converged,
        stop_reason,
    })
}

/// Mean squared nearest neighbor distance of the source under `transform`.
///
/// # Arguments
///
/// * `source` - Source point cloud.
/// * `transform` - Transformation applied to the source before the search.
/// * `index` - Spatial index over the target points.
pub fn fitness<I: SpatialIndex + ?Sized>(
    source: &PointCloud,
    transform: &RigidTransform,
    index: &I,
) -> Result<f64, IcpError> {
    check_cloud(source, Cloud::Source)?;
    if index.is_empty() {
        return Err(IcpError::EmptyInput(Cloud::Target));
    }

    let mut transformed = vec![[0.0; 3]; source.len()];
    transform.transform_points(source.points(), &mut transformed);

    let correspondences = find_correspondences(&transformed, index, false);
    mean_squared_error(&correspondences).ok_or(IcpError::EmptyInput(Cloud::Target))
}
