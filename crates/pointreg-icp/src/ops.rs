use rayon::prelude::*;

use crate::criteria::OutlierRejection;
use crate::spatial::SpatialIndex;

/// Scale turning a median absolute deviation into a standard deviation for normal data.
const MAD_TO_SIGMA: f64 = 1.4826;

/// A source point paired with its nearest target point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    /// Position of the point in the source cloud.
    pub source_index: usize,
    /// Position of the matched point in the target cloud.
    pub target_index: usize,
    /// Squared distance between the transformed source point and the target point.
    pub distance_squared: f64,
}

impl Correspondence {
    /// Euclidean distance between the two points.
    pub fn distance(&self) -> f64 {
        self.distance_squared.sqrt()
    }
}

/// Find the nearest indexed point of every point in `points`.
///
/// Points without a neighbor are skipped. The parallel search returns exactly the same
/// correspondences, in the same order, as the serial one.
pub fn find_correspondences<I: SpatialIndex + ?Sized>(
    points: &[[f64; 3]],
    index: &I,
    parallel: bool,
) -> Vec<Correspondence> {
    let to_correspondence = |(source_index, point): (usize, &[f64; 3])| {
        index.nearest(point).map(|nn| Correspondence {
            source_index,
            target_index: nn.index,
            distance_squared: nn.distance_squared,
        })
    };

    if parallel {
        points
            .par_iter()
            .enumerate()
            .filter_map(to_correspondence)
            .collect()
    } else {
        points
            .iter()
            .enumerate()
            .filter_map(to_correspondence)
            .collect()
    }
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

/// Drop the correspondences rejected by `policy`, keeping the order of the others.
pub fn reject_outliers(
    correspondences: Vec<Correspondence>,
    policy: &OutlierRejection,
) -> Vec<Correspondence> {
    match *policy {
        OutlierRejection::None => correspondences,
        OutlierRejection::MaxDistance(max_distance) => {
            let max_distance_squared = max_distance * max_distance;
            correspondences
                .into_iter()
                .filter(|c| c.distance_squared <= max_distance_squared)
                .collect()
        }
        OutlierRejection::MedianAbsoluteDeviation { k } => {
            if correspondences.is_empty() {
                return correspondences;
            }

            let mut distances = correspondences
                .iter()
                .map(Correspondence::distance)
                .collect::<Vec<_>>();
            distances.sort_by(f64::total_cmp);
            let median_dist = median(&distances);

            let mut deviations = distances
                .iter()
                .map(|d| (d - median_dist).abs())
                .collect::<Vec<_>>();
            deviations.sort_by(f64::total_cmp);
            let sigma = MAD_TO_SIGMA * median(&deviations);

            let threshold = median_dist + k * sigma;
            correspondences
                .into_iter()
                .filter(|c| c.distance() <= threshold)
                .collect()
        }
    }
}

/// Mean of the squared correspondence distances, `None` when there are no correspondences.
pub fn mean_squared_error(correspondences: &[Correspondence]) -> Option<f64> {
    if correspondences.is_empty() {
        return None;
    }
    let sum = correspondences
        .iter()
        .map(|c| c.distance_squared)
        .sum::<f64>();
    Some(sum / correspondences.len() as f64)
}
