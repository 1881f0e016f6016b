use glam::DVec3;
use kiddo::immutable::float::kdtree::ImmutableKdTree;

/// Nearest neighbor found by a [`SpatialIndex`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position of the neighbor in the indexed points.
    pub index: usize,
    /// Squared Euclidean distance between the query and the neighbor.
    pub distance_squared: f64,
}

/// Exact nearest neighbor queries over a fixed set of points.
///
/// Indexes are built once from the target cloud and queried concurrently, hence the `Sync`
/// bound.
pub trait SpatialIndex: Sync {
    /// The indexed point closest to `query`, or `None` when the index is empty.
    fn nearest(&self, query: &[f64; 3]) -> Option<Neighbor>;

    /// Number of indexed points.
    fn len(&self) -> usize;

    /// Whether the index holds no points.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// k-d tree index backed by [`kiddo`].
pub struct KdTreeIndex {
    tree: Option<ImmutableKdTree<f64, u32, 3, 32>>,
    len: usize,
}

impl KdTreeIndex {
    /// Build the tree over `points`.
    pub fn new(points: &[[f64; 3]]) -> Self {
        let tree = if points.is_empty() {
            None
        } else {
            Some(ImmutableKdTree::new_from_slice(points))
        };
        Self {
            tree,
            len: points.len(),
        }
    }
}

impl SpatialIndex for KdTreeIndex {
    fn nearest(&self, query: &[f64; 3]) -> Option<Neighbor> {
        let tree = self.tree.as_ref()?;
        let nn = tree.nearest_one::<kiddo::SquaredEuclidean>(query);
        Some(Neighbor {
            index: nn.item as usize,
            distance_squared: nn.distance,
        })
    }

    fn len(&self) -> usize {
        self.len
    }
}

impl std::fmt::Debug for KdTreeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KdTreeIndex").field("len", &self.len).finish()
    }
}

/// Linear scan over all the points.
///
/// Ties are resolved in favour of the point that comes first, so results never depend on
/// anything but the input order.
#[derive(Debug, Clone)]
pub struct BruteForceIndex {
    points: Vec<[f64; 3]>,
}

impl BruteForceIndex {
    /// Index a copy of `points`.
    pub fn new(points: &[[f64; 3]]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }
}

impl SpatialIndex for BruteForceIndex {
    fn nearest(&self, query: &[f64; 3]) -> Option<Neighbor> {
        let query = DVec3::from_array(*query);
        let mut best: Option<Neighbor> = None;
        for (index, point) in self.points.iter().enumerate() {
            let distance_squared = DVec3::from_array(*point).distance_squared(query);
            match best {
                Some(b) if b.distance_squared <= distance_squared => {}
                _ => {
                    best = Some(Neighbor {
                        index,
                        distance_squared,
                    })
                }
            }
        }
        best
    }

    fn len(&self) -> usize {
        self.points.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn test_empty_index() {
        let kdtree = KdTreeIndex::new(&[]);
        let brute = BruteForceIndex::new(&[]);
        assert!(kdtree.is_empty());
        assert!(brute.is_empty());
        assert_eq!(kdtree.nearest(&[0.0, 0.0, 0.0]), None);
        assert_eq!(brute.nearest(&[0.0, 0.0, 0.0]), None);
    }

    #[test]
    fn test_nearest_small() {
        let points = [[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [5.0, 5.0, 5.0]];
        let kdtree = KdTreeIndex::new(&points);
        let brute = BruteForceIndex::new(&points);
        assert_eq!(kdtree.len(), 3);

        for index in [&kdtree as &dyn SpatialIndex, &brute] {
            let nn = index.nearest(&[0.0, 0.0, 0.0]);
            assert_eq!(
                nn,
                Some(Neighbor {
                    index: 0,
                    distance_squared: 1.0
                })
            );
            let nn = index.nearest(&[4.0, 4.0, 4.0]);
            assert_eq!(nn.map(|n| n.index), Some(2));
        }
    }

    #[test]
    fn test_brute_force_tie_break() {
        let points = [[1.0, 0.0, 0.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let brute = BruteForceIndex::new(&points);
        assert_eq!(brute.nearest(&[0.0, 0.0, 0.0]).map(|n| n.index), Some(0));
    }

    #[test]
    fn test_kdtree_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(3);
        let random_point = |rng: &mut StdRng| {
            [
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            ]
        };
        let points = (0..500).map(|_| random_point(&mut rng)).collect::<Vec<_>>();
        let kdtree = KdTreeIndex::new(&points);
        let brute = BruteForceIndex::new(&points);

        for _ in 0..200 {
            let query = random_point(&mut rng);
            let (Some(a), Some(b)) = (kdtree.nearest(&query), brute.nearest(&query)) else {
                panic!("non empty index returned no neighbor");
            };
            assert_eq!(a.index, b.index);
            assert_relative_eq!(a.distance_squared, b.distance_squared, epsilon = 1e-12);
        }
    }
}
