use glam::DVec3;

/// Errors raised when building a point cloud from raw buffers.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PointCloudError {
    /// The flat buffer does not hold a whole number of `x, y, z` triples.
    #[error("Flat buffer length ({0}) is not a multiple of 3")]
    InvalidFlatLength(usize),
}

/// A point cloud with points, colors, and normals.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointCloud {
    // The points in the point cloud.
    points: Vec<[f64; 3]>,
    // The colors of the points.
    colors: Option<Vec<[u8; 3]>>,
    // The normals of the points.
    normals: Option<Vec<[f64; 3]>>,
}

impl PointCloud {
    /// Create a new point cloud from points, colors (optional), and normals (optional).
    pub fn new(
        points: Vec<[f64; 3]>,
        colors: Option<Vec<[u8; 3]>>,
        normals: Option<Vec<[f64; 3]>>,
    ) -> Self {
        Self {
            points,
            colors,
            normals,
        }
    }

    /// Create a point cloud from a flat buffer of sequential `x, y, z` values.
    ///
    /// Example:
    ///
    /// ```
    /// use pointreg_3d::pointcloud::PointCloud;
    ///
    /// let cloud = PointCloud::from_xyz(&[0.0, 0.0, 0.0, 1.0, 2.0, 3.0]).unwrap();
    /// assert_eq!(cloud.len(), 2);
    /// assert_eq!(cloud.points()[1], [1.0, 2.0, 3.0]);
    /// ```
    pub fn from_xyz(data: &[f64]) -> Result<Self, PointCloudError> {
        if data.len() % 3 != 0 {
            return Err(PointCloudError::InvalidFlatLength(data.len()));
        }
        let points = data
            .chunks_exact(3)
            .map(|xyz| [xyz[0], xyz[1], xyz[2]])
            .collect();
        Ok(Self::new(points, None, None))
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the points in the point cloud.
    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    /// Get as reference the colors of the points in the point cloud.
    pub fn colors(&self) -> Option<&[[u8; 3]]> {
        self.colors.as_deref()
    }

    /// Get as reference the normals of the points in the point cloud.
    pub fn normals(&self) -> Option<&[[f64; 3]]> {
        self.normals.as_deref()
    }

    /// Get the centroid of the point cloud, or `None` if the cloud is empty.
    pub fn centroid(&self) -> Option<[f64; 3]> {
        if self.points.is_empty() {
            return None;
        }
        let sum = self
            .points
            .iter()
            .fold(DVec3::ZERO, |acc, p| acc + DVec3::from_array(*p));
        Some((sum / self.points.len() as f64).to_array())
    }

    /// Get the minimum bound of the point cloud.
    pub fn min_bound(&self) -> Option<[f64; 3]> {
        self.points
            .iter()
            .map(|p| DVec3::from_array(*p))
            .reduce(|a, b| a.min(b))
            .map(|v| v.to_array())
    }

    /// Get the maximum bound of the point cloud.
    pub fn max_bound(&self) -> Option<[f64; 3]> {
        self.points
            .iter()
            .map(|p| DVec3::from_array(*p))
            .reduce(|a, b| a.max(b))
            .map(|v| v.to_array())
    }
}
