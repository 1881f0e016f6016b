use glam::{DMat3, DMat4, DVec3, DVec4};

use crate::linalg::{array33_to_dmat3, dmat3_to_array33};
use crate::transforms::rotation_angle;

/// Tolerance used to decide whether a matrix is a rigid motion.
const RIGID_TOLERANCE: f64 = 1e-6;

/// Errors raised when a matrix cannot be interpreted as a rigid motion.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RigidTransformError {
    /// The rotation block is not orthonormal with determinant +1.
    #[error("Rotation block is not a proper rotation (det = {0})")]
    NotRigid(f64),

    /// The bottom row of the homogeneous matrix is not `[0, 0, 0, 1]`.
    #[error("Bottom row of the homogeneous matrix must be [0, 0, 0, 1]")]
    InvalidBottomRow,

    /// The matrix contains NaN or infinite values.
    #[error("Matrix contains non finite values")]
    NonFinite,
}

/// A rigid motion in 3D: a proper rotation followed by a translation.
///
/// Maps a point `p` to `rotation * p + translation`. Equivalent to the homogeneous matrix
///
/// ```text
/// | R t |
/// | 0 1 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RigidTransform {
    /// Rotation block, orthonormal with determinant +1.
    pub rotation: DMat3,
    /// Translation vector.
    pub translation: DVec3,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RigidTransform {
    /// The identity motion.
    pub const IDENTITY: Self = Self {
        rotation: DMat3::IDENTITY,
        translation: DVec3::ZERO,
    };

    /// Create a transform from a rotation and a translation.
    ///
    /// PRECONDITION: rotation is a proper rotation matrix.
    pub fn from_parts(rotation: DMat3, translation: DVec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Create a transform from a row-major rotation array and a translation array.
    pub fn from_rotation_translation_arrays(
        rotation: &[[f64; 3]; 3],
        translation: &[f64; 3],
    ) -> Self {
        Self::from_parts(array33_to_dmat3(rotation), DVec3::from_array(*translation))
    }

    /// Create a transform from a homogeneous 4x4 matrix, checking that it is a rigid motion.
    pub fn from_matrix(matrix: &DMat4) -> Result<Self, RigidTransformError> {
        if !matrix.is_finite() {
            return Err(RigidTransformError::NonFinite);
        }
        let bottom = matrix.row(3);
        if !bottom.abs_diff_eq(DVec4::W, RIGID_TOLERANCE) {
            return Err(RigidTransformError::InvalidBottomRow);
        }
        let rotation = DMat3::from_mat4(*matrix);
        let det = rotation.determinant();
        let gram = rotation.transpose() * rotation;
        if det <= 0.0 || !gram.abs_diff_eq(DMat3::IDENTITY, RIGID_TOLERANCE) {
            return Err(RigidTransformError::NotRigid(det));
        }
        Ok(Self::from_parts(rotation, matrix.w_axis.truncate()))
    }

    /// Create a transform from a row-major flattened 4x4 matrix.
    pub fn from_row_major_array(data: &[f64; 16]) -> Result<Self, RigidTransformError> {
        Self::from_matrix(&DMat4::from_cols_array(data).transpose())
    }

    /// The homogeneous 4x4 matrix of the transform.
    pub fn to_matrix(&self) -> DMat4 {
        DMat4::from_cols(
            self.rotation.x_axis.extend(0.0),
            self.rotation.y_axis.extend(0.0),
            self.rotation.z_axis.extend(0.0),
            self.translation.extend(1.0),
        )
    }

    /// Flatten the homogeneous matrix row by row.
    ///
    /// Example:
    ///
    /// ```
    /// use glam::{DMat3, DVec3};
    /// use pointreg_3d::rigid::RigidTransform;
    ///
    /// let transform = RigidTransform::from_parts(DMat3::IDENTITY, DVec3::new(1.0, 2.0, 3.0));
    /// let data = transform.to_row_major_array();
    /// assert_eq!(data[3], 1.0);
    /// assert_eq!(data[7], 2.0);
    /// assert_eq!(data[11], 3.0);
    /// assert_eq!(&data[12..], &[0.0, 0.0, 0.0, 1.0]);
    /// ```
    pub fn to_row_major_array(&self) -> [f64; 16] {
        self.to_matrix().transpose().to_cols_array()
    }

    /// Flatten the homogeneous matrix column by column.
    pub fn to_column_major_array(&self) -> [f64; 16] {
        self.to_matrix().to_cols_array()
    }

    /// The rotation block as a row-major array.
    pub fn rotation_array(&self) -> [[f64; 3]; 3] {
        dmat3_to_array33(&self.rotation)
    }

    /// The translation as an array.
    pub fn translation_array(&self) -> [f64; 3] {
        self.translation.to_array()
    }

    /// Compose two transforms: the result applies `other` first and then `self`.
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    /// The inverse motion.
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.transpose();
        Self {
            rotation,
            translation: -(rotation * self.translation),
        }
    }

    /// Apply the transform to a single point.
    #[inline]
    pub fn transform_point(&self, point: &[f64; 3]) -> [f64; 3] {
        (self.rotation * DVec3::from_array(*point) + self.translation).to_array()
    }

    /// Apply the transform to a set of points.
    ///
    /// PRECONDITION: dst_points is a pre-allocated vector of the same size as source.
    pub fn transform_points(&self, src_points: &[[f64; 3]], dst_points: &mut [[f64; 3]]) {
        assert_eq!(src_points.len(), dst_points.len());
        for (dst, src) in dst_points.iter_mut().zip(src_points.iter()) {
            *dst = self.transform_point(src);
        }
    }

    /// Rotation angle in radians, in `[0, pi]`.
    pub fn rotation_angle(&self) -> f64 {
        rotation_angle(&self.rotation)
    }

    /// Norm of the translation vector.
    pub fn translation_norm(&self) -> f64 {
        self.translation.length()
    }

    /// Whether all the entries of both transforms differ by at most `max_abs_diff`.
    pub fn abs_diff_eq(&self, other: &Self, max_abs_diff: f64) -> bool {
        self.rotation.abs_diff_eq(other.rotation, max_abs_diff)
            && self.translation.abs_diff_eq(other.translation, max_abs_diff)
    }

    /// Whether the transform holds only finite values.
    pub fn is_finite(&self) -> bool {
        self.rotation.is_finite() && self.translation.is_finite()
    }

    /// Project the rotation block back onto SO(3).
    ///
    /// Repeated compositions accumulate rounding errors that slowly introduce scale and shear.
    /// Gram-Schmidt on the columns removes them while keeping the rotation within rounding of
    /// the original one.
    pub fn orthonormalize(&self) -> Self {
        let x = self.rotation.x_axis.normalize();
        let y = (self.rotation.y_axis - x * x.dot(self.rotation.y_axis)).normalize();
        let z = x.cross(y);
        Self {
            rotation: DMat3::from_cols(x, y, z),
            translation: self.translation,
        }
    }
}

impl std::ops::Mul for RigidTransform {
    type Output = RigidTransform;

    fn mul(self, rhs: RigidTransform) -> RigidTransform {
        self.compose(&rhs)
    }
}

impl std::fmt::Display for RigidTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.to_row_major_array();
        for row in data.chunks_exact(4) {
            writeln!(
                f,
                "[{:>12.6}, {:>12.6}, {:>12.6}, {:>12.6}]",
                row[0], row[1], row[2], row[3]
            )?;
        }
        Ok(())
    }
}
