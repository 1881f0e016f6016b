#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Eigen decomposition of small symmetric matrices.
pub mod eigen;

/// Closed-form rigid alignment of matched point sets.
pub mod rigid;

/// Module to calculate SVD of a 3x3 matrix
pub mod svd;
