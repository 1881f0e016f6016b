#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Linear algebra utilities.
pub mod linalg;

/// Point cloud container.
pub mod pointcloud;

/// Rigid transformation value type.
pub mod rigid;

/// 3D rotation representations.
pub mod transforms;

pub use pointcloud::{PointCloud, PointCloudError};
pub use rigid::{RigidTransform, RigidTransformError};
