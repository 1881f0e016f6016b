#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

mod icp_vanilla;
pub use icp_vanilla::*;

mod criteria;
pub use criteria::{IcpConvergenceCriteria, OutlierRejection};

mod error;
pub use error::{Cloud, IcpError};

/// Closed-form motion estimators used by the ICP loop.
pub mod estimator;

/// Correspondence search and filtering.
pub mod ops;
pub use ops::Correspondence;

/// Nearest neighbor indexes over the target cloud.
pub mod spatial;
