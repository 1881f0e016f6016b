#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use pointreg_3d as k3d;

#[doc(inline)]
pub use pointreg_linalg as linalg;

#[doc(inline)]
pub use pointreg_icp as icp;
