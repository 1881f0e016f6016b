//! Double precision 3×3 Singular Value Decomposition (SVD).
//!
//! For any matrix A ∈ ℝ³ˣ³, the SVD decomposes it into three matrices:
//!
//! ```text
//! A = U Σ Vᵀ
//! ```
//!
//! where:
//! * U ∈ ℝ³ˣ³ is an orthogonal matrix (left singular vectors)
//! * Σ ∈ ℝ³ˣ³ is a diagonal matrix of singular values (σ₁ ≥ σ₂ ≥ σ₃ ≥ 0)
//! * V ∈ ℝ³ˣ³ is an orthogonal matrix (right singular vectors)
//!
//! The right singular vectors come from a cyclic Jacobi eigen-analysis of AᵀA where the
//! accumulated rotation is kept as a quaternion, so V is orthonormal up to rounding. U and Σ
//! come from a Givens QR decomposition of A·V after sorting the columns.
//!
//! Rigid registration needs rotations accurate to well below a milliradian, so the Jacobi
//! rotations use exact angles instead of the fast approximate ones of the reference.
//!
//! # Example
//!
//! ```
//! use glam::{DMat3, DVec3};
//! use pointreg_linalg::svd::svd3;
//!
//! let matrix = DMat3::from_diagonal(DVec3::new(1.0, 2.0, 3.0));
//!
//! let svd_result = svd3(&matrix);
//! let s = svd_result.s();
//! assert!((s.x_axis.x - 3.0).abs() < 1e-12);
//! ```
//!
//! # References
//!
//! * McAdams, Selle, Tamstorf, Teran, and Sifakis (2011).
//!   "Computing the Singular Value Decomposition of 3x3 matrices with minimal
//!   branching and elementary floating point operations."
//!   University of Wisconsin-Madison Technical Report TR1690.

use glam::{DMat3, DQuat, DVec3};

// only guards the normalization of null Givens rotations, must stay far below any data scale
const SVD3_EPSILON: f64 = 1e-100;
const JACOBI_EPSILON: f64 = 1e-28;
const MAX_SWEEPS: usize = 12;

#[derive(Debug, Clone)]
/// A simple symmetric 3x3 Matrix class (contains no storage for (0, 1) (0, 2) and (1, 2)
struct Symmetric3x3 {
    m_00: f64,
    m_10: f64,
    m_11: f64,
    m_20: f64,
    m_21: f64,
    m_22: f64,
}

impl Symmetric3x3 {
    fn from_mat3x3(mat: &DMat3) -> Self {
        Symmetric3x3 {
            m_00: mat.x_axis.x,
            m_10: mat.y_axis.x,
            m_11: mat.y_axis.y,
            m_20: mat.x_axis.z,
            m_21: mat.y_axis.z,
            m_22: mat.z_axis.z,
        }
    }

    #[inline]
    fn off_diagonal_norm_sq(&self) -> f64 {
        self.m_10 * self.m_10 + self.m_20 * self.m_20 + self.m_21 * self.m_21
    }

    #[inline]
    fn diagonal_norm_sq(&self) -> f64 {
        self.m_00 * self.m_00 + self.m_11 * self.m_11 + self.m_22 * self.m_22
    }
}

#[derive(Debug)]
/// Half angle of a Givens rotation, stored as the (cos, sin) pair of a quaternion.
struct Givens {
    cos_theta: f64,
    sin_theta: f64,
}

#[derive(Debug)]
struct QR3 {
    q: DMat3,
    r: DMat3,
}

#[derive(Debug, Clone)]
/// Result of [`svd3`].
pub struct SVD3Set {
    /// The matrix of left singular vectors.
    u: DMat3,

    /// The diagonal matrix of singular values.
    s: DMat3,

    /// The matrix of right singular vectors.
    v: DMat3,
}

impl SVD3Set {
    /// Get the left singular vectors matrix.
    #[inline]
    pub fn u(&self) -> &DMat3 {
        &self.u
    }

    /// Get the diagonal matrix of singular values.
    #[inline]
    pub fn s(&self) -> &DMat3 {
        &self.s
    }

    /// Get the right singular vectors matrix.
    #[inline]
    pub fn v(&self) -> &DMat3 {
        &self.v
    }

    /// Get the singular values in descending order.
    #[inline]
    pub fn singular_values(&self) -> DVec3 {
        DVec3::new(self.s.x_axis.x, self.s.y_axis.y, self.s.z_axis.z)
    }
}

/// Jacobi rotation that annihilates `s_pq` in the 2x2 block `[[s_pp, s_pq], [s_pq, s_qq]]`.
///
/// The rotation angle is restricted to `[-pi/4, pi/4]` which keeps the cyclic sweeps convergent.
#[inline(always)]
fn jacobi_givens_parameters(s_pp: f64, s_qq: f64, s_pq: f64) -> Givens {
    if s_pq == 0.0 {
        return Givens {
            cos_theta: 1.0,
            sin_theta: 0.0,
        };
    }
    let diff = s_pp - s_qq;
    let angle = if diff == 0.0 {
        std::f64::consts::FRAC_PI_4.copysign(s_pq)
    } else {
        0.5 * (2.0 * s_pq / diff).atan()
    };
    let (sin_half, cos_half) = (0.5 * angle).sin_cos();
    Givens {
        cos_theta: cos_half,
        sin_theta: sin_half,
    }
}

#[inline(always)]
fn conjugate_xy(s: &mut Symmetric3x3, q: &mut DQuat) {
    let mut g = jacobi_givens_parameters(s.m_00, s.m_11, s.m_10);

    let cos_theta2 = g.cos_theta * g.cos_theta;
    let sin_theta2 = g.sin_theta * g.sin_theta;
    let scale = 1.0 / (cos_theta2 + sin_theta2);
    let a = (cos_theta2 - sin_theta2) * scale;
    let b = 2.0 * g.sin_theta * g.cos_theta * scale;

    let s00 = s.m_00;
    let s10 = s.m_10;
    let s11 = s.m_11;
    let s20 = s.m_20;
    let s21 = s.m_21;

    s.m_00 = a * (a * s00 + b * s10) + b * (a * s10 + b * s11);
    s.m_10 = a * (-b * s00 + a * s10) + b * (-b * s10 + a * s11);
    s.m_11 = -b * (-b * s00 + a * s10) + a * (-b * s10 + a * s11);
    s.m_20 = a * s20 + b * s21;
    s.m_21 = -b * s20 + a * s21;

    let tmp_x = q.x * g.sin_theta;
    let tmp_y = q.y * g.sin_theta;
    let tmp_z = q.z * g.sin_theta;
    g.sin_theta *= q.w;

    q.z = q.z * g.cos_theta + g.sin_theta;
    q.w = q.w * g.cos_theta - tmp_z;
    q.x = q.x * g.cos_theta + tmp_y;
    q.y = q.y * g.cos_theta - tmp_x;
}

#[inline(always)]
fn conjugate_yz(s: &mut Symmetric3x3, q: &mut DQuat) {
    let mut g = jacobi_givens_parameters(s.m_11, s.m_22, s.m_21);

    let cos_theta2 = g.cos_theta * g.cos_theta;
    let sin_theta2 = g.sin_theta * g.sin_theta;
    let scale = 1.0 / (cos_theta2 + sin_theta2);
    let a = (cos_theta2 - sin_theta2) * scale;
    let b = 2.0 * g.sin_theta * g.cos_theta * scale;

    let s11 = s.m_11;
    let s21 = s.m_21;
    let s22 = s.m_22;
    let s10 = s.m_10;
    let s20 = s.m_20;

    s.m_11 = a * (a * s11 + b * s21) + b * (a * s21 + b * s22);
    s.m_21 = a * (-b * s11 + a * s21) + b * (-b * s21 + a * s22);
    s.m_22 = -b * (-b * s11 + a * s21) + a * (-b * s21 + a * s22);
    s.m_10 = a * s10 + b * s20;
    s.m_20 = -b * s10 + a * s20;

    let tmp_x = q.x * g.sin_theta;
    let tmp_y = q.y * g.sin_theta;
    let tmp_z = q.z * g.sin_theta;
    g.sin_theta *= q.w;

    q.x = q.x * g.cos_theta + g.sin_theta;
    q.w = q.w * g.cos_theta - tmp_x;
    q.y = q.y * g.cos_theta + tmp_z;
    q.z = q.z * g.cos_theta - tmp_y;
}

#[inline(always)]
fn conjugate_xz(s: &mut Symmetric3x3, q: &mut DQuat) {
    let mut g = jacobi_givens_parameters(s.m_00, s.m_22, s.m_20);

    let cos_theta2 = g.cos_theta * g.cos_theta;
    let sin_theta2 = g.sin_theta * g.sin_theta;
    let scale = 1.0 / (cos_theta2 + sin_theta2);
    let a = (cos_theta2 - sin_theta2) * scale;
    let b = 2.0 * g.sin_theta * g.cos_theta * scale;

    let s00 = s.m_00;
    let s20 = s.m_20;
    let s22 = s.m_22;
    let s10 = s.m_10;
    let s21 = s.m_21;

    s.m_00 = a * (a * s00 + b * s20) + b * (a * s20 + b * s22);
    s.m_20 = a * (-b * s00 + a * s20) + b * (-b * s20 + a * s22);
    s.m_22 = -b * (-b * s00 + a * s20) + a * (-b * s20 + a * s22);
    s.m_10 = a * s10 + b * s21;
    s.m_21 = -b * s10 + a * s21;

    // in the (x, z) plane the update above is a rotation about y by -theta
    g.sin_theta = -g.sin_theta;

    let tmp_x = q.x * g.sin_theta;
    let tmp_y = q.y * g.sin_theta;
    let tmp_z = q.z * g.sin_theta;
    g.sin_theta *= q.w;

    q.y = q.y * g.cos_theta + g.sin_theta;
    q.w = q.w * g.cos_theta - tmp_y;
    q.z = q.z * g.cos_theta + tmp_x;
    q.x = q.x * g.cos_theta - tmp_z;
}

fn jacobi_eigenanalysis(mut s: Symmetric3x3) -> DMat3 {
    let mut q = DQuat::IDENTITY;
    for _ in 0..MAX_SWEEPS {
        if s.off_diagonal_norm_sq() <= JACOBI_EPSILON * s.diagonal_norm_sq() {
            break;
        }
        conjugate_xy(&mut s, &mut q);
        conjugate_yz(&mut s, &mut q);
        conjugate_xz(&mut s, &mut q);
    }
    DMat3::from_quat(q.normalize())
}

#[inline(always)]
fn cond_swap(c: bool, x: &mut f64, y: &mut f64) {
    if c {
        std::mem::swap(x, y);
    }
}

#[inline(always)]
fn cond_swap_vec3(c: bool, x: &mut DVec3, y: &mut DVec3) {
    if c {
        std::mem::swap(x, y);
    }
}

/// Flip the sign bit of every component when `c` holds.
#[inline(always)]
fn cond_negate_vec3(c: bool, v: &mut DVec3) {
    let mask = 0_i64.wrapping_sub(c as i64) as u64;
    let neg_mask = mask & 0x8000_0000_0000_0000u64;
    *v = DVec3::new(
        f64::from_bits(v.x.to_bits() ^ neg_mask),
        f64::from_bits(v.y.to_bits() ^ neg_mask),
        f64::from_bits(v.z.to_bits() ^ neg_mask),
    );
}

/// Sorts the singular values in descending order and adjusts the corresponding singular vectors.
///
/// Every swap negates one of the swapped columns so `v` stays a proper rotation.
#[inline(always)]
fn sort_singular_values(b: &mut DMat3, v: &mut DMat3) {
    let mut rho1 = b.x_axis.length_squared();
    let mut rho2 = b.y_axis.length_squared();
    let mut rho3 = b.z_axis.length_squared();

    let c1 = rho1 < rho2;
    cond_swap(c1, &mut rho1, &mut rho2);
    cond_swap_vec3(c1, &mut b.x_axis, &mut b.y_axis);
    cond_swap_vec3(c1, &mut v.x_axis, &mut v.y_axis);
    cond_negate_vec3(c1, &mut b.y_axis);
    cond_negate_vec3(c1, &mut v.y_axis);

    let c2 = rho1 < rho3;
    cond_swap(c2, &mut rho1, &mut rho3);
    cond_swap_vec3(c2, &mut b.x_axis, &mut b.z_axis);
    cond_swap_vec3(c2, &mut v.x_axis, &mut v.z_axis);
    cond_negate_vec3(c2, &mut b.z_axis);
    cond_negate_vec3(c2, &mut v.z_axis);

    let c3 = rho2 < rho3;
    cond_swap_vec3(c3, &mut b.y_axis, &mut b.z_axis);
    cond_swap_vec3(c3, &mut v.y_axis, &mut v.z_axis);
    cond_negate_vec3(c3, &mut b.z_axis);
    cond_negate_vec3(c3, &mut v.z_axis);
}

/// Givens rotation that zeroes `a2` against `a1` (Algorithm 4 of the reference).
#[inline(always)]
fn qr_givens_quaternion(a1: f64, a2: f64) -> Givens {
    let rho = (a1 * a1 + a2 * a2).sqrt();

    let mut g = Givens {
        cos_theta: a1.abs() + f64::max(rho, SVD3_EPSILON),
        sin_theta: if rho > SVD3_EPSILON { a2 } else { 0.0 },
    };

    cond_swap(a1 < 0.0, &mut g.sin_theta, &mut g.cos_theta);

    let w = (g.cos_theta * g.cos_theta + g.sin_theta * g.sin_theta)
        .sqrt()
        .recip();
    g.cos_theta *= w;
    g.sin_theta *= w;
    g
}

/// Applies the Givens rotation `(a, b)` to rows `p` and `q` of every column of `m`.
#[inline(always)]
fn rotate_rows(m: &mut DMat3, p: usize, q: usize, a: f64, b: f64) {
    for col in [&mut m.x_axis, &mut m.y_axis, &mut m.z_axis] {
        let cp = col[p];
        let cq = col[q];
        col[p] = a * cp + b * cq;
        col[q] = -b * cp + a * cq;
    }
}

/// QR decomposition of a matrix using Givens rotations.
fn qr_decomposition(b_mat: &mut DMat3) -> QR3 {
    // first rotation zeroes b[1][0]
    let g1 = qr_givens_quaternion(b_mat.x_axis.x, b_mat.x_axis.y);
    let a1 = -2.0 * g1.sin_theta * g1.sin_theta + 1.0;
    let b1 = 2.0 * g1.cos_theta * g1.sin_theta;
    rotate_rows(b_mat, 0, 1, a1, b1);

    // second rotation zeroes b[2][0]
    let g2 = qr_givens_quaternion(b_mat.x_axis.x, b_mat.x_axis.z);
    let a2 = -2.0 * g2.sin_theta * g2.sin_theta + 1.0;
    let b2 = 2.0 * g2.cos_theta * g2.sin_theta;
    rotate_rows(b_mat, 0, 2, a2, b2);

    // third rotation zeroes b[2][1]
    let g3 = qr_givens_quaternion(b_mat.y_axis.y, b_mat.y_axis.z);
    let a3 = -2.0 * g3.sin_theta * g3.sin_theta + 1.0;
    let b3 = 2.0 * g3.cos_theta * g3.sin_theta;
    rotate_rows(b_mat, 1, 2, a3, b3);

    let r = *b_mat;

    // Q = Q1 * Q2 * Q3
    let q1 = DMat3::from_cols(DVec3::new(a1, b1, 0.0), DVec3::new(-b1, a1, 0.0), DVec3::Z);
    let q2 = DMat3::from_cols(DVec3::new(a2, 0.0, b2), DVec3::Y, DVec3::new(-b2, 0.0, a2));
    let q3 = DMat3::from_cols(DVec3::X, DVec3::new(0.0, a3, b3), DVec3::new(0.0, -b3, a3));

    QR3 {
        q: q1 * q2 * q3,
        r,
    }
}

/// Compute the singular value decomposition of a 3x3 matrix.
///
/// The singular values are sorted in descending order and are non-negative. Both `u` and `v`
/// are orthogonal; `v` is always a proper rotation while `u` may hold a reflection.
pub fn svd3(a: &DMat3) -> SVD3Set {
    // the eigenvectors of A^T * A are the right singular vectors
    let mut v = jacobi_eigenanalysis(Symmetric3x3::from_mat3x3(&(a.transpose() * *a)));
    let mut b = *a * v;

    sort_singular_values(&mut b, &mut v);

    let qr = qr_decomposition(&mut b);

    let mut u = qr.q;
    let mut s = qr.r;

    cond_negate_vec3(s.x_axis.x < 0.0, &mut u.x_axis);
    cond_negate_vec3(s.y_axis.y < 0.0, &mut u.y_axis);
    cond_negate_vec3(s.z_axis.z < 0.0, &mut u.z_axis);

    s.x_axis.x = s.x_axis.x.abs();
    s.y_axis.y = s.y_axis.y.abs();
    s.z_axis.z = s.z_axis.z.abs();

    // R is upper triangular up to rounding, only its diagonal is kept
    let s = DMat3::from_diagonal(DVec3::new(s.x_axis.x, s.y_axis.y, s.z_axis.z));

    SVD3Set { u, s, v }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const EPSILON: f64 = 1e-10;

    fn verify_svd_properties(a: &DMat3, svd: &SVD3Set) {
        let u = svd.u;
        let s = svd.s;
        let v = svd.v;

        let reconstruction = u * s * v.transpose();
        assert!(
            a.abs_diff_eq(reconstruction, EPSILON),
            "Reconstruction failed: A != U*S*V.T\nA:\n{}\nReconstruction:\n{}",
            a,
            reconstruction
        );

        let u_t_u = u.transpose() * u;
        assert!(
            DMat3::IDENTITY.abs_diff_eq(u_t_u, EPSILON),
            "U is not orthogonal: U.T*U != I\nU.T*U:\n{}",
            u_t_u
        );

        let v_t_v = v.transpose() * v;
        assert!(
            DMat3::IDENTITY.abs_diff_eq(v_t_v, EPSILON),
            "V is not orthogonal: V.T*V != I\nV.T*V:\n{}",
            v_t_v
        );

        let s_diag = svd.singular_values();
        assert!(
            s_diag.x >= 0.0 && s_diag.y >= 0.0 && s_diag.z >= 0.0,
            "Singular values are not non-negative: {:?}",
            s_diag
        );
        assert!(
            s_diag.x >= s_diag.y - EPSILON && s_diag.y >= s_diag.z - EPSILON,
            "Singular values are not sorted: {:?}",
            s_diag
        );
    }

    #[test]
    fn test_svd3_diagonal_sorted() {
        let a = DMat3::from_diagonal(DVec3::new(3.0, 2.0, 1.0));
        let svd_result = svd3(&a);
        verify_svd_properties(&a, &svd_result);
        assert!(svd_result
            .singular_values()
            .abs_diff_eq(DVec3::new(3.0, 2.0, 1.0), EPSILON));
    }

    #[test]
    fn test_svd3_diagonal_unsorted() {
        let a = DMat3::from_diagonal(DVec3::new(2.0, 3.0, 1.0));
        let svd_result = svd3(&a);
        verify_svd_properties(&a, &svd_result);
        assert!(svd_result
            .singular_values()
            .abs_diff_eq(DVec3::new(3.0, 2.0, 1.0), EPSILON));
    }

    #[test]
    fn test_svd3_zero() {
        let a = DMat3::ZERO;
        let svd_result = svd3(&a);
        verify_svd_properties(&a, &svd_result);
        assert!(svd_result.s.abs_diff_eq(DMat3::ZERO, EPSILON));
    }

    #[test]
    fn test_svd3_rotation_matrix() {
        let a = DMat3::from_rotation_y(std::f64::consts::FRAC_PI_4);
        let svd_result = svd3(&a);
        verify_svd_properties(&a, &svd_result);
        assert!(svd_result.singular_values().abs_diff_eq(DVec3::ONE, EPSILON));
    }

    #[test]
    fn test_svd3_reflection_matrix() {
        let a = DMat3::from_diagonal(DVec3::new(1.0, -1.0, 1.0));
        let svd_result = svd3(&a);
        verify_svd_properties(&a, &svd_result);
        assert!(svd_result.singular_values().abs_diff_eq(DVec3::ONE, EPSILON));
    }

    #[test]
    fn test_svd3_singular_rank1() {
        let a = DMat3::from_cols(
            DVec3::new(1.0, 2.0, 3.0),
            DVec3::new(2.0, 4.0, 6.0),
            DVec3::new(3.0, 6.0, 9.0),
        );
        let svd_result = svd3(&a);
        verify_svd_properties(&a, &svd_result);

        let s_diag = svd_result.singular_values();
        assert!(s_diag.x > EPSILON);
        assert!(s_diag.y.abs() < 1e-8);
        assert!(s_diag.z.abs() < 1e-8);
    }

    #[test]
    fn test_svd3_singular_rank2() {
        let a = DMat3::from_cols(
            DVec3::new(1.0, 2.0, 3.0),
            DVec3::new(4.0, 5.0, 6.0),
            DVec3::new(5.0, 7.0, 9.0),
        );
        let svd_result = svd3(&a);
        verify_svd_properties(&a, &svd_result);

        let s_diag = svd_result.singular_values();
        assert!(s_diag.x > EPSILON);
        assert!(s_diag.y > EPSILON);
        assert!(s_diag.z.abs() < 1e-8);
    }

    #[test]
    fn test_svd3_general_full_rank() {
        let a = DMat3::from_cols(
            DVec3::new(1.0, 4.0, 7.0),
            DVec3::new(2.0, 5.0, 8.0),
            DVec3::new(3.0, 6.0, 10.0),
        );
        let svd_result = svd3(&a);
        verify_svd_properties(&a, &svd_result);
        assert!(svd_result.singular_values().min_element() > EPSILON);
    }

    #[test]
    fn test_svd3_random() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let cols: [f64; 9] = std::array::from_fn(|_| rng.random_range(-10.0..10.0));
            let a = DMat3::from_cols_array(&cols);
            verify_svd_properties(&a, &svd3(&a));
        }
    }
}
