//! Cyclic Jacobi eigen-decomposition of small symmetric matrices.

const MAX_SWEEPS: usize = 50;
const JACOBI_EPSILON: f64 = 1e-28;

/// Eigen decomposition of a symmetric 4x4 matrix.
///
/// # Arguments
///
/// * `matrix` - A symmetric matrix, row-major. Only symmetric input gives meaningful results.
///
/// # Returns
///
/// The eigenvalues and a row-major matrix whose column `j` is the unit eigenvector of
/// eigenvalue `j`. The eigenvalues are not sorted.
pub fn symmetric_eigen4(matrix: &[[f64; 4]; 4]) -> ([f64; 4], [[f64; 4]; 4]) {
    let mut a = *matrix;
    let mut v = [[0.0; 4]; 4];
    for (i, row) in v.iter_mut().enumerate() {
        row[i] = 1.0;
    }

    let scale: f64 = a.iter().flatten().map(|x| x * x).sum();

    for _ in 0..MAX_SWEEPS {
        let off_diagonal: f64 = (0..4)
            .flat_map(|i| (0..4).filter(move |&j| j != i).map(move |j| (i, j)))
            .map(|(i, j)| a[i][j] * a[i][j])
            .sum();
        if off_diagonal <= JACOBI_EPSILON * scale {
            break;
        }

        for p in 0..4 {
            for q in (p + 1)..4 {
                if a[p][q] == 0.0 {
                    continue;
                }
                // smallest rotation annihilating a[p][q]
                let tau = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
                let t = tau.signum() / (tau.abs() + (1.0 + tau * tau).sqrt());
                let c = 1.0 / (1.0 + t * t).sqrt();
                let s = t * c;

                for row in a.iter_mut() {
                    let (akp, akq) = (row[p], row[q]);
                    row[p] = c * akp - s * akq;
                    row[q] = s * akp + c * akq;
                }
                for k in 0..4 {
                    let (apk, aqk) = (a[p][k], a[q][k]);
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for row in v.iter_mut() {
                    let (vkp, vkq) = (row[p], row[q]);
                    row[p] = c * vkp - s * vkq;
                    row[q] = s * vkp + c * vkq;
                }
            }
        }
    }

    ([a[0][0], a[1][1], a[2][2], a[3][3]], v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn check_decomposition(m: &[[f64; 4]; 4]) {
        let (values, vectors) = symmetric_eigen4(m);
        for (j, &lambda) in values.iter().enumerate() {
            for i in 0..4 {
                let mv: f64 = (0..4).map(|k| m[i][k] * vectors[k][j]).sum();
                assert_relative_eq!(mv, lambda * vectors[i][j], epsilon = 1e-10);
            }
            let norm: f64 = (0..4).map(|k| vectors[k][j] * vectors[k][j]).sum();
            assert_relative_eq!(norm, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_eigen4_diagonal() {
        let m = [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 4.0, 0.0, 0.0],
            [0.0, 0.0, -2.0, 0.0],
            [0.0, 0.0, 0.0, 3.0],
        ];
        let (values, vectors) = symmetric_eigen4(&m);
        assert_eq!(values, [1.0, 4.0, -2.0, 3.0]);
        assert_eq!(vectors[1][1], 1.0);
    }

    #[test]
    fn test_eigen4_dense() {
        let m = [
            [4.0, 1.0, -2.0, 2.0],
            [1.0, 2.0, 0.0, 1.0],
            [-2.0, 0.0, 3.0, -2.0],
            [2.0, 1.0, -2.0, -1.0],
        ];
        check_decomposition(&m);

        let (values, _) = symmetric_eigen4(&m);
        let trace: f64 = values.iter().sum();
        assert_relative_eq!(trace, 8.0, epsilon = 1e-10);
    }

    #[test]
    fn test_eigen4_repeated() {
        let m = [
            [2.0, 1.0, 0.0, 0.0],
            [1.0, 2.0, 0.0, 0.0],
            [0.0, 0.0, 3.0, 0.0],
            [0.0, 0.0, 0.0, 3.0],
        ];
        check_decomposition(&m);
    }
}
