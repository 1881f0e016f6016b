use glam::DMat3;

/// Convert a row-major 3x3 array to a glam matrix.
#[inline]
pub fn array33_to_dmat3(array: &[[f64; 3]; 3]) -> DMat3 {
    // glam stores columns, the array stores rows
    DMat3::from_cols_array_2d(array).transpose()
}

/// Convert a glam matrix to a row-major 3x3 array.
#[inline]
pub fn dmat3_to_array33(mat: &DMat3) -> [[f64; 3]; 3] {
    mat.transpose().to_cols_array_2d()
}
