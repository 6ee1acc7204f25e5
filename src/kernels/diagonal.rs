//! Conversions between diagonal and dense block storage.

use crate::scalar::Scalar;

/// Expands a diagonal `rows x cols` block into dense row-major storage.
pub fn expand_diagonal<T: Scalar>(rows: usize, cols: usize, diag: &[T]) -> Vec<T> {
    let mut dense = vec![T::zero(); rows * cols];
    for (i, &v) in diag.iter().enumerate().take(rows.min(cols)) {
        dense[i * cols + i] = v;
    }
    dense
}

/// Extracts the diagonal of a dense `rows x cols` block.
pub fn extract_diagonal<T: Scalar>(rows: usize, cols: usize, dense: &[T]) -> Vec<T> {
    (0..rows.min(cols)).map(|i| dense[i * cols + i]).collect()
}

/// Returns true when every off-diagonal entry is zero.
pub fn is_diagonal<T: Scalar>(rows: usize, cols: usize, dense: &[T]) -> bool {
    (0..rows).all(|r| (0..cols).all(|c| r == c || dense[r * cols + c] == T::zero()))
}
