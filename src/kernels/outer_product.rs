//! Outer product kernel.
//!
//! Computes C[i, j] = A[i] * B[j], the single-block form of a contraction
//! without shared bonds.

use crate::scalar::Scalar;

/// Writes `output[i * rhs.len() + j] = lhs[i] * rhs[j]`.
pub fn outer_product<T: Scalar>(lhs: &[T], rhs: &[T], output: &mut [T]) {
    debug_assert_eq!(output.len(), lhs.len() * rhs.len());
    let n = rhs.len();
    for (i, &a) in lhs.iter().enumerate() {
        for (dst, &b) in output[i * n..(i + 1) * n].iter_mut().zip(rhs) {
            *dst = a * b;
        }
    }
}
