//! Block matrix multiplication.
//!
//! Computes C = A @ B for one symmetry block pair, dispatching on the
//! diagonal storage flags of the operands.

use ndarray::linalg::general_mat_mul;
use ndarray::{ArrayView2, ArrayViewMut2};

use crate::error::{TensorError, TensorResult};
use crate::scalar::Scalar;

/// Borrowed block: `rows x cols`, dense row-major or diagonal.
#[derive(Debug, Clone, Copy)]
pub struct MatRef<'a, T> {
    pub rows: usize,
    pub cols: usize,
    pub diag: bool,
    pub data: &'a [T],
}

impl<'a, T: Scalar> MatRef<'a, T> {
    pub fn dense(rows: usize, cols: usize, data: &'a [T]) -> Self {
        Self {
            rows,
            cols,
            diag: false,
            data,
        }
    }

    pub fn diagonal(rows: usize, cols: usize, data: &'a [T]) -> Self {
        Self {
            rows,
            cols,
            diag: true,
            data,
        }
    }

    /// Number of stored elements.
    #[inline]
    pub fn stored_len(&self) -> usize {
        if self.diag {
            self.rows.min(self.cols)
        } else {
            self.rows * self.cols
        }
    }
}

/// Multiplies `a` by `b`, writing the dense `a.rows x b.cols` product into `c`.
///
/// Handles four cases:
/// - diagonal x diagonal: element-wise product on the shared diagonal
/// - diagonal x dense: row scaling
/// - dense x diagonal: column scaling
/// - dense x dense: delegates to ndarray's `general_mat_mul`
pub fn block_gemm<T: Scalar>(a: MatRef<'_, T>, b: MatRef<'_, T>, c: &mut [T]) -> TensorResult<()> {
    let (m, k, n) = (a.rows, a.cols, b.cols);
    if b.rows != k {
        return Err(TensorError::ShapeMismatch {
            expected: vec![k, n],
            got: vec![b.rows, b.cols],
        });
    }
    if c.len() != m * n || a.data.len() != a.stored_len() || b.data.len() != b.stored_len() {
        return Err(TensorError::ShapeMismatch {
            expected: vec![m, n],
            got: vec![c.len()],
        });
    }

    c.iter_mut().for_each(|x| *x = T::zero());
    if m == 0 || n == 0 || k == 0 {
        return Ok(());
    }

    match (a.diag, b.diag) {
        (true, true) => {
            let len = m.min(k).min(n);
            for i in 0..len {
                c[i * n + i] = a.data[i] * b.data[i];
            }
        }
        (true, false) => {
            for i in 0..m.min(k) {
                let scale = a.data[i];
                let row = &b.data[i * n..(i + 1) * n];
                for (dst, &src) in c[i * n..(i + 1) * n].iter_mut().zip(row) {
                    *dst = scale * src;
                }
            }
        }
        (false, true) => {
            let len = k.min(n);
            for i in 0..m {
                for j in 0..len {
                    c[i * n + j] = a.data[i * k + j] * b.data[j];
                }
            }
        }
        (false, false) => {
            let a_view = ArrayView2::from_shape((m, k), a.data).map_err(shape_error)?;
            let b_view = ArrayView2::from_shape((k, n), b.data).map_err(shape_error)?;
            let mut c_view = ArrayViewMut2::from_shape((m, n), c).map_err(shape_error)?;
            general_mat_mul(T::one(), &a_view, &b_view, T::zero(), &mut c_view);
        }
    }
    Ok(())
}

/// Product of two diagonal blocks, kept diagonal.
pub fn diagonal_product<T: Scalar>(a: MatRef<'_, T>, b: MatRef<'_, T>) -> Vec<T> {
    let len = a.rows.min(b.cols);
    let shared = a.stored_len().min(b.stored_len());
    (0..len)
        .map(|i| if i < shared { a.data[i] * b.data[i] } else { T::zero() })
        .collect()
}

fn shape_error(err: ndarray::ShapeError) -> TensorError {
    TensorError::unsupported(format!("block view: {err}"))
}
