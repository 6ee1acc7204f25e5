//! Dense and diagonal matrices exchanged with tensor blocks.

use core::fmt;

use ndarray::Array2;

use crate::error::{TensorError, TensorResult};
use crate::kernels::{self, MatRef};
use crate::scalar::Scalar;

/// A `rows x cols` matrix stored densely (row-major) or as its diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T: Scalar> {
    rows: usize,
    cols: usize,
    diag: bool,
    elem: Vec<T>,
}

impl<T: Scalar> Matrix<T> {
    /// Dense zero matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            diag: false,
            elem: vec![T::zero(); rows * cols],
        }
    }

    /// Diagonal zero matrix.
    pub fn zeros_diagonal(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            diag: true,
            elem: vec![T::zero(); rows.min(cols)],
        }
    }

    pub fn identity(n: usize) -> Self {
        Self {
            rows: n,
            cols: n,
            diag: true,
            elem: vec![T::one(); n],
        }
    }

    /// Dense matrix from row-major elements.
    pub fn from_vec(rows: usize, cols: usize, elem: Vec<T>) -> TensorResult<Self> {
        if elem.len() != rows * cols {
            return Err(TensorError::ShapeMismatch {
                expected: vec![rows * cols],
                got: vec![elem.len()],
            });
        }
        Ok(Self {
            rows,
            cols,
            diag: false,
            elem,
        })
    }

    /// Diagonal matrix from its `min(rows, cols)` diagonal entries.
    pub fn from_diagonal(rows: usize, cols: usize, elem: Vec<T>) -> TensorResult<Self> {
        if elem.len() != rows.min(cols) {
            return Err(TensorError::ShapeMismatch {
                expected: vec![rows.min(cols)],
                got: vec![elem.len()],
            });
        }
        Ok(Self {
            rows,
            cols,
            diag: true,
            elem,
        })
    }

    pub(crate) fn from_ref(block: MatRef<'_, T>) -> Self {
        Self {
            rows: block.rows,
            cols: block.cols,
            diag: block.diag,
            elem: block.data.to_vec(),
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn is_diag(&self) -> bool {
        self.diag
    }

    /// Stored elements (the diagonal for diagonal matrices).
    #[inline]
    pub fn elem(&self) -> &[T] {
        &self.elem
    }

    #[inline]
    pub fn view(&self) -> MatRef<'_, T> {
        MatRef {
            rows: self.rows,
            cols: self.cols,
            diag: self.diag,
            data: &self.elem,
        }
    }

    pub fn at(&self, row: usize, col: usize) -> TensorResult<T> {
        if row >= self.rows || col >= self.cols {
            return Err(TensorError::IndexOutOfRange {
                index: vec![row, col],
                dims: vec![self.rows, self.cols],
            });
        }
        if self.diag {
            Ok(if row == col { self.elem[row] } else { T::zero() })
        } else {
            Ok(self.elem[row * self.cols + col])
        }
    }

    /// Dense copy of this matrix.
    pub fn to_dense(&self) -> Matrix<T> {
        if !self.diag {
            return self.clone();
        }
        Matrix {
            rows: self.rows,
            cols: self.cols,
            diag: false,
            elem: kernels::expand_diagonal(self.rows, self.cols, &self.elem),
        }
    }

    /// Diagonal copy of this matrix, or `None` when an off-diagonal entry is
    /// non-zero.
    pub fn to_diagonal(&self) -> Option<Matrix<T>> {
        if self.diag {
            return Some(self.clone());
        }
        if !kernels::is_diagonal(self.rows, self.cols, &self.elem) {
            return None;
        }
        Some(Matrix {
            rows: self.rows,
            cols: self.cols,
            diag: true,
            elem: kernels::extract_diagonal(self.rows, self.cols, &self.elem),
        })
    }

    pub fn transpose(&self) -> Matrix<T> {
        if self.diag {
            return Matrix {
                rows: self.cols,
                cols: self.rows,
                diag: true,
                elem: self.elem.clone(),
            };
        }
        let mut elem = vec![T::zero(); self.elem.len()];
        kernels::transpose_block(self.rows, self.cols, &self.elem, &mut elem);
        Matrix {
            rows: self.cols,
            cols: self.rows,
            diag: false,
            elem,
        }
    }

    /// Matrix product; two diagonal operands give a diagonal result.
    pub fn mul(&self, other: &Matrix<T>) -> TensorResult<Matrix<T>> {
        if self.cols != other.rows {
            return Err(TensorError::ShapeMismatch {
                expected: vec![self.cols, other.cols],
                got: vec![other.rows, other.cols],
            });
        }
        if self.diag && other.diag {
            return Ok(Matrix {
                rows: self.rows,
                cols: other.cols,
                diag: true,
                elem: kernels::diagonal_product(self.view(), other.view()),
            });
        }
        let mut out = Matrix::zeros(self.rows, other.cols);
        kernels::block_gemm(self.view(), other.view(), &mut out.elem)?;
        Ok(out)
    }

    pub fn trace(&self) -> TensorResult<T> {
        if self.rows != self.cols {
            return Err(TensorError::ShapeMismatch {
                expected: vec![self.rows, self.rows],
                got: vec![self.rows, self.cols],
            });
        }
        Ok(kernels::block_trace(self.view()))
    }

    /// Converts into an ndarray matrix.
    pub fn to_array2(&self) -> Array2<T> {
        let dense = self.to_dense();
        Array2::from_shape_vec((self.rows, self.cols), dense.elem)
            .unwrap_or_else(|_| Array2::zeros((self.rows, self.cols)))
    }
}

impl<T: Scalar> From<Array2<T>> for Matrix<T> {
    fn from(array: Array2<T>) -> Self {
        let (rows, cols) = array.dim();
        Matrix {
            rows,
            cols,
            diag: false,
            elem: array.iter().copied().collect(),
        }
    }
}

impl<T: Scalar> fmt::Display for Matrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {} = {}", self.rows, self.cols, self.rows * self.cols)?;
        if self.diag {
            write!(f, ", Diagonal")?;
        }
        writeln!(f)?;
        for r in 0..self.rows {
            for c in 0..self.cols {
                let value = if self.diag {
                    if r == c { self.elem[r] } else { T::zero() }
                } else {
                    self.elem[r * self.cols + c]
                };
                write!(f, "{value:?} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
