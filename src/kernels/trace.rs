//! Trace kernels.
//!
//! Computes the trace of a block and the traced sum over one run of a
//! partial trace.

use super::gemm::MatRef;
use crate::scalar::Scalar;

/// Sum of the diagonal of a block.
pub fn block_trace<T: Scalar>(block: MatRef<'_, T>) -> T {
    if block.diag {
        return block.data.iter().fold(T::zero(), |acc, &x| acc + x);
    }
    (0..block.rows.min(block.cols)).fold(T::zero(), |acc, i| acc + block.data[i * block.cols + i])
}

/// Geometry of one traced sub-block.
///
/// The source sub-block has rows `(r, k)` and columns `(k, c)` with
/// `r < rows`, `k < run`, `c < cols`; it starts at `src_offset` in a block
/// with `src_stride` columns. The destination sub-block is `rows x cols`
/// starting at `dst_offset` in a block with `dst_stride` columns.
#[derive(Debug, Clone, Copy)]
pub struct TracedSubBlock {
    pub rows: usize,
    pub run: usize,
    pub cols: usize,
    pub src_offset: usize,
    pub src_stride: usize,
    pub dst_offset: usize,
    pub dst_stride: usize,
}

/// Accumulates `dst[r, c] += sum_k src[(r, k), (k, c)]`.
pub fn accumulate_partial_trace<T: Scalar>(geom: TracedSubBlock, src: &[T], dst: &mut [T]) {
    let TracedSubBlock {
        rows,
        run,
        cols,
        src_offset,
        src_stride,
        dst_offset,
        dst_stride,
    } = geom;
    for r in 0..rows {
        for c in 0..cols {
            let mut sum = T::zero();
            for k in 0..run {
                sum += src[src_offset + (r * run + k) * src_stride + k * cols + c];
            }
            dst[dst_offset + r * dst_stride + c] += sum;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_trace() {
        let dense = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(block_trace(MatRef::dense(2, 2, &dense)), 5.0);
        assert_eq!(block_trace(MatRef::diagonal(3, 3, &[1.0, 1.0, 1.0])), 3.0);
    }

    #[test]
    fn test_partial_trace_single_run() {
        // rows (r, k) with r < 1, k < 2; cols (k, c) with c < 1: a 2x2 matrix
        let src = [1.0, 2.0, 3.0, 4.0];
        let mut dst = [0.0];
        let geom = TracedSubBlock {
            rows: 1,
            run: 2,
            cols: 1,
            src_offset: 0,
            src_stride: 2,
            dst_offset: 0,
            dst_stride: 1,
        };
        accumulate_partial_trace(geom, &src, &mut dst);
        assert_eq!(dst, [5.0]);
    }
}
