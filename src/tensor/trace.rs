//! Partial-trace engine and full trace.

use tracing::debug;

use super::Tensor;
use super::layout::{decode_qidx, encode_qidx, radices};
use crate::error::{TensorError, TensorResult};
use crate::kernels::{self, BondIndex, TracedSubBlock};
use crate::scalar::Scalar;
use crate::symmetry::{Bond, BondType};

/// Free-function form of [`Tensor::partial_trace`].
pub fn partial_trace<T: Scalar>(tensor: &Tensor<T>, la: i32, lb: i32) -> TensorResult<Tensor<T>> {
    tensor.partial_trace(la, lb)
}

impl<T: Scalar> Tensor<T> {
    /// Sums over the diagonal of the bond pair `(la, lb)`.
    ///
    /// The remaining bonds keep their order and directions. Tracing a rank-2
    /// tensor gives a rank-0 tensor.
    pub fn partial_trace(&self, la: i32, lb: i32) -> TensorResult<Tensor<T>> {
        if !self.has_elements() {
            return Err(TensorError::NotInitialized { operation: "partial trace" });
        }
        if la == lb {
            return Err(TensorError::labels(format!("cannot trace label {la} with itself")));
        }
        let pa = self.label_position(la)?;
        let pb = self.label_position(lb)?;

        let others = |ty: BondType| -> Vec<i32> {
            (0..self.bonds.len())
                .filter(|&p| p != pa && p != pb && self.bonds[p].ty() == ty)
                .map(|p| self.labels[p])
                .collect()
        };
        let in_others = others(BondType::In);
        let out_others = others(BondType::Out);
        let row_num = in_others.len() + 1;
        let order: Vec<i32> = in_others
            .iter()
            .copied()
            .chain([la, lb])
            .chain(out_others.iter().copied())
            .collect();
        let permuted = self.permute(&order, row_num)?;
        let src = permuted.densified();

        let (bond_a, bond_b) = (&src.bonds[row_num - 1], &src.bonds[row_num]);
        if !bond_a.change(BondType::In).same_runs(&bond_b.change(BondType::Out)) {
            return Err(TensorError::BondMismatch {
                label: la,
                message: format!("cannot trace {bond_a} against {bond_b} (label {lb})"),
            });
        }

        let bonds: Vec<Bond> = src.bonds[..row_num - 1]
            .iter()
            .chain(&src.bonds[row_num + 1..])
            .cloned()
            .collect();
        let labels: Vec<i32> = in_others.iter().chain(&out_others).copied().collect();
        let mut out = Tensor::allocate(bonds, labels, false)?;
        out.name = self.name.clone();
        debug!(la, lb, remaining = out.bonds.len(), "partial trace");

        let src_radices = radices(&src.bonds);
        let dst_radices = radices(&out.bonds);
        let out_rows = out.row_num();
        let mut pos = BondIndex::new();
        for &(qidx, dst_off) in out.layout.qidx_enc() {
            let Some(dst_block) = out.layout.qidx_block(qidx) else { continue };
            decode_qidx(qidx, &dst_radices, &mut pos);
            let degs = out.subblock_extents(&pos);
            let rows: usize = degs[..out_rows].iter().product();
            let cols: usize = degs[out_rows..].iter().product();

            for (t, &run) in bond_a.degeneracies().iter().enumerate() {
                let src_pos = pos[..out_rows]
                    .iter()
                    .copied()
                    .chain([t, t])
                    .chain(pos[out_rows..].iter().copied());
                let src_qidx = encode_qidx(src_pos, &src_radices);
                let (Some(src_off), Some(src_block)) = (src.layout.qidx_offset(src_qidx), src.layout.qidx_block(src_qidx))
                else {
                    continue;
                };
                let geom = TracedSubBlock {
                    rows,
                    run,
                    cols,
                    src_offset: src_off,
                    src_stride: src_block.cols(),
                    dst_offset: dst_off,
                    dst_stride: dst_block.cols(),
                };
                kernels::accumulate_partial_trace(geom, &src.elem, &mut out.elem);
            }
        }
        out.mark_initialized();
        Ok(out)
    }

    /// Sum of the diagonals of every block; blocks must be square.
    pub fn trace(&self) -> TensorResult<T> {
        if !self.has_elements() {
            return Err(TensorError::NotInitialized { operation: "trace" });
        }
        let mut sum = T::zero();
        for block in self.layout.blocks() {
            if block.rows() != block.cols() {
                return Err(TensorError::ShapeMismatch {
                    expected: vec![block.rows(), block.rows()],
                    got: vec![block.rows(), block.cols()],
                });
            }
            sum += kernels::block_trace(self.block_view(block));
        }
        Ok(sum)
    }
}
