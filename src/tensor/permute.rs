//! Permute engine: reorders bonds and moves them between rows and columns.
//!
//! Every stored sub-block of the source is copied, with an odometer walk over
//! the old bond order, to the position of its re-encoded Qidx in the
//! destination. Fermionic tensors pick up one sign per sub-block.

use tracing::debug;

use super::Tensor;
use super::layout::{decode_qidx, encode_qidx, radices};
use crate::error::{TensorError, TensorResult};
use crate::kernels::{self, BondIndex};
use crate::scalar::Scalar;
use crate::symmetry::{Bond, BondType, Symmetry};

/// Free-function form of [`Tensor::permute`].
pub fn permute<T: Scalar>(tensor: &Tensor<T>, new_labels: &[i32], row_num: usize) -> TensorResult<Tensor<T>> {
    tensor.permute(new_labels, row_num)
}

impl<T: Scalar> Tensor<T> {
    /// Reorders the bonds to `new_labels`, making the first `row_num` of them
    /// incoming.
    pub fn permute(&self, new_labels: &[i32], row_num: usize) -> TensorResult<Tensor<T>> {
        let bond_num = self.bonds.len();
        if bond_num == 0 {
            return Err(TensorError::NoBonds { operation: "permute" });
        }
        if row_num > bond_num {
            return Err(TensorError::permutation(format!(
                "row number {row_num} exceeds bond number {bond_num}"
            )));
        }
        let rsp = self.permutation_to(new_labels)?;

        if rsp.iter().enumerate().all(|(i, &old)| i == old) && row_num == self.row_num() {
            debug!(labels = ?new_labels, "identity permutation");
            return Ok(self.clone());
        }

        let bonds: Vec<Bond> = rsp
            .iter()
            .enumerate()
            .map(|(i, &old)| {
                let ty = if i < row_num { BondType::In } else { BondType::Out };
                self.bonds[old].change(ty)
            })
            .collect();
        let mut out = Tensor::allocate(bonds, new_labels.to_vec(), false)?;
        out.name = self.name.clone();

        if !self.has_elements() {
            return Ok(out);
        }

        let src = self.densified();
        debug!(
            symmetry = ?self.symmetry,
            from = ?self.labels,
            to = ?new_labels,
            row_num,
            "permute"
        );
        match self.symmetry {
            Symmetry::NoSymmetry => permute_single_block(&src, &mut out, &rsp),
            Symmetry::Bosonic => permute_blocks(&src, &mut out, &rsp, false)?,
            Symmetry::Fermionic => permute_blocks(&src, &mut out, &rsp, true)?,
        }
        out.mark_initialized();
        Ok(out)
    }

    /// Old position of each label of `new_labels`.
    pub(crate) fn permutation_to(&self, new_labels: &[i32]) -> TensorResult<BondIndex> {
        if new_labels.len() != self.labels.len() {
            return Err(TensorError::permutation(format!(
                "{:?} is not a permutation of {:?}",
                new_labels, self.labels
            )));
        }
        let mut used = vec![false; self.labels.len()];
        let mut rsp = BondIndex::with_capacity(new_labels.len());
        for &label in new_labels {
            let old = self.labels.iter().position(|&l| l == label);
            match old {
                Some(old) if !used[old] => {
                    used[old] = true;
                    rsp.push(old);
                }
                _ => {
                    return Err(TensorError::permutation(format!(
                        "{:?} is not a permutation of {:?}",
                        new_labels, self.labels
                    )));
                }
            }
        }
        Ok(rsp)
    }

    /// Swaps incoming and outgoing bonds and transposes every block.
    ///
    /// Quantum numbers are kept, so each block keeps its key.
    pub fn transpose(&self) -> TensorResult<Tensor<T>> {
        let row_num = self.row_num();
        let (rows, cols) = self.bonds.split_at(row_num);
        let bonds: Vec<Bond> = cols
            .iter()
            .map(|b| b.dummy_change(BondType::In))
            .chain(rows.iter().map(|b| b.dummy_change(BondType::Out)))
            .collect();
        let labels: Vec<i32> = self.labels[row_num..]
            .iter()
            .chain(&self.labels[..row_num])
            .copied()
            .collect();

        let mut out = Tensor::allocate(bonds, labels, self.is_diag())?;
        out.name = self.name.clone();
        if !self.has_elements() {
            return Ok(out);
        }
        for (src, dst) in self.layout.blocks().iter().zip(out.layout.blocks()) {
            let from = &self.elem[src.range()];
            let to = &mut out.elem[dst.range()];
            if src.is_diag() {
                to.copy_from_slice(from);
            } else {
                kernels::transpose_block(src.rows(), src.cols(), from, to);
            }
        }
        out.mark_initialized();
        Ok(out)
    }

    /// Merges the bonds named by `labels` into one bond.
    ///
    /// The bonds are first made contiguous at the position of the first
    /// label, on its side, then fused with [`Bond::combine_all`]. The merged
    /// bond keeps the first label.
    pub fn combine_bond(&self, labels: &[i32]) -> TensorResult<Tensor<T>> {
        let Some(&first) = labels.first() else {
            return Err(TensorError::labels("no label to combine"));
        };
        super::check_labels(labels, labels.len())?;
        if labels.len() == 1 {
            self.label_position(first)?;
            return Ok(self.clone());
        }
        let first_pos = self.label_position(first)?;
        let mut group_pos = Vec::with_capacity(labels.len());
        for &label in labels {
            group_pos.push(self.label_position(label)?);
        }

        let rest: Vec<usize> = (0..self.bonds.len()).filter(|p| !group_pos.contains(p)).collect();
        let insert_at = rest.iter().filter(|&&p| p < first_pos).count();
        let is_in = |p: usize| self.bonds[p].ty() == BondType::In;
        let row_num = if is_in(first_pos) {
            insert_at + labels.len() + rest[insert_at..].iter().filter(|&&p| is_in(p)).count()
        } else {
            rest[..insert_at].iter().filter(|&&p| is_in(p)).count()
        };

        let order: Vec<i32> = rest[..insert_at]
            .iter()
            .map(|&p| self.labels[p])
            .chain(labels.iter().copied())
            .chain(rest[insert_at..].iter().map(|&p| self.labels[p]))
            .collect();
        let permuted = self.permute(&order, row_num)?;

        let group_end = insert_at + labels.len();
        let merged = Bond::combine_all(&permuted.bonds[insert_at..group_end])?;
        let mut bonds = permuted.bonds[..insert_at].to_vec();
        bonds.push(merged);
        bonds.extend_from_slice(&permuted.bonds[group_end..]);
        let mut new_labels = order[..insert_at].to_vec();
        new_labels.push(first);
        new_labels.extend_from_slice(&order[group_end..]);

        let mut out = Tensor::allocate(bonds, new_labels, false)?;
        out.name = self.name.clone();
        if permuted.has_elements() {
            out.set_raw_elem(&permuted.raw_elem())?;
        }
        debug!(labels = ?labels, bonds = out.bonds.len(), "combined bonds");
        Ok(out)
    }
}

/// Trivial bonds: a single strided transpose of the one block.
fn permute_single_block<T: Scalar>(src: &Tensor<T>, out: &mut Tensor<T>, rsp: &[usize]) {
    let dims: BondIndex = src.bonds.iter().map(Bond::dim).collect();
    let src_strides = kernels::dense_strides(&dims);
    let new_dims: BondIndex = rsp.iter().map(|&old| dims[old]).collect();
    let new_strides = kernels::dense_strides(&new_dims);
    let dst_strides = strides_in_old_order(&new_strides, rsp);

    let dst = &mut out.elem;
    kernels::strided_walk(&dims, &src_strides, &dst_strides, 0, 0, |a, b| dst[b] = src.elem[a]);
}

/// Symmetric bonds: one strided copy per stored sub-block.
fn permute_blocks<T: Scalar>(
    src: &Tensor<T>,
    out: &mut Tensor<T>,
    rsp: &[usize],
    fermionic: bool,
) -> TensorResult<()> {
    let src_radices = radices(&src.bonds);
    let dst_radices = radices(&out.bonds);
    let src_rows = src.row_num();
    let dst_rows = out.row_num();
    let src_order = fermionic_order(src_rows, rsp.len(), |i| i);
    let dst_order = fermionic_order(dst_rows, rsp.len(), |i| rsp[i]);

    let mut pos = BondIndex::new();
    for &(qidx, src_off) in src.layout.qidx_enc() {
        decode_qidx(qidx, &src_radices, &mut pos);
        let dst_qidx = encode_qidx(rsp.iter().map(|&old| pos[old]), &dst_radices);
        let (Some(src_block), Some(dst_off), Some(dst_block)) = (
            src.layout.qidx_block(qidx),
            out.layout.qidx_offset(dst_qidx),
            out.layout.qidx_block(dst_qidx),
        ) else {
            return Err(TensorError::unsupported(format!(
                "permuted sub-block {dst_qidx} has no destination block"
            )));
        };

        let degs = src.subblock_extents(&pos);
        let src_strides = kernels::subblock_strides(&degs, src_rows, src_block.cols());
        let new_degs: BondIndex = rsp.iter().map(|&old| degs[old]).collect();
        let new_strides = kernels::subblock_strides(&new_degs, dst_rows, dst_block.cols());
        let dst_strides = strides_in_old_order(&new_strides, rsp);

        let negate = fermionic && swap_sign(&src_order, &dst_order, |b| src.bonds[b].qnums()[pos[b]].prt_f().is_odd());

        let dst = &mut out.elem;
        if negate {
            kernels::strided_walk(&degs, &src_strides, &dst_strides, src_off, dst_off, |a, b| {
                dst[b] = -src.elem[a]
            });
        } else {
            kernels::strided_walk(&degs, &src_strides, &dst_strides, src_off, dst_off, |a, b| {
                dst[b] = src.elem[a]
            });
        }
    }
    Ok(())
}

/// Reorders strides given in the new bond order into the old bond order.
fn strides_in_old_order(new_strides: &[usize], rsp: &[usize]) -> BondIndex {
    let mut strides: BondIndex = BondIndex::from_elem(0, rsp.len());
    for (new, &old) in rsp.iter().enumerate() {
        strides[old] = new_strides[new];
    }
    strides
}

/// Rank of every (old) bond in the fermionic ordering: incoming bonds in
/// order, then outgoing bonds in reverse order. `bond_at(i)` names the old
/// bond sitting at position `i`.
fn fermionic_order(row_num: usize, bond_num: usize, bond_at: impl Fn(usize) -> usize) -> BondIndex {
    let mut rank: BondIndex = BondIndex::from_elem(0, bond_num);
    let sequence = (0..row_num).chain((row_num..bond_num).rev());
    for (r, i) in sequence.enumerate() {
        rank[bond_at(i)] = r;
    }
    rank
}

/// Parity of the odd-odd bond pairs whose relative order changes.
fn swap_sign(src_rank: &[usize], dst_rank: &[usize], is_odd: impl Fn(usize) -> bool) -> bool {
    let odd: BondIndex = (0..src_rank.len()).filter(|&b| is_odd(b)).collect();
    let mut sign = false;
    for (i, &a) in odd.iter().enumerate() {
        for &b in &odd[i + 1..] {
            if (src_rank[a] < src_rank[b]) != (dst_rank[a] < dst_rank[b]) {
                sign = !sign;
            }
        }
    }
    sign
}
