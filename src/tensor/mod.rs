//! Block-sparse symmetric tensors.
//!
//! A [`Tensor`] owns its bonds, labels and one flat element buffer. The
//! [`Layout`] partitions the buffer into symmetry blocks; only blocks allowed
//! by the quantum numbers are stored.

mod contract;
mod io;
mod layout;
mod permute;
mod trace;

pub use contract::contract;
pub use layout::{Block, Layout};
pub use permute::permute;
pub use trace::partial_trace;

use core::fmt;
use std::borrow::Cow;
use std::collections::BTreeMap;

use hashbrown::HashSet;
use rand::Rng;

use crate::error::{TensorError, TensorResult};
use crate::kernels::{self, BondIndex, MatRef};
use crate::matrix::Matrix;
use crate::scalar::Scalar;
use crate::symmetry::{Bond, BondType, Qnum, Symmetry};

/// Which parts of a tensor have been set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Status {
    pub has_bonds: bool,
    pub has_elements: bool,
}

/// A tensor whose bonds carry abelian quantum numbers.
///
/// Incoming bonds come first and form the block rows, outgoing bonds form
/// the block columns. Tensors are values: every operation returns a fresh
/// tensor and leaves its inputs untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T: Scalar> {
    name: String,
    bonds: Vec<Bond>,
    labels: Vec<i32>,
    symmetry: Symmetry,
    layout: Layout,
    elem: Vec<T>,
    status: Status,
}

impl<T: Scalar> Tensor<T> {
    /// Builds a tensor with default labels `0..n` and no elements.
    ///
    /// Fails when incoming bonds do not precede outgoing bonds, or when no
    /// quantum number is shared by the row and column fusions.
    pub fn new(bonds: Vec<Bond>) -> TensorResult<Self> {
        let labels = (0..bonds.len() as i32).collect();
        Self::build(bonds, labels, false)
    }

    pub fn with_labels(bonds: Vec<Bond>, labels: Vec<i32>) -> TensorResult<Self> {
        Self::build(bonds, labels, false)
    }

    /// Like [`Tensor::new`], storing only the diagonal of every block.
    pub fn diagonal(bonds: Vec<Bond>) -> TensorResult<Self> {
        let labels = (0..bonds.len() as i32).collect();
        Self::build(bonds, labels, true)
    }

    /// Builds a tensor with every element set to zero.
    pub fn zeros(bonds: Vec<Bond>) -> TensorResult<Self> {
        let mut tensor = Self::new(bonds)?;
        tensor.set_zero();
        Ok(tensor)
    }

    /// A rank-0 tensor holding `value`.
    pub fn scalar(value: T) -> Self {
        Self {
            name: String::new(),
            bonds: Vec::new(),
            labels: Vec::new(),
            symmetry: Symmetry::NoSymmetry,
            layout: Layout::scalar(),
            elem: vec![value],
            status: Status {
                has_bonds: true,
                has_elements: true,
            },
        }
    }

    fn build(bonds: Vec<Bond>, labels: Vec<i32>, diag: bool) -> TensorResult<Self> {
        check_bond_order(&bonds)?;
        check_labels(&labels, bonds.len())?;
        let tensor = Self::allocate(bonds, labels, diag)?;
        if tensor.layout.is_empty() {
            return Err(TensorError::NoSymmetryBlock);
        }
        Ok(tensor)
    }

    /// Lays out `bonds` without checks; the layout may hold no block.
    pub(crate) fn allocate(bonds: Vec<Bond>, labels: Vec<i32>, diag: bool) -> TensorResult<Self> {
        let row_num = bonds.iter().filter(|b| b.ty() == BondType::In).count();
        let symmetry = Symmetry::infer(&bonds);
        let layout = Layout::build(&bonds, row_num, symmetry, diag)?;
        let elem = vec![T::zero(); layout.elem_num()];
        Ok(Self {
            name: String::new(),
            bonds,
            labels,
            symmetry,
            layout,
            elem,
            status: Status {
                has_bonds: true,
                has_elements: false,
            },
        })
    }

    pub(crate) fn status(&self) -> Status {
        self.status
    }

    pub(crate) fn mark_initialized(&mut self) {
        self.status.has_elements = true;
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[inline]
    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    #[inline]
    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    /// Replaces the labels; they must be distinct, one per bond.
    pub fn set_labels(&mut self, labels: &[i32]) -> TensorResult<()> {
        check_labels(labels, self.bonds.len())?;
        self.labels = labels.to_vec();
        Ok(())
    }

    #[inline]
    pub fn bond_num(&self) -> usize {
        self.bonds.len()
    }

    /// Number of incoming bonds.
    #[inline]
    pub fn row_num(&self) -> usize {
        self.layout.row_num()
    }

    #[inline]
    pub fn symmetry(&self) -> Symmetry {
        self.symmetry
    }

    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Number of stored elements.
    #[inline]
    pub fn elem_num(&self) -> usize {
        self.elem.len()
    }

    #[inline]
    pub fn has_elements(&self) -> bool {
        self.status.has_elements
    }

    #[inline]
    pub fn is_diag(&self) -> bool {
        self.layout.is_diag()
    }

    /// Dimension of every bond.
    pub fn shape(&self) -> Vec<usize> {
        self.bonds.iter().map(Bond::dim).collect()
    }

    /// Position of `label` among the bonds.
    pub fn label_position(&self, label: i32) -> TensorResult<usize> {
        self.labels
            .iter()
            .position(|&l| l == label)
            .ok_or_else(|| TensorError::LabelNotFound {
                label,
                labels: self.labels.clone(),
            })
    }

    pub fn bond(&self, label: i32) -> TensorResult<&Bond> {
        self.label_position(label).map(|i| &self.bonds[i])
    }

    /// The flat buffer, block after block in ascending quantum number order.
    #[inline]
    pub fn elem(&self) -> &[T] {
        &self.elem
    }

    /// Overwrites the flat buffer.
    pub fn set_elem(&mut self, elem: &[T]) -> TensorResult<()> {
        if elem.len() != self.elem.len() {
            return Err(TensorError::ShapeMismatch {
                expected: vec![self.elem.len()],
                got: vec![elem.len()],
            });
        }
        self.elem.copy_from_slice(elem);
        self.status.has_elements = true;
        Ok(())
    }

    pub fn set_zero(&mut self) {
        self.elem.iter_mut().for_each(|x| *x = T::zero());
        self.status.has_elements = true;
    }

    /// Sets every block to the identity (ones on the block diagonal).
    pub fn identity(&mut self) {
        self.set_zero();
        for block in self.layout.blocks() {
            let data = &mut self.elem[block.range()];
            if block.is_diag() {
                data.iter_mut().for_each(|x| *x = T::one());
            } else {
                for i in 0..block.rows().min(block.cols()) {
                    data[i * block.cols() + i] = T::one();
                }
            }
        }
    }

    /// Fills the stored elements with uniform samples from `[0, 1)`.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.elem.iter_mut().for_each(|x| *x = T::random(rng));
        self.status.has_elements = true;
    }

    /// Multiplies every element by `factor`.
    pub fn scale(&mut self, factor: T) {
        self.elem.iter_mut().for_each(|x| *x *= factor);
    }

    /// Element-wise sum; both tensors must have the same bonds.
    pub fn add(&self, other: &Tensor<T>) -> TensorResult<Tensor<T>> {
        if self.bonds != other.bonds {
            return Err(TensorError::bond("cannot add tensors with different bonds"));
        }
        if !self.has_elements() || !other.has_elements() {
            return Err(TensorError::NotInitialized { operation: "add" });
        }
        let (lhs, rhs) = if self.is_diag() == other.is_diag() {
            (Cow::Borrowed(self), Cow::Borrowed(other))
        } else {
            (self.densified(), other.densified())
        };
        let mut out = lhs.into_owned();
        for (x, &y) in out.elem.iter_mut().zip(rhs.elem.iter()) {
            *x += y;
        }
        Ok(out)
    }

    /// Complex conjugate of every element.
    pub fn conj(&self) -> Tensor<T> {
        let mut out = self.clone();
        out.elem.iter_mut().for_each(|x| *x = x.conj());
        out
    }

    /// Frobenius norm of the stored elements.
    pub fn norm(&self) -> f64 {
        self.elem.iter().map(|x| x.abs_sqr()).sum::<f64>().sqrt()
    }

    /// Copy of this tensor with dense block storage.
    pub fn to_dense(&self) -> Tensor<T> {
        self.densified().into_owned()
    }

    pub(crate) fn densified(&self) -> Cow<'_, Tensor<T>> {
        if !self.is_diag() {
            return Cow::Borrowed(self);
        }
        let layout = self.layout.to_dense();
        let mut out = Self {
            name: self.name.clone(),
            bonds: self.bonds.clone(),
            labels: self.labels.clone(),
            symmetry: self.symmetry,
            elem: vec![T::zero(); layout.elem_num()],
            layout,
            status: self.status,
        };
        for (src, dst) in self.layout.blocks().iter().zip(out.layout.blocks()) {
            let dense = kernels::expand_diagonal(src.rows(), src.cols(), &self.elem[src.range()]);
            out.elem[dst.range()].copy_from_slice(&dense);
        }
        Cow::Owned(out)
    }

    /// Quantum numbers of the stored blocks, ascending.
    pub fn block_qnums(&self) -> Vec<Qnum> {
        self.layout.qnums().to_vec()
    }

    pub fn block_count(&self) -> usize {
        self.layout.blocks().len()
    }

    pub(crate) fn block_view(&self, block: &Block) -> MatRef<'_, T> {
        MatRef {
            rows: block.rows(),
            cols: block.cols(),
            diag: block.is_diag(),
            data: &self.elem[block.range()],
        }
    }

    /// Copy of the block with quantum number `q`.
    pub fn get_block(&self, q: &Qnum) -> TensorResult<Matrix<T>> {
        let block = self.layout.block(q).ok_or(TensorError::BlockNotFound { qnum: *q })?;
        Ok(Matrix::from_ref(self.block_view(block)))
    }

    /// Every block keyed by its quantum number.
    pub fn blocks(&self) -> BTreeMap<Qnum, Matrix<T>> {
        self.layout
            .qnums()
            .iter()
            .zip(self.layout.blocks())
            .map(|(q, block)| (*q, Matrix::from_ref(self.block_view(block))))
            .collect()
    }

    /// Overwrites the block with quantum number `q`.
    ///
    /// A dense matrix written into diagonal storage converts the tensor to
    /// dense storage first.
    pub fn put_block(&mut self, q: &Qnum, matrix: &Matrix<T>) -> TensorResult<()> {
        let block = *self.layout.block(q).ok_or(TensorError::BlockNotFound { qnum: *q })?;
        if (block.rows(), block.cols()) != (matrix.rows(), matrix.cols()) {
            return Err(TensorError::ShapeMismatch {
                expected: vec![block.rows(), block.cols()],
                got: vec![matrix.rows(), matrix.cols()],
            });
        }
        if block.is_diag() && !matrix.is_diag() {
            *self = self.to_dense();
            return self.put_block(q, matrix);
        }
        let data = &mut self.elem[block.range()];
        if block.is_diag() || !matrix.is_diag() {
            data.copy_from_slice(matrix.elem());
        } else {
            data.copy_from_slice(matrix.to_dense().elem());
        }
        self.status.has_elements = true;
        Ok(())
    }

    /// Extents of sub-block `pos` (one run per bond) and the column count of
    /// its block.
    pub(crate) fn subblock_extents(&self, pos: &[usize]) -> BondIndex {
        self.bonds
            .iter()
            .zip(pos)
            .map(|(b, &p)| b.degeneracies()[p])
            .collect()
    }

    /// Visits every stored element of a dense layout as
    /// `f(raw_index, buffer_index)`, where `raw_index` is the row-major
    /// position over all bonds.
    fn raw_walk(&self, mut f: impl FnMut(usize, usize)) {
        let dims: BondIndex = self.bonds.iter().map(Bond::dim).collect();
        let raw_strides = kernels::dense_strides(&dims);
        let radices = layout::radices(&self.bonds);
        let mut pos = BondIndex::new();
        for &(qidx, off) in self.layout.qidx_enc() {
            let Some(block) = self.layout.qidx_block(qidx) else { continue };
            layout::decode_qidx(qidx, &radices, &mut pos);
            let degs = self.subblock_extents(&pos);
            let raw_base = self
                .bonds
                .iter()
                .zip(pos.iter())
                .zip(raw_strides.iter())
                .map(|((b, &p), &s)| b.offsets()[p] * s)
                .sum();
            let block_strides = kernels::subblock_strides(&degs, self.row_num(), block.cols());
            kernels::strided_walk(&degs, &raw_strides, &block_strides, raw_base, off, &mut f);
        }
    }

    /// Sets the elements from a dense row-major array over all bonds.
    ///
    /// Entries forbidden by the symmetry are ignored.
    pub fn set_raw_elem(&mut self, raw: &[T]) -> TensorResult<()> {
        let total: usize = self.bonds.iter().map(Bond::dim).product();
        if raw.len() != total {
            return Err(TensorError::ShapeMismatch {
                expected: self.shape(),
                got: vec![raw.len()],
            });
        }
        if self.is_diag() {
            *self = self.to_dense();
        }
        let mut elem = vec![T::zero(); self.elem.len()];
        self.raw_walk(|r, e| elem[e] = raw[r]);
        self.elem = elem;
        self.status.has_elements = true;
        Ok(())
    }

    /// Dense row-major array over all bonds; forbidden entries are zero.
    pub fn raw_elem(&self) -> Vec<T> {
        let dense = self.densified();
        let total: usize = dense.bonds.iter().map(Bond::dim).product();
        let mut raw = vec![T::zero(); total];
        dense.raw_walk(|r, e| raw[r] = dense.elem[e]);
        raw
    }

    /// Element at the multi-index `idx` (one state per bond).
    pub fn at(&self, idx: &[usize]) -> TensorResult<T> {
        if !self.has_elements() {
            return Err(TensorError::NotInitialized { operation: "at" });
        }
        if idx.len() != self.bonds.len() || idx.iter().zip(&self.bonds).any(|(&i, b)| i >= b.dim()) {
            return Err(TensorError::IndexOutOfRange {
                index: idx.to_vec(),
                dims: self.shape(),
            });
        }
        let row_num = self.row_num();
        let mut runs = BondIndex::new();
        let mut locals = BondIndex::new();
        for (bond, &i) in self.bonds.iter().zip(idx) {
            let (run, local) = bond.locate(i).ok_or_else(|| TensorError::IndexOutOfRange {
                index: idx.to_vec(),
                dims: self.shape(),
            })?;
            runs.push(run);
            locals.push(local);
        }
        let radices = layout::radices(&self.bonds);
        let rqidx = layout::encode_qidx(runs[..row_num].iter().copied(), &radices[..row_num]);
        let cqidx = layout::encode_qidx(runs[row_num..].iter().copied(), &radices[row_num..]);
        let row_slot = self.layout.row_slot(rqidx);
        let col_slot = self.layout.col_slot(cqidx);
        let Some(b) = row_slot.block.filter(|_| row_slot.qnum == col_slot.qnum) else {
            return Ok(T::zero());
        };
        let block = &self.layout.blocks()[b];

        let degs = self.subblock_extents(&runs);
        let local_row = layout::encode_qidx(locals[..row_num].iter().copied(), &degs[..row_num]);
        let local_col = layout::encode_qidx(locals[row_num..].iter().copied(), &degs[row_num..]);
        let (r, c) = (row_slot.offset + local_row, col_slot.offset + local_col);
        if block.is_diag() {
            return Ok(if r == c { self.elem[block.offset() + r] } else { T::zero() });
        }
        Ok(self.elem[block.offset() + r * block.cols() + c])
    }
}

fn check_bond_order(bonds: &[Bond]) -> TensorResult<()> {
    let row_num = bonds.iter().take_while(|b| b.ty() == BondType::In).count();
    if bonds[row_num..].iter().any(|b| b.ty() == BondType::In) {
        return Err(TensorError::bond("incoming bonds must precede outgoing bonds"));
    }
    Ok(())
}

pub(crate) fn check_labels(labels: &[i32], bond_num: usize) -> TensorResult<()> {
    if labels.len() != bond_num {
        return Err(TensorError::labels(format!(
            "{} labels given for {bond_num} bonds",
            labels.len()
        )));
    }
    let mut seen = HashSet::with_capacity(labels.len());
    if let Some(dup) = labels.iter().find(|l| !seen.insert(**l)) {
        return Err(TensorError::labels(format!("label {dup} appears more than once")));
    }
    Ok(())
}

impl<T: Scalar> fmt::Display for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.name.is_empty() { "Tensor" } else { &self.name };
        writeln!(f, "**************** {name} ****************")?;
        writeln!(f, "{:?}, bonds = {}, row_num = {}", self.symmetry, self.bonds.len(), self.row_num())?;
        for (label, bond) in self.labels.iter().zip(&self.bonds) {
            writeln!(f, "  {label:>4}: {bond}")?;
        }
        if !self.has_elements() {
            return writeln!(f, "(no elements)");
        }
        for (q, block) in self.layout.qnums().iter().zip(self.layout.blocks()) {
            write!(f, "--- {q}: {}", Matrix::from_ref(self.block_view(block)))?;
        }
        writeln!(f, "Total elemNum: {}", self.elem.len())
    }
}
