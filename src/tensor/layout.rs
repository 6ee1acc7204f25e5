//! Grouping: partitions a tensor's flat buffer into symmetry blocks.
//!
//! Row combinations (one run per incoming bond) and column combinations (one
//! run per outgoing bond) are enumerated as mixed-radix numbers, the row and
//! column Qidx. Each fused quantum number present on both sides owns one
//! block; every `(rqidx, cqidx)` pair fusing to it owns a sub-block.

use hashbrown::HashMap;
use smallvec::SmallVec;
use std::collections::BTreeMap;

use crate::error::{TensorError, TensorResult};
use crate::kernels::BondIndex;
use crate::symmetry::{Bond, Qnum, Symmetry};

/// One symmetry block: an `(offset, extent)` record into the flat buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    rows: usize,
    cols: usize,
    diag: bool,
    offset: usize,
}

impl Block {
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

    /// Position of the first element in the flat buffer.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of stored elements.
    #[inline]
    pub fn len(&self) -> usize {
        if self.diag {
            self.rows.min(self.cols)
        } else {
            self.rows * self.cols
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn range(&self) -> core::ops::Range<usize> {
        self.offset..self.offset + self.len()
    }
}

/// A row or column run combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Slot {
    pub qnum: Qnum,
    /// Product of the run degeneracies.
    pub dim: usize,
    /// Block owning this combination, if the quantum number has one.
    pub block: Option<usize>,
    /// Row (or column) offset inside the block.
    pub offset: usize,
}

/// Block map and Qidx tables of a tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    row_num: usize,
    diag: bool,
    qnums: Vec<Qnum>,
    blocks: Vec<Block>,
    row_slots: Vec<Slot>,
    col_slots: Vec<Slot>,
    /// Ascending `(qidx, flat offset)` of every stored sub-block.
    qidx_enc: Vec<(usize, usize)>,
    qidx_offsets: HashMap<usize, usize>,
    elem_num: usize,
}

impl Layout {
    /// Groups `bonds`, the first `row_num` of which are incoming.
    ///
    /// The result may hold no block at all; callers building user tensors
    /// reject that case. Fails when the dense size overflows `usize` or a
    /// fused charge overflows.
    pub fn build(bonds: &[Bond], row_num: usize, symmetry: Symmetry, diag: bool) -> TensorResult<Layout> {
        bonds
            .iter()
            .try_fold(1usize, |acc, b| acc.checked_mul(b.dim()))
            .ok_or_else(|| TensorError::bond("tensor size overflows usize"))?;
        let (row_bonds, col_bonds) = bonds.split_at(row_num.min(bonds.len()));
        let layout = match symmetry {
            Symmetry::NoSymmetry => Self::single_block(row_bonds, col_bonds, row_num, diag),
            Symmetry::Bosonic | Symmetry::Fermionic => Self::grouped(row_bonds, col_bonds, row_num, diag)?,
        };
        tracing::trace!(
            blocks = layout.blocks.len(),
            elem_num = layout.elem_num,
            row_qdim = layout.row_qdim(),
            col_qdim = layout.col_qdim(),
            "grouped bonds"
        );
        Ok(layout)
    }

    /// Layout of a rank-0 tensor.
    pub(crate) fn scalar() -> Layout {
        Self::single_block(&[], &[], 0, false)
    }

    /// The same blocks with dense storage.
    pub(crate) fn to_dense(&self) -> Layout {
        if !self.diag {
            return self.clone();
        }
        let mut elem_num = 0;
        let blocks: Vec<Block> = self
            .blocks
            .iter()
            .map(|b| {
                let block = Block {
                    diag: false,
                    offset: elem_num,
                    ..*b
                };
                elem_num += block.len();
                block
            })
            .collect();
        let qidx_enc = encode_subblocks(&self.row_slots, &self.col_slots, &blocks);
        Layout {
            row_num: self.row_num,
            diag: false,
            qnums: self.qnums.clone(),
            blocks,
            row_slots: self.row_slots.clone(),
            col_slots: self.col_slots.clone(),
            qidx_offsets: qidx_enc.iter().copied().collect(),
            qidx_enc,
            elem_num,
        }
    }

    /// Trivial bonds: one neutral block, one row and one column slot.
    fn single_block(row_bonds: &[Bond], col_bonds: &[Bond], row_num: usize, diag: bool) -> Layout {
        let rows: usize = row_bonds.iter().map(Bond::dim).product();
        let cols: usize = col_bonds.iter().map(Bond::dim).product();
        let block = Block {
            rows,
            cols,
            diag,
            offset: 0,
        };
        let neutral = Qnum::default();
        let slot = |dim| Slot {
            qnum: neutral,
            dim,
            block: Some(0),
            offset: 0,
        };
        let (row_slots, col_slots) = (vec![slot(rows)], vec![slot(cols)]);
        let qidx_enc = if diag {
            Vec::new()
        } else {
            encode_subblocks(&row_slots, &col_slots, &[block])
        };
        Layout {
            row_num,
            diag,
            qnums: vec![neutral],
            blocks: vec![block],
            row_slots,
            col_slots,
            qidx_offsets: qidx_enc.iter().copied().collect(),
            qidx_enc,
            elem_num: block.len(),
        }
    }

    fn grouped(row_bonds: &[Bond], col_bonds: &[Bond], row_num: usize, diag: bool) -> TensorResult<Layout> {
        let mut row_slots = enumerate_side(row_bonds)?;
        let mut col_slots = enumerate_side(col_bonds)?;

        let row_totals = accumulate(&mut row_slots);
        let col_totals = accumulate(&mut col_slots);

        let mut qnums = Vec::new();
        let mut blocks = Vec::new();
        let mut elem_num = 0;
        for (q, &rows) in &row_totals {
            if let Some(&cols) = col_totals.get(q) {
                let block = Block {
                    rows,
                    cols,
                    diag,
                    offset: elem_num,
                };
                elem_num += block.len();
                qnums.push(*q);
                blocks.push(block);
            }
        }

        let block_of = |q: &Qnum| qnums.binary_search(q).ok();
        for slot in row_slots.iter_mut().chain(col_slots.iter_mut()) {
            slot.block = block_of(&slot.qnum);
        }

        let qidx_enc = if diag {
            Vec::new()
        } else {
            encode_subblocks(&row_slots, &col_slots, &blocks)
        };

        Ok(Layout {
            row_num,
            diag,
            qnums,
            blocks,
            row_slots,
            col_slots,
            qidx_offsets: qidx_enc.iter().copied().collect(),
            qidx_enc,
            elem_num,
        })
    }

    /// Number of incoming bonds.
    #[inline]
    pub fn row_num(&self) -> usize {
        self.row_num
    }

    #[inline]
    pub fn is_diag(&self) -> bool {
        self.diag
    }

    /// Total number of stored elements.
    #[inline]
    pub fn elem_num(&self) -> usize {
        self.elem_num
    }

    /// True when no quantum number is shared by rows and columns.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Block quantum numbers in ascending order.
    #[inline]
    pub fn qnums(&self) -> &[Qnum] {
        &self.qnums
    }

    /// Blocks, parallel to [`Layout::qnums`].
    #[inline]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block_index(&self, q: &Qnum) -> Option<usize> {
        self.qnums.binary_search(q).ok()
    }

    pub fn block(&self, q: &Qnum) -> Option<&Block> {
        self.block_index(q).map(|i| &self.blocks[i])
    }

    /// Number of row run combinations.
    #[inline]
    pub fn row_qdim(&self) -> usize {
        self.row_slots.len()
    }

    /// Number of column run combinations.
    #[inline]
    pub fn col_qdim(&self) -> usize {
        self.col_slots.len()
    }

    #[inline]
    pub(crate) fn row_slot(&self, rqidx: usize) -> &Slot {
        &self.row_slots[rqidx]
    }

    #[inline]
    pub(crate) fn col_slot(&self, cqidx: usize) -> &Slot {
        &self.col_slots[cqidx]
    }

    /// Block holding the sub-block `qidx`.
    pub(crate) fn qidx_block(&self, qidx: usize) -> Option<&Block> {
        let rqidx = qidx / self.col_qdim();
        self.row_slots
            .get(rqidx)
            .and_then(|slot| slot.block)
            .map(|b| &self.blocks[b])
    }

    /// Stored sub-blocks as ascending `(qidx, flat offset)` pairs.
    #[inline]
    pub fn qidx_enc(&self) -> &[(usize, usize)] {
        &self.qidx_enc
    }

    /// Flat offset of the sub-block `qidx`, if it is stored.
    #[inline]
    pub fn qidx_offset(&self, qidx: usize) -> Option<usize> {
        self.qidx_offsets.get(&qidx).copied()
    }
}

/// Run counts of each bond, the radices of the Qidx encoding.
pub(crate) fn radices(bonds: &[Bond]) -> BondIndex {
    bonds.iter().map(Bond::qnum_count).collect()
}

/// Splits `qidx` into one run position per bond, bond 0 most significant.
pub(crate) fn decode_qidx(mut qidx: usize, radices: &[usize], out: &mut BondIndex) {
    out.clear();
    out.resize(radices.len(), 0);
    for b in (0..radices.len()).rev() {
        out[b] = qidx % radices[b];
        qidx /= radices[b];
    }
}

pub(crate) fn encode_qidx(positions: impl IntoIterator<Item = usize>, radices: &[usize]) -> usize {
    positions
        .into_iter()
        .zip(radices)
        .fold(0, |acc, (p, &r)| acc * r + p)
}

/// Ascending `(qidx, flat offset)` of every row/column pair owning a
/// sub-block of a dense layout.
fn encode_subblocks(row_slots: &[Slot], col_slots: &[Slot], blocks: &[Block]) -> Vec<(usize, usize)> {
    let mut cols_by_block: Vec<Vec<usize>> = vec![Vec::new(); blocks.len()];
    for (cqidx, slot) in col_slots.iter().enumerate() {
        if let Some(b) = slot.block {
            cols_by_block[b].push(cqidx);
        }
    }
    let col_qdim = col_slots.len();
    let mut qidx_enc = Vec::new();
    for (rqidx, rslot) in row_slots.iter().enumerate() {
        let Some(b) = rslot.block else { continue };
        let block = &blocks[b];
        for &cqidx in &cols_by_block[b] {
            let off = block.offset + rslot.offset * block.cols + col_slots[cqidx].offset;
            qidx_enc.push((rqidx * col_qdim + cqidx, off));
        }
    }
    qidx_enc
}

/// Enumerates run combinations of `bonds`, last bond fastest.
fn enumerate_side(bonds: &[Bond]) -> TensorResult<Vec<Slot>> {
    let count: usize = bonds.iter().map(Bond::qnum_count).product();
    let mut slots = Vec::with_capacity(count);
    let mut idx: BondIndex = SmallVec::from_elem(0, bonds.len());
    loop {
        let mut qnum = Qnum::default();
        let mut dim = 1;
        for (bond, &i) in bonds.iter().zip(idx.iter()) {
            let q = bond.qnums()[i];
            qnum = qnum
                .checked_mul(q)
                .ok_or_else(|| TensorError::bond(format!("fusing {qnum} and {q} overflows the U1 charge")))?;
            dim *= bond.degeneracies()[i];
        }
        slots.push(Slot {
            qnum,
            dim,
            block: None,
            offset: 0,
        });

        let mut k = bonds.len();
        loop {
            if k == 0 {
                return Ok(slots);
            }
            k -= 1;
            idx[k] += 1;
            if idx[k] < bonds[k].qnum_count() {
                break;
            }
            idx[k] = 0;
        }
    }
}

/// Assigns running offsets per quantum number; returns the totals.
fn accumulate(slots: &mut [Slot]) -> BTreeMap<Qnum, usize> {
    let mut totals: BTreeMap<Qnum, usize> = BTreeMap::new();
    for slot in slots.iter_mut() {
        let total = totals.entry(slot.qnum).or_insert(0);
        slot.offset = *total;
        *total += slot.dim;
    }
    totals
}
