//! Strided copies between sub-blocks.
//!
//! A sub-block is addressed by one local index per bond. Both the source and
//! the destination address are linear in those indices, so a single odometer
//! walk can track the two addresses through per-bond strides.

use smallvec::SmallVec;

/// Per-bond index vector.
pub type BondIndex = SmallVec<[usize; 8]>;

/// Strides of each bond inside a dense block.
///
/// `degs` are the sub-block extents in bond order; the first `row_num` bonds
/// form the row index, the rest the column index of a block with
/// `block_cols` columns.
pub fn subblock_strides(degs: &[usize], row_num: usize, block_cols: usize) -> BondIndex {
    let mut strides: BondIndex = SmallVec::from_elem(0, degs.len());
    let mut acc = 1;
    for b in (row_num..degs.len()).rev() {
        strides[b] = acc;
        acc *= degs[b];
    }
    let mut acc = block_cols;
    for b in (0..row_num).rev() {
        strides[b] = acc;
        acc *= degs[b];
    }
    strides
}

/// Row-major strides of a dense array with extents `dims`.
pub fn dense_strides(dims: &[usize]) -> BondIndex {
    let mut strides: BondIndex = SmallVec::from_elem(0, dims.len());
    let mut acc = 1;
    for b in (0..dims.len()).rev() {
        strides[b] = acc;
        acc *= dims[b];
    }
    strides
}

/// Visits every multi-index below `extents`, last index fastest, calling
/// `f(addr_a, addr_b)` with both linear addresses.
pub fn strided_walk(
    extents: &[usize],
    strides_a: &[usize],
    strides_b: &[usize],
    base_a: usize,
    base_b: usize,
    mut f: impl FnMut(usize, usize),
) {
    if extents.iter().any(|&e| e == 0) {
        return;
    }
    let rank = extents.len();
    let mut idx: BondIndex = SmallVec::from_elem(0, rank);
    let (mut addr_a, mut addr_b) = (base_a, base_b);
    loop {
        f(addr_a, addr_b);

        // roll the odometer
        let mut b = rank;
        loop {
            if b == 0 {
                return;
            }
            b -= 1;
            if idx[b] + 1 < extents[b] {
                idx[b] += 1;
                addr_a += strides_a[b];
                addr_b += strides_b[b];
                break;
            }
            addr_a -= idx[b] * strides_a[b];
            addr_b -= idx[b] * strides_b[b];
            idx[b] = 0;
        }
    }
}

/// Copies `rows x cols` from `src` into `dst` transposed.
pub fn transpose_block<T: Copy>(rows: usize, cols: usize, src: &[T], dst: &mut [T]) {
    for r in 0..rows {
        for c in 0..cols {
            dst[c * rows + r] = src[r * cols + c];
        }
    }
}
