//! CPU kernels for block operations.
//!
//! Contains implementations of:
//! - Block matrix multiplication with diagonal fast paths (gemm)
//! - Outer product (contraction without shared bonds)
//! - Trace and partial-trace accumulation
//! - Diagonal/dense storage conversion
//! - Strided sub-block copies (for materializing permuted tensors)

mod copy_reshape;
mod diagonal;
mod gemm;
mod outer_product;
mod trace;

pub use copy_reshape::{BondIndex, dense_strides, strided_walk, subblock_strides, transpose_block};
pub use diagonal::{expand_diagonal, extract_diagonal, is_diagonal};
pub use gemm::{MatRef, block_gemm, diagonal_product};
pub use outer_product::outer_product;
pub use trace::{TracedSubBlock, accumulate_partial_trace, block_trace};
