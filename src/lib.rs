//! # symtensor
//!
//! Block-sparse tensors whose bonds carry abelian quantum numbers.
//!
//! ## Features
//!
//! - U1 charges with bosonic and fermionic parities, fused per bond
//! - Symmetry-block grouping: only blocks allowed by the charges are stored
//! - Permute (with fermionic signs), contract, partial trace and trace
//! - Little-endian tensor files
//! - Tensor networks described in text, with contraction order search
//!
//! ## Example
//!
//! ```
//! use symtensor::{Bond, BondType, Qnum, Tensor};
//!
//! let bi = Bond::from_qnums(BondType::In, &[Qnum::new(1), Qnum::new(-1)]).unwrap();
//! let bo = bi.dummy_change(BondType::Out);
//! let mut h = Tensor::<f64>::with_labels(vec![bi.clone(), bi, bo.clone(), bo], vec![0, 1, 2, 3]).unwrap();
//! h.identity();
//! assert_eq!(h.block_count(), 3);
//!
//! let swapped = h.permute(&[1, 0, 3, 2], 2).unwrap();
//! assert_eq!(swapped.labels(), &[1, 0, 3, 2]);
//! ```

pub mod error;
pub mod kernels;
pub mod launch;
pub mod matrix;
pub mod network;
pub mod optimization;
pub mod scalar;
pub mod symmetry;
pub mod tensor;

pub use error::{ErrorKind, TensorError, TensorResult};
pub use launch::{Network, NetworkConfig, contract_network};
pub use matrix::Matrix;
pub use network::{NetworkDescription, parse_network};
pub use optimization::{ContractionStrategy, CostModel, ExecutionPlan, ExecutionStep, create_plan};
pub use scalar::Scalar;
pub use symmetry::{Bond, BondType, Parity, Qnum, Symmetry};
pub use tensor::{Tensor, contract, partial_trace, permute};
