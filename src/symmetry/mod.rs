//! Quantum numbers, bonds and symmetry categories.
//!
//! - [`Qnum`]: U1 charge with bosonic and fermionic parity, fused by `*`
//! - [`Bond`]: a leg with runs of quantum numbers and their degeneracies
//! - [`Symmetry`]: which grouping/permute variant a tensor uses

mod bond;
mod kind;
mod qnum;

pub use bond::{Bond, BondType};
pub use kind::Symmetry;
pub use qnum::{Parity, Qnum};
