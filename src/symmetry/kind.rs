//! Symmetry category of a tensor.

use serde::{Deserialize, Serialize};

use super::bond::Bond;

/// Which engine variant a tensor uses.
///
/// Chosen once from the bond list when the tensor is built: trivial bonds
/// give `NoSymmetry`, any odd fermionic parity gives `Fermionic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symmetry {
    NoSymmetry,
    Bosonic,
    Fermionic,
}

impl Symmetry {
    pub fn infer(bonds: &[Bond]) -> Self {
        if bonds.iter().any(|b| b.qnums().iter().any(|q| q.prt_f().is_odd())) {
            Symmetry::Fermionic
        } else if bonds.iter().all(Bond::is_trivial) {
            Symmetry::NoSymmetry
        } else {
            Symmetry::Bosonic
        }
    }

    /// Numeric value written to tensor files.
    pub fn as_i32(self) -> i32 {
        match self {
            Symmetry::NoSymmetry => 0,
            Symmetry::Bosonic => 1,
            Symmetry::Fermionic => 2,
        }
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Symmetry::NoSymmetry),
            1 => Some(Symmetry::Bosonic),
            2 => Some(Symmetry::Fermionic),
            _ => None,
        }
    }

    #[inline]
    pub fn is_fermionic(self) -> bool {
        matches!(self, Symmetry::Fermionic)
    }
}
