//! Abelian quantum numbers.

use core::fmt;
use core::ops::{Mul, MulAssign, Neg};

use serde::{Deserialize, Serialize};

/// A Z2 label, used for both the bosonic and the fermionic parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Parity {
    #[default]
    Even,
    Odd,
}

impl Parity {
    #[inline]
    pub fn is_odd(self) -> bool {
        matches!(self, Parity::Odd)
    }

    /// Numeric value written to tensor files.
    #[inline]
    pub fn as_i32(self) -> i32 {
        match self {
            Parity::Even => 0,
            Parity::Odd => 1,
        }
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Parity::Even),
            1 => Some(Parity::Odd),
            _ => None,
        }
    }
}

impl Mul for Parity {
    type Output = Parity;

    #[inline]
    fn mul(self, rhs: Parity) -> Parity {
        if self == rhs { Parity::Even } else { Parity::Odd }
    }
}

/// A quantum number: U1 charge, parity and fermionic parity.
///
/// Ordering is lexicographic over `(u1, prt, prt_f)`. Fusion is `*`: charges
/// add and both parities combine by XOR. The neutral element is
/// [`Qnum::default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Qnum {
    u1: i32,
    prt: Parity,
    prt_f: Parity,
}

impl Qnum {
    /// Size of one quantum number in the tensor file format.
    pub const ENCODED_SIZE: u64 = 12;

    /// A bosonic quantum number with even parity.
    pub const fn new(u1: i32) -> Self {
        Self {
            u1,
            prt: Parity::Even,
            prt_f: Parity::Even,
        }
    }

    pub const fn with_parity(u1: i32, prt: Parity) -> Self {
        Self {
            u1,
            prt,
            prt_f: Parity::Even,
        }
    }

    pub const fn fermionic(prt_f: Parity, u1: i32, prt: Parity) -> Self {
        Self { u1, prt, prt_f }
    }

    #[inline]
    pub fn u1(&self) -> i32 {
        self.u1
    }

    #[inline]
    pub fn prt(&self) -> Parity {
        self.prt
    }

    #[inline]
    pub fn prt_f(&self) -> Parity {
        self.prt_f
    }

    /// Returns true for the neutral element.
    #[inline]
    pub fn is_neutral(&self) -> bool {
        *self == Qnum::default()
    }

    /// Whether the charge can be negated, i.e. lies in `-i32::MAX..=i32::MAX`.
    #[inline]
    pub fn is_representable(&self) -> bool {
        self.u1 != i32::MIN
    }

    /// Fusion that returns `None` when the charge leaves the representable
    /// range.
    #[inline]
    pub fn checked_mul(self, rhs: Qnum) -> Option<Qnum> {
        let u1 = self.u1.checked_add(rhs.u1).filter(|&u| u != i32::MIN)?;
        Some(Qnum {
            u1,
            prt: self.prt * rhs.prt,
            prt_f: self.prt_f * rhs.prt_f,
        })
    }
}

/// Panics on charge overflow; library code fuses with [`Qnum::checked_mul`].
impl Mul for Qnum {
    type Output = Qnum;

    #[inline]
    fn mul(self, rhs: Qnum) -> Qnum {
        Qnum {
            u1: self.u1 + rhs.u1,
            prt: self.prt * rhs.prt,
            prt_f: self.prt_f * rhs.prt_f,
        }
    }
}

impl MulAssign for Qnum {
    #[inline]
    fn mul_assign(&mut self, rhs: Qnum) {
        *self = *self * rhs;
    }
}

impl Neg for Qnum {
    type Output = Qnum;

    #[inline]
    fn neg(self) -> Qnum {
        Qnum {
            u1: -self.u1,
            prt: self.prt,
            prt_f: self.prt_f,
        }
    }
}

impl fmt::Display for Qnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(U1 = {}, P = {}, {})", self.u1, self.prt.as_i32(), self.prt_f.as_i32())
    }
}
