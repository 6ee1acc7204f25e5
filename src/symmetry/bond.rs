//! Tensor legs carrying quantum-number runs.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::qnum::Qnum;
use crate::error::{TensorError, TensorResult};

/// Direction of a bond: incoming legs form the rows, outgoing legs the columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BondType {
    In,
    Out,
}

impl BondType {
    /// Numeric value written to tensor files.
    pub fn as_i32(self) -> i32 {
        match self {
            BondType::In => 1,
            BondType::Out => -1,
        }
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(BondType::In),
            -1 => Some(BondType::Out),
            _ => None,
        }
    }
}

/// One leg of a tensor.
///
/// The basis is split into runs of consecutive states sharing a quantum
/// number. `qnums[i]` occupies `degeneracies[i]` states starting at
/// `offsets[i]`. Every charge is representable, so negation is exact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BondRuns", into = "BondRuns")]
pub struct Bond {
    ty: BondType,
    dim: usize,
    qnums: Vec<Qnum>,
    degeneracies: Vec<usize>,
    offsets: Vec<usize>,
}

/// Serialized form; deserializing goes through [`Bond::from_degeneracies`].
#[derive(Serialize, Deserialize)]
struct BondRuns {
    ty: BondType,
    runs: Vec<(Qnum, usize)>,
}

impl TryFrom<BondRuns> for Bond {
    type Error = TensorError;

    fn try_from(value: BondRuns) -> TensorResult<Bond> {
        Bond::from_degeneracies(value.ty, &value.runs)
    }
}

impl From<Bond> for BondRuns {
    fn from(bond: Bond) -> BondRuns {
        BondRuns {
            ty: bond.ty,
            runs: bond.qnums.into_iter().zip(bond.degeneracies).collect(),
        }
    }
}

impl Bond {
    /// A bond without symmetry: a single neutral run of `dim` states.
    pub fn new(ty: BondType, dim: usize) -> TensorResult<Self> {
        Self::from_degeneracies(ty, &[(Qnum::default(), dim)])
    }

    /// Builds a bond from one quantum number per basis state.
    pub fn from_qnums(ty: BondType, states: &[Qnum]) -> TensorResult<Self> {
        if states.is_empty() {
            return Err(TensorError::bond("a bond needs at least one state"));
        }
        let mut runs: Vec<(Qnum, usize)> = Vec::new();
        for &q in states {
            match runs.last_mut() {
                Some((last, deg)) if *last == q => *deg += 1,
                _ => runs.push((q, 1)),
            }
        }
        Self::from_degeneracies(ty, &runs)
    }

    /// Builds a bond from `(quantum number, degeneracy)` runs.
    pub fn from_degeneracies(ty: BondType, runs: &[(Qnum, usize)]) -> TensorResult<Self> {
        if runs.is_empty() {
            return Err(TensorError::bond("a bond needs at least one quantum number"));
        }
        let mut qnums = Vec::with_capacity(runs.len());
        let mut degeneracies = Vec::with_capacity(runs.len());
        let mut offsets = Vec::with_capacity(runs.len());
        let mut dim: usize = 0;
        for &(q, deg) in runs {
            if deg == 0 {
                return Err(TensorError::bond(format!("quantum number {q} has zero degeneracy")));
            }
            if !q.is_representable() {
                return Err(TensorError::bond(format!("charge of {q} cannot be negated")));
            }
            qnums.push(q);
            degeneracies.push(deg);
            offsets.push(dim);
            dim = dim
                .checked_add(deg)
                .ok_or_else(|| TensorError::bond("bond dimension overflows usize"))?;
        }
        Ok(Self {
            ty,
            dim,
            qnums,
            degeneracies,
            offsets,
        })
    }

    #[inline]
    pub fn ty(&self) -> BondType {
        self.ty
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Quantum number of each run.
    #[inline]
    pub fn qnums(&self) -> &[Qnum] {
        &self.qnums
    }

    #[inline]
    pub fn degeneracies(&self) -> &[usize] {
        &self.degeneracies
    }

    #[inline]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Number of runs.
    #[inline]
    pub fn qnum_count(&self) -> usize {
        self.qnums.len()
    }

    /// Total number of states carrying `q`.
    pub fn degeneracy_of(&self, q: &Qnum) -> usize {
        self.qnums
            .iter()
            .zip(&self.degeneracies)
            .filter(|(qn, _)| *qn == q)
            .map(|(_, d)| d)
            .sum()
    }

    /// First state carrying `q`.
    pub fn offset_of(&self, q: &Qnum) -> Option<usize> {
        self.qnums.iter().position(|qn| qn == q).map(|i| self.offsets[i])
    }

    /// Maps a basis state to its run and its position inside the run.
    pub fn locate(&self, state: usize) -> Option<(usize, usize)> {
        if state >= self.dim {
            return None;
        }
        let run = self.offsets.partition_point(|&off| off <= state) - 1;
        Some((run, state - self.offsets[run]))
    }

    /// Quantum number of every basis state.
    pub fn states(&self) -> Vec<Qnum> {
        let mut states = Vec::with_capacity(self.dim);
        for (&q, &d) in self.qnums.iter().zip(&self.degeneracies) {
            states.extend(core::iter::repeat(q).take(d));
        }
        states
    }

    /// True when the bond is a single neutral run.
    pub fn is_trivial(&self) -> bool {
        self.qnums.len() == 1 && self.qnums[0].is_neutral()
    }

    /// Compares runs and degeneracies, ignoring the direction.
    pub fn same_runs(&self, other: &Bond) -> bool {
        self.qnums == other.qnums && self.degeneracies == other.degeneracies
    }

    /// Moves the bond to the other side, negating every quantum number.
    pub fn change(&self, ty: BondType) -> Bond {
        if self.ty == ty {
            return self.clone();
        }
        Bond {
            ty,
            dim: self.dim,
            qnums: self.qnums.iter().map(|&q| -q).collect(),
            degeneracies: self.degeneracies.clone(),
            offsets: self.offsets.clone(),
        }
    }

    /// Flips the direction tag and keeps the quantum numbers.
    pub fn dummy_change(&self, ty: BondType) -> Bond {
        Bond { ty, ..self.clone() }
    }

    /// Product bond; state `(a, b)` becomes `a * other.dim() + b`.
    ///
    /// Fails when a fused charge or the product dimension overflows.
    pub fn combine(&self, other: &Bond) -> TensorResult<Bond> {
        let mut runs: Vec<(Qnum, usize)> = Vec::new();
        for (&qa, &da) in self.qnums.iter().zip(&self.degeneracies) {
            for _ in 0..da {
                for (&qb, &db) in other.qnums.iter().zip(&other.degeneracies) {
                    let q = qa
                        .checked_mul(qb)
                        .ok_or_else(|| TensorError::bond(format!("fusing {qa} and {qb} overflows the U1 charge")))?;
                    match runs.last_mut() {
                        Some((last, deg)) if *last == q => *deg += db,
                        _ => runs.push((q, db)),
                    }
                }
            }
        }
        Self::from_degeneracies(self.ty, &runs)
    }

    /// Combines a list of bonds left to right.
    pub fn combine_all(bonds: &[Bond]) -> TensorResult<Bond> {
        let (first, rest) = bonds
            .split_first()
            .ok_or_else(|| TensorError::bond("cannot combine an empty bond list"))?;
        rest.iter().try_fold(first.clone(), |acc, b| acc.combine(b))
    }
}

impl fmt::Display for Bond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.ty {
            BondType::In => "IN",
            BondType::Out => "OUT",
        };
        write!(f, "{dir} :")?;
        for (q, d) in self.qnums.iter().zip(&self.degeneracies) {
            write!(f, " {q}|{d}")?;
        }
        write!(f, ", Dim = {}", self.dim)
    }
}
