//! Contract engine: sums over the bonds two tensors share by label.
//!
//! Both inputs are brought to a canonical form in which the shared bonds are
//! the columns of the left operand and the rows of the right operand. The
//! result is then one block product per quantum number.

use std::borrow::Cow;

use tracing::debug;

use super::Tensor;
use crate::error::{TensorError, TensorResult};
use crate::kernels;
use crate::scalar::Scalar;
use crate::symmetry::BondType;

/// Contracts `a` and `b` over their common labels.
///
/// Passing the same tensor twice is allowed.
pub fn contract<T: Scalar>(a: &Tensor<T>, b: &Tensor<T>) -> TensorResult<Tensor<T>> {
    a.contract(b)
}

impl<T: Scalar> Tensor<T> {
    /// Contracts with `other` over the common labels.
    ///
    /// The result carries the remaining labels of `self` as incoming bonds
    /// followed by the remaining labels of `other` as outgoing bonds. A full
    /// contraction gives a rank-0 tensor.
    pub fn contract(&self, other: &Tensor<T>) -> TensorResult<Tensor<T>> {
        if !self.has_elements() || !other.has_elements() {
            return Err(TensorError::NotInitialized { operation: "contract" });
        }
        if core::ptr::eq(self, other) {
            debug!(name = %self.name, "contracting a tensor with itself");
        }

        // Shared labels in the order of `self`
        let shared: Vec<i32> = self
            .labels
            .iter()
            .copied()
            .filter(|l| other.labels.contains(l))
            .collect();
        for &label in &shared {
            let bond_a = self.bond(label)?;
            let bond_b = other.bond(label)?;
            if bond_a.dim() != bond_b.dim() {
                return Err(TensorError::BondDimensionMismatch {
                    label,
                    left: bond_a.dim(),
                    right: bond_b.dim(),
                });
            }
            let (out_a, in_b) = (bond_a.change(BondType::Out), bond_b.change(BondType::In));
            if !out_a.same_runs(&in_b) {
                return Err(TensorError::BondMismatch {
                    label,
                    message: format!("{out_a} does not match {in_b}"),
                });
            }
        }

        let kept_a: Vec<i32> = self.labels.iter().copied().filter(|l| !shared.contains(l)).collect();
        let kept_b: Vec<i32> = other.labels.iter().copied().filter(|l| !shared.contains(l)).collect();

        // Canonical forms, borrowed when no move is needed
        let order_a: Vec<i32> = kept_a.iter().chain(&shared).copied().collect();
        let order_b: Vec<i32> = shared.iter().chain(&kept_b).copied().collect();
        let lhs = self.canonical(&order_a, kept_a.len())?;
        let rhs = other.canonical(&order_b, shared.len())?;

        let bonds = lhs.bonds[..kept_a.len()]
            .iter()
            .chain(&rhs.bonds[shared.len()..])
            .cloned()
            .collect();
        let labels = kept_a.iter().chain(&kept_b).copied().collect();
        let mut out = Tensor::allocate(bonds, labels, false)?;

        debug!(
            shared = ?shared,
            lhs_moved = matches!(lhs, Cow::Owned(_)),
            rhs_moved = matches!(rhs, Cow::Owned(_)),
            blocks = out.layout.blocks().len(),
            "contract"
        );

        for (q, c_block) in out.layout.qnums().iter().zip(out.layout.blocks()) {
            let (Some(a_block), Some(b_block)) = (lhs.layout.block(q), rhs.layout.block(q)) else {
                continue;
            };
            let a_view = lhs.block_view(a_block);
            let b_view = rhs.block_view(b_block);
            let c = &mut out.elem[c_block.range()];
            if shared.is_empty() && !a_view.diag && !b_view.diag {
                kernels::outer_product(a_view.data, b_view.data, c);
            } else {
                kernels::block_gemm(a_view, b_view, c)?;
            }
        }
        out.mark_initialized();
        Ok(out)
    }

    /// Outer product; the labels of `other` are shifted past those of
    /// `self` when they collide.
    pub fn otimes(&self, other: &Tensor<T>) -> TensorResult<Tensor<T>> {
        let collides = other.labels.iter().any(|l| self.labels.contains(l));
        if !collides {
            return self.contract(other);
        }
        let shift = self.labels.iter().max().map_or(0, |m| m + 1) - other.labels.iter().min().copied().unwrap_or(0);
        let mut shifted = other.clone();
        let labels: Vec<i32> = other.labels.iter().map(|l| l + shift).collect();
        shifted.set_labels(&labels)?;
        self.contract(&shifted)
    }

    fn canonical(&self, order: &[i32], row_num: usize) -> TensorResult<Cow<'_, Tensor<T>>> {
        if self.labels == order && self.row_num() == row_num {
            return Ok(Cow::Borrowed(self));
        }
        self.permute(order, row_num).map(Cow::Owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetry::{Bond, Qnum};
    use pretty_assertions::assert_eq;

    fn matrix(labels: [i32; 2], raw: &[f64]) -> Tensor<f64> {
        let bonds = vec![Bond::new(BondType::In, 2).unwrap(), Bond::new(BondType::Out, 2).unwrap()];
        let mut t = Tensor::with_labels(bonds, labels.to_vec()).unwrap();
        t.set_raw_elem(raw).unwrap();
        t
    }

    #[test]
    fn test_matrix_product() {
        let a = matrix([0, 1], &[1.0, 2.0, 3.0, 4.0]);
        let b = matrix([1, 2], &[1.0, 2.0, 3.0, 4.0]);
        let c = a.contract(&b).unwrap();
        assert_eq!(c.labels(), &[0, 2]);
        assert_eq!(c.raw_elem(), vec![7.0, 10.0, 15.0, 22.0]);
    }

    #[test]
    fn test_full_contraction_is_scalar() {
        let a = matrix([0, 1], &[1.0, 2.0, 3.0, 4.0]);
        let c = a.contract(&a).unwrap();
        assert_eq!(c.bond_num(), 0);
        assert_eq!(c.at(&[]).unwrap(), 30.0);
    }

    #[test]
    fn test_outer_product() {
        let a = matrix([0, 1], &[1.0, 2.0, 3.0, 4.0]);
        let c = a.otimes(&a).unwrap();
        assert_eq!(c.labels(), &[0, 1, 2, 3]);
        assert_eq!(c.at(&[1, 0, 0, 1]).unwrap(), 6.0);
    }

    #[test]
    fn test_dimension_mismatch_names_label() {
        let a = matrix([0, 1], &[1.0; 4]);
        let bonds = vec![Bond::new(BondType::In, 3).unwrap(), Bond::new(BondType::Out, 2).unwrap()];
        let mut b = Tensor::with_labels(bonds, vec![1, 2]).unwrap();
        b.set_zero();
        let err = a.contract(&b).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot contract two bonds having different dimensions: label 1: 2 vs 3"
        );
    }

    #[test]
    fn test_mismatched_quantum_numbers() {
        let bi = Bond::from_qnums(BondType::In, &[Qnum::new(1), Qnum::new(-1)]).unwrap();
        let mut a = Tensor::<f64>::with_labels(vec![bi.clone(), bi.change(BondType::Out)], vec![0, 1]).unwrap();
        a.identity();

        // incoming partner carrying the charges of the outgoing bond of `a`
        let partner = bi.change(BondType::Out).dummy_change(BondType::In);
        let mut b = Tensor::<f64>::with_labels(vec![partner.clone(), partner.change(BondType::Out)], vec![1, 2]).unwrap();
        b.identity();
        assert!(a.contract(&b).is_ok());

        let mut c = Tensor::<f64>::with_labels(vec![bi.clone(), bi.change(BondType::Out)], vec![1, 2]).unwrap();
        c.identity();
        assert!(matches!(a.contract(&c), Err(TensorError::BondMismatch { label: 1, .. })));
    }

    #[test]
    fn test_requires_elements() {
        let bonds = vec![Bond::new(BondType::In, 2).unwrap(), Bond::new(BondType::Out, 2).unwrap()];
        let empty = Tensor::<f64>::new(bonds).unwrap();
        let a = matrix([0, 1], &[1.0; 4]);
        assert!(matches!(a.contract(&empty), Err(TensorError::NotInitialized { .. })));
    }

    #[test]
    fn test_symmetric_contraction_matches_dense() {
        let bi = Bond::from_degeneracies(BondType::In, &[(Qnum::new(1), 1), (Qnum::new(0), 2), (Qnum::new(-1), 1)]).unwrap();
        let bo = bi.change(BondType::Out);
        let mut a = Tensor::<f64>::with_labels(vec![bi.clone(), bo.clone()], vec![0, 1]).unwrap();
        let mut b = Tensor::<f64>::with_labels(vec![bo.dummy_change(BondType::In), bo.clone()], vec![1, 2]).unwrap();
        let raw_a: Vec<f64> = (1..=16).map(|x| x as f64).collect();
        let raw_b: Vec<f64> = (1..=16).map(|x| (x * x) as f64).collect();
        a.set_raw_elem(&raw_a).unwrap();
        b.set_raw_elem(&raw_b).unwrap();
        let c = a.contract(&b).unwrap();

        let (da, db) = (a.raw_elem(), b.raw_elem());
        let mut expected = vec![0.0; 16];
        for i in 0..4 {
            for k in 0..4 {
                for j in 0..4 {
                    expected[i * 4 + j] += da[i * 4 + k] * db[k * 4 + j];
                }
            }
        }
        assert_eq!(c.raw_elem(), expected);
    }
}
