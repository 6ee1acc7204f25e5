//! Cost model for pairwise contractions.

use hashbrown::HashMap;

/// Cost of a single contraction operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContractionCost {
    /// Number of multiply-adds, counted twice.
    pub flops: u64,
    /// Elements read and written.
    pub memory: u64,
    /// Combined cost using the cost model.
    pub total: u64,
}

impl ContractionCost {
    pub fn new(flops: u64, memory: u64, alpha: u64) -> Self {
        let total = flops.saturating_add(memory.saturating_mul(alpha));
        Self { flops, memory, total }
    }

    pub fn zero() -> Self {
        Self { flops: 0, memory: 0, total: 0 }
    }

    /// Larger than any real cost.
    pub fn infinite() -> Self {
        Self {
            flops: u64::MAX,
            memory: u64::MAX,
            total: u64::MAX,
        }
    }
}

impl core::ops::Add for ContractionCost {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            flops: self.flops.saturating_add(rhs.flops),
            memory: self.memory.saturating_add(rhs.memory),
            total: self.total.saturating_add(rhs.total),
        }
    }
}

impl Ord for ContractionCost {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.total.cmp(&other.total)
    }
}

impl PartialOrd for ContractionCost {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for ContractionCost {}

/// Cost model for evaluating contractions.
///
/// Costs use the dense bond dimensions; block sparsity only makes the real
/// work smaller.
#[derive(Debug, Clone)]
pub struct CostModel {
    /// Memory traffic penalty factor.
    pub alpha: u64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self { alpha: 8 }
    }
}

impl CostModel {
    pub fn new(alpha: u64) -> Self {
        Self { alpha }
    }

    /// Counts only arithmetic.
    pub fn flops_only() -> Self {
        Self { alpha: 0 }
    }

    /// Computes the cost of contracting two tensors over `contracted`.
    ///
    /// # Arguments
    /// * `shape_a` - Bond dimensions of the first tensor
    /// * `shape_b` - Bond dimensions of the second tensor
    /// * `labels_a` - Labels of the first tensor
    /// * `labels_b` - Labels of the second tensor
    /// * `contracted` - Labels summed over
    pub fn compute_pairwise_cost(
        &self,
        shape_a: &[usize],
        shape_b: &[usize],
        labels_a: &[i32],
        labels_b: &[i32],
        contracted: &[i32],
    ) -> ContractionCost {
        let mut dim_map: HashMap<i32, usize> = HashMap::new();
        for (&l, &d) in labels_a.iter().zip(shape_a).chain(labels_b.iter().zip(shape_b)) {
            dim_map.insert(l, d);
        }

        let output_size: u64 = dim_map
            .iter()
            .filter(|&(l, _)| !contracted.contains(l))
            .map(|(_, &d)| d as u64)
            .fold(1, u64::saturating_mul);
        let contracted_size: u64 = contracted
            .iter()
            .filter_map(|l| dim_map.get(l))
            .map(|&d| d as u64)
            .fold(1, u64::saturating_mul);

        // FLOPs = output_size * contracted_size * 2
        let flops = output_size.saturating_mul(contracted_size).saturating_mul(2);

        let size_a: u64 = shape_a.iter().map(|&d| d as u64).fold(1, u64::saturating_mul);
        let size_b: u64 = shape_b.iter().map(|&d| d as u64).fold(1, u64::saturating_mul);
        let memory = size_a.saturating_add(size_b).saturating_add(output_size);

        ContractionCost::new(flops, memory, self.alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matmul_cost() {
        let model = CostModel::default();

        // A[100, 200] B[200, 300] over label 2
        let cost = model.compute_pairwise_cost(&[100, 200], &[200, 300], &[1, 2], &[2, 3], &[2]);

        // 100 * 300 * 200 * 2
        assert_eq!(cost.flops, 12_000_000);
        assert_eq!(cost.memory, 20_000 + 60_000 + 30_000);
        assert_eq!(cost.total, 12_000_000 + 8 * 110_000);
    }

    #[test]
    fn test_outer_product_cost() {
        let cost = CostModel::flops_only().compute_pairwise_cost(&[3], &[4], &[1], &[2], &[]);
        assert_eq!(cost.flops, 24);
        assert_eq!(cost.total, 24);
    }

    #[test]
    fn test_cost_ordering() {
        let cheap = ContractionCost::new(100, 10, 8);
        let expensive = ContractionCost::new(1000, 100, 8);

        assert!(cheap < expensive);
        assert!(expensive < ContractionCost::infinite());
        assert_eq!((cheap + ContractionCost::zero()).total, cheap.total);
    }
}
