//! Contraction path representation.

use hashbrown::HashMap;

use super::cost::{ContractionCost, CostModel};

/// A single step in a contraction path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractionStep {
    /// Positions of the two tensors in the current list, first < second.
    pub inputs: (usize, usize),
    /// Labels summed over in this step.
    pub contracted_labels: Vec<i32>,
    /// Labels of the result tensor.
    pub result_labels: Vec<i32>,
    /// Estimated cost of this step.
    pub estimated_flops: u64,
}

impl ContractionStep {
    pub fn new(
        inputs: (usize, usize),
        contracted_labels: Vec<i32>,
        result_labels: Vec<i32>,
        estimated_flops: u64,
    ) -> Self {
        Self {
            inputs,
            contracted_labels,
            result_labels,
            estimated_flops,
        }
    }
}

/// A complete contraction path.
///
/// After each step the two inputs leave the list and the result is appended
/// at its end.
#[derive(Debug, Clone, Default)]
pub struct ContractionPath {
    steps: Vec<ContractionStep>,
    total_flops: u64,
    total_memory: u64,
}

impl ContractionPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            steps: Vec::with_capacity(capacity),
            total_flops: 0,
            total_memory: 0,
        }
    }

    pub fn push(&mut self, step: ContractionStep, cost: ContractionCost) {
        self.total_flops = self.total_flops.saturating_add(cost.flops);
        self.total_memory = self.total_memory.saturating_add(cost.memory);
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[ContractionStep] {
        &self.steps
    }

    pub fn total_flops(&self) -> u64 {
        self.total_flops
    }

    pub fn total_memory(&self) -> u64 {
        self.total_memory
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Pairs of positions contracted at each step.
    pub fn to_pairs(&self) -> Vec<(usize, usize)> {
        self.steps.iter().map(|s| s.inputs).collect()
    }
}

/// Shared and remaining labels of a pairwise contraction.
///
/// Every shared label is summed over. The result keeps the remaining labels
/// of `a` followed by those of `b`.
pub(crate) fn merge_labels(a: &[i32], b: &[i32]) -> (Vec<i32>, Vec<i32>) {
    let contracted: Vec<i32> = a.iter().copied().filter(|l| b.contains(l)).collect();
    let result = a
        .iter()
        .chain(b)
        .copied()
        .filter(|l| !contracted.contains(l))
        .collect();
    (contracted, result)
}

/// Tensor list during path search.
///
/// Inputs get ids `0..n`; each contraction result gets the next free id.
#[derive(Debug, Clone)]
pub(crate) struct TensorState {
    pub shapes: Vec<Vec<usize>>,
    pub labels: Vec<Vec<i32>>,
    pub ids: Vec<usize>,
    next_id: usize,
}

impl TensorState {
    pub fn new(shapes: Vec<Vec<usize>>, labels: Vec<Vec<i32>>) -> Self {
        let ids: Vec<usize> = (0..shapes.len()).collect();
        let next_id = ids.len();
        Self {
            shapes,
            labels,
            ids,
            next_id,
        }
    }

    /// Number of tensors remaining.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Current position of the tensor with id `id`.
    pub fn position(&self, id: usize) -> Option<usize> {
        self.ids.iter().position(|&x| x == id)
    }

    /// Describes contracting the tensors at positions `i < j` without
    /// changing the state.
    pub fn evaluate(&self, i: usize, j: usize, cost_model: &CostModel) -> (ContractionStep, ContractionCost) {
        let (contracted, result) = merge_labels(&self.labels[i], &self.labels[j]);
        let cost = cost_model.compute_pairwise_cost(
            &self.shapes[i],
            &self.shapes[j],
            &self.labels[i],
            &self.labels[j],
            &contracted,
        );
        let step = ContractionStep::new((i, j), contracted, result, cost.flops);
        (step, cost)
    }

    /// Contracts the tensors at positions `i < j`; returns the step, its cost
    /// and the id of the result.
    pub fn contract(&mut self, i: usize, j: usize, cost_model: &CostModel) -> (ContractionStep, ContractionCost, usize) {
        debug_assert!(i < j && j < self.len());
        let (step, cost) = self.evaluate(i, j, cost_model);

        let mut dim_map: HashMap<i32, usize> = HashMap::new();
        for k in [i, j] {
            for (&l, &d) in self.labels[k].iter().zip(&self.shapes[k]) {
                dim_map.insert(l, d);
            }
        }
        let result_shape: Vec<usize> = step
            .result_labels
            .iter()
            .map(|l| dim_map.get(l).copied().unwrap_or(1))
            .collect();

        // remove the later position first
        for k in [j, i] {
            self.shapes.remove(k);
            self.labels.remove(k);
            self.ids.remove(k);
        }
        let id = self.next_id;
        self.next_id += 1;
        self.shapes.push(result_shape);
        self.labels.push(step.result_labels.clone());
        self.ids.push(id);
        (step, cost, id)
    }
}
