//! Greedy contraction path optimization.
//!
//! O(n³) algorithm that repeatedly contracts the cheapest pair.

use super::cost::{ContractionCost, CostModel};
use super::path::{ContractionPath, TensorState};

/// Finds a contraction path using the greedy algorithm.
///
/// At each step, contracts the pair of tensors with lowest cost. Ties go to
/// the pair found first.
///
/// # Arguments
/// * `labels` - Labels of each input tensor
/// * `shapes` - Bond dimensions of each input tensor
/// * `cost_model` - Cost model for evaluating contractions
pub fn greedy_path(labels: &[Vec<i32>], shapes: &[Vec<usize>], cost_model: &CostModel) -> ContractionPath {
    let n = labels.len();
    if n < 2 {
        return ContractionPath::new();
    }

    let mut state = TensorState::new(shapes.to_vec(), labels.to_vec());
    let mut path = ContractionPath::with_capacity(n - 1);

    while state.len() > 1 {
        let (i, j) = find_best_pair(&state, cost_model);
        let (step, cost, _) = state.contract(i, j, cost_model);
        path.push(step, cost);
    }

    path
}

/// Finds the cheapest pair to contract in the current state.
fn find_best_pair(state: &TensorState, cost_model: &CostModel) -> (usize, usize) {
    let mut best_cost = ContractionCost::infinite();
    let mut best_pair = (0, 1);

    let n = state.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let (_, cost) = state.evaluate(i, j, cost_model);
            if cost < best_cost {
                best_cost = cost;
                best_pair = (i, j);
            }
        }
    }

    best_pair
}
