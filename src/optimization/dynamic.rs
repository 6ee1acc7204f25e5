//! Optimal contraction path via dynamic programming.
//!
//! Finds the globally optimal contraction order by trying all possible
//! bipartitions. Exponential in the number of tensors, but optimal.

use hashbrown::HashMap;

use super::cost::{ContractionCost, CostModel};
use super::path::{ContractionPath, TensorState, merge_labels};
use crate::error::{TensorError, TensorResult};

/// Maximum number of tensors for which DP is feasible.
/// For n tensors, we have 2^n subsets to consider.
pub const MAX_DP_TENSORS: usize = 12;

/// Best split of a subset and the cost of contracting it.
#[derive(Debug, Clone)]
struct Entry {
    cost: ContractionCost,
    left: u32,
    labels: Vec<i32>,
    shape: Vec<usize>,
}

/// Finds the optimal contraction path using dynamic programming.
///
/// Uses memoization over all subsets of tensors. Time complexity: O(3^n)
/// where n is the number of input tensors.
///
/// # Arguments
/// * `labels` - Labels of each input tensor
/// * `shapes` - Bond dimensions of each input tensor
/// * `cost_model` - Cost model for evaluating contractions
///
/// # Errors
/// Fails when there are more than [`MAX_DP_TENSORS`] tensors.
pub fn optimal_path(labels: &[Vec<i32>], shapes: &[Vec<usize>], cost_model: &CostModel) -> TensorResult<ContractionPath> {
    let n = labels.len();
    if n < 2 {
        return Ok(ContractionPath::new());
    }
    if n > MAX_DP_TENSORS {
        return Err(TensorError::unsupported(format!(
            "optimal search handles at most {MAX_DP_TENSORS} tensors, got {n}"
        )));
    }

    let mut memo: HashMap<u32, Entry> = HashMap::new();
    for i in 0..n {
        memo.insert(
            1u32 << i,
            Entry {
                cost: ContractionCost::zero(),
                left: 0,
                labels: labels[i].clone(),
                shape: shapes[i].clone(),
            },
        );
    }

    // DP over subset sizes
    for size in 2..=n {
        for subset in subsets_of_size(n, size) {
            let mut best: Option<Entry> = None;

            for left in proper_subsets(subset) {
                let right = subset ^ left;
                // each bipartition once
                if right == 0 || left > right {
                    continue;
                }
                let (Some(l), Some(r)) = (memo.get(&left), memo.get(&right)) else {
                    continue;
                };

                let (contracted, result) = merge_labels(&l.labels, &r.labels);
                let step_cost = cost_model.compute_pairwise_cost(&l.shape, &r.shape, &l.labels, &r.labels, &contracted);
                let total = l.cost + r.cost + step_cost;
                if best.as_ref().is_some_and(|b| b.cost <= total) {
                    continue;
                }

                let shape = result
                    .iter()
                    .map(|label| {
                        l.labels
                            .iter()
                            .zip(&l.shape)
                            .chain(r.labels.iter().zip(&r.shape))
                            .find(|(x, _)| *x == label)
                            .map_or(1, |(_, &d)| d)
                    })
                    .collect();
                best = Some(Entry {
                    cost: total,
                    left,
                    labels: result,
                    shape,
                });
            }

            if let Some(entry) = best {
                memo.insert(subset, entry);
            }
        }
    }

    // Replay the best tree to get positions in the shrinking tensor list
    let full = (1u32 << n) - 1;
    let mut state = TensorState::new(shapes.to_vec(), labels.to_vec());
    let mut path = ContractionPath::with_capacity(n - 1);
    replay(full, &memo, &mut state, &mut path, cost_model)?;
    Ok(path)
}

/// Emits the steps for `subset` in post order; returns the id of its result.
fn replay(
    subset: u32,
    memo: &HashMap<u32, Entry>,
    state: &mut TensorState,
    path: &mut ContractionPath,
    cost_model: &CostModel,
) -> TensorResult<usize> {
    if subset.count_ones() == 1 {
        return Ok(subset.trailing_zeros() as usize);
    }
    let entry = memo
        .get(&subset)
        .ok_or_else(|| TensorError::unsupported(format!("no split recorded for subset {subset:#b}")))?;
    let left = entry.left;
    let left_id = replay(left, memo, state, path, cost_model)?;
    let right_id = replay(subset ^ left, memo, state, path, cost_model)?;

    let (Some(a), Some(b)) = (state.position(left_id), state.position(right_id)) else {
        return Err(TensorError::unsupported("contraction tree refers to a consumed tensor"));
    };
    let (step, cost, id) = state.contract(a.min(b), a.max(b), cost_model);
    path.push(step, cost);
    Ok(id)
}

/// Generates all subsets of {0..n-1} with exactly `size` elements.
fn subsets_of_size(n: usize, size: usize) -> Vec<u32> {
    let mut result = Vec::new();
    generate_subsets(n, size, 0, 0, &mut result);
    result
}

fn generate_subsets(n: usize, size: usize, start: usize, current: u32, result: &mut Vec<u32>) {
    if size == 0 {
        result.push(current);
        return;
    }
    if start >= n || n - start < size {
        return;
    }

    // Include start
    generate_subsets(n, size - 1, start + 1, current | (1 << start), result);
    // Exclude start
    generate_subsets(n, size, start + 1, current, result);
}

/// Generates all non-empty subsets of a set, the set itself included.
fn proper_subsets(set: u32) -> impl Iterator<Item = u32> {
    let mut subset = set;
    core::iter::from_fn(move || {
        if subset == 0 {
            return None;
        }
        let result = subset;
        subset = (subset - 1) & set;
        Some(result)
    })
}
