//! Execution plan for a network.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cost::CostModel;
use super::dynamic::{MAX_DP_TENSORS, optimal_path};
use super::greedy::greedy_path;
use super::path::{ContractionPath, TensorState};
use crate::error::{TensorError, TensorResult};
use crate::network::{NetworkDescription, OrderTree};

/// Up to this many tensors `Auto` runs the exhaustive search.
const AUTO_DP_TENSORS: usize = 8;

/// Strategy for finding contraction paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContractionStrategy {
    /// Declaration order: `((A B) C) ...`.
    Sequential,
    /// Greedy algorithm - fast O(n³) heuristic.
    Greedy,
    /// Optimal dynamic programming - exponential but optimal for small n.
    Optimal,
    /// Automatically choose based on problem size.
    #[default]
    Auto,
}

/// A single step in the execution plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStep {
    /// Contract two tensors of the working list; the result goes to its end.
    Contraction {
        /// Positions in the working list, first < second.
        inputs: (usize, usize),
        /// Labels summed over.
        contracted: Vec<i32>,
        /// Labels of the result.
        result: Vec<i32>,
        /// Estimated FLOPs.
        flops: u64,
    },
    /// Bring the last tensor to the output label order and row split.
    Permutation {
        labels: Vec<i32>,
        row_num: usize,
    },
}

/// Complete execution plan for a network.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    steps: Vec<ExecutionStep>,
    total_flops: u64,
    total_memory: u64,
    output_shape: Vec<usize>,
}

impl ExecutionPlan {
    /// Creates a plan from a contraction path and the `TOUT` spec.
    pub fn from_contraction_path(path: &ContractionPath, output_labels: &[i32], row_num: usize, output_shape: Vec<usize>) -> Self {
        let mut steps: Vec<ExecutionStep> = path
            .steps()
            .iter()
            .map(|step| ExecutionStep::Contraction {
                inputs: step.inputs,
                contracted: step.contracted_labels.clone(),
                result: step.result_labels.clone(),
                flops: step.estimated_flops,
            })
            .collect();
        if !output_labels.is_empty() {
            steps.push(ExecutionStep::Permutation {
                labels: output_labels.to_vec(),
                row_num,
            });
        }

        Self {
            steps,
            total_flops: path.total_flops(),
            total_memory: path.total_memory(),
            output_shape,
        }
    }

    /// Returns the execution steps.
    pub fn steps(&self) -> &[ExecutionStep] {
        &self.steps
    }

    /// Returns the total estimated FLOPs.
    pub fn total_flops(&self) -> u64 {
        self.total_flops
    }

    pub fn total_memory(&self) -> u64 {
        self.total_memory
    }

    /// Dense bond dimensions of the result.
    pub fn output_shape(&self) -> &[usize] {
        &self.output_shape
    }

    /// Returns the number of steps.
    pub fn num_steps(&self) -> usize {
        self.steps.len()
    }

    /// Number of pairwise contractions.
    pub fn num_contractions(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, ExecutionStep::Contraction { .. }))
            .count()
    }
}

/// Creates an execution plan for a network.
///
/// `shapes[i]` holds the bond dimensions of input `i` in the order of its
/// declared labels. An `ORDER` line in the description overrides `strategy`.
pub fn create_plan(
    desc: &NetworkDescription,
    shapes: &[&[usize]],
    strategy: ContractionStrategy,
    cost_model: &CostModel,
) -> TensorResult<ExecutionPlan> {
    let n = desc.num_tensors();
    if shapes.len() != n {
        return Err(TensorError::network(format!("expected {n} shapes, got {}", shapes.len())));
    }
    let labels = desc.input_labels();
    let shapes: Vec<Vec<usize>> = shapes.iter().map(|s| s.to_vec()).collect();

    let path = if let Some(order) = desc.order() {
        debug!("contraction order given by the description");
        path_from_order(order, &labels, &shapes, cost_model)?
    } else {
        match strategy {
            ContractionStrategy::Sequential => sequential_path(&labels, &shapes, cost_model)?,
            ContractionStrategy::Greedy => greedy_path(&labels, &shapes, cost_model),
            ContractionStrategy::Optimal if n <= MAX_DP_TENSORS => optimal_path(&labels, &shapes, cost_model)?,
            ContractionStrategy::Optimal => {
                debug!(n, "too many tensors for optimal search, using greedy");
                greedy_path(&labels, &shapes, cost_model)
            }
            ContractionStrategy::Auto if n <= AUTO_DP_TENSORS => optimal_path(&labels, &shapes, cost_model)?,
            ContractionStrategy::Auto => greedy_path(&labels, &shapes, cost_model),
        }
    };

    let output = desc.output();
    let output_shape = output_shape(output.labels(), &labels, &shapes);
    debug!(
        ?strategy,
        steps = path.len(),
        flops = path.total_flops(),
        "planned network"
    );
    Ok(ExecutionPlan::from_contraction_path(
        &path,
        output.labels(),
        output.row_num(),
        output_shape,
    ))
}

/// Contracts in declaration order.
pub fn sequential_path(labels: &[Vec<i32>], shapes: &[Vec<usize>], cost_model: &CostModel) -> TensorResult<ContractionPath> {
    let Some(tree) = (0..labels.len())
        .map(OrderTree::Leaf)
        .reduce(|acc, leaf| OrderTree::Pair(Box::new(acc), Box::new(leaf)))
    else {
        return Ok(ContractionPath::new());
    };
    path_from_order(&tree, labels, shapes, cost_model)
}

/// Converts an explicit contraction tree into a path.
pub fn path_from_order(
    order: &OrderTree,
    labels: &[Vec<i32>],
    shapes: &[Vec<usize>],
    cost_model: &CostModel,
) -> TensorResult<ContractionPath> {
    let mut state = TensorState::new(shapes.to_vec(), labels.to_vec());
    let mut path = ContractionPath::with_capacity(labels.len().saturating_sub(1));
    emit(order, &mut state, &mut path, cost_model)?;
    if state.len() != 1 {
        return Err(TensorError::network(format!(
            "contraction order leaves {} tensors",
            state.len()
        )));
    }
    Ok(path)
}

fn emit(node: &OrderTree, state: &mut TensorState, path: &mut ContractionPath, cost_model: &CostModel) -> TensorResult<usize> {
    match node {
        OrderTree::Leaf(i) => {
            state
                .position(*i)
                .ok_or_else(|| TensorError::network(format!("tensor {i} used twice in contraction order")))?;
            Ok(*i)
        }
        OrderTree::Pair(l, r) => {
            let left = emit(l, state, path, cost_model)?;
            let right = emit(r, state, path, cost_model)?;
            let (Some(a), Some(b)) = (state.position(left), state.position(right)) else {
                return Err(TensorError::network("contraction order reuses a tensor"));
            };
            if a == b {
                return Err(TensorError::network("contraction order pairs a tensor with itself"));
            }
            let (step, cost, id) = state.contract(a.min(b), a.max(b), cost_model);
            path.push(step, cost);
            Ok(id)
        }
    }
}

fn output_shape(output: &[i32], labels: &[Vec<i32>], shapes: &[Vec<usize>]) -> Vec<usize> {
    output
        .iter()
        .map(|l| {
            labels
                .iter()
                .zip(shapes)
                .find_map(|(ls, sh)| ls.iter().position(|x| x == l).and_then(|p| sh.get(p).copied()))
                .unwrap_or(1)
        })
        .collect()
}
