//! Contraction order search for networks.
//!
//! Implements multiple strategies for ordering pairwise contractions:
//! - Sequential: declaration order
//! - Greedy: O(n³) fast heuristic
//! - Dynamic Programming: Optimal for small n

mod cost;
mod dynamic;
mod greedy;
mod path;
mod plan;

pub use cost::{ContractionCost, CostModel};
pub use dynamic::{MAX_DP_TENSORS, optimal_path};
pub use greedy::greedy_path;
pub use path::{ContractionPath, ContractionStep};
pub use plan::{ContractionStrategy, ExecutionPlan, ExecutionStep, create_plan, path_from_order, sequential_path};
