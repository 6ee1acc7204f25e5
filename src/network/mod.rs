//! Network descriptions.
//!
//! A network lists tensors by name with the labels of their bonds, the
//! labels of the result `TOUT`, and optionally a contraction `ORDER`.

mod description;
mod parser;
mod tensor_spec;
pub mod validation;

pub use description::{NetworkDescription, OrderTree};
pub use parser::parse_network;
pub use tensor_spec::TensorSpec;
pub use validation::{validate_bonds, validate_network};
