//! Network execution engine.
//!
//! Orchestrates validation, planning and pairwise contraction.

use std::borrow::Cow;

use tracing::{debug, info};

use super::config::NetworkConfig;
use crate::error::{TensorError, TensorResult};
use crate::network::{NetworkDescription, parse_network, validate_bonds, validate_network};
use crate::optimization::{ExecutionPlan, ExecutionStep, create_plan};
use crate::scalar::Scalar;
use crate::tensor::Tensor;

/// A tensor network: a validated description plus the tensors put into it.
///
/// # Example
///
/// ```
/// use symtensor::{Bond, BondType, Network, NetworkConfig, Tensor};
///
/// let mut net = Network::<f64>::parse("A: 1; 2\nB: 2; 3\nTOUT: 1; 3", NetworkConfig::default()).unwrap();
/// let bonds = vec![Bond::new(BondType::In, 2).unwrap(), Bond::new(BondType::Out, 2).unwrap()];
/// let mut a = Tensor::new(bonds).unwrap();
/// a.set_raw_elem(&[1.0, 2.0, 3.0, 4.0]).unwrap();
/// net.put_tensor("A", a.clone()).unwrap();
/// net.put_tensor("B", a).unwrap();
/// let c = net.launch().unwrap();
/// assert_eq!(c.raw_elem(), vec![7.0, 10.0, 15.0, 22.0]);
/// ```
#[derive(Debug, Clone)]
pub struct Network<T: Scalar> {
    desc: NetworkDescription,
    config: NetworkConfig,
    tensors: Vec<Option<Tensor<T>>>,
    plan: Option<ExecutionPlan>,
}

impl<T: Scalar> Network<T> {
    /// Creates a network after checking its structure.
    pub fn new(desc: NetworkDescription, config: NetworkConfig) -> TensorResult<Self> {
        validate_network(&desc)?;
        let tensors = vec![None; desc.num_tensors()];
        Ok(Self {
            desc,
            config,
            tensors,
            plan: None,
        })
    }

    /// Parses and validates a description.
    pub fn parse(text: &str, config: NetworkConfig) -> TensorResult<Self> {
        Self::new(parse_network(text)?, config)
    }

    pub fn description(&self) -> &NetworkDescription {
        &self.desc
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Places `tensor` at the slot named `name`.
    ///
    /// The tensor takes the labels of the slot and its declared split into
    /// incoming and outgoing bonds.
    pub fn put_tensor(&mut self, name: &str, tensor: Tensor<T>) -> TensorResult<()> {
        let index = self
            .desc
            .tensor_index(name)
            .ok_or_else(|| TensorError::network(format!("no tensor named '{name}' in the network")))?;
        self.put_tensor_at(index, tensor)
    }

    /// Places `tensor` at input position `index`.
    pub fn put_tensor_at(&mut self, index: usize, mut tensor: Tensor<T>) -> TensorResult<()> {
        let spec = self
            .desc
            .tensors()
            .get(index)
            .ok_or_else(|| TensorError::network(format!("no tensor at position {index}")))?;
        if tensor.bond_num() != spec.len() {
            return Err(TensorError::network(format!(
                "'{}' declares {} bonds, tensor has {}",
                spec.name(),
                spec.len(),
                tensor.bond_num()
            )));
        }

        tensor.set_labels(spec.labels())?;
        let tensor = if spec.is_empty() {
            tensor
        } else {
            tensor.permute(spec.labels(), spec.row_num())?
        };

        let reshaped = self.tensors[index]
            .as_ref()
            .is_none_or(|old| old.shape() != tensor.shape());
        if reshaped {
            self.plan = None;
        }
        debug!(name = spec.name(), shape = ?tensor.shape(), "put tensor");
        self.tensors[index] = Some(tensor);
        Ok(())
    }

    /// Whether every slot holds a tensor.
    pub fn is_complete(&self) -> bool {
        self.tensors.iter().all(Option::is_some)
    }

    /// Returns the execution plan, computing it on first use.
    pub fn plan(&mut self) -> TensorResult<&ExecutionPlan> {
        let plan = match self.plan.take() {
            Some(plan) => plan,
            None => self.create_plan()?,
        };
        Ok(self.plan.insert(plan))
    }

    fn create_plan(&self) -> TensorResult<ExecutionPlan> {
        let shapes = self
            .tensors
            .iter()
            .zip(self.desc.tensors())
            .map(|(t, spec)| {
                t.as_ref()
                    .map(Tensor::shape)
                    .ok_or_else(|| TensorError::network(format!("tensor '{}' has not been put", spec.name())))
            })
            .collect::<TensorResult<Vec<_>>>()?;
        let shape_refs: Vec<&[usize]> = shapes.iter().map(Vec::as_slice).collect();

        if self.config.validate_bonds {
            validate_bonds(&self.desc, &shape_refs)?;
        }
        create_plan(&self.desc, &shape_refs, self.config.strategy, &self.config.cost_model())
    }

    /// Contracts the network and returns the `TOUT` tensor.
    pub fn launch(&mut self) -> TensorResult<Tensor<T>> {
        let plan = self.plan()?.clone();
        let mut working: Vec<Cow<'_, Tensor<T>>> = Vec::with_capacity(self.tensors.len());
        for (t, spec) in self.tensors.iter().zip(self.desc.tensors()) {
            match t {
                Some(t) if t.has_elements() => working.push(Cow::Borrowed(t)),
                _ => {
                    return Err(TensorError::network(format!(
                        "tensor '{}' has no elements",
                        spec.name()
                    )));
                }
            }
        }
        info!(
            tensors = working.len(),
            steps = plan.num_steps(),
            flops = plan.total_flops(),
            "launching network"
        );
        execute_plan(&plan, working)
    }
}

/// Runs `plan` over the working list.
fn execute_plan<T: Scalar>(plan: &ExecutionPlan, mut working: Vec<Cow<'_, Tensor<T>>>) -> TensorResult<Tensor<T>> {
    for step in plan.steps() {
        match step {
            ExecutionStep::Contraction { inputs: (i, j), contracted, .. } => {
                let (i, j) = (*i, *j);
                if i >= j || j >= working.len() {
                    return Err(TensorError::unsupported(format!(
                        "invalid contraction step ({i}, {j}) over {} tensors",
                        working.len()
                    )));
                }
                let b = working.remove(j);
                let a = working.remove(i);
                debug!(i, j, ?contracted, "contract step");
                let c = a.contract(&b)?;
                working.push(Cow::Owned(c));
            }
            ExecutionStep::Permutation { labels, row_num } => {
                let last = working
                    .pop()
                    .ok_or_else(|| TensorError::unsupported("permutation with no tensor"))?;
                working.push(Cow::Owned(last.permute(labels, *row_num)?));
            }
        }
    }

    if working.len() != 1 {
        return Err(TensorError::unsupported(format!(
            "plan left {} tensors instead of one",
            working.len()
        )));
    }
    let mut out = working.pop().map(Cow::into_owned).ok_or_else(|| TensorError::unsupported("empty network"))?;
    out.set_name("TOUT");
    Ok(out)
}

/// Contracts `tensors` as described by `desc`.
///
/// # Arguments
/// * `desc` - The network description
/// * `tensors` - One tensor per description entry, in declaration order
/// * `config` - Optional configuration
///
/// # Example
///
/// ```ignore
/// let desc = parse_network("A: 1; 2\nB: 2; 3\nTOUT: 1; 3")?;
/// let c = contract_network(&desc, &[&a, &b], None)?;
/// ```
pub fn contract_network<T: Scalar>(
    desc: &NetworkDescription,
    tensors: &[&Tensor<T>],
    config: Option<NetworkConfig>,
) -> TensorResult<Tensor<T>> {
    let config = config.unwrap_or_default();
    if tensors.len() != desc.num_tensors() {
        return Err(TensorError::network(format!(
            "expected {} tensors, got {}",
            desc.num_tensors(),
            tensors.len()
        )));
    }
    let mut net = Network::new(desc.clone(), config)?;
    for (i, &t) in tensors.iter().enumerate() {
        net.put_tensor_at(i, t.clone())?;
    }
    net.launch()
}
