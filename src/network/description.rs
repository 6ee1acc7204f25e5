//! Parsed network description.

use core::fmt;

use hashbrown::HashMap;

use super::tensor_spec::TensorSpec;

/// Contraction order given by an `ORDER:` line.
///
/// Leaves index into [`NetworkDescription::tensors`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderTree {
    Leaf(usize),
    Pair(Box<OrderTree>, Box<OrderTree>),
}

impl OrderTree {
    /// Tensor indices in left-to-right order.
    pub fn leaves(&self) -> Vec<usize> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves(&self, out: &mut Vec<usize>) {
        match self {
            Self::Leaf(i) => out.push(*i),
            Self::Pair(l, r) => {
                l.collect_leaves(out);
                r.collect_leaves(out);
            }
        }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, tensors: &[TensorSpec]) -> fmt::Result {
        match self {
            Self::Leaf(i) => match tensors.get(*i) {
                Some(spec) => write!(f, "{}", spec.name()),
                None => write!(f, "#{i}"),
            },
            Self::Pair(l, r) => {
                write!(f, "(")?;
                l.write(f, tensors)?;
                write!(f, " ")?;
                r.write(f, tensors)?;
                write!(f, ")")
            }
        }
    }
}

/// A network: input tensors, the output `TOUT`, and an optional order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkDescription {
    tensors: Vec<TensorSpec>,
    output: TensorSpec,
    order: Option<OrderTree>,
}

impl NetworkDescription {
    pub fn new(tensors: Vec<TensorSpec>, output: TensorSpec) -> Self {
        Self {
            tensors,
            output,
            order: None,
        }
    }

    pub fn with_order(mut self, order: OrderTree) -> Self {
        self.order = Some(order);
        self
    }

    pub fn tensors(&self) -> &[TensorSpec] {
        &self.tensors
    }

    pub fn output(&self) -> &TensorSpec {
        &self.output
    }

    pub fn order(&self) -> Option<&OrderTree> {
        self.order.as_ref()
    }

    pub fn num_tensors(&self) -> usize {
        self.tensors.len()
    }

    pub fn tensor_index(&self, name: &str) -> Option<usize> {
        self.tensors.iter().position(|t| t.name() == name)
    }

    /// Labels shared by two inputs, in order of first appearance.
    pub fn contracted_labels(&self) -> Vec<i32> {
        let counts = self.label_counts();
        let mut out = Vec::new();
        for spec in &self.tensors {
            for &l in spec.labels() {
                if counts.get(&l) == Some(&2) && !out.contains(&l) {
                    out.push(l);
                }
            }
        }
        out
    }

    /// Number of inputs each label appears on.
    pub fn label_counts(&self) -> HashMap<i32, usize> {
        let mut counts: HashMap<i32, usize> = HashMap::new();
        for spec in &self.tensors {
            for &l in spec.labels() {
                *counts.entry(l).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Label lists of every input, in declaration order.
    pub fn input_labels(&self) -> Vec<Vec<i32>> {
        self.tensors.iter().map(|t| t.labels().to_vec()).collect()
    }
}

impl fmt::Display for NetworkDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for spec in &self.tensors {
            writeln!(f, "{spec}")?;
        }
        write!(f, "{}", self.output)?;
        if let Some(order) = &self.order {
            write!(f, "\nORDER: ")?;
            order.write(f, &self.tensors)?;
        }
        Ok(())
    }
}
