//! One line of a network description: a tensor name and its labels.

use core::fmt;

/// Labels of one tensor in a network, split into incoming and outgoing.
///
/// For example `A: 1, 2; 3` names tensor `A` with incoming labels `1, 2` and
/// outgoing label `3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorSpec {
    name: String,
    labels: Vec<i32>,
    row_num: usize,
}

impl TensorSpec {
    /// The first `row_num` labels are incoming.
    pub fn new(name: impl Into<String>, labels: Vec<i32>, row_num: usize) -> Self {
        let row_num = row_num.min(labels.len());
        Self {
            name: name.into(),
            labels,
            row_num,
        }
    }

    /// Builds a spec from its incoming and outgoing label lists.
    pub fn from_parts(name: impl Into<String>, incoming: &[i32], outgoing: &[i32]) -> Self {
        let labels = incoming.iter().chain(outgoing).copied().collect();
        Self {
            name: name.into(),
            labels,
            row_num: incoming.len(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    /// Number of incoming labels.
    #[inline]
    pub fn row_num(&self) -> usize {
        self.row_num
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn contains(&self, label: i32) -> bool {
        self.labels.contains(&label)
    }

    /// Counts occurrences of `label`.
    pub fn count(&self, label: i32) -> usize {
        self.labels.iter().filter(|&&l| l == label).count()
    }

    pub fn position(&self, label: i32) -> Option<usize> {
        self.labels.iter().position(|&l| l == label)
    }
}

impl fmt::Display for TensorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.name)?;
        let (incoming, outgoing) = self.labels.split_at(self.row_num);
        for (i, l) in incoming.iter().enumerate() {
            write!(f, "{}{l}", if i == 0 { " " } else { ", " })?;
        }
        if !outgoing.is_empty() {
            write!(f, ";")?;
            for (i, l) in outgoing.iter().enumerate() {
                write!(f, "{}{l}", if i == 0 { " " } else { ", " })?;
            }
        }
        Ok(())
    }
}
