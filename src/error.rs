//! Error types for tensor operations.

use crate::symmetry::Qnum;

/// Broad category of a [`TensorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bond list or argument combination that cannot describe a tensor.
    Configuration,
    /// Bond, block or matrix dimensions are incompatible.
    DimensionMismatch,
    /// Index or quantum number outside the tensor.
    IndexOutOfRange,
    /// Elements were read before any were set.
    NotYetInitialized,
    /// Operation not available for this input.
    Unsupported,
    /// Malformed network description.
    Parse,
    /// Reading or writing a tensor file failed.
    Io,
}

/// Errors that can occur while building or operating on tensors.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// The bonds admit no quantum number common to the row and column fusion.
    #[error("no symmetry block with given bonds")]
    NoSymmetryBlock,

    /// A bond could not be constructed.
    #[error("invalid bond: {message}")]
    InvalidBond { message: String },

    /// Operation requires at least one bond.
    #[error("nothing to {operation}: tensor has no bonds")]
    NoBonds { operation: &'static str },

    /// Label list does not fit the tensor.
    #[error("invalid labels: {message}")]
    InvalidLabels { message: String },

    /// A label was not found on the tensor.
    #[error("label {label} not found in {labels:?}")]
    LabelNotFound { label: i32, labels: Vec<i32> },

    /// New label order is not a permutation of the current labels.
    #[error("invalid permutation: {message}")]
    InvalidPermutation { message: String },

    /// Shared bonds of a contraction have different dimensions.
    #[error("Cannot contract two bonds having different dimensions: label {label}: {left} vs {right}")]
    BondDimensionMismatch { label: i32, left: usize, right: usize },

    /// Paired bonds carry incompatible quantum numbers.
    #[error("bonds with label {label} cannot be paired: {message}")]
    BondMismatch { label: i32, message: String },

    /// Matrix or buffer shape does not match.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    /// Multi-index lookup outside the tensor.
    #[error("index {index:?} out of range for dimensions {dims:?}")]
    IndexOutOfRange { index: Vec<usize>, dims: Vec<usize> },

    /// No block carries the requested quantum number.
    #[error("no block with quantum number {qnum}")]
    BlockNotFound { qnum: Qnum },

    /// Elements were read before being set.
    #[error("{operation}: tensor has no elements")]
    NotInitialized { operation: &'static str },

    /// Unsupported operation.
    #[error("unsupported operation: {message}")]
    Unsupported { message: String },

    /// Malformed network description.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Invalid network structure.
    #[error("invalid network: {message}")]
    InvalidNetwork { message: String },

    /// Stored tensor file is inconsistent.
    #[error("malformed tensor file: {message}")]
    Format { message: String },

    /// Underlying reader or writer failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TensorError {
    pub fn bond(message: impl Into<String>) -> Self {
        Self::InvalidBond {
            message: message.into(),
        }
    }

    pub fn labels(message: impl Into<String>) -> Self {
        Self::InvalidLabels {
            message: message.into(),
        }
    }

    pub fn permutation(message: impl Into<String>) -> Self {
        Self::InvalidPermutation {
            message: message.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::InvalidNetwork {
            message: message.into(),
        }
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    /// Returns the category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoSymmetryBlock
            | Self::InvalidBond { .. }
            | Self::NoBonds { .. }
            | Self::InvalidLabels { .. }
            | Self::InvalidPermutation { .. }
            | Self::InvalidNetwork { .. } => ErrorKind::Configuration,
            Self::BondDimensionMismatch { .. }
            | Self::BondMismatch { .. }
            | Self::ShapeMismatch { .. } => ErrorKind::DimensionMismatch,
            Self::IndexOutOfRange { .. }
            | Self::LabelNotFound { .. }
            | Self::BlockNotFound { .. } => ErrorKind::IndexOutOfRange,
            Self::NotInitialized { .. } => ErrorKind::NotYetInitialized,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Format { .. } | Self::Io(_) => ErrorKind::Io,
        }
    }
}

/// Result type for tensor operations.
pub type TensorResult<T> = core::result::Result<T, TensorError>;
