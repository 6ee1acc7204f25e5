//! Structural checks for network descriptions and bond dimensions.

use hashbrown::{HashMap, HashSet};

use super::description::NetworkDescription;
use crate::error::{TensorError, TensorResult};

/// Validates the structure of a network.
///
/// Checks:
/// - Tensor names are unique
/// - Labels are distinct within each tensor, including `TOUT`
/// - No label is used by more than two inputs
/// - `TOUT` holds exactly the labels used once
/// - `ORDER`, when present, names each tensor exactly once
pub fn validate_network(desc: &NetworkDescription) -> TensorResult<()> {
    validate_names(desc)?;
    validate_distinct_labels(desc)?;
    validate_label_counts(desc)?;
    validate_output(desc)?;
    validate_order(desc)?;
    Ok(())
}

fn validate_names(desc: &NetworkDescription) -> TensorResult<()> {
    let mut seen = HashSet::new();
    for spec in desc.tensors() {
        if !seen.insert(spec.name()) {
            return Err(TensorError::network(format!("tensor '{}' declared twice", spec.name())));
        }
    }
    Ok(())
}

fn validate_distinct_labels(desc: &NetworkDescription) -> TensorResult<()> {
    for spec in desc.tensors().iter().chain([desc.output()]) {
        if let Some(&l) = spec.labels().iter().find(|&&l| spec.count(l) > 1) {
            return Err(TensorError::network(format!(
                "label {l} appears twice on '{}'",
                spec.name()
            )));
        }
    }
    Ok(())
}

fn validate_label_counts(desc: &NetworkDescription) -> TensorResult<()> {
    let counts = desc.label_counts();
    // first offender in declaration order
    for spec in desc.tensors() {
        for &l in spec.labels() {
            let count = counts.get(&l).copied().unwrap_or(0);
            if count > 2 {
                return Err(TensorError::network(format!(
                    "label {l} is used by {count} tensors, at most 2 allowed"
                )));
            }
        }
    }
    Ok(())
}

fn validate_output(desc: &NetworkDescription) -> TensorResult<()> {
    let counts = desc.label_counts();
    for &l in desc.output().labels() {
        match counts.get(&l).copied() {
            Some(1) => {}
            Some(_) => {
                return Err(TensorError::network(format!(
                    "TOUT label {l} is contracted between two tensors"
                )));
            }
            None => return Err(TensorError::network(format!("TOUT label {l} is not used by any tensor"))),
        }
    }
    let open = counts.values().filter(|&&c| c == 1).count();
    if open != desc.output().len() {
        let mut missing: Vec<i32> = counts
            .iter()
            .filter(|&(l, &c)| c == 1 && !desc.output().contains(*l))
            .map(|(&l, _)| l)
            .collect();
        missing.sort_unstable();
        return Err(TensorError::network(format!("open labels {missing:?} missing from TOUT")));
    }
    Ok(())
}

fn validate_order(desc: &NetworkDescription) -> TensorResult<()> {
    let Some(order) = desc.order() else {
        return Ok(());
    };
    let mut seen = vec![false; desc.num_tensors()];
    for i in order.leaves() {
        if seen[i] {
            return Err(TensorError::network(format!(
                "ORDER names '{}' more than once",
                desc.tensors()[i].name()
            )));
        }
        seen[i] = true;
    }
    if let Some(i) = seen.iter().position(|&s| !s) {
        return Err(TensorError::network(format!(
            "ORDER does not mention '{}'",
            desc.tensors()[i].name()
        )));
    }
    Ok(())
}

/// Checks bond dimensions against the network and maps each label to its
/// dimension.
///
/// `shapes[i]` holds the bond dimensions of input `i` in the order of its
/// declared labels.
pub fn validate_bonds(desc: &NetworkDescription, shapes: &[&[usize]]) -> TensorResult<HashMap<i32, usize>> {
    if shapes.len() != desc.num_tensors() {
        return Err(TensorError::network(format!(
            "expected {} tensors, got {}",
            desc.num_tensors(),
            shapes.len()
        )));
    }
    let mut dims: HashMap<i32, usize> = HashMap::new();
    for (spec, shape) in desc.tensors().iter().zip(shapes) {
        if spec.len() != shape.len() {
            return Err(TensorError::network(format!(
                "'{}' declares {} labels, tensor has {} bonds",
                spec.name(),
                spec.len(),
                shape.len()
            )));
        }
        for (&l, &d) in spec.labels().iter().zip(shape.iter()) {
            if let Some(&prev) = dims.get(&l) {
                if prev != d {
                    return Err(TensorError::BondDimensionMismatch {
                        label: l,
                        left: prev,
                        right: d,
                    });
                }
            } else {
                dims.insert(l, d);
            }
        }
    }
    Ok(dims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::parse_network;

    #[test]
    fn test_valid_chain() {
        let desc = parse_network("A: 1; 2\nB: 2; 3\nTOUT: 1; 3").unwrap();
        assert!(validate_network(&desc).is_ok());
        let dims = validate_bonds(&desc, &[&[2, 3], &[3, 4]]).unwrap();
        assert_eq!(dims[&1], 2);
        assert_eq!(dims[&2], 3);
        assert_eq!(dims[&3], 4);
    }

    #[test]
    fn test_structure_errors() {
        let cases = [
            "A: 1; 2\nA: 2; 3\nTOUT: 1; 3",
            "A: 1, 1; 2\nB: 2; 3\nTOUT: 3",
            "A: 1; 2\nB: 2; 3\nC: 2; 4\nTOUT: 1; 3, 4",
            "A: 1; 2\nB: 2; 3\nTOUT: 1",
            "A: 1; 2\nB: 2; 3\nTOUT: 1; 2, 3",
            "A: 1; 2\nB: 2; 3\nTOUT: 1; 3, 9",
            "A: 1; 2\nB: 2; 3\nTOUT: 1; 3\nORDER: (A A)",
            "A: 1; 2\nB: 2; 3\nC: 4\nTOUT: 1; 3, 4\nORDER: (A B)",
        ];
        for text in cases {
            let desc = parse_network(text).unwrap();
            let err = validate_network(&desc).unwrap_err();
            assert!(matches!(err, TensorError::InvalidNetwork { .. }), "{text}: {err}");
        }
    }

    #[test]
    fn test_bond_errors() {
        let desc = parse_network("A: 1; 2\nB: 2; 3\nTOUT: 1; 3").unwrap();
        assert!(matches!(
            validate_bonds(&desc, &[&[2, 3], &[4, 4]]),
            Err(TensorError::BondDimensionMismatch { label: 2, left: 3, right: 4 })
        ));
        assert!(validate_bonds(&desc, &[&[2, 3]]).is_err());
        assert!(validate_bonds(&desc, &[&[2, 3], &[3]]).is_err());
    }
}
