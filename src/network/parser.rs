//! Network description parser.
//!
//! Parses text like
//!
//! ```text
//! # two-site Hamiltonian applied to a state
//! H: 1, 2; 3, 4
//! Psi: 3, 4
//! TOUT: 1, 2
//! ```
//!
//! into a [`NetworkDescription`].

use core::iter::Peekable;
use core::str::CharIndices;

use super::description::{NetworkDescription, OrderTree};
use super::tensor_spec::TensorSpec;
use crate::error::{TensorError, TensorResult};

const OUTPUT_NAME: &str = "TOUT";
const ORDER_NAME: &str = "ORDER";

/// Parses a network description.
///
/// # Grammar
///
/// ```text
/// network   ::= (line '\n')*
/// line      ::= entry? comment?
/// comment   ::= '#' any*
/// entry     ::= name ':' labels (';' labels)? | 'ORDER' ':' order
/// labels    ::= (integer (',' | ' ')*)*
/// order     ::= term+
/// term      ::= name | '(' term+ ')'
/// ```
///
/// Labels before `;` are incoming, after it outgoing. Exactly one entry must
/// be named `TOUT`. Terms inside parentheses are contracted left to right,
/// so `(A B C)` means `((A B) C)`.
///
/// # Examples
///
/// ```
/// use symtensor::parse_network;
///
/// let desc = parse_network("A: 1; 2\nB: 2; 3\nTOUT: 1; 3").unwrap();
/// assert_eq!(desc.num_tensors(), 2);
/// assert_eq!(desc.output().labels(), &[1, 3]);
/// ```
pub fn parse_network(text: &str) -> TensorResult<NetworkDescription> {
    let mut tensors: Vec<TensorSpec> = Vec::new();
    let mut output: Option<TensorSpec> = None;
    let mut order: Option<(usize, String)> = None;

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = match raw.find('#') {
            Some(pos) => &raw[..pos],
            None => raw,
        }
        .trim();
        if line.is_empty() {
            continue;
        }

        let Some((name, rest)) = line.split_once(':') else {
            return Err(TensorError::parse(line_no, format!("expected 'NAME: labels', got '{line}'")));
        };
        let name = name.trim();
        check_name(name, line_no)?;

        match name {
            ORDER_NAME => {
                if order.is_some() {
                    return Err(TensorError::parse(line_no, "ORDER given more than once"));
                }
                order = Some((line_no, rest.to_string()));
            }
            OUTPUT_NAME => {
                if output.is_some() {
                    return Err(TensorError::parse(line_no, "TOUT given more than once"));
                }
                output = Some(parse_entry(name, rest, line_no)?);
            }
            _ => tensors.push(parse_entry(name, rest, line_no)?),
        }
    }

    let Some(output) = output else {
        let last = text.lines().count().max(1);
        return Err(TensorError::parse(last, "missing TOUT line"));
    };
    if tensors.is_empty() {
        return Err(TensorError::parse(1, "network has no input tensors"));
    }

    let mut desc = NetworkDescription::new(tensors, output);
    if let Some((line_no, text)) = order {
        let tree = parse_order(&text, &desc, line_no)?;
        desc = desc.with_order(tree);
    }
    Ok(desc)
}

fn check_name(name: &str, line_no: usize) -> TensorResult<()> {
    if name.is_empty() {
        return Err(TensorError::parse(line_no, "empty tensor name"));
    }
    if let Some(c) = name.chars().find(|c| !(c.is_alphanumeric() || *c == '_' || *c == '-' || *c == '.')) {
        return Err(TensorError::parse(
            line_no,
            format!("invalid character '{c}' in tensor name '{name}'"),
        ));
    }
    Ok(())
}

/// Parses `l1, l2; l3` into a spec.
fn parse_entry(name: &str, rest: &str, line_no: usize) -> TensorResult<TensorSpec> {
    let mut parts = rest.split(';');
    let incoming = parse_labels(parts.next().unwrap_or(""), line_no)?;
    let outgoing = match parts.next() {
        Some(s) => parse_labels(s, line_no)?,
        None => Vec::new(),
    };
    if parts.next().is_some() {
        return Err(TensorError::parse(line_no, format!("more than one ';' in entry '{name}'")));
    }
    Ok(TensorSpec::from_parts(name, &incoming, &outgoing))
}

fn parse_labels(s: &str, line_no: usize) -> TensorResult<Vec<i32>> {
    s.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|tok| !tok.is_empty())
        .map(|tok| {
            tok.parse::<i32>()
                .map_err(|_| TensorError::parse(line_no, format!("invalid label '{tok}'")))
        })
        .collect()
}

/// Parses the body of an `ORDER:` line.
fn parse_order(text: &str, desc: &NetworkDescription, line_no: usize) -> TensorResult<OrderTree> {
    let mut parser = OrderParser {
        chars: text.char_indices().peekable(),
        text,
        desc,
        line_no,
    };
    let tree = parser.sequence(false)?;
    match tree {
        Some(tree) => Ok(tree),
        None => Err(TensorError::parse(line_no, "empty ORDER")),
    }
}

struct OrderParser<'a> {
    chars: Peekable<CharIndices<'a>>,
    text: &'a str,
    desc: &'a NetworkDescription,
    line_no: usize,
}

impl OrderParser<'_> {
    /// Reads terms until `)` (when nested) or the end, folding them left.
    fn sequence(&mut self, nested: bool) -> TensorResult<Option<OrderTree>> {
        let mut acc: Option<OrderTree> = None;
        loop {
            self.skip_whitespace();
            let term = match self.chars.peek().copied() {
                None if nested => return Err(TensorError::parse(self.line_no, "unclosed '(' in ORDER")),
                None => break,
                Some((_, ')')) if nested => {
                    self.chars.next();
                    break;
                }
                Some((_, ')')) => return Err(TensorError::parse(self.line_no, "unmatched ')' in ORDER")),
                Some((_, '(')) => {
                    self.chars.next();
                    match self.sequence(true)? {
                        Some(t) => t,
                        None => return Err(TensorError::parse(self.line_no, "empty '()' in ORDER")),
                    }
                }
                Some(_) => self.leaf()?,
            };
            acc = Some(match acc {
                None => term,
                Some(prev) => OrderTree::Pair(Box::new(prev), Box::new(term)),
            });
        }
        Ok(acc)
    }

    fn leaf(&mut self) -> TensorResult<OrderTree> {
        let start = self.chars.peek().map_or(self.text.len(), |&(i, _)| i);
        let mut end = start;
        while let Some(&(i, c)) = self.chars.peek() {
            if c.is_whitespace() || c == '(' || c == ')' || c == ',' {
                break;
            }
            end = i + c.len_utf8();
            self.chars.next();
        }
        let name = &self.text[start..end];
        self.desc
            .tensor_index(name)
            .map(OrderTree::Leaf)
            .ok_or_else(|| TensorError::parse(self.line_no, format!("unknown tensor '{name}' in ORDER")))
    }

    /// Commas count as whitespace.
    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace() || *c == ',') {
            self.chars.next();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_chain() {
        let desc = parse_network("A: 1; 2\nB: 2; 3\nC: 3; 4\nTOUT: 1; 4").unwrap();
        assert_eq!(desc.num_tensors(), 3);
        assert_eq!(desc.tensors()[1].name(), "B");
        assert_eq!(desc.tensors()[1].labels(), &[2, 3]);
        assert_eq!(desc.tensors()[1].row_num(), 1);
        assert_eq!(desc.output().labels(), &[1, 4]);
        assert!(desc.order().is_none());
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let text = "# header\n\nH: 1, 2; 3, 4   # operator\nPsi: 3 4\n\nTOUT: 1, 2\n";
        let desc = parse_network(text).unwrap();
        assert_eq!(desc.tensors()[0].row_num(), 2);
        assert_eq!(desc.tensors()[1].labels(), &[3, 4]);
        assert_eq!(desc.tensors()[1].row_num(), 2);
        assert_eq!(desc.output().row_num(), 2);
    }

    #[test]
    fn test_negative_labels_and_empty_output() {
        let desc = parse_network("A: -1; 5\nB: 5; -1\nTOUT:").unwrap();
        assert_eq!(desc.tensors()[0].labels(), &[-1, 5]);
        assert!(desc.output().is_empty());
    }

    #[test]
    fn test_parse_order() {
        let desc = parse_network("A: 1; 2\nB: 2; 3\nC: 3; 4\nTOUT: 1; 4\nORDER: (A (B C))").unwrap();
        let expected = OrderTree::Pair(
            Box::new(OrderTree::Leaf(0)),
            Box::new(OrderTree::Pair(Box::new(OrderTree::Leaf(1)), Box::new(OrderTree::Leaf(2)))),
        );
        assert_eq!(desc.order(), Some(&expected));

        // flat lists fold left
        let flat = parse_network("A: 1; 2\nB: 2; 3\nC: 3; 4\nTOUT: 1; 4\nORDER: C B A").unwrap();
        assert_eq!(flat.order().unwrap().leaves(), vec![2, 1, 0]);
        assert!(matches!(flat.order(), Some(OrderTree::Pair(_, r)) if **r == OrderTree::Leaf(0)));
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let err = parse_network("A: 1; 2\nB: 2; x\nTOUT: 1; 3").unwrap_err();
        assert!(matches!(err, TensorError::Parse { line: 2, .. }));
        assert_eq!(err.to_string(), "parse error at line 2: invalid label 'x'");

        assert!(matches!(parse_network("A: 1; 2\nB 2"), Err(TensorError::Parse { line: 2, .. })));
        assert!(matches!(parse_network("A: 1; 2; 3\nTOUT:"), Err(TensorError::Parse { line: 1, .. })));
        assert!(matches!(parse_network("A: 1; 2\nB: 2; 1"), Err(TensorError::Parse { .. })));
        assert!(matches!(parse_network("TOUT:\nTOUT:"), Err(TensorError::Parse { line: 2, .. })));
        assert!(matches!(parse_network("TOUT:"), Err(TensorError::Parse { .. })));
        assert!(matches!(parse_network("A b: 1\nTOUT: 1"), Err(TensorError::Parse { line: 1, .. })));
    }

    #[test]
    fn test_order_errors() {
        let base = "A: 1; 2\nB: 2; 1\nTOUT:\n";
        for bad in ["ORDER: (A B", "ORDER: A B)", "ORDER: (A X)", "ORDER:", "ORDER: ()"] {
            let err = parse_network(&format!("{base}{bad}")).unwrap_err();
            assert!(matches!(err, TensorError::Parse { line: 4, .. }), "{bad}: {err}");
        }
    }
}
