//! Template Pattern Helpers
//!
//! Expands template fragments into the finite set of strings they denote,
//! and renders unbounded patterns as anchored regular expressions.

use super::{Kind, Node, Primitive};

/// Outcome of expanding a sequence of template fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansion {
    /// Every concrete string, in cross-product order
    Finite(Vec<String>),
    /// At least one fragment admits infinitely many values (or the product
    /// exceeded the combination limit)
    Unbounded,
    /// A fragment is not yet resolved
    Unresolved,
}

/// Expand `fragments` into their cross product of concrete strings.
pub fn expand(fragments: &[Node], max_combinations: usize) -> Expansion {
    let mut combinations = vec![String::new()];
    let mut unbounded = false;
    for fragment in fragments {
        match fragment_values(fragment, max_combinations) {
            Expansion::Unresolved => return Expansion::Unresolved,
            Expansion::Unbounded => unbounded = true,
            Expansion::Finite(values) => {
                if unbounded {
                    continue;
                }
                if combinations.len().saturating_mul(values.len()) > max_combinations {
                    unbounded = true;
                    continue;
                }
                combinations = combinations
                    .iter()
                    .flat_map(|prefix| values.iter().map(move |v| format!("{}{}", prefix, v)))
                    .collect();
            }
        }
    }
    if unbounded {
        Expansion::Unbounded
    } else {
        Expansion::Finite(combinations)
    }
}

fn fragment_values(fragment: &Node, max_combinations: usize) -> Expansion {
    match &fragment.kind {
        Kind::Literal(l) => Expansion::Finite(vec![l.to_key()]),
        Kind::Primitive(Primitive::Boolean) => {
            Expansion::Finite(vec!["true".to_string(), "false".to_string()])
        }
        Kind::Primitive(Primitive::Never) => Expansion::Finite(Vec::new()),
        Kind::Primitive(Primitive::Null) => Expansion::Finite(vec!["null".to_string()]),
        Kind::Primitive(Primitive::Undefined) => Expansion::Finite(vec!["undefined".to_string()]),
        Kind::Union(variants) => {
            let mut values = Vec::new();
            let mut unbounded = false;
            for variant in variants {
                match fragment_values(variant, max_combinations) {
                    Expansion::Unresolved => return Expansion::Unresolved,
                    Expansion::Unbounded => unbounded = true,
                    Expansion::Finite(v) => {
                        for value in v {
                            if !values.contains(&value) {
                                values.push(value);
                            }
                        }
                    }
                }
            }
            if unbounded {
                Expansion::Unbounded
            } else {
                Expansion::Finite(values)
            }
        }
        Kind::TemplatePattern(inner) => expand(inner, max_combinations),
        Kind::Ref(_) | Kind::Call { .. } | Kind::Deferred(_) | Kind::Parameter(_) => {
            Expansion::Unresolved
        }
        _ => Expansion::Unbounded,
    }
}

/// Anchored regular expression matching every string of the pattern.
pub fn regex_source(fragments: &[Node]) -> String {
    format!("^{}$", fragments_source(fragments))
}

fn fragments_source(fragments: &[Node]) -> String {
    fragments.iter().map(fragment_source).collect()
}

fn fragment_source(fragment: &Node) -> String {
    match &fragment.kind {
        Kind::Literal(l) => regex::escape(&l.to_key()),
        Kind::Primitive(Primitive::Number) => r"-?(?:\d+|\d*\.\d+)".to_string(),
        Kind::Primitive(Primitive::Integer) | Kind::Primitive(Primitive::BigInt) => r"-?\d+".to_string(),
        Kind::Primitive(Primitive::Boolean) => "(?:true|false)".to_string(),
        Kind::Primitive(Primitive::Null) => "null".to_string(),
        Kind::Primitive(Primitive::Undefined) => "undefined".to_string(),
        Kind::Primitive(Primitive::Never) => r"\b\B".to_string(),
        Kind::Union(variants) => {
            let alternatives: Vec<String> = variants.iter().map(fragment_source).collect();
            format!("(?:{})", alternatives.join("|"))
        }
        Kind::TemplatePattern(inner) => fragments_source(inner),
        _ => ".*".to_string(),
    }
}
