//! Set-difference (`Exclude`), set-intersection-filter (`Extract`) and
//! `NonNullable`.
//!
//! The left operand is flattened into its union branches (`boolean`
//! becomes `true | false`), each branch is tested with the comparability
//! check, and the survivors are reassembled into a union.

use super::Reducer;
use crate::error::Result;
use crate::extends::extends;
use crate::node::{self, Kind, Literal, Node, Primitive};

/// Union branches of `node`, with `boolean` split into its two literals.
pub(crate) fn branches(node: &Node) -> Vec<Node> {
    match &node.kind {
        Kind::Union(variants) => variants.iter().flat_map(branches).collect(),
        Kind::Primitive(Primitive::Boolean) => vec![
            node::literal(Literal::Boolean(true)),
            node::literal(Literal::Boolean(false)),
        ],
        Kind::Primitive(Primitive::Never) => Vec::new(),
        _ => vec![node.clone()],
    }
}

fn filter(r: &Reducer<'_>, operands: &[Node], keep_matching: bool) -> Result<Option<Node>> {
    let operands = r.arity(operands, 2)?;
    let (left, right) = (&operands[0], &operands[1]);
    if !right.is_concrete() {
        return Ok(None);
    }
    let candidates = branches(left);
    if candidates.iter().any(|branch| !branch.is_concrete()) {
        return Ok(None);
    }
    Ok(Some(node::union_of(
        candidates
            .into_iter()
            .filter(|branch| extends(branch, right) == keep_matching),
    )))
}

pub fn exclude(r: &Reducer<'_>, operands: &[Node]) -> Result<Option<Node>> {
    filter(r, operands, false)
}

pub fn extract(r: &Reducer<'_>, operands: &[Node]) -> Result<Option<Node>> {
    filter(r, operands, true)
}

pub fn non_nullable(r: &Reducer<'_>, operands: &[Node]) -> Result<Option<Node>> {
    let operands = r.arity(operands, 1)?;
    let subject = &operands[0];
    if subject.is_unresolved() {
        return Ok(None);
    }
    let variants = match &subject.kind {
        Kind::Union(variants) => variants.clone(),
        _ => vec![subject.clone()],
    };
    Ok(Some(node::union_of(variants.into_iter().filter(|variant| {
        !matches!(
            variant.kind,
            Kind::Primitive(Primitive::Null | Primitive::Undefined)
        )
    }))))
}
