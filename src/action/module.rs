//! Inline modules: an object of definitions instantiated together, each
//! able to reference its siblings and the enclosing context.

use super::{Reduced, Reducer};
use crate::error::Result;
use crate::node::{self, Context, Kind, Node};

pub fn reduce(r: &Reducer<'_>, operands: &[Node]) -> Result<Reduced> {
    let operands = r.arity(operands, 1)?;
    let Kind::Object(definitions) = &operands[0].kind else {
        return Err(r.mismatch("an object of definitions", &operands[0]));
    };
    let local: Context = definitions
        .iter()
        .map(|(name, node)| (name.clone(), node.clone()))
        .collect();
    let scope = r.context.extend(&local);
    let names: Vec<&str> = local.names().collect();
    let assembled = r.engine.assemble(&scope, &names)?;
    Ok(Reduced::Done(node::object(assembled)))
}
