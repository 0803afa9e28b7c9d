//! Conditional branching: `check extends extends_type ? when_true : when_false`.
//!
//! Only the check and extends operands are instantiated before the verdict.
//! The untaken branch is never touched, so it may mention names that are
//! not in scope or operators that would fail on its operands.

use tracing::trace;

use super::{Reduced, Reducer};
use crate::error::Result;
use crate::extends::extends;
use crate::node::Node;

pub fn reduce(r: &Reducer<'_>, operands: &[Node]) -> Result<Reduced> {
    let operands = r.arity(operands, 4)?;
    let check = r.subject(&r.instantiate(&operands[0])?)?;
    let extends_type = r.subject(&r.instantiate(&operands[1])?)?;
    if !check.is_concrete() || !extends_type.is_concrete() {
        return Ok(Reduced::Deferred(vec![
            check,
            extends_type,
            operands[2].clone(),
            operands[3].clone(),
        ]));
    }
    let verdict = extends(&check, &extends_type);
    trace!(check = %check, extends = %extends_type, verdict, "conditional");
    let branch = if verdict { &operands[2] } else { &operands[3] };
    Ok(Reduced::Done(r.instantiate(branch)?))
}
