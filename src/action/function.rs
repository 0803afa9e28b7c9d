//! Signature operators (`ReturnType`, `Parameters`,
//! `ConstructorParameters`, `InstanceType`) and promise unwrapping
//! (`Awaited`).

use super::object::distribute;
use super::Reducer;
use crate::error::Result;
use crate::node::{self, Kind, Node, Primitive, WrapperKind};

/// Which part of a signature an operator extracts.
#[derive(Clone, Copy)]
enum Part {
    FunctionResult,
    FunctionParameters,
    ConstructorInstance,
    ConstructorParameters,
}

fn signature_part(r: &Reducer<'_>, subject: &Node, part: Part) -> Result<Option<Node>> {
    match (&subject.kind, part) {
        (Kind::Primitive(Primitive::Any), _) => Ok(Some(node::any())),
        (Kind::Primitive(Primitive::Never), _) => Ok(Some(node::never())),
        (Kind::Union(variants), _) => distribute(variants, |variant| signature_part(r, variant, part)),
        (Kind::Function { returns, .. }, Part::FunctionResult) => Ok(Some(returns.as_ref().clone())),
        (Kind::Function { parameters, .. }, Part::FunctionParameters) => {
            Ok(Some(node::tuple(parameters.clone())))
        }
        (Kind::Constructor { instance, .. }, Part::ConstructorInstance) => {
            Ok(Some(instance.as_ref().clone()))
        }
        (Kind::Constructor { parameters, .. }, Part::ConstructorParameters) => {
            Ok(Some(node::tuple(parameters.clone())))
        }
        _ if subject.is_unresolved() => Ok(None),
        (_, Part::FunctionResult | Part::FunctionParameters) => Err(r.mismatch("a function type", subject)),
        (_, Part::ConstructorInstance | Part::ConstructorParameters) => {
            Err(r.mismatch("a constructor type", subject))
        }
    }
}

pub fn return_type(r: &Reducer<'_>, operands: &[Node]) -> Result<Option<Node>> {
    let operands = r.arity(operands, 1)?;
    signature_part(r, &operands[0], Part::FunctionResult)
}

pub fn parameters(r: &Reducer<'_>, operands: &[Node]) -> Result<Option<Node>> {
    let operands = r.arity(operands, 1)?;
    signature_part(r, &operands[0], Part::FunctionParameters)
}

pub fn constructor_parameters(r: &Reducer<'_>, operands: &[Node]) -> Result<Option<Node>> {
    let operands = r.arity(operands, 1)?;
    signature_part(r, &operands[0], Part::ConstructorParameters)
}

pub fn instance_type(r: &Reducer<'_>, operands: &[Node]) -> Result<Option<Node>> {
    let operands = r.arity(operands, 1)?;
    signature_part(r, &operands[0], Part::ConstructorInstance)
}

pub fn awaited(r: &Reducer<'_>, operands: &[Node]) -> Result<Option<Node>> {
    let operands = r.arity(operands, 1)?;
    unwrap_promise(&operands[0])
}

fn unwrap_promise(subject: &Node) -> Result<Option<Node>> {
    match &subject.kind {
        Kind::Wrapper {
            wrapper: WrapperKind::Promise,
            item,
        } => unwrap_promise(item),
        Kind::Union(variants) => distribute(variants, unwrap_promise),
        _ if subject.is_unresolved() => Ok(None),
        _ => Ok(Some(subject.clone())),
    }
}
