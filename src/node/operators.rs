//! Factories for deferred operator applications.
//!
//! Each returns a `Deferred` node; the engine reduces it once its operands
//! are known.

use super::{deferred, literal, object, parameter_node, union_of, Context, Literal, Node, Operator, Parameter};

/// Union of literal keys, e.g. `"a" | "c"`.
pub fn keys<I, K>(keys: I) -> Node
where
    I: IntoIterator<Item = K>,
    K: Into<Literal>,
{
    union_of(keys.into_iter().map(literal))
}

pub fn pick(subject: Node, keys: Node) -> Node {
    deferred(Operator::Pick, vec![subject, keys])
}

pub fn omit(subject: Node, keys: Node) -> Node {
    deferred(Operator::Omit, vec![subject, keys])
}

pub fn partial(subject: Node) -> Node {
    deferred(Operator::Partial, vec![subject])
}

pub fn required(subject: Node) -> Node {
    deferred(Operator::Required, vec![subject])
}

pub fn readonly_type(subject: Node) -> Node {
    deferred(Operator::Readonly, vec![subject])
}

pub fn writable(subject: Node) -> Node {
    deferred(Operator::Writable, vec![subject])
}

pub fn key_of(subject: Node) -> Node {
    deferred(Operator::KeyOf, vec![subject])
}

pub fn index(subject: Node, key: Node) -> Node {
    deferred(Operator::Index, vec![subject, key])
}

pub fn evaluate(subject: Node) -> Node {
    deferred(Operator::Evaluate, vec![subject])
}

pub fn exclude(left: Node, right: Node) -> Node {
    deferred(Operator::Exclude, vec![left, right])
}

pub fn extract(left: Node, right: Node) -> Node {
    deferred(Operator::Extract, vec![left, right])
}

pub fn awaited(subject: Node) -> Node {
    deferred(Operator::Awaited, vec![subject])
}

pub fn capitalize(subject: Node) -> Node {
    deferred(Operator::Capitalize, vec![subject])
}

pub fn uncapitalize(subject: Node) -> Node {
    deferred(Operator::Uncapitalize, vec![subject])
}

pub fn uppercase(subject: Node) -> Node {
    deferred(Operator::Uppercase, vec![subject])
}

pub fn lowercase(subject: Node) -> Node {
    deferred(Operator::Lowercase, vec![subject])
}

pub fn return_type(function: Node) -> Node {
    deferred(Operator::ReturnType, vec![function])
}

pub fn parameters(function: Node) -> Node {
    deferred(Operator::Parameters, vec![function])
}

pub fn constructor_parameters(constructor: Node) -> Node {
    deferred(Operator::ConstructorParameters, vec![constructor])
}

pub fn instance_type(constructor: Node) -> Node {
    deferred(Operator::InstanceType, vec![constructor])
}

pub fn non_nullable(subject: Node) -> Node {
    deferred(Operator::NonNullable, vec![subject])
}

pub fn record(key: Node, value: Node) -> Node {
    deferred(Operator::Record, vec![key, value])
}

/// `{ [P in constraint as remap]: body }` where `key` is the binder `P`.
pub fn mapped(key: Parameter, body: Node, remap: Option<Node>) -> Node {
    let mut operands = vec![parameter_node(key), body];
    operands.extend(remap);
    deferred(Operator::Mapped, operands)
}

/// `check extends extends_type ? when_true : when_false`
pub fn conditional(check: Node, extends_type: Node, when_true: Node, when_false: Node) -> Node {
    deferred(Operator::Conditional, vec![check, extends_type, when_true, when_false])
}

pub fn template_literal(fragments: Vec<Node>) -> Node {
    deferred(Operator::TemplateLiteral, fragments)
}

/// Interface extending `heritage`, with `own` properties taking precedence.
pub fn interface(heritage: Vec<Node>, own: Node) -> Node {
    let mut operands = heritage;
    operands.push(own);
    deferred(Operator::Interface, operands)
}

/// Inline module whose definitions are instantiated together.
pub fn module(definitions: Context) -> Node {
    deferred(Operator::Module, vec![object(definitions)])
}
