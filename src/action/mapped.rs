//! Mapped-type generation and `Record`.
//!
//! Both enumerate the concrete keys of a key operand. A finite key set
//! builds an object; an unbounded one (e.g. `string`, `` `id-${number}` ``)
//! builds a dictionary keyed by that operand.

use super::{Reduced, Reducer};
use crate::error::Result;
use crate::node::{self, pattern, Kind, Node, Primitive, Properties};

/// Concrete keys of a key operand.
enum KeySpace {
    Finite(Vec<Node>),
    Unbounded,
    Unresolved,
}

fn key_space(r: &Reducer<'_>, keys: &Node) -> KeySpace {
    let mut out = Vec::new();
    match collect_keys(r, keys, &mut out) {
        Some(true) => KeySpace::Finite(out),
        Some(false) => KeySpace::Unbounded,
        None => KeySpace::Unresolved,
    }
}

/// Push each concrete key of `keys` onto `out`. Returns `Some(false)` when
/// the key set is unbounded, `None` when some part is unresolved.
fn collect_keys(r: &Reducer<'_>, keys: &Node, out: &mut Vec<Node>) -> Option<bool> {
    match &keys.kind {
        Kind::Literal(l) => {
            let key = node::literal(l.clone());
            if !out.contains(&key) {
                out.push(key);
            }
            Some(true)
        }
        Kind::Primitive(Primitive::Never) => Some(true),
        Kind::Union(variants) => {
            let mut finite = true;
            for variant in variants {
                finite &= collect_keys(r, variant, out)?;
            }
            Some(finite)
        }
        Kind::TemplatePattern(fragments) => {
            match pattern::expand(fragments, r.engine.limits().max_template_combinations) {
                pattern::Expansion::Finite(values) => {
                    for value in values {
                        let key = node::literal(value);
                        if !out.contains(&key) {
                            out.push(key);
                        }
                    }
                    Some(true)
                }
                pattern::Expansion::Unbounded => Some(false),
                pattern::Expansion::Unresolved => None,
            }
        }
        _ if keys.is_unresolved() => None,
        _ => Some(false),
    }
}

/// Operands: `[Parameter(binder, key source), body, remap?]`.
pub fn reduce_mapped(r: &Reducer<'_>, operands: &[Node]) -> Result<Reduced> {
    let operands = r.arity_range(operands, 2, 3)?;
    let Kind::Parameter(binder) = &operands[0].kind else {
        return Err(r.mismatch("a key parameter", &operands[0]));
    };
    let body = &operands[1];
    let remap = operands.get(2);

    let source = r.instantiate(&binder.constraint)?;
    let keys = match key_space(r, &source) {
        KeySpace::Finite(keys) => keys,
        KeySpace::Unbounded => {
            let scope = r.context.with(binder.name.clone(), source.clone());
            let value = r.instantiate_in(&scope, body)?;
            return Ok(Reduced::Done(node::dictionary(source, value)));
        }
        KeySpace::Unresolved => {
            let mut binder = binder.clone();
            binder.constraint = Box::new(source);
            let mut deferred = vec![node::parameter_node(binder)];
            deferred.extend(operands[1..].iter().cloned());
            return Ok(Reduced::Deferred(deferred));
        }
    };

    let mut props = Properties::new();
    for key in keys {
        let scope = r.context.with(binder.name.clone(), key.clone());
        let name = match remap {
            Some(remap) => {
                let remapped = r.instantiate_in(&scope, remap)?;
                match &remapped.kind {
                    Kind::Primitive(Primitive::Never) => continue,
                    Kind::Literal(l) => l.to_key(),
                    _ => return Err(r.mismatch("a literal key or never", &remapped)),
                }
            }
            None => match &key.kind {
                Kind::Literal(l) => l.to_key(),
                _ => return Err(r.mismatch("a literal key", &key)),
            },
        };
        let value = r.instantiate_in(&scope, body)?;
        props.insert(name, value);
    }
    Ok(Reduced::Done(node::object(props)))
}

pub fn record(r: &Reducer<'_>, operands: &[Node]) -> Result<Option<Node>> {
    let operands = r.arity(operands, 2)?;
    let (key, value) = (&operands[0], &operands[1]);
    match key_space(r, key) {
        KeySpace::Finite(keys) => Ok(Some(node::object(keys.iter().filter_map(|key| {
            key.as_literal().map(|l| (l.to_key(), value.clone()))
        })))),
        KeySpace::Unbounded => Ok(Some(node::dictionary(key.clone(), value.clone()))),
        KeySpace::Unresolved => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::instantiate;
    use crate::node::*;

    #[test]
    fn test_mapped_identity_over_key_of() {
        let subject = object([("x", number()), ("y", string())]);
        let node = mapped(
            parameter_extends("K", key_of(subject)),
            reference("K"),
            None,
        );
        assert_eq!(
            instantiate(&Context::new(), &node).unwrap(),
            object([("x", literal("x")), ("y", literal("y"))])
        );
    }

    #[test]
    fn test_mapped_body_sees_outer_context() {
        let ctx: Context = [("Source", object([("a", number()), ("b", string())]))]
            .into_iter()
            .collect();
        // { [K in keyof Source]: Source[K][] }
        let node = mapped(
            parameter_extends("K", key_of(reference("Source"))),
            array(index(reference("Source"), reference("K"))),
            None,
        );
        assert_eq!(
            instantiate(&ctx, &node).unwrap(),
            object([("a", array(number())), ("b", array(string()))])
        );
    }

    #[test]
    fn test_mapped_remap_and_filter() {
        // { [K in "a" | "b" as K extends "a" ? never : `get${Capitalize<K>}`]: K }
        let remap = conditional(
            reference("K"),
            literal("a"),
            never(),
            template_literal(vec![literal("get"), capitalize(reference("K"))]),
        );
        let node = mapped(
            parameter_extends("K", keys(["a", "b"])),
            reference("K"),
            Some(remap),
        );
        assert_eq!(
            instantiate(&Context::new(), &node).unwrap(),
            object([("getB", literal("b"))])
        );
    }

    #[test]
    fn test_mapped_over_unbounded_keys() {
        let node = mapped(parameter_extends("K", string()), number(), None);
        assert_eq!(
            instantiate(&Context::new(), &node).unwrap(),
            dictionary(string(), number())
        );
    }

    #[test]
    fn test_record() {
        let ctx = Context::new();
        assert_eq!(
            instantiate(&ctx, &record(keys(["a", "b"]), boolean())).unwrap(),
            object([("a", boolean()), ("b", boolean())])
        );
        assert_eq!(
            instantiate(&ctx, &record(string(), number())).unwrap(),
            dictionary(string(), number())
        );
    }
}
