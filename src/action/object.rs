//! Object-shaped operators: key selection and exclusion, modifier toggles,
//! key domain, indexed access, intersection evaluation and interface
//! composition.
//!
//! Object operators distribute over union subjects, pass `any` and `never`
//! through, and apply to a cyclic bundle through its root projection.

use super::Reducer;
use crate::error::Result;
use crate::node::{
    self, number, pattern, Kind, Literal, Modifiers, Node, Primitive, Properties,
};

/// A node viewed as a property map.
pub(crate) enum Collapse {
    Properties(Properties),
    Unresolved,
    NotObject,
}

/// Flatten an object, or an intersection of objects, into one property map.
/// A key present in several parts keeps the intersection of its types.
pub(crate) fn collapse(node: &Node) -> Collapse {
    match &node.kind {
        Kind::Object(props) => Collapse::Properties(props.clone()),
        Kind::Intersect(parts) => {
            let mut merged = Properties::new();
            for part in parts {
                match collapse(part) {
                    Collapse::Properties(props) => {
                        for (name, prop) in props {
                            match merged.get_mut(&name) {
                                Some(existing) => {
                                    let previous = std::mem::replace(existing, node::never());
                                    *existing = intersect_property(previous, prop);
                                }
                                None => {
                                    merged.insert(name, prop);
                                }
                            }
                        }
                    }
                    other => return other,
                }
            }
            Collapse::Properties(merged)
        }
        _ if node.is_unresolved() => Collapse::Unresolved,
        _ => Collapse::NotObject,
    }
}

fn intersect_property(left: Node, right: Node) -> Node {
    if left == right {
        return left;
    }
    let modifiers = Modifiers {
        optional: left.modifiers.optional && right.modifiers.optional,
        readonly: left.modifiers.readonly || right.modifiers.readonly,
    };
    node::intersect(vec![
        left.with_modifiers(Modifiers::default()),
        right.with_modifiers(Modifiers::default()),
    ])
    .with_modifiers(modifiers)
}

/// Apply `f` to `branches` one by one and union the results. Any
/// unresolved branch makes the whole result unresolved.
pub(crate) fn distribute<F>(branches: &[Node], mut f: F) -> Result<Option<Node>>
where
    F: FnMut(&Node) -> Result<Option<Node>>,
{
    let mut out = Vec::with_capacity(branches.len());
    for branch in branches {
        match f(branch)? {
            Some(result) => out.push(result),
            None => return Ok(None),
        }
    }
    Ok(Some(node::union_of(out)))
}

/// Rewrite the property map of an object-like subject.
fn map_object<F>(r: &Reducer<'_>, subject: &Node, f: &F) -> Result<Option<Node>>
where
    F: Fn(Properties) -> Properties,
{
    let subject = r.subject(subject)?;
    match &subject.kind {
        Kind::Primitive(Primitive::Any | Primitive::Never) => Ok(Some(subject.clone())),
        Kind::Union(variants) => distribute(variants, |variant| map_object(r, variant, f)),
        Kind::Cyclic { definitions, root } => {
            r.on_cyclic(definitions, root, |projection| map_object(r, projection, f))
        }
        _ => match collapse(&subject) {
            Collapse::Properties(props) => Ok(Some(node::object(f(props)))),
            Collapse::Unresolved => Ok(None),
            Collapse::NotObject => Err(r.mismatch("an object type", &subject)),
        },
    }
}

/// Concrete property names denoted by a key operand.
pub(crate) fn literal_keys(r: &Reducer<'_>, keys: &Node) -> Result<Option<Vec<String>>> {
    match &keys.kind {
        Kind::Literal(l) => Ok(Some(vec![l.to_key()])),
        Kind::Primitive(Primitive::Never) => Ok(Some(Vec::new())),
        Kind::Union(variants) => {
            let mut out = Vec::new();
            for variant in variants {
                match literal_keys(r, variant)? {
                    Some(names) => out.extend(names),
                    None => return Ok(None),
                }
            }
            Ok(Some(out))
        }
        Kind::TemplatePattern(fragments) => {
            match pattern::expand(fragments, r.engine.limits().max_template_combinations) {
                pattern::Expansion::Finite(names) => Ok(Some(names)),
                pattern::Expansion::Unresolved => Ok(None),
                pattern::Expansion::Unbounded => Err(r.mismatch("a finite set of keys", keys)),
            }
        }
        _ if keys.is_unresolved() => Ok(None),
        _ => Err(r.mismatch("literal keys", keys)),
    }
}

pub fn pick(r: &Reducer<'_>, operands: &[Node]) -> Result<Option<Node>> {
    let operands = r.arity(operands, 2)?;
    let Some(keys) = literal_keys(r, &operands[1])? else {
        return Ok(None);
    };
    map_object(r, &operands[0], &|props: Properties| {
        props.into_iter().filter(|(name, _)| keys.contains(name)).collect()
    })
}

pub fn omit(r: &Reducer<'_>, operands: &[Node]) -> Result<Option<Node>> {
    let operands = r.arity(operands, 2)?;
    let Some(keys) = literal_keys(r, &operands[1])? else {
        return Ok(None);
    };
    map_object(r, &operands[0], &|props: Properties| {
        props.into_iter().filter(|(name, _)| !keys.contains(name)).collect()
    })
}

fn set_modifiers(r: &Reducer<'_>, operands: &[Node], set: fn(&mut Modifiers)) -> Result<Option<Node>> {
    let operands = r.arity(operands, 1)?;
    map_object(r, &operands[0], &|props: Properties| {
        props
            .into_iter()
            .map(|(name, mut prop)| {
                set(&mut prop.modifiers);
                (name, prop)
            })
            .collect()
    })
}

pub fn partial(r: &Reducer<'_>, operands: &[Node]) -> Result<Option<Node>> {
    set_modifiers(r, operands, |m| m.optional = true)
}

pub fn required(r: &Reducer<'_>, operands: &[Node]) -> Result<Option<Node>> {
    set_modifiers(r, operands, |m| m.optional = false)
}

pub fn readonly(r: &Reducer<'_>, operands: &[Node]) -> Result<Option<Node>> {
    set_modifiers(r, operands, |m| m.readonly = true)
}

pub fn writable(r: &Reducer<'_>, operands: &[Node]) -> Result<Option<Node>> {
    set_modifiers(r, operands, |m| m.readonly = false)
}

pub fn key_of(r: &Reducer<'_>, operands: &[Node]) -> Result<Option<Node>> {
    let operands = r.arity(operands, 1)?;
    key_domain(r, &operands[0])
}

fn key_domain(r: &Reducer<'_>, subject: &Node) -> Result<Option<Node>> {
    let subject = r.subject(subject)?;
    match &subject.kind {
        Kind::Primitive(Primitive::Any | Primitive::Never) => Ok(Some(node::union(vec![
            node::string(),
            node::number(),
            node::symbol(),
        ]))),
        Kind::Union(variants) => {
            let mut domains: Vec<Vec<Node>> = Vec::with_capacity(variants.len());
            for variant in variants {
                match key_domain(r, variant)? {
                    Some(domain) => domains.push(flatten(domain)),
                    None => return Ok(None),
                }
            }
            let Some((first, rest)) = domains.split_first() else {
                return Ok(Some(node::never()));
            };
            let common = first
                .iter()
                .filter(|key| rest.iter().all(|other| other.contains(key)))
                .cloned();
            Ok(Some(node::union_of(common)))
        }
        Kind::Cyclic { definitions, root } => {
            r.on_cyclic(definitions, root, |projection| key_domain(r, projection))
        }
        Kind::Dictionary { key, .. } => Ok(Some(key.as_ref().clone())),
        Kind::Array(_) => Ok(Some(number())),
        Kind::Tuple { rest: true, .. } => Ok(Some(number())),
        Kind::Tuple { items, rest: false } => Ok(Some(node::union_of(
            (0..items.len()).map(|i| node::literal(i as i64)),
        ))),
        _ => match collapse(&subject) {
            Collapse::Properties(props) => Ok(Some(node::union_of(
                props.keys().map(|name| node::literal(name.as_str())),
            ))),
            Collapse::Unresolved => Ok(None),
            Collapse::NotObject => Ok(Some(node::never())),
        },
    }
}

fn flatten(node: Node) -> Vec<Node> {
    match node.kind {
        Kind::Union(variants) => variants.into_iter().flat_map(flatten).collect(),
        Kind::Primitive(Primitive::Never) => Vec::new(),
        _ => vec![node],
    }
}

pub fn index(r: &Reducer<'_>, operands: &[Node]) -> Result<Option<Node>> {
    let operands = r.arity(operands, 2)?;
    index_access(r, &operands[0], &operands[1])
}

fn index_access(r: &Reducer<'_>, subject: &Node, key: &Node) -> Result<Option<Node>> {
    if key.is_unresolved() {
        return Ok(None);
    }
    if let Kind::Union(keys) = &key.kind {
        return distribute(keys, |key| index_access(r, subject, key));
    }
    let subject = r.subject(subject)?;
    match &subject.kind {
        Kind::Primitive(Primitive::Any) => Ok(Some(node::any())),
        Kind::Primitive(Primitive::Never) => Ok(Some(node::never())),
        Kind::Union(variants) => distribute(variants, |variant| index_access(r, variant, key)),
        Kind::Cyclic { definitions, root } => {
            r.on_cyclic(definitions, root, |projection| index_access(r, projection, key))
        }
        Kind::Dictionary { value, .. } => Ok(Some(value.as_ref().clone())),
        Kind::Array(item) if is_numeric_key(key) => Ok(Some(item.as_ref().clone())),
        Kind::Tuple { items, rest } => match &key.kind {
            Kind::Literal(Literal::Number(n)) if n.fract() == 0.0 && *n >= 0.0 => {
                tuple_element(items, *rest, *n as usize)
                    .map(Some)
                    .ok_or_else(|| r.mismatch("an index within the tuple", key))
            }
            _ if is_numeric_key(key) => Ok(Some(node::union_of(
                items.iter().enumerate().map(|(i, item)| element(item, *rest && i + 1 == items.len())),
            ))),
            _ => Err(r.mismatch("a numeric index", key)),
        },
        _ => match collapse(&subject) {
            Collapse::Properties(props) => {
                let Some(names) = literal_keys(r, key)? else {
                    return Ok(None);
                };
                let mut out = Vec::with_capacity(names.len());
                for name in &names {
                    let prop = props
                        .get(name)
                        .ok_or_else(|| r.mismatch("a key of the subject", key))?;
                    out.push(prop.clone().with_modifiers(Modifiers::default()));
                }
                Ok(Some(node::union_of(out)))
            }
            Collapse::Unresolved => Ok(None),
            Collapse::NotObject => Err(r.mismatch("an indexable type", &subject)),
        },
    }
}

fn is_numeric_key(key: &Node) -> bool {
    matches!(
        key.kind,
        Kind::Primitive(Primitive::Number | Primitive::Integer) | Kind::Literal(Literal::Number(_))
    )
}

/// Element type of a tuple item; a rest item contributes its array element.
fn element(item: &Node, is_rest: bool) -> Node {
    match (&item.kind, is_rest) {
        (Kind::Array(inner), true) => inner.as_ref().clone(),
        _ => item.clone().with_modifiers(Modifiers::default()),
    }
}

fn tuple_element(items: &[Node], rest: bool, index: usize) -> Option<Node> {
    if rest && index + 1 >= items.len() {
        return items.last().map(|last| element(last, true));
    }
    items.get(index).map(|item| element(item, false))
}

pub fn evaluate(r: &Reducer<'_>, operands: &[Node]) -> Result<Option<Node>> {
    let operands = r.arity(operands, 1)?;
    evaluate_node(r, &operands[0])
}

fn evaluate_node(r: &Reducer<'_>, subject: &Node) -> Result<Option<Node>> {
    let subject = r.subject(subject)?;
    match &subject.kind {
        Kind::Union(variants) => distribute(variants, |variant| evaluate_node(r, variant)),
        Kind::Cyclic { definitions, root } => {
            r.on_cyclic(definitions, root, |projection| evaluate_node(r, projection))
        }
        Kind::Intersect(_) => match collapse(&subject) {
            Collapse::Properties(props) => Ok(Some(node::object(props))),
            Collapse::Unresolved => Ok(None),
            // Non-object intersections (e.g. branded primitives) stay as written
            Collapse::NotObject => Ok(Some(subject.clone())),
        },
        _ if subject.is_unresolved() => Ok(None),
        _ => Ok(Some(subject.clone())),
    }
}

pub fn interface(r: &Reducer<'_>, operands: &[Node]) -> Result<Option<Node>> {
    let operands = r.arity_range(operands, 1, usize::MAX)?;
    let mut merged = Properties::new();
    for operand in operands {
        let operand = r.subject(operand)?;
        let props = match &operand.kind {
            Kind::Cyclic { definitions, root } => match definitions.get(root).map(collapse) {
                Some(Collapse::Properties(props)) => props,
                _ => return Err(r.mismatch("an object type", &operand)),
            },
            _ => match collapse(&operand) {
                Collapse::Properties(props) => props,
                Collapse::Unresolved => return Ok(None),
                Collapse::NotObject => return Err(r.mismatch("an object type", &operand)),
            },
        };
        for (name, prop) in props {
            merged.insert(name, prop);
        }
    }
    Ok(Some(node::object(merged)))
}

#[cfg(test)]
mod tests {
    use crate::engine::instantiate;
    use crate::error::EngineError;
    use crate::node::*;

    fn sample() -> Node {
        object([
            ("a", number()),
            ("b", string().optional()),
            ("c", boolean().readonly()),
        ])
    }

    #[test]
    fn test_pick_and_omit() {
        let ctx = Context::new();
        assert_eq!(
            instantiate(&ctx, &pick(sample(), keys(["a", "c"]))).unwrap(),
            object([("a", number()), ("c", boolean().readonly())])
        );
        assert_eq!(
            instantiate(&ctx, &omit(sample(), keys(["a", "c"]))).unwrap(),
            object([("b", string().optional())])
        );
    }

    #[test]
    fn test_pick_on_non_object_is_a_mismatch() {
        let err = instantiate(&Context::new(), &pick(number(), keys(["a"]))).unwrap_err();
        assert!(matches!(
            err,
            EngineError::StructuralMismatch { operator: Operator::Pick, .. }
        ));
    }

    #[test]
    fn test_modifier_toggles() {
        let ctx = Context::new();
        assert_eq!(
            instantiate(&ctx, &partial(sample())).unwrap(),
            object([
                ("a", number().optional()),
                ("b", string().optional()),
                ("c", boolean().readonly().optional()),
            ])
        );
        assert_eq!(
            instantiate(&ctx, &required(sample())).unwrap(),
            object([("a", number()), ("b", string()), ("c", boolean().readonly())])
        );
        assert_eq!(
            instantiate(&ctx, &writable(readonly_type(sample()))).unwrap(),
            object([("a", number()), ("b", string().optional()), ("c", boolean())])
        );
    }

    #[test]
    fn test_partial_distributes_over_union() {
        let subject = union(vec![object([("a", number())]), object([("b", string())])]);
        assert_eq!(
            instantiate(&Context::new(), &partial(subject)).unwrap(),
            union(vec![
                object([("a", number().optional())]),
                object([("b", string().optional())]),
            ])
        );
    }

    #[test]
    fn test_key_of() {
        let ctx = Context::new();
        assert_eq!(
            instantiate(&ctx, &key_of(sample())).unwrap(),
            keys(["a", "b", "c"])
        );
        let common = union(vec![
            object([("id", number()), ("a", number())]),
            object([("id", string()), ("b", number())]),
        ]);
        assert_eq!(instantiate(&ctx, &key_of(common)).unwrap(), literal("id"));
        assert_eq!(
            instantiate(&ctx, &key_of(tuple(vec![string(), number()]))).unwrap(),
            union(vec![literal(0i64), literal(1i64)])
        );
    }

    #[test]
    fn test_index() {
        let ctx = Context::new();
        assert_eq!(
            instantiate(&ctx, &index(sample(), literal("b"))).unwrap(),
            string()
        );
        assert_eq!(
            instantiate(&ctx, &index(sample(), keys(["a", "b"]))).unwrap(),
            union(vec![number(), string()])
        );
        assert_eq!(
            instantiate(&ctx, &index(array(boolean()), number())).unwrap(),
            boolean()
        );
        assert_eq!(
            instantiate(&ctx, &index(rest_tuple(vec![string()], number()), literal(3i64))).unwrap(),
            number()
        );
        assert!(instantiate(&ctx, &index(sample(), literal("zzz"))).is_err());
    }

    #[test]
    fn test_evaluate_merges_intersection() {
        let subject = intersect(vec![
            object([("a", number())]),
            object([("b", string()), ("a", number())]),
        ]);
        assert_eq!(
            instantiate(&Context::new(), &evaluate(subject)).unwrap(),
            object([("a", number()), ("b", string())])
        );
    }

    #[test]
    fn test_interface_own_properties_win() {
        let ctx: Context = [("Base", object([("id", string()), ("kind", string())]))]
            .into_iter()
            .collect();
        let node = interface(
            vec![reference("Base")],
            object([("kind", literal("user")), ("name", string())]),
        );
        assert_eq!(
            instantiate(&ctx, &node).unwrap(),
            object([("id", string()), ("kind", literal("user")), ("name", string())])
        );
    }

    #[test]
    fn test_operator_on_cyclic_subject_rebundles() {
        let ctx: Context = [(
            "List",
            object([("value", number()), ("next", reference("List").optional())]),
        )]
        .into_iter()
        .collect();
        let out = instantiate(&ctx, &partial(reference("List"))).unwrap();
        let Kind::Cyclic { definitions, root } = &out.kind else {
            panic!("Expected cyclic bundle, got {}", out);
        };
        assert_eq!(root, "Partial<List>");
        assert_eq!(
            definitions.get(root),
            Some(&object([
                ("value", number().optional()),
                ("next", reference("List").optional()),
            ]))
        );
        assert!(definitions.contains("List"));

        // Results without references to the bundle are returned bare
        let keys_out = instantiate(&ctx, &key_of(reference("List"))).unwrap();
        assert_eq!(keys_out, keys(["value", "next"]));
    }
}
