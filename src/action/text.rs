//! String operators: case transforms and template-literal expansion.

use super::object::distribute;
use super::Reducer;
use crate::error::Result;
use crate::node::{self, pattern, Kind, Literal, Node, Operator, Primitive};

fn transform(operator: Operator, text: &str) -> String {
    match operator {
        Operator::Uppercase => text.to_uppercase(),
        Operator::Lowercase => text.to_lowercase(),
        Operator::Capitalize | Operator::Uncapitalize => {
            let mut chars = text.chars();
            match chars.next() {
                Some(first) if operator == Operator::Capitalize => {
                    first.to_uppercase().chain(chars).collect()
                }
                Some(first) => first.to_lowercase().chain(chars).collect(),
                None => String::new(),
            }
        }
        _ => text.to_string(),
    }
}

pub fn case(r: &Reducer<'_>, operands: &[Node]) -> Result<Option<Node>> {
    let operands = r.arity(operands, 1)?;
    apply_case(r, &operands[0])
}

fn apply_case(r: &Reducer<'_>, subject: &Node) -> Result<Option<Node>> {
    match &subject.kind {
        Kind::Literal(Literal::String(text)) => Ok(Some(node::literal(transform(r.operator, text)))),
        Kind::Union(variants) => distribute(variants, |variant| apply_case(r, variant)),
        Kind::Primitive(Primitive::String | Primitive::Any | Primitive::Never) => Ok(Some(subject.clone())),
        Kind::TemplatePattern(fragments) => {
            let whole_pattern = matches!(r.operator, Operator::Uppercase | Operator::Lowercase);
            let fragments = fragments
                .iter()
                .enumerate()
                .map(|(i, fragment)| {
                    if whole_pattern || i == 0 {
                        case_span(r.operator, fragment)
                    } else {
                        fragment.clone()
                    }
                })
                .collect();
            Ok(Some(node::template_pattern(fragments)))
        }
        _ if subject.is_unresolved() => Ok(None),
        _ => Err(r.mismatch("a string type", subject)),
    }
}

/// Transform the literal text of a template fragment, including each
/// literal of a union fragment. Primitive spans stay as they are.
fn case_span(operator: Operator, fragment: &Node) -> Node {
    match &fragment.kind {
        Kind::Literal(Literal::String(text)) => {
            fragment.rebuild(Kind::Literal(Literal::String(transform(operator, text))))
        }
        Kind::Union(variants) => fragment.rebuild(Kind::Union(
            variants.iter().map(|variant| case_span(operator, variant)).collect(),
        )),
        _ => fragment.clone(),
    }
}

/// Expand the fragments into a union of string literals when finite, or
/// an opaque template pattern when some fragment is unbounded.
pub fn template_literal(r: &Reducer<'_>, operands: &[Node]) -> Result<Option<Node>> {
    match pattern::expand(operands, r.engine.limits().max_template_combinations) {
        pattern::Expansion::Finite(values) => {
            Ok(Some(node::union_of(values.into_iter().map(node::literal))))
        }
        pattern::Expansion::Unbounded => Ok(Some(node::template_pattern(operands.to_vec()))),
        pattern::Expansion::Unresolved => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::{Instantiator, Limits};
    use crate::node::*;

    fn run(node: &Node) -> Node {
        Instantiator::default().instantiate(&Context::new(), node).unwrap()
    }

    #[test]
    fn test_case_transforms() {
        assert_eq!(run(&uppercase(literal("hello"))), literal("HELLO"));
        assert_eq!(run(&lowercase(literal("HeLLo"))), literal("hello"));
        assert_eq!(run(&capitalize(literal("hello"))), literal("Hello"));
        assert_eq!(run(&uncapitalize(literal("Hello"))), literal("hello"));
        assert_eq!(
            run(&capitalize(keys(["get", "set"]))),
            keys(["Get", "Set"])
        );
    }

    #[test]
    fn test_case_reaches_union_spans_of_patterns() {
        let pattern = template_pattern(vec![keys(["a", "b"]), literal("-"), number()]);
        assert_eq!(
            run(&capitalize(pattern.clone())),
            template_pattern(vec![keys(["A", "B"]), literal("-"), number()])
        );
        let pattern = template_pattern(vec![literal("id-"), number(), keys(["x", "y"])]);
        assert_eq!(
            run(&uppercase(pattern)),
            template_pattern(vec![literal("ID-"), number(), keys(["X", "Y"])])
        );
    }

    #[test]
    fn test_template_cross_product() {
        let node = template_literal(vec![
            literal("key"),
            keys(["A", "B"]),
            keys(["X", "Y"]),
        ]);
        assert_eq!(run(&node), keys(["keyAX", "keyAY", "keyBX", "keyBY"]));
    }

    #[test]
    fn test_template_single_value_is_a_literal() {
        assert_eq!(
            run(&template_literal(vec![literal("on"), capitalize(literal("click"))])),
            literal("onClick")
        );
    }

    #[test]
    fn test_template_unbounded_degrades_to_pattern() {
        let node = template_literal(vec![literal("id-"), number()]);
        assert_eq!(run(&node), template_pattern(vec![literal("id-"), number()]));
    }

    #[test]
    fn test_template_limit_degrades_to_pattern() {
        let ab = keys(["a", "b"]);
        let node = template_literal(vec![ab.clone(), ab.clone(), ab.clone()]);
        let engine = Instantiator::new(Limits {
            max_template_combinations: 4,
            ..Limits::default()
        });
        let out = engine.instantiate(&Context::new(), &node).unwrap();
        assert_eq!(out, template_pattern(vec![ab.clone(), ab.clone(), ab]));
    }

    #[test]
    fn test_template_with_unbound_parameter_is_deferred() {
        let ctx: Context = [("T", string())].into_iter().collect();
        let node = template_literal(vec![literal("x"), reference("Missing")]);
        let out = Instantiator::default().instantiate(&ctx, &node).unwrap();
        assert_eq!(out, node);
    }
}
