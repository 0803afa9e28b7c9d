//! Structural Comparability ("extends") Check
//!
//! Decides whether every value described by `left` is also described by
//! `right`. Recursive types are handled coinductively: references are
//! resolved against the definitions of enclosing cyclic bundles, and a
//! reference pair already under comparison is assumed to hold.

use regex::Regex;

use crate::node::{pattern, Context, Kind, Literal, Node, Primitive, Properties};

/// Maximum nesting of the comparison. Exceeding it answers `false`.
const MAX_EXTENDS_DEPTH: usize = 256;

/// True iff `left` is structurally compatible with (assignable to) `right`.
pub fn extends(left: &Node, right: &Node) -> bool {
    Extends::default().check(left, right)
}

#[derive(Default)]
struct Extends<'a> {
    scopes: Vec<&'a Context>,
    assumptions: Vec<(usize, usize)>,
    depth: usize,
}

impl<'a> Extends<'a> {
    fn check(&mut self, left: &'a Node, right: &'a Node) -> bool {
        if self.depth >= MAX_EXTENDS_DEPTH {
            return false;
        }
        self.depth += 1;
        let result = self.relate(left, right);
        self.depth -= 1;
        result
    }

    fn lookup(&self, name: &str) -> Option<&'a Node> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn within(&mut self, definitions: &'a Context, left: &'a Node, right: &'a Node) -> bool {
        self.scopes.push(definitions);
        let result = self.check(left, right);
        self.scopes.pop();
        result
    }

    /// Compare `target_left` with `target_right` under the assumption that
    /// the reference pair (`left`, `right`) holds.
    fn assume(
        &mut self,
        left: &'a Node,
        right: &'a Node,
        target_left: &'a Node,
        target_right: &'a Node,
    ) -> bool {
        let key = (left as *const Node as usize, right as *const Node as usize);
        if self.assumptions.contains(&key) {
            return true;
        }
        self.assumptions.push(key);
        let result = self.check(target_left, target_right);
        self.assumptions.pop();
        result
    }

    fn relate(&mut self, left: &'a Node, right: &'a Node) -> bool {
        if left.kind == right.kind {
            return true;
        }
        if matches!(right.kind, Kind::Primitive(Primitive::Any | Primitive::Unknown)) {
            return true;
        }
        if left.is_never() {
            return true;
        }

        // Cyclic bundles compare through their root projection
        if let Kind::Cyclic { definitions, root } = &right.kind {
            return match definitions.get(root) {
                Some(target) => self.within(definitions, left, target),
                None => false,
            };
        }
        if let Kind::Cyclic { definitions, root } = &left.kind {
            return match definitions.get(root) {
                Some(target) => self.within(definitions, target, right),
                None => false,
            };
        }

        if let Kind::Ref(name) = &left.kind {
            return match self.lookup(name) {
                Some(target) => self.assume(left, right, target, right),
                None => false,
            };
        }
        if let Kind::Ref(name) = &right.kind {
            return match self.lookup(name) {
                Some(target) => self.assume(left, right, left, target),
                None => false,
            };
        }

        if left.is_primitive(Primitive::Any) {
            return true;
        }
        if right.is_never() {
            return false;
        }

        if let Kind::Union(variants) = &left.kind {
            return variants.iter().all(|v| self.check(v, right));
        }
        if let Kind::Union(variants) = &right.kind {
            if left.is_primitive(Primitive::Boolean) && covers_boolean(variants) {
                return true;
            }
            return variants.iter().any(|v| self.check(left, v));
        }
        if let Kind::Intersect(parts) = &right.kind {
            return parts.iter().all(|p| self.check(left, p));
        }
        if let Kind::Intersect(parts) = &left.kind {
            if parts.iter().any(|p| self.check(p, right)) {
                return true;
            }
            if let Kind::Object(right_props) = &right.kind {
                let mut merged = Vec::new();
                if gather_properties(left, &mut merged) {
                    return self.objects(&merged, right_props);
                }
            }
            return false;
        }

        self.structural(left, right)
    }

    fn structural(&mut self, left: &'a Node, right: &'a Node) -> bool {
        match (&left.kind, &right.kind) {
            (Kind::Primitive(l), Kind::Primitive(r)) => primitive_extends(*l, *r),
            (Kind::Literal(l), Kind::Primitive(r)) => literal_extends(l, *r),
            (Kind::Literal(l), Kind::Literal(r)) => l == r,
            (Kind::Literal(Literal::String(s)), Kind::TemplatePattern(fragments)) => {
                pattern_matches(fragments, s)
            }
            (Kind::TemplatePattern(_), Kind::Primitive(Primitive::String)) => true,
            (Kind::Array(l), Kind::Array(r)) => self.check(l, r),
            (Kind::Tuple { items, rest }, Kind::Array(r)) => items.iter().enumerate().all(|(i, item)| {
                match (&item.kind, *rest && i + 1 == items.len()) {
                    (Kind::Array(inner), true) => self.check(inner, r),
                    _ => self.check(item, r),
                }
            }),
            (
                Kind::Tuple { items: l, rest: lr },
                Kind::Tuple { items: r, rest: rr },
            ) => lr == rr && l.len() == r.len() && l.iter().zip(r).all(|(a, b)| self.check(a, b)),
            (Kind::Object(l), Kind::Object(r)) => {
                let merged: Vec<(&'a str, &'a Node)> = l.iter().map(|(k, v)| (k.as_str(), v)).collect();
                self.objects(&merged, r)
            }
            (_, Kind::Object(r)) if r.is_empty() => !matches!(
                left.kind,
                Kind::Primitive(
                    Primitive::Null | Primitive::Undefined | Primitive::Void | Primitive::Unknown
                )
            ),
            (Kind::Object(l), Kind::Dictionary { key, value }) => l
                .iter()
                .all(|(name, prop)| key_admits(key, name) && self.check(prop, value)),
            (
                Kind::Dictionary { key: lk, value: lv },
                Kind::Dictionary { key: rk, value: rv },
            ) => self.check(lk, rk) && self.check(lv, rv),
            (
                Kind::Function { parameters: lp, returns: lr },
                Kind::Function { parameters: rp, returns: rr },
            ) => self.signatures(lp, lr, rp, rr),
            (
                Kind::Constructor { parameters: lp, instance: li },
                Kind::Constructor { parameters: rp, instance: ri },
            ) => self.signatures(lp, li, rp, ri),
            (
                Kind::Wrapper { wrapper: lw, item: li },
                Kind::Wrapper { wrapper: rw, item: ri },
            ) => lw == rw && self.check(li, ri),
            _ => false,
        }
    }

    fn objects(&mut self, left: &[(&'a str, &'a Node)], right: &'a Properties) -> bool {
        right.iter().all(|(name, expected)| {
            let found = left
                .iter()
                .find(|(k, _)| *k == name.as_str())
                .map(|(_, node)| *node);
            match found {
                Some(actual) => {
                    if actual.is_optional() && !expected.is_optional() {
                        return false;
                    }
                    self.check(actual, expected)
                }
                None => expected.is_optional(),
            }
        })
    }

    /// Parameters compare contravariantly, results covariantly.
    fn signatures(
        &mut self,
        left_params: &'a [Node],
        left_result: &'a Node,
        right_params: &'a [Node],
        right_result: &'a Node,
    ) -> bool {
        if left_params.len() > right_params.len() {
            return false;
        }
        left_params
            .iter()
            .zip(right_params)
            .all(|(l, r)| self.check(r, l))
            && self.check(left_result, right_result)
    }
}

fn primitive_extends(left: Primitive, right: Primitive) -> bool {
    left == right
        || matches!(
            (left, right),
            (Primitive::Integer, Primitive::Number) | (Primitive::Undefined, Primitive::Void)
        )
}

fn literal_extends(literal: &Literal, primitive: Primitive) -> bool {
    match (literal, primitive) {
        (Literal::String(_), Primitive::String) => true,
        (Literal::Number(_), Primitive::Number) => true,
        (Literal::Number(n), Primitive::Integer) => n.fract() == 0.0,
        (Literal::Boolean(_), Primitive::Boolean) => true,
        _ => false,
    }
}

fn covers_boolean(variants: &[Node]) -> bool {
    let has = |b: bool| {
        variants
            .iter()
            .any(|v| v.as_literal() == Some(&Literal::Boolean(b)))
    };
    has(true) && has(false)
}

fn pattern_matches(fragments: &[Node], value: &str) -> bool {
    Regex::new(&pattern::regex_source(fragments))
        .map(|re| re.is_match(value))
        .unwrap_or(false)
}

/// Whether a dictionary key type admits the property name `name`.
fn key_admits(key: &Node, name: &str) -> bool {
    match &key.kind {
        Kind::Primitive(Primitive::String | Primitive::Any | Primitive::Unknown) => true,
        Kind::Primitive(Primitive::Number) => name.parse::<f64>().is_ok(),
        Kind::Primitive(Primitive::Integer) => name.parse::<i64>().is_ok(),
        Kind::Literal(l) => l.to_key() == name,
        Kind::Union(variants) => variants.iter().any(|v| key_admits(v, name)),
        Kind::TemplatePattern(fragments) => pattern_matches(fragments, name),
        _ => false,
    }
}

/// Flatten an intersection of objects into one property list. Returns
/// false when some part is not object-shaped.
fn gather_properties<'a>(node: &'a Node, out: &mut Vec<(&'a str, &'a Node)>) -> bool {
    match &node.kind {
        Kind::Object(props) => {
            for (name, prop) in props {
                if !out.iter().any(|(k, _)| *k == name.as_str()) {
                    out.push((name.as_str(), prop));
                }
            }
            true
        }
        Kind::Intersect(parts) => parts.iter().all(|p| gather_properties(p, out)),
        _ => false,
    }
}
