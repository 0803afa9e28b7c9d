//! Generic Call Resolver
//!
//! Finds the generic a call targets, binds its parameters and expands its
//! body. A call to the generic currently on top of the call-stack is a tail
//! call and reuses the stack; any other call pushes a fresh frame.
//!
//! A call repeating an expansion already in progress, with the same
//! arguments, becomes a reference back to that expansion, which is then
//! packaged as a `Cyclic` bundle named after the call (e.g. `List<string>`).

use tracing::debug;

use super::cycle::{chase, Target};
use super::{Instantiator, State};
use crate::error::{EngineError, Result};
use crate::extends::extends;
use crate::node::{self, Context, Deferred, Kind, Node, Operator, Parameter};

/// Name used on the call-stack for a generic written inline at the call site.
pub const ANONYMOUS: &str = "(anonymous)";

impl Instantiator {
    /// Instantiate the call `target<arguments>` in `context`.
    ///
    /// An unresolvable target, or arguments that mention the parameters of
    /// an enclosing generic declaration, yield the call rebuilt with
    /// instantiated arguments, ready to be retried later.
    pub fn call(&self, context: &Context, state: &State, target: &Node, arguments: &[Node]) -> Result<Node> {
        let arguments = self.instantiate_all(context, state, arguments)?;
        if arguments.iter().any(|argument| state.depends_on_open(argument)) {
            debug!("call depends on open generic parameters, deferring");
            return Ok(node::call(target.clone(), arguments));
        }
        match &target.kind {
            Kind::Generic { parameters, body } => {
                self.expand(context, state, ANONYMOUS, parameters, body, arguments)
            }
            Kind::Ref(name) => match chase(context, name) {
                Target::Generic { name, parameters, body } => {
                    self.expand(context, state, name, parameters, body, arguments)
                }
                Target::Concrete(_) | Target::Unresolved => {
                    debug!(target_name = name.as_str(), "call target is not a generic, deferring");
                    Ok(node::call(target.clone(), arguments))
                }
            },
            _ => {
                let resolved = self.instantiate_with(context, state, target)?;
                match &resolved.kind {
                    Kind::Generic { parameters, body } => {
                        self.expand(context, state, ANONYMOUS, parameters, body, arguments)
                    }
                    _ => Ok(node::call(resolved, arguments)),
                }
            }
        }
    }

    fn expand(
        &self,
        context: &Context,
        state: &State,
        name: &str,
        parameters: &[Parameter],
        body: &Node,
        arguments: Vec<Node>,
    ) -> Result<Node> {
        let key = recursion_key(name, &arguments);
        // Inline generics cannot refer to themselves
        if name != ANONYMOUS && state.is_expanding(name, &arguments) {
            debug!(generic = name, "call repeats an expansion in progress");
            return Ok(node::reference(key));
        }

        let bindings = self.bind(context, state, parameters, arguments.clone())?;
        let inner = if state.peek() == Some(name) {
            debug!(generic = name, depth = state.depth(), "tail call, reusing call-stack");
            state.replace_top(name, arguments)
        } else {
            debug!(generic = name, frames = state.callstack().len() + 1, "expanding generic");
            state.push(name, arguments, &self.limits)?
        };

        let expanded = self.instantiate_with(context, &inner, &substitute(body, &bindings))?;
        let expanded = if expanded.references().contains(&key) {
            debug!(generic = name, root = key.as_str(), "packaging recursive expansion");
            node::cyclic([(key.clone(), expanded)].into_iter().collect(), key)
        } else {
            expanded
        };
        self.instantiate_with(context, state, &expanded)
    }

    /// Bind parameters left to right, checking each candidate against its
    /// constraint. Missing arguments fall back to the parameter default.
    ///
    /// Constraints and defaults see earlier parameters through substitution
    /// only, so names free in an argument are never resolved against the
    /// callee's parameters.
    fn bind(&self, context: &Context, state: &State, parameters: &[Parameter], arguments: Vec<Node>) -> Result<Context> {
        let scope = context.without(parameters.iter().map(|p| p.name.as_str()));
        let mut bindings = Context::new();
        let mut arguments = arguments.into_iter();
        for parameter in parameters {
            let constraint = self.instantiate_with(&scope, state, &substitute(&parameter.constraint, &bindings))?;
            let candidate = match arguments.next() {
                Some(argument) => argument,
                None => self.instantiate_with(&scope, state, &substitute(&parameter.default, &bindings))?,
            };
            if candidate.is_concrete() && constraint.is_concrete() && !extends(&candidate, &constraint) {
                return Err(EngineError::ConstraintViolation {
                    parameter: parameter.name.clone(),
                    constraint: Box::new(constraint),
                    received: Box::new(candidate),
                });
            }
            bindings = bindings.with(parameter.name.clone(), candidate);
        }
        Ok(bindings)
    }
}

/// Name of the bundle entry standing for `name<arguments>`.
fn recursion_key(name: &str, arguments: &[Node]) -> String {
    let arguments: Vec<String> = arguments.iter().map(Node::to_string).collect();
    format!("{}<{}>", name, arguments.join(", "))
}

/// Replace free references to the names of `bindings` beneath `node`, in
/// one pass. Generic parameters and mapped keys shadow what they declare;
/// cyclic bundles are closed and left alone.
fn substitute(node: &Node, bindings: &Context) -> Node {
    if bindings.is_empty() {
        return node.clone();
    }
    let kind = match &node.kind {
        Kind::Ref(name) => {
            return match bindings.get(name) {
                Some(bound) => bound.clone().inherit(node),
                None => node.clone(),
            }
        }
        Kind::Primitive(_) | Kind::Literal(_) | Kind::Cyclic { .. } => return node.clone(),
        Kind::Array(item) => Kind::Array(Box::new(substitute(item, bindings))),
        Kind::Tuple { items, rest } => Kind::Tuple {
            items: substitute_all(items, bindings),
            rest: *rest,
        },
        Kind::Object(props) => Kind::Object(
            props
                .iter()
                .map(|(name, prop)| (name.clone(), substitute(prop, bindings)))
                .collect(),
        ),
        Kind::Union(variants) => Kind::Union(substitute_all(variants, bindings)),
        Kind::Intersect(parts) => Kind::Intersect(substitute_all(parts, bindings)),
        Kind::Function { parameters, returns } => Kind::Function {
            parameters: substitute_all(parameters, bindings),
            returns: Box::new(substitute(returns, bindings)),
        },
        Kind::Constructor { parameters, instance } => Kind::Constructor {
            parameters: substitute_all(parameters, bindings),
            instance: Box::new(substitute(instance, bindings)),
        },
        Kind::Wrapper { wrapper, item } => Kind::Wrapper {
            wrapper: *wrapper,
            item: Box::new(substitute(item, bindings)),
        },
        Kind::Dictionary { key, value } => Kind::Dictionary {
            key: Box::new(substitute(key, bindings)),
            value: Box::new(substitute(value, bindings)),
        },
        Kind::Parameter(parameter) => Kind::Parameter(substitute_parameter(parameter, bindings)),
        Kind::Generic { parameters, body } => {
            let inner = bindings.without(parameters.iter().map(|p| p.name.as_str()));
            Kind::Generic {
                parameters: parameters.iter().map(|p| substitute_parameter(p, &inner)).collect(),
                body: Box::new(substitute(body, &inner)),
            }
        }
        Kind::Call { target, arguments } => Kind::Call {
            target: Box::new(substitute(target, bindings)),
            arguments: substitute_all(arguments, bindings),
        },
        Kind::Deferred(deferred) => {
            let operands = match (deferred.operator, deferred.operands.split_first()) {
                (Operator::Mapped, Some((key, rest))) => match &key.kind {
                    Kind::Parameter(parameter) => {
                        let inner = bindings.without([parameter.name.as_str()]);
                        std::iter::once(key.rebuild(Kind::Parameter(substitute_parameter(parameter, bindings))))
                            .chain(rest.iter().map(|operand| substitute(operand, &inner)))
                            .collect()
                    }
                    _ => substitute_all(&deferred.operands, bindings),
                },
                _ => substitute_all(&deferred.operands, bindings),
            };
            Kind::Deferred(Deferred {
                operator: deferred.operator,
                operands,
                options: deferred.options.clone(),
            })
        }
        Kind::TemplatePattern(fragments) => Kind::TemplatePattern(substitute_all(fragments, bindings)),
    };
    node.rebuild(kind)
}

fn substitute_all(nodes: &[Node], bindings: &Context) -> Vec<Node> {
    nodes.iter().map(|node| substitute(node, bindings)).collect()
}

fn substitute_parameter(parameter: &Parameter, bindings: &Context) -> Parameter {
    Parameter {
        name: parameter.name.clone(),
        constraint: Box::new(substitute(&parameter.constraint, bindings)),
        default: Box::new(substitute(&parameter.default, bindings)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Limits;
    use crate::node::*;

    fn boxed() -> Context {
        [(
            "Box",
            generic(
                vec![parameter_extends("T", string())],
                object([("value", reference("T"))]),
            ),
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_call_binds_arguments() {
        let ctx = boxed();
        let out = Instantiator::default()
            .instantiate(&ctx, &call(reference("Box"), vec![literal("hi")]))
            .unwrap();
        assert_eq!(out, object([("value", literal("hi"))]));
    }

    #[test]
    fn test_call_uses_default() {
        let ctx: Context = [(
            "Pair",
            generic(
                vec![parameter("A"), parameter_with_default("B", unknown(), reference("A"))],
                tuple(vec![reference("A"), reference("B")]),
            ),
        )]
        .into_iter()
        .collect();
        let out = Instantiator::default()
            .instantiate(&ctx, &call(reference("Pair"), vec![number()]))
            .unwrap();
        assert_eq!(out, tuple(vec![number(), number()]));
    }

    #[test]
    fn test_constraint_violation() {
        let ctx = boxed();
        let err = Instantiator::default()
            .instantiate(&ctx, &call(reference("Box"), vec![number()]))
            .unwrap_err();
        match err {
            EngineError::ConstraintViolation { parameter, received, .. } => {
                assert_eq!(parameter, "T");
                assert_eq!(*received, number());
            }
            other => panic!("Expected constraint violation, got {:?}", other),
        }
    }

    #[test]
    fn test_unresolved_target_is_rebuilt() {
        let ctx: Context = [("N", number())].into_iter().collect();
        let node = call(reference("Missing"), vec![reference("N")]);
        let out = Instantiator::default().instantiate(&ctx, &node).unwrap();
        assert_eq!(out, call(reference("Missing"), vec![number()]));
    }

    #[test]
    fn test_anonymous_generic() {
        let node = call(generic(vec![parameter("T")], array(reference("T"))), vec![boolean()]);
        let out = Instantiator::default().instantiate(&Context::new(), &node).unwrap();
        assert_eq!(out, array(boolean()));

        // Nested inline generics with equal arguments are distinct calls
        let inner = generic(vec![parameter("U")], tuple(vec![reference("U")]));
        let outer = generic(
            vec![parameter("T")],
            object([("pair", call(inner, vec![reference("T")]))]),
        );
        let out = Instantiator::default()
            .instantiate(&Context::new(), &call(outer, vec![boolean()]))
            .unwrap();
        assert_eq!(out, object([("pair", tuple(vec![boolean()]))]));
    }

    #[test]
    fn test_tail_call_reuses_stack() {
        // F<X> = X extends "stop" ? "done" : F<"stop">
        let body = conditional(
            reference("X"),
            literal("stop"),
            literal("done"),
            call(reference("F"), vec![literal("stop")]),
        );
        let ctx: Context = [("F", generic(vec![parameter("X")], body))].into_iter().collect();
        let engine = Instantiator::new(Limits {
            max_call_depth: 1,
            ..Limits::default()
        });
        let out = engine.instantiate(&ctx, &call(reference("F"), vec![literal("go")])).unwrap();
        assert_eq!(out, literal("done"));
    }

    #[test]
    fn test_growing_mutual_recursion_exceeds_call_depth() {
        // G<X> = H<X[]>, H<X> = G<X[]>: every call carries new arguments
        let ctx: Context = [
            ("G", generic(vec![parameter("X")], call(reference("H"), vec![array(reference("X"))]))),
            ("H", generic(vec![parameter("X")], call(reference("G"), vec![array(reference("X"))]))),
        ]
        .into_iter()
        .collect();
        let engine = Instantiator::new(Limits {
            max_call_depth: 8,
            ..Limits::default()
        });
        let err = engine
            .instantiate(&ctx, &call(reference("G"), vec![number()]))
            .unwrap_err();
        assert!(matches!(err, EngineError::CallDepthExceeded { limit: 8, .. }));
    }

    #[test]
    fn test_repeated_call_is_packaged() {
        // List<T> = { value: T, next: List<T> | null }
        let body = object([
            ("value", reference("T")),
            ("next", union(vec![call(reference("List"), vec![reference("T")]), null()])),
        ]);
        let ctx: Context = [("List", generic(vec![parameter("T")], body))].into_iter().collect();
        let out = Instantiator::default()
            .instantiate(&ctx, &call(reference("List"), vec![string()]))
            .unwrap();

        let definitions: Context = [(
            "List<string>",
            object([
                ("value", string()),
                ("next", union(vec![reference("List<string>"), null()])),
            ]),
        )]
        .into_iter()
        .collect();
        assert_eq!(out, cyclic(definitions, "List<string>"));
    }

    #[test]
    fn test_mutual_generics_share_one_bundle() {
        // A<T> = { b: B<T> }, B<T> = { a: A<T> }
        let ctx: Context = [
            ("A", generic(vec![parameter("T")], object([("b", call(reference("B"), vec![reference("T")]))]))),
            ("B", generic(vec![parameter("T")], object([("a", call(reference("A"), vec![reference("T")]))]))),
        ]
        .into_iter()
        .collect();
        let out = Instantiator::default()
            .instantiate(&ctx, &call(reference("A"), vec![number()]))
            .unwrap();
        let definitions: Context = [(
            "A<number>",
            object([("b", object([("a", reference("A<number>"))]))]),
        )]
        .into_iter()
        .collect();
        assert_eq!(out, cyclic(definitions, "A<number>"));
    }

    #[test]
    fn test_arguments_are_not_captured_by_parameters() {
        // Pair<A, B> = [A, B] called as Pair<B, string> with B free
        let ctx: Context = [(
            "Pair",
            generic(
                vec![parameter("A"), parameter("B")],
                tuple(vec![reference("A"), reference("B")]),
            ),
        )]
        .into_iter()
        .collect();
        let out = Instantiator::default()
            .instantiate(&ctx, &call(reference("Pair"), vec![reference("B"), string()]))
            .unwrap();
        assert_eq!(out, tuple(vec![reference("B"), string()]));
    }

    #[test]
    fn test_declaration_keeps_calls_on_its_parameters() {
        let ctx: Context = [
            (
                "Pair",
                generic(
                    vec![parameter("A"), parameter("B")],
                    tuple(vec![reference("A"), reference("B")]),
                ),
            ),
            ("G", generic(vec![parameter("B")], call(reference("Pair"), vec![reference("B"), string()]))),
        ]
        .into_iter()
        .collect();
        let engine = Instantiator::default();
        let declaration = engine.instantiate(&ctx, &reference("G")).unwrap();
        assert_eq!(Some(&declaration), ctx.get("G"));

        let out = engine.instantiate(&ctx, &call(reference("G"), vec![number()])).unwrap();
        assert_eq!(out, tuple(vec![number(), string()]));
    }

    #[test]
    fn test_substitution_respects_shadowing() {
        let bindings: Context = [("T", number())].into_iter().collect();
        let node = object([
            ("outer", reference("T").optional()),
            ("inner", generic(vec![parameter("T")], array(reference("T")))),
            ("keys", mapped(parameter_extends("T", reference("T")), reference("T"), None)),
        ]);
        let expected = object([
            ("outer", number().optional()),
            ("inner", generic(vec![parameter("T")], array(reference("T")))),
            ("keys", mapped(parameter_extends("T", number()), reference("T"), None)),
        ]);
        assert_eq!(substitute(&node, &bindings), expected);
    }
}
