//! Operator Reducers
//!
//! Every deferred operator application is reduced eagerly when its operands
//! are resolvable in the current context, and kept deferred otherwise so it
//! can be retried once embedded in a richer context (e.g. inside a module).
//!
//! Reducers share one contract: given instantiated operands they either
//! produce a node, report that some structural operand is still unresolved
//! (the action is re-deferred with its instantiated operands), or raise a
//! [`EngineError::StructuralMismatch`] when no added context could help.

pub mod conditional;
pub mod function;
pub mod mapped;
pub mod module;
pub mod object;
pub mod set;
pub mod text;

use tracing::debug;

use crate::engine::{Instantiator, State};
use crate::error::{EngineError, Result};
use crate::node::{self, Context, Deferred, Kind, Node, Operator};

/// Result of one reduction step.
#[derive(Debug, Clone, PartialEq)]
pub enum Reduced {
    /// The operator applied
    Done(Node),
    /// A structural operand is unresolved; keep the action with these operands
    Deferred(Vec<Node>),
}

/// Whether the operands `deferred` depends on are resolvable in `context`.
///
/// Unions and intersections must resolve in every branch; a bare reference
/// resolves only when bound in `context`; anything else is resolvable.
/// Conditionals only guard their check and extends operands, mapped types
/// only their key source.
pub fn can_instantiate(context: &Context, deferred: &Deferred) -> bool {
    let operands = &deferred.operands;
    match deferred.operator {
        Operator::Conditional => operands.iter().take(2).all(|op| resolvable(context, op)),
        Operator::Mapped => match operands.first().map(|op| &op.kind) {
            Some(Kind::Parameter(key)) => resolvable(context, &key.constraint),
            _ => true,
        },
        _ => operands.iter().all(|op| resolvable(context, op)),
    }
}

fn resolvable(context: &Context, node: &Node) -> bool {
    match &node.kind {
        Kind::Union(branches) | Kind::Intersect(branches) => {
            branches.iter().all(|branch| resolvable(context, branch))
        }
        Kind::Ref(name) => context.contains(name),
        _ => true,
    }
}

/// Reduce the deferred action `node` in `context`.
pub(crate) fn reduce(
    engine: &Instantiator,
    context: &Context,
    state: &State,
    node: &Node,
    deferred: &Deferred,
) -> Result<Node> {
    if !can_instantiate(context, deferred) {
        debug!(operator = %deferred.operator, "operands unresolved, deferring");
        return Ok(node.clone());
    }
    let reducer = Reducer {
        engine,
        context,
        state,
        operator: deferred.operator,
    };
    let reduced = match deferred.operator {
        // Lazy operators instantiate their own operands
        Operator::Conditional => conditional::reduce(&reducer, &deferred.operands)?,
        Operator::Mapped => mapped::reduce_mapped(&reducer, &deferred.operands)?,
        Operator::Module => module::reduce(&reducer, &deferred.operands)?,
        operator => {
            let operands = engine.instantiate_all(context, state, &deferred.operands)?;
            match eager(&reducer, operator, &operands)? {
                Some(result) => Reduced::Done(result),
                None => Reduced::Deferred(operands),
            }
        }
    };
    Ok(match reduced {
        Reduced::Done(result) => {
            let mut result = result.inherit(node);
            for (key, value) in &deferred.options {
                result.annotations.insert(key.clone(), value.clone());
            }
            result
        }
        Reduced::Deferred(operands) => {
            debug!(operator = %deferred.operator, "structural operand unresolved, re-deferring");
            node.rebuild(Kind::Deferred(Deferred {
                operator: deferred.operator,
                operands,
                options: deferred.options.clone(),
            }))
        }
    })
}

fn eager(reducer: &Reducer<'_>, operator: Operator, operands: &[Node]) -> Result<Option<Node>> {
    match operator {
        Operator::Pick => object::pick(reducer, operands),
        Operator::Omit => object::omit(reducer, operands),
        Operator::Partial => object::partial(reducer, operands),
        Operator::Required => object::required(reducer, operands),
        Operator::Readonly => object::readonly(reducer, operands),
        Operator::Writable => object::writable(reducer, operands),
        Operator::KeyOf => object::key_of(reducer, operands),
        Operator::Index => object::index(reducer, operands),
        Operator::Evaluate => object::evaluate(reducer, operands),
        Operator::Interface => object::interface(reducer, operands),
        Operator::Exclude => set::exclude(reducer, operands),
        Operator::Extract => set::extract(reducer, operands),
        Operator::NonNullable => set::non_nullable(reducer, operands),
        Operator::Awaited => function::awaited(reducer, operands),
        Operator::ReturnType => function::return_type(reducer, operands),
        Operator::Parameters => function::parameters(reducer, operands),
        Operator::ConstructorParameters => function::constructor_parameters(reducer, operands),
        Operator::InstanceType => function::instance_type(reducer, operands),
        Operator::Capitalize
        | Operator::Uncapitalize
        | Operator::Uppercase
        | Operator::Lowercase => text::case(reducer, operands),
        Operator::TemplateLiteral => text::template_literal(reducer, operands),
        Operator::Record => mapped::record(reducer, operands),
        Operator::Conditional | Operator::Mapped | Operator::Module => Err(EngineError::Internal(
            format!("{} is not an eager operator", operator),
        )),
    }
}

/// Everything a reducer needs besides its operands.
pub struct Reducer<'a> {
    pub engine: &'a Instantiator,
    pub context: &'a Context,
    pub state: &'a State,
    pub operator: Operator,
}

impl Reducer<'_> {
    pub fn instantiate(&self, node: &Node) -> Result<Node> {
        self.engine.instantiate_with(self.context, self.state, node)
    }

    pub fn instantiate_in(&self, context: &Context, node: &Node) -> Result<Node> {
        self.engine.instantiate_with(context, self.state, node)
    }

    pub fn mismatch(&self, expected: &str, received: &Node) -> EngineError {
        EngineError::mismatch(self.operator, expected, received)
    }

    /// Require exactly `expected` operands.
    pub fn arity<'n>(&self, operands: &'n [Node], expected: usize) -> Result<&'n [Node]> {
        if operands.len() != expected {
            return Err(EngineError::InvalidArity {
                operator: self.operator,
                expected: expected.to_string(),
                received: operands.len(),
            });
        }
        Ok(operands)
    }

    /// Require between `min` and `max` operands.
    pub fn arity_range<'n>(&self, operands: &'n [Node], min: usize, max: usize) -> Result<&'n [Node]> {
        if operands.len() < min || operands.len() > max {
            let expected = if max == usize::MAX {
                format!("at least {}", min)
            } else {
                format!("{}..={}", min, max)
            };
            return Err(EngineError::InvalidArity {
                operator: self.operator,
                expected,
                received: operands.len(),
            });
        }
        Ok(operands)
    }

    /// A subject the engine left as a reference because it is cyclic is
    /// packaged into a bundle so structural operators can see its shape.
    pub fn subject(&self, node: &Node) -> Result<Node> {
        match &node.kind {
            Kind::Ref(name) => match self.context.get(name) {
                Some(target) => Ok(self.engine.instantiate_cyclic(self.context, name, target)?.inherit(node)),
                None => Ok(node.clone()),
            },
            _ => Ok(node.clone()),
        }
    }

    /// Apply `transform` to the root projection of a cyclic bundle. The
    /// result is re-bundled under a synthesized root when it still refers
    /// to the bundle's definitions.
    pub fn on_cyclic<F>(&self, definitions: &Context, root: &str, transform: F) -> Result<Option<Node>>
    where
        F: FnOnce(&Node) -> Result<Option<Node>>,
    {
        let projection = definitions
            .get(root)
            .ok_or_else(|| EngineError::Internal(format!("cyclic root '{}' is missing", root)))?;
        let Some(result) = transform(projection)? else {
            return Ok(None);
        };
        if result.references().iter().any(|name| definitions.contains(name)) {
            let name = format!("{}<{}>", self.operator, root);
            Ok(Some(node::cyclic(definitions.with(name.clone(), result), name)))
        } else {
            Ok(Some(result))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::*;

    #[test]
    fn test_can_instantiate_guards_references() {
        let ctx: Context = [("A", object([("a", number())]))].into_iter().collect();
        let deferred = |node: Node| match node.kind {
            Kind::Deferred(d) => d,
            _ => unreachable!(),
        };
        assert!(can_instantiate(&ctx, &deferred(partial(reference("A")))));
        assert!(!can_instantiate(&ctx, &deferred(partial(reference("B")))));
        assert!(!can_instantiate(
            &ctx,
            &deferred(partial(union(vec![reference("A"), reference("B")])))
        ));
        // Nested references are not guarded
        assert!(can_instantiate(&ctx, &deferred(partial(object([("b", reference("B"))])))));
        // Conditional branches are not guarded
        assert!(can_instantiate(
            &ctx,
            &deferred(conditional(number(), number(), reference("B"), reference("C")))
        ));
    }

    #[test]
    fn test_unresolvable_action_is_unchanged() {
        let node = pick(reference("Missing"), keys(["a"]));
        let out = instantiate_node(&Context::new(), &node);
        assert_eq!(out, node);
    }

    #[test]
    fn test_options_become_annotations() {
        let mut node = partial(object([("a", number())]));
        if let Kind::Deferred(d) = &mut node.kind {
            d.options.insert("title".to_string(), serde_json::json!("Draft"));
        }
        let out = instantiate_node(&Context::new(), &node.optional());
        assert_eq!(
            out,
            object([("a", number().optional())])
                .optional()
                .annotate("title", "Draft")
        );
    }

    #[test]
    fn test_arity_is_checked() {
        let node = deferred(Operator::Pick, vec![object([("a", number())])]);
        let err = crate::engine::instantiate(&Context::new(), &node).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidArity { operator: Operator::Pick, received: 1, .. }
        ));
    }

    fn instantiate_node(context: &Context, node: &Node) -> Node {
        crate::engine::instantiate(context, node).unwrap()
    }
}
