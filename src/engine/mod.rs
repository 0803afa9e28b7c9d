//! Instantiation Engine
//!
//! Reduces schema expression trees to concrete schema trees given a
//! [`Context`]. Composite nodes are rebuilt child by child, references are
//! resolved unless resolving them would re-enter a definition already being
//! expanded, generic calls are bound and expanded, and deferred operator
//! applications are reduced as soon as their operands are known.
//!
//! Everything here is a pure function of `(context, state, node)`. The only
//! state is the explicit [`State`] value: the generic call-stack and the
//! recursion depth, plus the parameters of enclosing generic declarations.
//! Each step may move onto a freshly allocated stack segment, so deep input
//! ends in [`EngineError::DepthExceeded`] rather than a native overflow.

pub mod call;
pub mod cycle;
pub mod graph;
pub mod module;

pub use cycle::{cyclic_check, is_cyclic};
pub use graph::ReferenceGraph;

use std::sync::Arc;

use tracing::trace;

use crate::action;
use crate::error::{EngineError, Result};
use crate::node::{Context, Kind, Node, Parameter, Properties};

/// Recursion limits guarding against runaway expansion of untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum nesting of instantiation steps
    pub max_depth: usize,
    /// Maximum number of fresh (non-tail) generic calls on the call-stack
    pub max_call_depth: usize,
    /// Largest template cross product expanded into literals
    pub max_template_combinations: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: 512,
            max_call_depth: 64,
            max_template_combinations: 10_000,
        }
    }
}

/// Remaining stack below which an instantiation step moves to a fresh segment.
const STACK_RED_ZONE: usize = 256 * 1024;
/// Size of each stack segment allocated on demand.
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// One generic expansion in progress.
#[derive(Debug, Clone, PartialEq)]
struct Frame {
    name: String,
    arguments: Vec<Node>,
}

impl Frame {
    fn new(name: impl Into<String>, arguments: Vec<Node>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Evaluation state threaded through every instantiation step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    frames: Arc<Vec<Frame>>,
    /// Parameters of the generic declarations enclosing the current node
    open: Arc<Vec<String>>,
    depth: usize,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// State with a pre-populated call-stack (outermost call first).
    pub fn with_callstack<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            frames: Arc::new(names.into_iter().map(|name| Frame::new(name, Vec::new())).collect()),
            ..Self::default()
        }
    }

    /// Names of the generics being expanded, outermost first.
    pub fn callstack(&self) -> Vec<&str> {
        self.frames.iter().map(|frame| frame.name.as_str()).collect()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Name of the generic currently being expanded.
    pub fn peek(&self) -> Option<&str> {
        self.frames.last().map(|frame| frame.name.as_str())
    }

    /// Whether `name<arguments>` is already being expanded somewhere on the
    /// call-stack.
    pub fn is_expanding(&self, name: &str, arguments: &[Node]) -> bool {
        self.frames
            .iter()
            .any(|frame| frame.name == name && frame.arguments == arguments)
    }

    /// Whether `node` mentions a parameter of an enclosing generic declaration.
    pub fn depends_on_open(&self, node: &Node) -> bool {
        !self.open.is_empty()
            && node
                .references()
                .iter()
                .any(|name| self.open.contains(name))
    }

    /// Same call-stack, one level deeper.
    fn descend(&self, limits: &Limits) -> Result<State> {
        if self.depth >= limits.max_depth {
            return Err(EngineError::DepthExceeded {
                limit: limits.max_depth,
            });
        }
        Ok(State {
            depth: self.depth + 1,
            ..self.clone()
        })
    }

    /// Call-stack with `name<arguments>` pushed on top.
    fn push(&self, name: &str, arguments: Vec<Node>, limits: &Limits) -> Result<State> {
        let mut frames = self.frames.as_ref().clone();
        frames.push(Frame::new(name, arguments));
        if frames.len() > limits.max_call_depth {
            return Err(EngineError::CallDepthExceeded {
                limit: limits.max_call_depth,
                callstack: frames.into_iter().map(|frame| frame.name).collect(),
            });
        }
        Ok(State {
            frames: Arc::new(frames),
            ..self.clone()
        })
    }

    /// Call-stack of the same height with the top frame replaced.
    fn replace_top(&self, name: &str, arguments: Vec<Node>) -> State {
        let mut frames = self.frames.as_ref().clone();
        frames.pop();
        frames.push(Frame::new(name, arguments));
        State {
            frames: Arc::new(frames),
            ..self.clone()
        }
    }

    /// State inside the body of a generic declaring `parameters`.
    fn open(&self, parameters: &[Parameter]) -> State {
        let mut open = self.open.as_ref().clone();
        open.extend(parameters.iter().map(|p| p.name.clone()));
        State {
            open: Arc::new(open),
            ..self.clone()
        }
    }
}

/// The instantiation procedure, parameterized by its recursion limits.
#[derive(Debug, Clone, Default)]
pub struct Instantiator {
    limits: Limits,
}

impl Instantiator {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Instantiate `node` in `context` with an empty call-stack.
    pub fn instantiate(&self, context: &Context, node: &Node) -> Result<Node> {
        self.instantiate_with(context, &State::new(), node)
    }

    /// Instantiate `node` in `context` under an explicit evaluation state.
    pub fn instantiate_with(&self, context: &Context, state: &State, node: &Node) -> Result<Node> {
        let state = state.descend(&self.limits)?;
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.instantiate_step(context, &state, node)
        })
    }

    fn instantiate_step(&self, context: &Context, state: &State, node: &Node) -> Result<Node> {
        let kind = match &node.kind {
            Kind::Primitive(_) | Kind::Literal(_) | Kind::Cyclic { .. } => return Ok(node.clone()),
            Kind::Ref(name) => return self.instantiate_ref(context, state, node, name),
            Kind::Call { target, arguments } => {
                return Ok(self.call(context, state, target, arguments)?.inherit(node));
            }
            Kind::Deferred(deferred) => {
                return action::reduce(self, context, state, node, deferred);
            }
            Kind::Array(item) => Kind::Array(Box::new(self.instantiate_with(context, state, item)?)),
            Kind::Tuple { items, rest } => Kind::Tuple {
                items: self.instantiate_all(context, state, items)?,
                rest: *rest,
            },
            Kind::Object(props) => Kind::Object(
                props
                    .iter()
                    .map(|(name, prop)| Ok((name.clone(), self.instantiate_with(context, state, prop)?)))
                    .collect::<Result<Properties>>()?,
            ),
            Kind::Union(variants) => Kind::Union(self.instantiate_all(context, state, variants)?),
            Kind::Intersect(parts) => Kind::Intersect(self.instantiate_all(context, state, parts)?),
            Kind::Function { parameters, returns } => Kind::Function {
                parameters: self.instantiate_all(context, state, parameters)?,
                returns: Box::new(self.instantiate_with(context, state, returns)?),
            },
            Kind::Constructor { parameters, instance } => Kind::Constructor {
                parameters: self.instantiate_all(context, state, parameters)?,
                instance: Box::new(self.instantiate_with(context, state, instance)?),
            },
            Kind::Wrapper { wrapper, item } => Kind::Wrapper {
                wrapper: *wrapper,
                item: Box::new(self.instantiate_with(context, state, item)?),
            },
            Kind::Dictionary { key, value } => Kind::Dictionary {
                key: Box::new(self.instantiate_with(context, state, key)?),
                value: Box::new(self.instantiate_with(context, state, value)?),
            },
            Kind::Parameter(parameter) => {
                Kind::Parameter(self.instantiate_parameter(context, state, parameter)?)
            }
            Kind::Generic { parameters, body } => {
                // Parameter names shadow outer bindings inside the body, and
                // calls depending on them wait for the call site
                let scope = context.without(parameters.iter().map(|p| p.name.as_str()));
                let inner = state.open(parameters);
                let instantiated = parameters
                    .iter()
                    .map(|p| self.instantiate_parameter(&scope, &inner, p))
                    .collect::<Result<Vec<_>>>()?;
                Kind::Generic {
                    parameters: instantiated,
                    body: Box::new(self.instantiate_with(&scope, &inner, body)?),
                }
            }
            Kind::TemplatePattern(fragments) => {
                Kind::TemplatePattern(self.instantiate_all(context, state, fragments)?)
            }
        };
        Ok(node.rebuild(kind))
    }

    /// Instantiate every node of a list with the same context and state.
    pub fn instantiate_all(&self, context: &Context, state: &State, nodes: &[Node]) -> Result<Vec<Node>> {
        nodes
            .iter()
            .map(|node| self.instantiate_with(context, state, node))
            .collect()
    }

    fn instantiate_parameter(&self, context: &Context, state: &State, parameter: &Parameter) -> Result<Parameter> {
        Ok(Parameter {
            name: parameter.name.clone(),
            constraint: Box::new(self.instantiate_with(context, state, &parameter.constraint)?),
            default: Box::new(self.instantiate_with(context, state, &parameter.default)?),
        })
    }

    fn instantiate_ref(&self, context: &Context, state: &State, node: &Node, name: &str) -> Result<Node> {
        let Some(target) = context.get(name) else {
            trace!(reference = name, "reference absent from context");
            return Ok(node.clone());
        };
        if cyclic_check(&[name], context, target) {
            trace!(reference = name, "reference is cyclic, left unexpanded");
            return Ok(node.clone());
        }
        Ok(self.instantiate_with(context, state, target)?.inherit(node))
    }
}

/// Instantiate `node` in `context` with default limits and an empty call-stack.
pub fn instantiate(context: &Context, node: &Node) -> Result<Node> {
    Instantiator::default().instantiate(context, node)
}

/// Instantiate every definition of `context` as one module.
pub fn instantiate_module(context: &Context) -> Result<Context> {
    Instantiator::default().instantiate_module(context)
}
