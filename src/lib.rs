//! Familiar Type Engine
//!
//! An instantiation engine for parameterized, composable and self-referential
//! schema expressions. Schema nodes describe structural data shapes; the
//! engine reduces expressions over them (references, generic calls,
//! type-level operators, cyclic definitions) into concrete schema trees.
//!
//! ## Features
//!
//! - **Partial Evaluation**: Operators whose operands are not yet known stay deferred
//! - **Cycle Safety**: Self-referential definitions are packaged as `Cyclic` bundles
//! - **Tail Calls**: Self-recursive generics reuse the call-stack instead of growing it
//! - **Bounded Recursion**: Depth and call-stack limits turn runaway input into typed errors
//!
//! ## Architecture
//!
//! ```text
//! node/      schema node model, context, template patterns
//! extends    structural comparability check
//! engine/    instantiation, cycle check, generic calls, module assembly
//! action/    operator reducers (Pick, Omit, Mapped, Conditional, ...)
//! config     layered engine configuration
//! ```
//!
//! ## Example
//!
//! ```
//! use familiar_type_engine::node::*;
//! use familiar_type_engine::instantiate;
//!
//! let subject = object([("a", number()), ("b", string()), ("c", boolean())]);
//! let picked = instantiate(&Context::new(), &pick(subject, keys(["a", "c"]))).unwrap();
//! assert_eq!(picked, object([("a", number()), ("c", boolean())]));
//! ```

pub mod action;
pub mod config;
pub mod engine;
pub mod error;
pub mod extends;
pub mod node;

pub use config::EngineConfig;
pub use engine::{instantiate, instantiate_module, Instantiator, Limits, ReferenceGraph, State};
pub use error::{EngineError, Result};
pub use extends::extends;
pub use node::{Context, Kind, Node, Operator};
