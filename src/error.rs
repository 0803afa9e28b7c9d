//! Error types for the instantiation engine
//!
//! Unresolved references are not errors: an absent or cyclic name simply
//! stays a `Ref` (or a deferred action) in the output tree.

use thiserror::Error;

use crate::node::{Node, Operator};

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Instantiation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Constraint violation: parameter '{parameter}' requires {constraint}, received {received}")]
    ConstraintViolation {
        parameter: String,
        constraint: Box<Node>,
        received: Box<Node>,
    },

    #[error("Structural mismatch in {operator}: expected {expected}, received {received}")]
    StructuralMismatch {
        operator: Operator,
        expected: String,
        received: Box<Node>,
    },

    #[error("Invalid arity for {operator}: expected {expected} operand(s), received {received}")]
    InvalidArity {
        operator: Operator,
        expected: String,
        received: usize,
    },

    #[error("Instantiation depth limit of {limit} exceeded")]
    DepthExceeded { limit: usize },

    #[error("Call depth limit of {limit} exceeded: {}", callstack.join(" -> "))]
    CallDepthExceeded { limit: usize, callstack: Vec<String> },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn mismatch(operator: Operator, expected: impl Into<String>, received: &Node) -> Self {
        EngineError::StructuralMismatch {
            operator,
            expected: expected.into(),
            received: Box::new(received.clone()),
        }
    }
}
