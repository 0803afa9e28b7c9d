//! Cyclic Packager & Module Assembler
//!
//! A definition is a cyclic candidate when resolving it would re-enter a
//! name already being expanded. Each candidate is packaged with the other
//! candidates it depends on into a self-contained `Cyclic` bundle whose
//! sibling references stay unresolved; every other definition is
//! instantiated normally.

use std::collections::HashSet;

use tracing::debug;

use super::cycle::is_cyclic;
use super::graph::ReferenceGraph;
use super::{Instantiator, State};
use crate::error::{EngineError, Result};
use crate::node::{self, Context, Node};

impl Instantiator {
    /// Instantiate every definition of `context` as one module. Output
    /// order follows input order.
    pub fn instantiate_module(&self, context: &Context) -> Result<Context> {
        let names: Vec<&str> = context.names().collect();
        self.assemble(context, &names)
    }

    /// Package the definition `name -> node` (resolved against `context`)
    /// into a cyclic bundle.
    pub fn instantiate_cyclic(&self, context: &Context, name: &str, node: &Node) -> Result<Node> {
        let scope = context.with(name, node.clone());
        let candidates: HashSet<&str> = scope.names().filter(|n| is_cyclic(&scope, n)).collect();
        let graph = ReferenceGraph::from_context(&scope);
        self.package(&scope, &graph, &candidates, name)
    }

    /// Instantiate the definitions `names` of `scope`, packaging cyclic
    /// candidates and expanding the rest with a fresh call-stack each.
    pub(crate) fn assemble(&self, scope: &Context, names: &[&str]) -> Result<Context> {
        let candidates: HashSet<&str> = names
            .iter()
            .copied()
            .filter(|name| is_cyclic(scope, name))
            .collect();
        debug!(
            definitions = names.len(),
            cyclic = candidates.len(),
            "assembling module"
        );
        let graph = ReferenceGraph::from_context(scope);

        let mut output = Vec::with_capacity(names.len());
        for &name in names {
            let node = scope
                .get(name)
                .ok_or_else(|| EngineError::Internal(format!("module definition '{}' is missing", name)))?;
            let instantiated = if candidates.contains(name) {
                self.package(scope, &graph, &candidates, name)?
            } else {
                self.instantiate_with(scope, &State::new(), node)?
            };
            output.push((name.to_string(), instantiated));
        }
        Ok(output.into_iter().collect())
    }

    fn package(
        &self,
        scope: &Context,
        graph: &ReferenceGraph,
        candidates: &HashSet<&str>,
        name: &str,
    ) -> Result<Node> {
        let mut members: Vec<String> = graph
            .closure(name)
            .into_iter()
            .filter(|member| member != name && candidates.contains(member.as_str()))
            .collect();
        members.insert(0, name.to_string());
        debug!(root = name, members = ?members, "packaging cyclic definition");

        // Siblings are hidden so their references survive inside the bundle
        let private = scope.without(members.iter().map(String::as_str));
        let mut definitions = Vec::with_capacity(members.len());
        for member in &members {
            let body = scope
                .get(member)
                .ok_or_else(|| EngineError::Internal(format!("cyclic member '{}' is missing", member)))?;
            definitions.push((member.clone(), self.instantiate_with(&private, &State::new(), body)?));
        }
        Ok(node::cyclic(definitions.into_iter().collect(), name))
    }
}
