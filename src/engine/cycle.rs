//! Reference & Cycle Resolver
//!
//! Decides whether resolving a name now would re-enter a definition that is
//! already being expanded, and chases reference chains toward the generic a
//! call targets.

use std::collections::HashSet;

use crate::node::{Context, Kind, Node, Parameter};

/// True iff walking `node` (reached through the names on `path`) leads back
/// to a name already on the path.
///
/// Composite nodes are walked structurally; a reference to a new name
/// extends the path and walks that name's binding. Leaves, generics and
/// cyclic bundles end the walk.
pub fn cyclic_check(path: &[&str], context: &Context, node: &Node) -> bool {
    let mut walk = CycleWalk {
        context,
        path: path.iter().map(|name| name.to_string()).collect(),
        acyclic: HashSet::new(),
    };
    walk.visit(node)
}

/// True iff the binding of `name` in `context` is self-referential.
pub fn is_cyclic(context: &Context, name: &str) -> bool {
    context
        .get(name)
        .map(|node| cyclic_check(&[name], context, node))
        .unwrap_or(false)
}

struct CycleWalk<'a> {
    context: &'a Context,
    path: Vec<String>,
    /// Names fully walked without finding a cycle
    acyclic: HashSet<String>,
}

impl CycleWalk<'_> {
    fn visit(&mut self, node: &Node) -> bool {
        match &node.kind {
            Kind::Ref(name) => self.visit_reference(name),
            Kind::Generic { .. } | Kind::Cyclic { .. } => false,
            _ => node.children().into_iter().any(|child| self.visit(child)),
        }
    }

    fn visit_reference(&mut self, name: &str) -> bool {
        if self.path.iter().any(|entry| entry == name) {
            return true;
        }
        if self.acyclic.contains(name) {
            return false;
        }
        let Some(target) = self.context.get(name) else {
            return false;
        };
        self.path.push(name.to_string());
        let cyclic = self.visit(target);
        self.path.pop();
        if !cyclic {
            self.acyclic.insert(name.to_string());
        }
        cyclic
    }
}

/// Where a call target leads once its reference chain is followed.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// A generic, with the name it was defined under
    Generic {
        name: &'a str,
        parameters: &'a [Parameter],
        body: &'a Node,
    },
    /// A bound, non-generic node
    Concrete(&'a Node),
    /// An absent name, or a reference chain looping on itself
    Unresolved,
}

/// Follow a chain of references starting at `name` until it lands on
/// something other than a reference.
pub fn chase<'a>(context: &'a Context, name: &'a str) -> Target<'a> {
    let mut path: Vec<&str> = Vec::new();
    let mut current = name;
    loop {
        if path.contains(&current) {
            return Target::Unresolved;
        }
        let Some(node) = context.get(current) else {
            return Target::Unresolved;
        };
        path.push(current);
        match &node.kind {
            Kind::Ref(next) => current = next,
            Kind::Generic { parameters, body } => {
                return Target::Generic {
                    name: current,
                    parameters,
                    body,
                }
            }
            _ => return Target::Concrete(node),
        }
    }
}
