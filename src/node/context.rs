//! Ordered name → node environment.
//!
//! A `Context` is never mutated through its public API: binding a name
//! produces a new context and leaves the original untouched.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::Node;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    entries: IndexMap<String, Node>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// New context with `name` bound to `node`. An existing binding is
    /// replaced in place, keeping its position.
    pub fn with(&self, name: impl Into<String>, node: Node) -> Context {
        let mut entries = self.entries.clone();
        entries.insert(name.into(), node);
        Context { entries }
    }

    /// New context with every binding of `other` layered over this one.
    pub fn extend(&self, other: &Context) -> Context {
        let mut entries = self.entries.clone();
        for (name, node) in &other.entries {
            entries.insert(name.clone(), node.clone());
        }
        Context { entries }
    }

    /// New context without the given names.
    pub fn without<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Context {
        let mut entries = self.entries.clone();
        for name in names {
            entries.shift_remove(name);
        }
        Context { entries }
    }
}

impl FromIterator<(String, Node)> for Context {
    fn from_iter<T: IntoIterator<Item = (String, Node)>>(iter: T) -> Self {
        Context {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<(&'a str, Node)> for Context {
    fn from_iter<T: IntoIterator<Item = (&'a str, Node)>>(iter: T) -> Self {
        Context {
            entries: iter.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }
}

impl IntoIterator for Context {
    type Item = (String, Node);
    type IntoIter = indexmap::map::IntoIter<String, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
