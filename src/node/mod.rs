//! Schema Node Model
//!
//! Closed tagged-variant tree describing every expressible type: concrete
//! shapes (objects, arrays, unions, literals, functions), plus the
//! parameterized forms the engine reduces (references, generics, calls,
//! deferred operator applications, cyclic bundles, template patterns).
//!
//! Nodes are immutable values. Every transformation produces a new node;
//! apparent recursion is always mediated by a `Ref` resolved through a
//! [`Context`], or packaged explicitly as `Cyclic`.

pub mod context;
pub mod operators;
pub mod pattern;

pub use context::Context;
pub use operators::*;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered property map of an object node.
pub type Properties = IndexMap<String, Node>;

/// Free-form metadata carried by a node (title, description, ...).
pub type Annotations = BTreeMap<String, serde_json::Value>;

// =============================================================================
// Node
// =============================================================================

/// A single value in the schema expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// What this node describes
    pub kind: Kind,
    /// Optional / read-only flags (meaningful when the node is an object property)
    #[serde(default, skip_serializing_if = "Modifiers::is_empty")]
    pub modifiers: Modifiers,
    /// Metadata preserved through instantiation
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: Annotations,
}

/// Per-node property modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub readonly: bool,
}

impl Modifiers {
    pub fn is_empty(&self) -> bool {
        !self.optional && !self.readonly
    }

    /// Union of both flag sets.
    pub fn merge(self, other: Modifiers) -> Modifiers {
        Modifiers {
            optional: self.optional || other.optional,
            readonly: self.readonly || other.readonly,
        }
    }
}

/// The node variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Primitive(Primitive),
    Literal(Literal),
    Array(Box<Node>),
    /// When `rest` is set the last item is a rest element (normally an `Array`).
    Tuple {
        items: Vec<Node>,
        #[serde(default)]
        rest: bool,
    },
    Object(Properties),
    Union(Vec<Node>),
    Intersect(Vec<Node>),
    Function {
        parameters: Vec<Node>,
        returns: Box<Node>,
    },
    Constructor {
        parameters: Vec<Node>,
        instance: Box<Node>,
    },
    Wrapper {
        wrapper: WrapperKind,
        item: Box<Node>,
    },
    Dictionary {
        key: Box<Node>,
        value: Box<Node>,
    },
    Ref(String),
    Parameter(Parameter),
    Generic {
        parameters: Vec<Parameter>,
        body: Box<Node>,
    },
    Call {
        target: Box<Node>,
        arguments: Vec<Node>,
    },
    Deferred(Deferred),
    Cyclic {
        definitions: Context,
        root: String,
    },
    /// Opaque pattern type, e.g. `` `id-${number}` ``.
    TemplatePattern(Vec<Node>),
}

/// Primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    Any,
    Unknown,
    Never,
    String,
    Number,
    Integer,
    Boolean,
    BigInt,
    Null,
    Undefined,
    Void,
    Symbol,
}

impl Primitive {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Unknown => "unknown",
            Self::Never => "never",
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::BigInt => "bigint",
            Self::Null => "null",
            Self::Undefined => "undefined",
            Self::Void => "void",
            Self::Symbol => "symbol",
        }
    }
}

/// Literal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    String(String),
    Number(f64),
    Boolean(bool),
}

impl Literal {
    /// Text used when the literal acts as a property key or template span.
    pub fn to_key(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Number(n) if n.is_infinite() && n.is_sign_positive() => "Infinity".to_string(),
            Self::Number(n) if n.is_infinite() => "-Infinity".to_string(),
            // Integral values print without a fraction at any magnitude
            Self::Number(n) => n.to_string(),
            Self::Boolean(b) => b.to_string(),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Number(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Number(value as f64)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Boolean(value)
    }
}

/// Container kinds wrapping a single item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapperKind {
    Promise,
    Iterator,
    AsyncIterator,
}

impl WrapperKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Promise => "Promise",
            Self::Iterator => "Iterator",
            Self::AsyncIterator => "AsyncIterator",
        }
    }
}

/// A generic parameter: `name extends constraint = default`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub constraint: Box<Node>,
    pub default: Box<Node>,
}

/// An operator application whose reduction may be postponed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deferred {
    pub operator: Operator,
    pub operands: Vec<Node>,
    /// Merged into the annotations of the reduced result
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: Annotations,
}

/// Named type-level operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Pick,
    Omit,
    Partial,
    Required,
    Readonly,
    Writable,
    KeyOf,
    Index,
    Evaluate,
    Exclude,
    Extract,
    Awaited,
    Capitalize,
    Uncapitalize,
    Uppercase,
    Lowercase,
    ReturnType,
    Parameters,
    ConstructorParameters,
    InstanceType,
    NonNullable,
    Record,
    Mapped,
    Conditional,
    TemplateLiteral,
    Interface,
    Module,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pick => "Pick",
            Self::Omit => "Omit",
            Self::Partial => "Partial",
            Self::Required => "Required",
            Self::Readonly => "Readonly",
            Self::Writable => "Writable",
            Self::KeyOf => "KeyOf",
            Self::Index => "Index",
            Self::Evaluate => "Evaluate",
            Self::Exclude => "Exclude",
            Self::Extract => "Extract",
            Self::Awaited => "Awaited",
            Self::Capitalize => "Capitalize",
            Self::Uncapitalize => "Uncapitalize",
            Self::Uppercase => "Uppercase",
            Self::Lowercase => "Lowercase",
            Self::ReturnType => "ReturnType",
            Self::Parameters => "Parameters",
            Self::ConstructorParameters => "ConstructorParameters",
            Self::InstanceType => "InstanceType",
            Self::NonNullable => "NonNullable",
            Self::Record => "Record",
            Self::Mapped => "Mapped",
            Self::Conditional => "Conditional",
            Self::TemplateLiteral => "TemplateLiteral",
            Self::Interface => "Interface",
            Self::Module => "Module",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Node API
// =============================================================================

impl Node {
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            modifiers: Modifiers::default(),
            annotations: Annotations::new(),
        }
    }

    /// Replace the kind while keeping modifiers and annotations.
    pub fn rebuild(&self, kind: Kind) -> Node {
        Node {
            kind,
            modifiers: self.modifiers,
            annotations: self.annotations.clone(),
        }
    }

    /// Carry `origin`'s modifiers and annotations over to this node.
    ///
    /// Used when a node is replaced by whatever it reduced to; `origin`'s
    /// annotations win on key collisions.
    pub fn inherit(mut self, origin: &Node) -> Node {
        self.modifiers = self.modifiers.merge(origin.modifiers);
        for (key, value) in &origin.annotations {
            self.annotations.insert(key.clone(), value.clone());
        }
        self
    }

    pub fn optional(mut self) -> Self {
        self.modifiers.optional = true;
        self
    }

    pub fn readonly(mut self) -> Self {
        self.modifiers.readonly = true;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn annotate(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn is_optional(&self) -> bool {
        self.modifiers.optional
    }

    pub fn as_primitive(&self) -> Option<Primitive> {
        match &self.kind {
            Kind::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn is_primitive(&self, primitive: Primitive) -> bool {
        self.as_primitive() == Some(primitive)
    }

    pub fn is_never(&self) -> bool {
        self.is_primitive(Primitive::Never)
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match &self.kind {
            Kind::Literal(l) => Some(l),
            _ => None,
        }
    }

    pub fn properties(&self) -> Option<&Properties> {
        match &self.kind {
            Kind::Object(props) => Some(props),
            _ => None,
        }
    }

    /// True for nodes the engine may still reduce: references, calls,
    /// deferred actions and free parameters.
    pub fn is_unresolved(&self) -> bool {
        matches!(
            self.kind,
            Kind::Ref(_) | Kind::Call { .. } | Kind::Deferred(_) | Kind::Parameter(_)
        )
    }

    /// True iff no reference, call, deferred action, parameter or generic
    /// occurs anywhere outside a cyclic bundle.
    pub fn is_concrete(&self) -> bool {
        match &self.kind {
            Kind::Ref(_)
            | Kind::Call { .. }
            | Kind::Deferred(_)
            | Kind::Parameter(_)
            | Kind::Generic { .. } => false,
            _ => self.children().into_iter().all(Node::is_concrete),
        }
    }

    /// Direct child nodes. Cyclic bundles are opaque and report none.
    pub fn children(&self) -> Vec<&Node> {
        match &self.kind {
            Kind::Primitive(_) | Kind::Literal(_) | Kind::Ref(_) | Kind::Cyclic { .. } => Vec::new(),
            Kind::Array(item) => vec![item],
            Kind::Tuple { items, .. } => items.iter().collect(),
            Kind::Object(props) => props.values().collect(),
            Kind::Union(variants) => variants.iter().collect(),
            Kind::Intersect(parts) => parts.iter().collect(),
            Kind::Function { parameters, returns } => {
                parameters.iter().chain(std::iter::once(returns.as_ref())).collect()
            }
            Kind::Constructor { parameters, instance } => {
                parameters.iter().chain(std::iter::once(instance.as_ref())).collect()
            }
            Kind::Wrapper { item, .. } => vec![item],
            Kind::Dictionary { key, value } => vec![key, value],
            Kind::Parameter(p) => vec![&p.constraint, &p.default],
            Kind::Generic { parameters, body } => parameters
                .iter()
                .flat_map(|p| [p.constraint.as_ref(), p.default.as_ref()])
                .chain(std::iter::once(body.as_ref()))
                .collect(),
            Kind::Call { target, arguments } => {
                std::iter::once(target.as_ref()).chain(arguments.iter()).collect()
            }
            Kind::Deferred(d) => d.operands.iter().collect(),
            Kind::TemplatePattern(fragments) => fragments.iter().collect(),
        }
    }

    /// Names referenced anywhere beneath this node, in first-seen order.
    ///
    /// Parameter names of a generic are not reported from inside its body.
    pub fn references(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_references(self, &[], &mut out);
        out
    }
}

fn collect_references(node: &Node, shadowed: &[&str], out: &mut Vec<String>) {
    match &node.kind {
        Kind::Ref(name) => {
            if !shadowed.contains(&name.as_str()) && !out.contains(name) {
                out.push(name.clone());
            }
        }
        Kind::Generic { parameters, body } => {
            let mut inner: Vec<&str> = shadowed.to_vec();
            inner.extend(parameters.iter().map(|p| p.name.as_str()));
            for p in parameters {
                collect_references(&p.constraint, &inner, out);
                collect_references(&p.default, &inner, out);
            }
            collect_references(body, &inner, out);
        }
        _ => {
            for child in node.children() {
                collect_references(child, shadowed, out);
            }
        }
    }
}

// =============================================================================
// Factories
// =============================================================================

pub fn primitive(primitive: Primitive) -> Node {
    Node::new(Kind::Primitive(primitive))
}

pub fn any() -> Node {
    primitive(Primitive::Any)
}

pub fn unknown() -> Node {
    primitive(Primitive::Unknown)
}

pub fn never() -> Node {
    primitive(Primitive::Never)
}

pub fn string() -> Node {
    primitive(Primitive::String)
}

pub fn number() -> Node {
    primitive(Primitive::Number)
}

pub fn integer() -> Node {
    primitive(Primitive::Integer)
}

pub fn boolean() -> Node {
    primitive(Primitive::Boolean)
}

pub fn bigint() -> Node {
    primitive(Primitive::BigInt)
}

pub fn null() -> Node {
    primitive(Primitive::Null)
}

pub fn undefined() -> Node {
    primitive(Primitive::Undefined)
}

pub fn void() -> Node {
    primitive(Primitive::Void)
}

pub fn symbol() -> Node {
    primitive(Primitive::Symbol)
}

pub fn literal(value: impl Into<Literal>) -> Node {
    Node::new(Kind::Literal(value.into()))
}

pub fn array(item: Node) -> Node {
    Node::new(Kind::Array(Box::new(item)))
}

pub fn tuple(items: Vec<Node>) -> Node {
    Node::new(Kind::Tuple { items, rest: false })
}

/// Tuple whose last element is a rest element of `rest_item`.
pub fn rest_tuple(mut items: Vec<Node>, rest_item: Node) -> Node {
    items.push(array(rest_item));
    Node::new(Kind::Tuple { items, rest: true })
}

pub fn object<K, I>(properties: I) -> Node
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Node)>,
{
    Node::new(Kind::Object(
        properties.into_iter().map(|(k, v)| (k.into(), v)).collect(),
    ))
}

/// Raw union, exactly as given.
pub fn union(variants: Vec<Node>) -> Node {
    Node::new(Kind::Union(variants))
}

/// Normalized union: nested unions flattened, duplicates and `never`
/// dropped, zero variants become `never`, one variant stands alone.
pub fn union_of(variants: impl IntoIterator<Item = Node>) -> Node {
    let mut flat: Vec<Node> = Vec::new();
    fn push(flat: &mut Vec<Node>, node: Node) {
        match node.kind {
            Kind::Union(inner) if node.modifiers.is_empty() && node.annotations.is_empty() => {
                for v in inner {
                    push(flat, v);
                }
            }
            Kind::Primitive(Primitive::Never) => {}
            _ => {
                if !flat.contains(&node) {
                    flat.push(node);
                }
            }
        }
    }
    for variant in variants {
        push(&mut flat, variant);
    }
    match flat.len() {
        0 => never(),
        1 => flat.remove(0),
        _ => union(flat),
    }
}

pub fn intersect(parts: Vec<Node>) -> Node {
    Node::new(Kind::Intersect(parts))
}

pub fn function(parameters: Vec<Node>, returns: Node) -> Node {
    Node::new(Kind::Function {
        parameters,
        returns: Box::new(returns),
    })
}

pub fn constructor(parameters: Vec<Node>, instance: Node) -> Node {
    Node::new(Kind::Constructor {
        parameters,
        instance: Box::new(instance),
    })
}

pub fn wrapper(wrapper: WrapperKind, item: Node) -> Node {
    Node::new(Kind::Wrapper {
        wrapper,
        item: Box::new(item),
    })
}

pub fn promise(item: Node) -> Node {
    wrapper(WrapperKind::Promise, item)
}

pub fn iterator(item: Node) -> Node {
    wrapper(WrapperKind::Iterator, item)
}

pub fn async_iterator(item: Node) -> Node {
    wrapper(WrapperKind::AsyncIterator, item)
}

pub fn dictionary(key: Node, value: Node) -> Node {
    Node::new(Kind::Dictionary {
        key: Box::new(key),
        value: Box::new(value),
    })
}

pub fn reference(name: impl Into<String>) -> Node {
    Node::new(Kind::Ref(name.into()))
}

/// Unconstrained parameter (`unknown` constraint and default).
pub fn parameter(name: impl Into<String>) -> Parameter {
    parameter_extends(name, unknown())
}

/// Constrained parameter whose default is its constraint.
pub fn parameter_extends(name: impl Into<String>, constraint: Node) -> Parameter {
    let default = constraint.clone();
    parameter_with_default(name, constraint, default)
}

pub fn parameter_with_default(name: impl Into<String>, constraint: Node, default: Node) -> Parameter {
    Parameter {
        name: name.into(),
        constraint: Box::new(constraint),
        default: Box::new(default),
    }
}

/// A parameter used as a standalone node (e.g. the key binder of a mapped type).
pub fn parameter_node(parameter: Parameter) -> Node {
    Node::new(Kind::Parameter(parameter))
}

pub fn generic(parameters: Vec<Parameter>, body: Node) -> Node {
    Node::new(Kind::Generic {
        parameters,
        body: Box::new(body),
    })
}

pub fn call(target: Node, arguments: Vec<Node>) -> Node {
    Node::new(Kind::Call {
        target: Box::new(target),
        arguments,
    })
}

pub fn deferred(operator: Operator, operands: Vec<Node>) -> Node {
    Node::new(Kind::Deferred(Deferred {
        operator,
        operands,
        options: Annotations::new(),
    }))
}

pub fn cyclic(definitions: Context, root: impl Into<String>) -> Node {
    Node::new(Kind::Cyclic {
        definitions,
        root: root.into(),
    })
}

pub fn template_pattern(fragments: Vec<Node>) -> Node {
    Node::new(Kind::TemplatePattern(fragments))
}

// =============================================================================
// Display
// =============================================================================

fn join(f: &mut fmt::Formatter<'_>, nodes: &[Node], separator: &str) -> fmt::Result {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{}", node)?;
    }
    Ok(())
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::Number(_) | Literal::Boolean(_) => f.write_str(&self.to_key()),
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.constraint.is_primitive(Primitive::Unknown) {
            write!(f, " extends {}", self.constraint)?;
        }
        if self.default != self.constraint {
            write!(f, " = {}", self.default)?;
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Primitive(p) => f.write_str(p.as_str()),
            Kind::Literal(l) => write!(f, "{}", l),
            Kind::Array(item) => write!(f, "{}[]", item),
            Kind::Tuple { items, rest } => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if *rest && i + 1 == items.len() {
                        f.write_str("...")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Kind::Object(props) => {
                if props.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{ ")?;
                for (i, (key, value)) in props.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    let prefix = if value.modifiers.readonly { "readonly " } else { "" };
                    let marker = if value.modifiers.optional { "?" } else { "" };
                    let bare = value.clone().with_modifiers(Modifiers::default());
                    write!(f, "{}{}{}: {}", prefix, key, marker, bare)?;
                }
                f.write_str(" }")
            }
            Kind::Union(variants) => join(f, variants, " | "),
            Kind::Intersect(parts) => join(f, parts, " & "),
            Kind::Function { parameters, returns } => {
                f.write_str("(")?;
                join(f, parameters, ", ")?;
                write!(f, ") => {}", returns)
            }
            Kind::Constructor { parameters, instance } => {
                f.write_str("new (")?;
                join(f, parameters, ", ")?;
                write!(f, ") => {}", instance)
            }
            Kind::Wrapper { wrapper, item } => write!(f, "{}<{}>", wrapper.as_str(), item),
            Kind::Dictionary { key, value } => write!(f, "{{ [key: {}]: {} }}", key, value),
            Kind::Ref(name) => f.write_str(name),
            Kind::Parameter(p) => write!(f, "{}", p),
            Kind::Generic { parameters, body } => {
                f.write_str("<")?;
                for (i, p) in parameters.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, "> {}", body)
            }
            Kind::Call { target, arguments } => {
                write!(f, "{}<", target)?;
                join(f, arguments, ", ")?;
                f.write_str(">")
            }
            Kind::Deferred(d) => {
                write!(f, "{}<", d.operator)?;
                join(f, &d.operands, ", ")?;
                f.write_str(">")
            }
            Kind::Cyclic { root, .. } => write!(f, "cyclic {}", root),
            Kind::TemplatePattern(fragments) => {
                f.write_str("`")?;
                for fragment in fragments {
                    match &fragment.kind {
                        Kind::Literal(l) => f.write_str(&l.to_key())?,
                        _ => write!(f, "${{{}}}", fragment)?,
                    }
                }
                f.write_str("`")
            }
        }
    }
}
