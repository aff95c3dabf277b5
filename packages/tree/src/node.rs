use indexmap::IndexMap;
use loom_common::{Bindings, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a node slot inside a [`crate::Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Source position of a node that came from authored markup.
/// Nodes synthesized during compilation carry no position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Attribute value as handed over by the parser, or as produced by code
/// attributes that keep the evaluated native type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Text(String),
    Flag(bool),
    Value(Value),
}

impl AttrValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert into the runtime value seen by the script engine.
    pub fn to_value(&self) -> Value {
        match self {
            AttrValue::Text(s) => Value::String(s.clone()),
            AttrValue::Flag(b) => Value::Boolean(*b),
            AttrValue::Value(v) => v.clone(),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Flag(b)
    }
}

impl From<Value> for AttrValue {
    fn from(v: Value) -> Self {
        AttrValue::Value(v)
    }
}

pub type Attributes = IndexMap<String, AttrValue>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: Attributes,
    /// Bindings local to this element, visible to it and its descendants
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub context: Bindings,
    /// Name of the component whose substitution produced this element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }
}

/// Text or comment payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Literal {
    pub content: String,
    /// Set by the parser for text inside whitespace-sensitive elements
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub in_pre: bool,
}

impl Literal {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            in_pre: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    Root,
    Element(Element),
    Text(Literal),
    Comment(Literal),
    Doctype { name: String },
}

impl NodeKind {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&Literal> {
        match self {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// A node slot in the arena
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Option<Vec<NodeId>>,
    pub kind: NodeKind,
    pub position: Option<Position>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child ids, empty for leaves and void elements
    pub fn children(&self) -> &[NodeId] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Whether the node owns a child list (`Root` or a non-void element)
    pub fn is_container(&self) -> bool {
        self.children.is_some()
    }

    pub fn as_element(&self) -> Option<&Element> {
        self.kind.as_element()
    }
}
