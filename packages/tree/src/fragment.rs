use crate::node::{AttrValue, Element, Literal, NodeKind, Position};
use loom_common::Value;
use serde::{Deserialize, Serialize};

/// Owned, id-free subtree.
///
/// Fragments are instantiated into a [`crate::Tree`] with
/// [`crate::Tree::instantiate`] and captured back with
/// [`crate::Tree::to_fragment`]. `children` is `None` for leaves and void
/// elements, `Some` (possibly empty) for containers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Fragment>>,
}

impl Fragment {
    pub fn root(children: impl IntoIterator<Item = Fragment>) -> Self {
        Self {
            kind: NodeKind::Root,
            position: None,
            children: Some(children.into_iter().collect()),
        }
    }

    /// Element with an (initially empty) child list
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Element(Element::new(tag)),
            position: None,
            children: Some(Vec::new()),
        }
    }

    /// Element that cannot hold children (`<br>`, `<img>`, self-closed tags)
    pub fn void(tag: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Element(Element::new(tag)),
            position: None,
            children: None,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Text(Literal::new(content)),
            position: None,
            children: None,
        }
    }

    pub fn comment(content: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Comment(Literal::new(content)),
            position: None,
            children: None,
        }
    }

    pub fn doctype(name: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Doctype { name: name.into() },
            position: None,
            children: None,
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        if let NodeKind::Element(el) = &mut self.kind {
            el.attributes.insert(name.into(), value.into());
        }
        self
    }

    /// Valueless attribute, e.g. `disabled` or `@else`
    pub fn flag(self, name: impl Into<String>) -> Self {
        self.attr(name, true)
    }

    pub fn with_context(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        if let NodeKind::Element(el) = &mut self.kind {
            el.context.insert(name.into(), value.into());
        }
        self
    }

    pub fn child(mut self, child: Fragment) -> Self {
        self.children.get_or_insert_with(Vec::new).push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Fragment>) -> Self {
        self.children
            .get_or_insert_with(Vec::new)
            .extend(children);
        self
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.position = Some(Position::new(line, column));
        self
    }

    /// Mark a text/comment literal as preformatted
    pub fn preformatted(mut self) -> Self {
        if let NodeKind::Text(lit) | NodeKind::Comment(lit) = &mut self.kind {
            lit.in_pre = true;
        }
        self
    }

    pub fn as_element(&self) -> Option<&Element> {
        self.kind.as_element()
    }

    pub fn children(&self) -> &[Fragment] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Copy with every position removed, recursively
    pub fn without_positions(&self) -> Fragment {
        Fragment {
            kind: self.kind.clone(),
            position: None,
            children: self
                .children
                .as_ref()
                .map(|children| children.iter().map(Fragment::without_positions).collect()),
        }
    }
}
