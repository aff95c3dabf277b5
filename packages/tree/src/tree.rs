use crate::error::{TreeError, TreeResult};
use crate::fragment::Fragment;
use crate::node::{Element, Literal, Node, NodeId, NodeKind, Position};
use std::collections::HashSet;

/// Arena of markup nodes with a single `Root`
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Option<Node>>,
    root: NodeId,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node {
                parent: None,
                children: Some(Vec::new()),
                kind: NodeKind::Root,
                position: None,
            })],
            root: NodeId(0),
        }
    }

    /// Build a tree from a fragment. A `Root` fragment supplies the root's
    /// children; any other fragment becomes the single top-level node.
    pub fn from_fragment(fragment: &Fragment) -> TreeResult<Self> {
        let mut tree = Tree::new();
        let top: Vec<&Fragment> = match fragment.kind {
            NodeKind::Root => fragment.children().iter().collect(),
            _ => vec![fragment],
        };
        for child in top {
            let id = tree.instantiate(child)?;
            tree.append_child(tree.root, id)?;
        }
        Ok(tree)
    }

    pub fn from_fragments(children: impl IntoIterator<Item = Fragment>) -> TreeResult<Self> {
        Self::from_fragment(&Fragment::root(children))
    }

    pub fn from_json(json: &str) -> TreeResult<Self> {
        let fragment: Fragment = serde_json::from_str(json)?;
        Self::from_fragment(&fragment)
    }

    pub fn to_json(&self) -> TreeResult<String> {
        let fragment = self.to_fragment(self.root)?;
        Ok(serde_json::to_string_pretty(&fragment)?)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    /// Mutable access to a node's kind and position. Structure is only
    /// changed through the linking operations below.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn node(&self, id: NodeId) -> TreeResult<&Node> {
        self.get(id).ok_or(TreeError::MissingNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.get(id).and_then(Node::as_element)
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.get_mut(id).map(|node| &mut node.kind) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&Literal> {
        self.get(id).and_then(|node| node.kind.as_text())
    }

    pub fn text_mut(&mut self, id: NodeId) -> Option<&mut Literal> {
        match self.get_mut(id).map(|node| &mut node.kind) {
            Some(NodeKind::Text(lit)) => Some(lit),
            _ => None,
        }
    }

    pub fn position(&self, id: NodeId) -> Option<Position> {
        self.get(id).and_then(|node| node.position)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::children).unwrap_or(&[])
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// Whether the node is reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).any(|a| a == self.root)
    }

    /// Concatenated content of every text node below `id`
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .filter_map(|d| self.text(d))
            .map(|lit| lit.content.as_str())
            .collect()
    }

    // ---- creation -------------------------------------------------------

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(node));
        id
    }

    pub fn create_element(&mut self, element: Element, position: Option<Position>) -> NodeId {
        self.alloc(Node {
            parent: None,
            children: Some(Vec::new()),
            kind: NodeKind::Element(element),
            position,
        })
    }

    pub fn create_void_element(&mut self, element: Element, position: Option<Position>) -> NodeId {
        self.alloc(Node {
            parent: None,
            children: None,
            kind: NodeKind::Element(element),
            position,
        })
    }

    pub fn create_text(&mut self, content: impl Into<String>, position: Option<Position>) -> NodeId {
        self.alloc(Node {
            parent: None,
            children: None,
            kind: NodeKind::Text(Literal::new(content)),
            position,
        })
    }

    pub fn create_comment(&mut self, content: impl Into<String>, position: Option<Position>) -> NodeId {
        self.alloc(Node {
            parent: None,
            children: None,
            kind: NodeKind::Comment(Literal::new(content)),
            position,
        })
    }

    /// Load a fragment as a detached subtree, keeping its positions
    pub fn instantiate(&mut self, fragment: &Fragment) -> TreeResult<NodeId> {
        self.build(fragment, true, None)
    }

    /// Load a fragment as a detached subtree of synthesized nodes (no positions)
    pub fn instantiate_synthetic(&mut self, fragment: &Fragment) -> TreeResult<NodeId> {
        self.build(fragment, false, None)
    }

    fn build(
        &mut self,
        fragment: &Fragment,
        keep_positions: bool,
        parent: Option<NodeId>,
    ) -> TreeResult<NodeId> {
        if matches!(fragment.kind, NodeKind::Root) {
            return Err(TreeError::NestedRoot);
        }
        let container = matches!(fragment.kind, NodeKind::Element(_)) && fragment.children.is_some();
        let id = self.alloc(Node {
            parent,
            children: if container { Some(Vec::new()) } else { None },
            kind: fragment.kind.clone(),
            position: if keep_positions { fragment.position } else { None },
        });
        if container {
            let mut ids = Vec::with_capacity(fragment.children().len());
            for child in fragment.children() {
                ids.push(self.build(child, keep_positions, Some(id))?);
            }
            if let Some(node) = self.get_mut(id) {
                node.children = Some(ids);
            }
        }
        Ok(id)
    }

    /// Capture the subtree at `id` as an owned fragment
    pub fn to_fragment(&self, id: NodeId) -> TreeResult<Fragment> {
        let node = self.node(id)?;
        let children = match &node.children {
            Some(ids) => Some(
                ids.iter()
                    .map(|child| self.to_fragment(*child))
                    .collect::<TreeResult<Vec<_>>>()?,
            ),
            None => None,
        };
        Ok(Fragment {
            kind: node.kind.clone(),
            position: node.position,
            children,
        })
    }

    /// Deep-copy a subtree into a new detached subtree. Context maps and
    /// metadata are copied, positions are cleared.
    pub fn clone_subtree(&mut self, id: NodeId) -> TreeResult<NodeId> {
        let fragment = self.to_fragment(id)?;
        self.instantiate_synthetic(&fragment)
    }

    // ---- linking --------------------------------------------------------

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        if !self.node(parent)?.is_container() {
            return Err(TreeError::NotAContainer(parent));
        }
        if child == self.root {
            return Err(TreeError::RootImmovable);
        }
        if let Some(current) = self.node(child)?.parent {
            return Err(TreeError::AlreadyAttached {
                child,
                parent: current,
            });
        }
        if parent == child || self.ancestors(parent).any(|a| a == child) {
            return Err(TreeError::Cycle { parent, child });
        }
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        let len = self.children(parent).len();
        self.insert_children(parent, len, &[child])
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> TreeResult<()> {
        self.insert_children(parent, index, &[child])
    }

    /// Insert detached nodes at `index`, in order. Either all are inserted or none.
    pub fn insert_children(
        &mut self,
        parent: NodeId,
        index: usize,
        children: &[NodeId],
    ) -> TreeResult<()> {
        let mut seen = HashSet::new();
        for child in children {
            self.check_insertable(parent, *child)?;
            if !seen.insert(*child) {
                return Err(TreeError::AlreadyAttached {
                    child: *child,
                    parent,
                });
            }
        }
        let len = self.children(parent).len();
        if index > len {
            return Err(TreeError::IndexOutOfBounds { index, len });
        }
        for child in children {
            if let Some(node) = self.get_mut(*child) {
                node.parent = Some(parent);
            }
        }
        if let Some(list) = self.get_mut(parent).and_then(|node| node.children.as_mut()) {
            list.splice(index..index, children.iter().copied());
        }
        Ok(())
    }

    /// Unlink a node from its parent. The subtree stays alive as a detached
    /// subtree. Returns the index it occupied, if it was attached.
    pub fn detach(&mut self, id: NodeId) -> TreeResult<Option<usize>> {
        if id == self.root {
            return Err(TreeError::RootImmovable);
        }
        let Some(parent) = self.node(id)?.parent else {
            return Ok(None);
        };
        let index = self.index_in_parent(id).ok_or_else(|| {
            TreeError::BrokenLink(format!("{} is not listed under its parent {}", id, parent))
        })?;
        if let Some(list) = self.get_mut(parent).and_then(|node| node.children.as_mut()) {
            list.remove(index);
        }
        if let Some(node) = self.get_mut(id) {
            node.parent = None;
        }
        Ok(Some(index))
    }

    /// Detach several nodes, returning them in the given order
    pub fn detach_all(&mut self, ids: &[NodeId]) -> TreeResult<Vec<NodeId>> {
        for id in ids {
            self.detach(*id)?;
        }
        Ok(ids.to_vec())
    }

    /// Unlink and free a subtree
    pub fn remove(&mut self, id: NodeId) -> TreeResult<()> {
        self.detach(id)?;
        self.free(id);
        Ok(())
    }

    /// Replace an attached node by a sequence of detached nodes, in place.
    /// The replaced subtree is freed.
    pub fn replace_with(&mut self, id: NodeId, replacements: &[NodeId]) -> TreeResult<()> {
        let parent = self.node(id)?.parent;
        match (parent, self.detach(id)?) {
            (Some(parent), Some(index)) => {
                if let Err(err) = self.insert_children(parent, index, replacements) {
                    // restore the original link before reporting
                    self.insert_child(parent, index, id)?;
                    return Err(err);
                }
            }
            _ => {
                return Err(TreeError::BrokenLink(format!(
                    "cannot replace detached node {}",
                    id
                )))
            }
        }
        self.free(id);
        Ok(())
    }

    fn free(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current.index()).and_then(Option::take) {
                stack.extend(node.children.unwrap_or_default());
            }
        }
    }

    /// Verify parent/child links in both directions for every attached node
    pub fn check_integrity(&self) -> TreeResult<()> {
        for id in self.descendants(self.root) {
            for child in self.children(id) {
                let node = self.node(*child)?;
                if node.parent != Some(id) {
                    return Err(TreeError::BrokenLink(format!(
                        "{} lists {} as a child but its parent is {:?}",
                        id, child, node.parent
                    )));
                }
            }
            if let Some(parent) = self.node(id)?.parent {
                let count = self.children(parent).iter().filter(|c| **c == id).count();
                if count != 1 {
                    return Err(TreeError::BrokenLink(format!(
                        "{} appears {} times under {}",
                        id, count, parent
                    )));
                }
            }
        }
        Ok(())
    }
}
