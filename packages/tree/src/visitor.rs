use crate::node::{Node, NodeId};
use crate::tree::Tree;

/// What a visitor wants the walker to do after entering a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitFlow {
    Continue,
    SkipChildren,
    Stop,
}

/// Read-only traversal hooks
///
/// `enter` is called before a node's children are walked and `leave` after.
/// Override only the hooks you need; the defaults walk the whole subtree.
pub trait Visitor {
    fn enter(&mut self, _tree: &Tree, _id: NodeId, _node: &Node) -> VisitFlow {
        VisitFlow::Continue
    }

    fn leave(&mut self, _tree: &Tree, _id: NodeId, _node: &Node) {}
}

/// Walk the subtree at `id` depth-first. Returns `VisitFlow::Stop` when the
/// visitor stopped the walk early.
pub fn walk<V: Visitor + ?Sized>(visitor: &mut V, tree: &Tree, id: NodeId) -> VisitFlow {
    let Some(node) = tree.get(id) else {
        return VisitFlow::Continue;
    };
    match visitor.enter(tree, id, node) {
        VisitFlow::Stop => return VisitFlow::Stop,
        VisitFlow::SkipChildren => {}
        VisitFlow::Continue => {
            for child in node.children() {
                if walk(visitor, tree, *child) == VisitFlow::Stop {
                    return VisitFlow::Stop;
                }
            }
        }
    }
    visitor.leave(tree, id, node);
    VisitFlow::Continue
}
