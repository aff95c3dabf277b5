//! # Loom Tree
//!
//! Arena-backed markup tree.
//!
//! Nodes live in a slot vector owned by [`Tree`] and are addressed by copyable
//! [`NodeId`] handles. Parent back-references are plain ids, so ancestor lookups
//! never fight the borrow checker and detaching a subtree is an O(depth) edit.
//!
//! ## Invariants
//!
//! - A node appears in at most one parent's child list, and its `parent` field
//!   names exactly that parent.
//! - Only `Root` and non-void `Element` nodes own a child list.
//! - Freed slots are never reused, so a stale id resolves to `None` instead of
//!   aliasing a newer node.
//!
//! [`Fragment`] is the owned, id-free form of a subtree. It is what component
//! templates store, what test builders produce and what the JSON contract reads
//! and writes.

pub mod error;
pub mod fragment;
pub mod node;
pub mod render;
pub mod traverse;
pub mod tree;
pub mod visitor;

#[cfg(test)]
mod tests_tree;


pub use error::{TreeError, TreeResult};
pub use fragment::Fragment;
pub use node::{AttrValue, Attributes, Element, Literal, Node, NodeId, NodeKind, Position};
pub use render::{render_html, RenderOptions};
pub use traverse::{Ancestors, Descendants};
pub use tree::Tree;
pub use visitor::{walk, VisitFlow, Visitor};
