//! Post-compilation check that nothing meant for the compiler survived.

use crate::config::CompilerConfig;
use crate::error::at;
use crate::interpolation::{split_markers, Segment};
use loom_tree::{walk, Node, NodeId, NodeKind, Position, Tree, VisitFlow, Visitor};
use std::fmt;

/// Compiler syntax left in an output tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Residue {
    Directive {
        tag: String,
        attribute: String,
        position: Option<Position>,
    },
    LoopElement {
        position: Option<Position>,
    },
    Marker {
        text: String,
        position: Option<Position>,
    },
}

impl fmt::Display for Residue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Residue::Directive {
                tag,
                attribute,
                position,
            } => write!(f, "directive '{}' on <{}> at {}", attribute, tag, at(position)),
            Residue::LoopElement { position } => write!(f, "loop element at {}", at(position)),
            Residue::Marker { text, position } => {
                write!(f, "interpolation marker in {:?} at {}", text, at(position))
            }
        }
    }
}

/// Every directive attribute, loop element and interpolation marker below
/// the root. Text inside raw-text elements is not inspected.
pub fn find_residue(tree: &Tree, config: &CompilerConfig) -> Vec<Residue> {
    let mut finder = ResidueFinder {
        config,
        found: Vec::new(),
    };
    walk(&mut finder, tree, tree.root());
    finder.found
}

struct ResidueFinder<'a> {
    config: &'a CompilerConfig,
    found: Vec<Residue>,
}

impl ResidueFinder<'_> {
    fn check_text(&mut self, text: &str, position: Option<Position>) {
        let marked = match split_markers(text) {
            Ok(segments) => segments.iter().any(|s| matches!(s, Segment::Marker(_))),
            Err(_) => true,
        };
        if marked {
            self.found.push(Residue::Marker {
                text: text.to_string(),
                position,
            });
        }
    }
}

impl Visitor for ResidueFinder<'_> {
    fn enter(&mut self, _tree: &Tree, _id: NodeId, node: &Node) -> VisitFlow {
        match &node.kind {
            NodeKind::Element(el) => {
                if self.config.is_loop(el) {
                    self.found.push(Residue::LoopElement {
                        position: node.position,
                    });
                }
                for (attribute, value) in &el.attributes {
                    if self.config.directive(attribute).is_some() {
                        self.found.push(Residue::Directive {
                            tag: el.tag.clone(),
                            attribute: attribute.clone(),
                            position: node.position,
                        });
                    } else if let Some(text) = value.as_text() {
                        self.check_text(text, node.position);
                    }
                }
                if self.config.is_raw_text_tag(&el.tag) {
                    return VisitFlow::SkipChildren;
                }
            }
            NodeKind::Text(lit) => self.check_text(&lit.content, node.position),
            _ => {}
        }
        VisitFlow::Continue
    }
}
