use crate::cache::ComponentCache;
use crate::config::CompilerConfig;
use crate::error::CompileResult;
use crate::gateway::Gateway;
use crate::registry::ComponentRegistry;
use loom_common::Bindings;
use loom_tree::{NodeId, Position, Tree};
use std::collections::HashSet;
use std::iter;

/// A pass run once per scope (the root and then every element), operating
/// on the scope's direct children only.
pub trait ScopedStep {
    fn name(&self) -> &str;

    fn run(&self, cx: &mut PassContext<'_>, scope: NodeId) -> CompileResult<()>;
}

/// Everything a pass can see or touch during one compilation
pub struct PassContext<'a> {
    pub tree: &'a mut Tree,
    pub config: &'a CompilerConfig,
    pub gateway: Gateway<'a>,
    pub registry: &'a ComponentRegistry,
    pub cache: &'a mut ComponentCache,
    /// Bindings produced by setup blocks and the caller, below every context map
    pub globals: &'a Bindings,
    /// Text nodes whose markers were already substituted
    pub settled: HashSet<NodeId>,
}

impl<'a> PassContext<'a> {
    /// Bindings visible at `id`: globals, then each ancestor's context from the
    /// root down, then the node's own context. Nearer scopes win.
    pub fn bindings_for(&self, id: NodeId) -> Bindings {
        let mut bindings = self.globals.clone();
        bindings.extend(self.context_for(id));
        bindings
    }

    /// Context maps in scope at `id`, without the globals
    pub fn context_for(&self, id: NodeId) -> Bindings {
        let mut context = Bindings::new();
        for ancestor in self.tree.ancestors_root_first(id).into_iter().chain(iter::once(id)) {
            if let Some(el) = self.tree.element(ancestor) {
                context.extend(el.context.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        context
    }

    /// Position of the node, or of its nearest positioned ancestor
    pub fn position_of(&self, id: NodeId) -> Option<Position> {
        iter::once(id)
            .chain(self.tree.ancestors(id))
            .find_map(|n| self.tree.position(n))
    }

    /// Whether `id` is (inside) an element whose text is never interpolated
    pub fn is_raw_text(&self, id: NodeId) -> bool {
        self.within(id, |tag| self.config.is_raw_text_tag(tag))
    }

    /// Whether `id` is (inside) an element whose text keeps its whitespace
    pub fn is_preformatted(&self, id: NodeId) -> bool {
        self.within(id, |tag| self.config.is_preformatted_tag(tag))
    }

    fn within(&self, id: NodeId, pred: impl Fn(&str) -> bool) -> bool {
        iter::once(id)
            .chain(self.tree.ancestors(id))
            .filter_map(|n| self.tree.element(n))
            .any(|el| pred(&el.tag))
    }

    /// Element siblings following `id` that continue its conditional chain
    /// (`elif`s, optionally closed by one `else`). Text and comments in
    /// between are skipped; any other element ends the chain.
    pub fn chained_fallbacks(&self, id: NodeId) -> Vec<NodeId> {
        use crate::config::Directive;
        use loom_tree::NodeKind;

        let Some(parent) = self.tree.parent(id) else {
            return Vec::new();
        };
        let siblings = self.tree.children(parent);
        let Some(start) = siblings.iter().position(|s| *s == id) else {
            return Vec::new();
        };

        let mut chain = Vec::new();
        for sibling in &siblings[start + 1..] {
            let Some(node) = self.tree.get(*sibling) else {
                continue;
            };
            let el = match &node.kind {
                NodeKind::Text(_) | NodeKind::Comment(_) => continue,
                NodeKind::Element(el) => el,
                _ => break,
            };
            match self.config.directives_of(el).first().map(|(d, _)| *d) {
                Some(Directive::Elif) => chain.push(*sibling),
                Some(Directive::Else) => {
                    chain.push(*sibling);
                    break;
                }
                _ => break,
            }
        }
        chain
    }
}
