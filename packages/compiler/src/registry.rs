use crate::config::CompilerConfig;
use crate::error::{CompileError, CompileResult};
use crate::gateway::Gateway;
use crate::scoping::{is_scoped_style, scope_selector, scope_style, SCOPED_ATTRIBUTE};
use crate::setup::execute_setup_block;
use crc32fast::Hasher;
use indexmap::IndexMap;
use loom_common::{Bindings, ScriptEngine, Value};
use loom_tree::{Fragment, NodeKind, Position, Tree};
use std::collections::HashSet;

/// A reusable piece of markup referenced by tag name
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentTemplate {
    pub name: String,
    /// Template element cloned into every call site
    pub root: Fragment,
    /// Side nodes emitted once per compilation, before the first use
    pub styles: Vec<Fragment>,
    pub scripts: Vec<Fragment>,
    /// Default context, overridden by call-site attributes
    pub context: Bindings,
}

impl ComponentTemplate {
    pub fn new(name: impl Into<String>, root: Fragment) -> Self {
        Self {
            name: name.into(),
            root,
            styles: Vec::new(),
            scripts: Vec::new(),
            context: Bindings::new(),
        }
    }

    pub fn with_style(mut self, css: impl Into<String>) -> Self {
        self.styles
            .push(Fragment::element("style").child(Fragment::text(css)));
        self
    }

    /// Style whose rules only match this component's markup
    pub fn with_scoped_style(mut self, css: impl Into<String>) -> Self {
        self.styles.push(
            Fragment::element("style")
                .flag(SCOPED_ATTRIBUTE)
                .child(Fragment::text(css)),
        );
        self
    }

    pub fn with_script(mut self, js: impl Into<String>) -> Self {
        self.scripts
            .push(Fragment::element("script").child(Fragment::text(js)));
        self
    }

    pub fn with_context(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(name.into(), value.into());
        self
    }

    /// Build a template from a parsed component file.
    ///
    /// Top-level `style` and `script` elements become side nodes, top-level
    /// setup blocks run into the default context, and exactly one other
    /// element must remain as the template root.
    pub fn from_tree(
        name: impl Into<String>,
        tree: &Tree,
        engine: &dyn ScriptEngine,
        config: &CompilerConfig,
    ) -> CompileResult<Self> {
        let name = name.into();
        let gateway = Gateway::new(engine);
        let mut template = Self::new(name.clone(), Fragment::root([]));
        let mut roots = Vec::new();

        for child in tree.children(tree.root()) {
            let node = tree.node(*child)?;
            match &node.kind {
                NodeKind::Comment(_) | NodeKind::Doctype { .. } => {}
                NodeKind::Text(lit) if lit.content.trim().is_empty() => {}
                NodeKind::Text(lit) => {
                    return Err(CompileError::invalid_component(
                        name,
                        format!("stray text {:?} outside the template root", lit.content.trim()),
                    ));
                }
                NodeKind::Element(el) if el.tag == "style" => template.styles.push(tree.to_fragment(*child)?),
                NodeKind::Element(el) if el.tag == "script" => template.scripts.push(tree.to_fragment(*child)?),
                NodeKind::Element(el) if el.tag == config.setup_tag => {
                    let context = std::mem::take(&mut template.context);
                    template.context = execute_setup_block(tree, *child, gateway, context)?;
                }
                NodeKind::Element(_) => roots.push(*child),
                NodeKind::Root => {}
            }
        }

        let root = match roots.as_slice() {
            [root] => *root,
            [] => return Err(CompileError::invalid_component(name, "no root element")),
            many => {
                return Err(CompileError::invalid_component(
                    name,
                    format!("expected a single root element, found {}", many.len()),
                ))
            }
        };
        if tree.element(root).is_some_and(|el| config.is_loop(el)) {
            return Err(CompileError::invalid_component(name, "the root element cannot be a loop"));
        }

        template.root = tree.to_fragment(root)?;
        template.check_slots(config)?;
        Ok(template)
    }

    /// At most one default slot marker and no duplicate named markers
    pub fn check_slots(&self, config: &CompilerConfig) -> CompileResult<()> {
        let mut defaults = 0;
        let mut named = HashSet::new();
        let mut stack = vec![&self.root];
        while let Some(fragment) = stack.pop() {
            if let Some(el) = fragment.as_element().filter(|el| el.tag == config.slot_tag) {
                match el.attribute("name").and_then(|v| v.as_text()) {
                    Some(slot) => {
                        if !named.insert(slot.to_string()) {
                            return Err(CompileError::invalid_component(
                                &self.name,
                                format!("duplicate slot '{}'", slot),
                            ));
                        }
                    }
                    None => defaults += 1,
                }
            }
            stack.extend(fragment.children());
        }
        if defaults > 1 {
            return Err(CompileError::invalid_component(
                &self.name,
                format!("{} default slots, at most one is allowed", defaults),
            ));
        }
        Ok(())
    }

    /// Stable id of this template, derived from its name and markup
    pub fn scope_id(&self) -> String {
        let mut hasher = Hasher::new();
        hasher.update(self.name.as_bytes());
        for fragment in std::iter::once(&self.root).chain(&self.styles) {
            if let Ok(json) = serde_json::to_string(fragment) {
                hasher.update(json.as_bytes());
            }
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn has_scoped_styles(&self) -> bool {
        self.styles.iter().any(is_scoped_style)
    }

    /// Styles as emitted, with scoped rules confined to the stamped roots
    pub fn side_styles(&self, config: &CompilerConfig) -> Vec<Fragment> {
        if !self.has_scoped_styles() {
            return self.styles.clone();
        }
        let selector = scope_selector(&config.scope_attribute, &self.scope_id());
        self.styles.iter().map(|style| scope_style(style, &selector)).collect()
    }

    pub fn has_assets(&self) -> bool {
        !self.styles.is_empty() || !self.scripts.is_empty()
    }
}

/// Components available to a compilation, by tag name
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    components: IndexMap<String, ComponentTemplate>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template under its name, returning the one it replaces
    pub fn register(&mut self, template: ComponentTemplate) -> Option<ComponentTemplate> {
        self.components.insert(template.name.clone(), template)
    }

    pub fn get(&self, name: &str) -> Option<&ComponentTemplate> {
        self.components.get(name)
    }

    pub fn lookup(&self, name: &str, position: Option<Position>) -> CompileResult<&ComponentTemplate> {
        self.get(name).ok_or_else(|| CompileError::ComponentNotFound {
            name: name.to_string(),
            position,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }
}
