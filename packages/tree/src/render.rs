//! Minimal HTML serializer used to inspect compiled trees.

use crate::node::{AttrValue, Attributes, Node, NodeId, NodeKind};
use crate::tree::Tree;
use loom_common::Value;

/// Options for HTML rendering
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Put every element on its own indented line
    pub pretty: bool,
    /// Indentation string
    pub indent: String,
    /// Tags whose text is emitted verbatim in pretty mode
    pub preformatted_tags: Vec<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            indent: "  ".to_string(),
            preformatted_tags: vec!["pre".to_string(), "textarea".to_string()],
        }
    }
}

impl RenderOptions {
    /// Single-line output with text emitted exactly as stored
    pub fn compact() -> Self {
        Self {
            pretty: false,
            ..Default::default()
        }
    }
}

struct Context<'a> {
    tree: &'a Tree,
    options: &'a RenderOptions,
    depth: usize,
    preformatted: usize,
    buffer: String,
}

impl<'a> Context<'a> {
    fn pretty(&self) -> bool {
        self.options.pretty && self.preformatted == 0
    }

    fn add(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn add_indent(&mut self) {
        if self.pretty() {
            for _ in 0..self.depth {
                self.buffer.push_str(&self.options.indent);
            }
        }
    }

    fn add_newline(&mut self) {
        if self.pretty() {
            self.buffer.push('\n');
        }
    }
}

/// Render the whole tree to HTML
pub fn render_html(tree: &Tree, options: &RenderOptions) -> String {
    let mut ctx = Context {
        tree,
        options,
        depth: 0,
        preformatted: 0,
        buffer: String::new(),
    };
    for child in tree.children(tree.root()) {
        render_node(*child, &mut ctx);
    }
    ctx.buffer
}

fn render_node(id: NodeId, ctx: &mut Context) {
    let tree = ctx.tree;
    let Some(node) = tree.get(id) else {
        return;
    };
    match &node.kind {
        NodeKind::Root => {
            for child in node.children() {
                render_node(*child, ctx);
            }
        }
        NodeKind::Doctype { name } => {
            ctx.add_indent();
            ctx.add(&format!("<!DOCTYPE {}>", name));
            ctx.add_newline();
        }
        NodeKind::Comment(lit) => {
            ctx.add_indent();
            ctx.add(&format!("<!--{}-->", lit.content));
            ctx.add_newline();
        }
        NodeKind::Text(lit) => {
            if !ctx.pretty() || lit.in_pre {
                ctx.add(&lit.content);
                return;
            }
            let trimmed = lit.content.trim();
            if trimmed.is_empty() {
                return;
            }
            ctx.add_indent();
            ctx.add(trimmed);
            ctx.add_newline();
        }
        NodeKind::Element(el) => render_element(node, &el.tag, &el.attributes, ctx),
    }
}

fn render_element(node: &Node, tag: &str, attributes: &Attributes, ctx: &mut Context) {
    let tree = ctx.tree;
    ctx.add_indent();
    ctx.add(&format!("<{}", tag));
    for (name, value) in attributes {
        render_attribute(name, value, ctx);
    }

    if !node.is_container() {
        ctx.add(if is_void(tag) { ">" } else { " />" });
        ctx.add_newline();
        return;
    }
    ctx.add(">");

    let preformatted = ctx.options.preformatted_tags.iter().any(|t| t == tag);
    let inline = !node
        .children()
        .iter()
        .any(|c| matches!(tree.get(*c).map(|n| &n.kind), Some(NodeKind::Element(_))));

    if preformatted {
        ctx.preformatted += 1;
    }
    if inline && ctx.pretty() {
        for child in node.children() {
            match tree.get(*child).map(|n| &n.kind) {
                Some(NodeKind::Text(lit)) => ctx.add(lit.content.trim()),
                Some(NodeKind::Comment(lit)) => ctx.add(&format!("<!--{}-->", lit.content)),
                _ => {}
            }
        }
    } else {
        ctx.add_newline();
        ctx.depth += 1;
        for child in node.children() {
            render_node(*child, ctx);
        }
        ctx.depth -= 1;
        ctx.add_indent();
    }
    if preformatted {
        ctx.preformatted -= 1;
    }

    ctx.add(&format!("</{}>", tag));
    ctx.add_newline();
}

fn render_attribute(name: &str, value: &AttrValue, ctx: &mut Context) {
    match value {
        AttrValue::Flag(true) | AttrValue::Value(Value::Boolean(true)) => {
            ctx.add(&format!(" {}", name));
        }
        AttrValue::Flag(false) | AttrValue::Value(Value::Boolean(false)) => {
            ctx.add(&format!(" {}=\"false\"", name));
        }
        AttrValue::Text(text) => {
            ctx.add(&format!(" {}=\"{}\"", name, escape_attribute(text)));
        }
        AttrValue::Value(value) => {
            ctx.add(&format!(" {}=\"{}\"", name, escape_attribute(&value.to_string())));
        }
    }
}

fn escape_attribute(text: &str) -> String {
    text.replace('"', "&quot;")
}

fn is_void(tag: &str) -> bool {
    matches!(
        tag,
        "img"
            | "input"
            | "br"
            | "hr"
            | "meta"
            | "link"
            | "area"
            | "base"
            | "col"
            | "embed"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}
