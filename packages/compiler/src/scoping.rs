//! Scoped component styles.
//!
//! A `<style scoped>` side node of a component only applies to that
//! component's markup. Substituted roots are stamped with the scope
//! attribute and every rule selector of the style is rewritten to match the
//! stamped root itself or anything below it.

use loom_tree::{Fragment, NodeKind};

/// Attribute marking a side style as scoped
pub const SCOPED_ATTRIBUTE: &str = "scoped";

/// At-rules whose blocks hold rules rather than declarations
const GROUPING_RULES: [&str; 4] = ["@media", "@supports", "@layer", "@container"];

pub fn is_scoped_style(fragment: &Fragment) -> bool {
    fragment
        .as_element()
        .is_some_and(|el| el.tag == "style" && el.has_attribute(SCOPED_ATTRIBUTE))
}

/// Attribute selector matching elements stamped with `scope`
pub fn scope_selector(attribute: &str, scope: &str) -> String {
    format!("[{}='{}']", attribute, scope)
}

/// The style with its rules confined to `selector`. Unscoped styles come
/// back unchanged.
pub fn scope_style(style: &Fragment, selector: &str) -> Fragment {
    if !is_scoped_style(style) {
        return style.clone();
    }
    let mut scoped = style.clone();
    if let NodeKind::Element(el) = &mut scoped.kind {
        el.attributes.shift_remove(SCOPED_ATTRIBUTE);
    }
    for child in scoped.children.iter_mut().flatten() {
        if let NodeKind::Text(lit) = &mut child.kind {
            lit.content = scope_css(&lit.content, selector);
        }
    }
    scoped
}

/// Rewrite every rule selector `s` of a stylesheet into `{selector}s,
/// {selector} s`. Rules nested in grouping at-rules are rewritten too;
/// keyframe selectors and other at-rule bodies are left alone.
pub fn scope_css(css: &str, selector: &str) -> String {
    let mut out = String::with_capacity(css.len() * 2);
    // one entry per open block: whether it holds rules
    let mut blocks: Vec<bool> = Vec::new();
    let mut prelude = String::new();
    let mut quote: Option<char> = None;

    for c in css.chars() {
        if let Some(q) = quote {
            prelude.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                prelude.push(c);
            }
            '{' => {
                let holds_rules = blocks.last().copied().unwrap_or(true);
                let head = prelude.trim();
                if head.starts_with('@') {
                    out.push_str(&prelude);
                    blocks.push(GROUPING_RULES.iter().any(|rule| head.starts_with(rule)));
                } else if holds_rules && !head.is_empty() {
                    out.push_str(&scope_prelude(&prelude, selector));
                    blocks.push(false);
                } else {
                    out.push_str(&prelude);
                    blocks.push(false);
                }
                out.push('{');
                prelude.clear();
            }
            '}' => {
                out.push_str(&prelude);
                out.push('}');
                prelude.clear();
                blocks.pop();
            }
            ';' => {
                out.push_str(&prelude);
                out.push(';');
                prelude.clear();
            }
            _ => prelude.push(c),
        }
    }
    out.push_str(&prelude);
    out
}

/// Scope a comma-separated selector list, keeping the surrounding whitespace
fn scope_prelude(prelude: &str, selector: &str) -> String {
    let start = prelude.len() - prelude.trim_start().len();
    let end = prelude.trim_end().len();
    let list = prelude[start..end]
        .split(',')
        .map(|part| scope_one(part.trim(), selector))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}{}{}", &prelude[..start], list, &prelude[end..])
}

fn scope_one(part: &str, selector: &str) -> String {
    // a type selector has to stay in front of the attribute selector
    let type_len = part
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_' || c == '*'))
        .unwrap_or(part.len());
    let (type_selector, rest) = part.split_at(type_len);
    format!("{}{}{}, {} {}", type_selector, selector, rest, selector, part)
}
