use crate::error::{CompileError, CompileResult};
use crate::interpolation::{encode_braces, escape_html, needs_rewrite, normalize_edges, sole_marker, split_markers, Segment};
use crate::step::{PassContext, ScopedStep};
use loom_common::Bindings;
use loom_tree::{AttrValue, Attributes, NodeId, Position};
use std::collections::HashSet;
use tracing::debug;

/// Substitutes `{…}` markers in the attributes and text of a scope's children
pub struct ExpressionStep;

impl ScopedStep for ExpressionStep {
    fn name(&self) -> &str {
        "expressions"
    }

    fn run(&self, cx: &mut PassContext<'_>, scope: NodeId) -> CompileResult<()> {
        let raw = cx.is_raw_text(scope);
        for child in cx.tree.children(scope).to_vec() {
            if cx.tree.element(child).is_some() {
                resolve_attributes(cx, child)?;
            } else if !raw && !cx.settled.contains(&child) && cx.tree.text(child).is_some() {
                substitute_text(cx, child, None)?;
            }
        }
        Ok(())
    }
}

/// Resolve code-prefixed attributes (whole value evaluated, native type kept,
/// prefix dropped) and splice markers into plain string attributes.
/// Directive attributes are left for the passes that own them.
pub(crate) fn resolve_attributes(cx: &mut PassContext<'_>, id: NodeId) -> CompileResult<()> {
    let Some(el) = cx.tree.element(id) else {
        return Ok(());
    };
    let config = cx.config;
    let pending = el.attributes.iter().any(|(name, value)| {
        config.strip_code_prefix(name).is_some()
            || value.as_text().is_some_and(needs_rewrite)
    });
    if !pending {
        return Ok(());
    }

    let attributes = el.attributes.clone();
    let is_loop = config.is_loop(el);
    let bindings = cx.bindings_for(id);
    let position = cx.position_of(id);

    let mut resolved = Attributes::with_capacity(attributes.len());
    let mut from_code: HashSet<String> = HashSet::new();
    for (name, value) in attributes {
        if config.directive(&name).is_some() || (is_loop && config.is_loop_attribute(&name)) {
            resolved.insert(name, value);
            continue;
        }
        if let Some(bare) = config.strip_code_prefix(&name) {
            let value = match value {
                AttrValue::Text(source) => {
                    let source = sole_marker(&source).unwrap_or(&source);
                    AttrValue::Value(cx.gateway.evaluate_code(source, &bindings, position)?)
                }
                other => other,
            };
            debug!(attribute = bare, "Evaluated code attribute");
            from_code.insert(bare.to_string());
            resolved.insert(bare.to_string(), value);
            continue;
        }
        if from_code.contains(&name) {
            continue;
        }
        let value = match value {
            AttrValue::Text(text) if needs_rewrite(&text) => {
                let (spliced, _) = interpolate(cx, &text, &bindings, position, false)?;
                AttrValue::Text(spliced)
            }
            other => other,
        };
        resolved.insert(name, value);
    }

    if let Some(el) = cx.tree.element_mut(id) {
        el.attributes = resolved;
    }
    Ok(())
}

/// Substitute markers in a text node. `bindings` overrides the bindings
/// derived from the node's ancestors (used for detached clones).
pub(crate) fn substitute_text(
    cx: &mut PassContext<'_>,
    id: NodeId,
    bindings: Option<(&Bindings, bool)>,
) -> CompileResult<()> {
    let Some(lit) = cx.tree.text(id) else {
        return Ok(());
    };
    if !needs_rewrite(&lit.content) {
        return Ok(());
    }
    let content = lit.content.clone();
    let in_pre = lit.in_pre;
    let position = cx.position_of(id);

    let (bindings, preformatted) = match bindings {
        Some((bindings, preformatted)) => (bindings.clone(), preformatted || in_pre),
        None => (cx.bindings_for(id), in_pre || cx.is_preformatted(id)),
    };

    let (mut text, had_markers) = interpolate(cx, &content, &bindings, position, cx.config.escape_html)?;
    if had_markers && !preformatted {
        text = normalize_edges(&text);
    }
    if let Some(lit) = cx.tree.text_mut(id) {
        lit.content = text;
    }
    cx.settled.insert(id);
    Ok(())
}

/// Replace every marker by the display form of its value. Returns the new
/// text and whether any marker was found.
pub(crate) fn interpolate(
    cx: &PassContext<'_>,
    text: &str,
    bindings: &Bindings,
    position: Option<Position>,
    escape: bool,
) -> CompileResult<(String, bool)> {
    let segments = split_markers(text).map_err(|_| CompileError::UnterminatedMarker {
        text: text.to_string(),
        position,
    })?;

    let mut out = String::with_capacity(text.len());
    let mut had_markers = false;
    for segment in segments {
        match segment {
            Segment::Literal(literal) => out.push_str(&literal),
            Segment::Escaped(brace) => out.push_str(&encode_braces(&brace.to_string())),
            Segment::Marker(source) => {
                had_markers = true;
                let value = cx.gateway.evaluate(source, bindings, position)?.to_string();
                if escape {
                    out.push_str(&encode_braces(&escape_html(&value)));
                } else {
                    out.push_str(&encode_braces(&value));
                }
            }
        }
    }
    Ok((out, had_markers))
}
