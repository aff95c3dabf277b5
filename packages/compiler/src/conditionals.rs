use crate::config::Directive;
use crate::error::{CompileError, CompileResult, StructuralKind};
use crate::interpolation::sole_marker;
use crate::step::{PassContext, ScopedStep};
use loom_tree::{AttrValue, NodeId, NodeKind};
use tracing::debug;

/// Resolves `if`/`elif`/`else` chains among a scope's children
pub struct ConditionalStep;

impl ScopedStep for ConditionalStep {
    fn name(&self) -> &str {
        "conditionals"
    }

    fn run(&self, cx: &mut PassContext<'_>, scope: NodeId) -> CompileResult<()> {
        resolve_conditions(cx, scope)
    }
}

/// One link of a conditional chain
#[derive(Debug)]
struct Branch {
    node: NodeId,
    directive: Directive,
    attribute: String,
}

/// The chain link `id` represents, if it carries a conditional directive
fn branch_of(cx: &PassContext<'_>, id: NodeId) -> CompileResult<Option<Branch>> {
    let Some(el) = cx.tree.element(id) else {
        return Ok(None);
    };
    match cx.config.directives_of(el).as_slice() {
        [] => Ok(None),
        [(directive, attribute)] => Ok(Some(Branch {
            node: id,
            directive: *directive,
            attribute: attribute.to_string(),
        })),
        many => {
            let names = many.iter().map(|(_, name)| name.to_string()).collect();
            Err(CompileError::structural(
                StructuralKind::MultipleDirectives(names),
                el.tag.clone(),
                cx.position_of(id),
            ))
        }
    }
}

/// Group the scope's directive-bearing children into chains, validating
/// every chain before anything is mutated.
fn collect_chains(cx: &PassContext<'_>, scope: NodeId) -> CompileResult<Vec<Vec<Branch>>> {
    let mut chains: Vec<Vec<Branch>> = Vec::new();
    let mut open = false;

    for child in cx.tree.children(scope) {
        let Some(node) = cx.tree.get(*child) else {
            continue;
        };
        match &node.kind {
            NodeKind::Text(_) | NodeKind::Comment(_) => continue,
            NodeKind::Element(_) => {}
            _ => {
                open = false;
                continue;
            }
        }

        let Some(branch) = branch_of(cx, *child)? else {
            open = false;
            continue;
        };
        match branch.directive {
            Directive::If => {
                chains.push(vec![branch]);
                open = true;
            }
            directive @ (Directive::Elif | Directive::Else) => {
                let chain = match chains.last_mut() {
                    Some(chain) if open => chain,
                    _ => {
                        let kind = if directive == Directive::Elif {
                            StructuralKind::OrphanElif
                        } else {
                            StructuralKind::OrphanElse
                        };
                        let tag = cx.tree.element(*child).map(|el| el.tag.clone()).unwrap_or_default();
                        return Err(CompileError::structural(kind, tag, cx.position_of(*child)));
                    }
                };
                chain.push(branch);
                open = directive == Directive::Elif;
            }
        }
    }
    Ok(chains)
}

/// Judge, ahead of the chain resolver, whether the chain `id` belongs to
/// keeps `id`. Earlier links are evaluated in order and the first one that
/// holds wins. `None` when `id` carries no directive. A link whose chain is
/// malformed is never kept; the resolver reports it when the scope's chains
/// are collected.
pub(crate) fn keeps_branch(cx: &PassContext<'_>, id: NodeId) -> CompileResult<Option<bool>> {
    let Some(own) = branch_of(cx, id)? else {
        return Ok(None);
    };

    let mut earlier = Vec::new();
    if own.directive != Directive::If {
        let siblings = cx.tree.parent(id).map(|p| cx.tree.children(p)).unwrap_or(&[]);
        let index = siblings.iter().position(|s| *s == id).unwrap_or(0);
        for sibling in siblings[..index].iter().rev() {
            match cx.tree.get(*sibling).map(|node| &node.kind) {
                Some(NodeKind::Text(_) | NodeKind::Comment(_)) => continue,
                Some(NodeKind::Element(_)) => {}
                _ => return Ok(Some(false)),
            }
            match branch_of(cx, *sibling)? {
                Some(branch) if branch.directive == Directive::If => {
                    earlier.push(branch);
                    break;
                }
                Some(branch) if branch.directive == Directive::Elif => earlier.push(branch),
                _ => return Ok(Some(false)),
            }
        }
        if earlier.last().map(|b| b.directive) != Some(Directive::If) {
            return Ok(Some(false));
        }
        earlier.reverse();
    }

    for branch in &earlier {
        if holds(cx, branch)? {
            return Ok(Some(false));
        }
    }
    Ok(Some(own.directive == Directive::Else || holds(cx, &own)?))
}

/// Remove every conditional directive from an element whose branch was kept
pub(crate) fn strip_directives(cx: &mut PassContext<'_>, id: NodeId) {
    let config = cx.config;
    if let Some(el) = cx.tree.element_mut(id) {
        for directive in [Directive::If, Directive::Elif, Directive::Else] {
            el.attributes.shift_remove(config.directive_attribute(directive));
        }
    }
}

/// Keep the first branch of every chain whose condition holds (stripped of
/// its directive) and drop all the others. Conditions are judged in order and
/// evaluation stops at the first true one.
pub(crate) fn resolve_conditions(cx: &mut PassContext<'_>, scope: NodeId) -> CompileResult<()> {
    let chains = collect_chains(cx, scope)?;

    for chain in chains {
        let mut kept = None;
        for (index, branch) in chain.iter().enumerate() {
            if branch.directive == Directive::Else || holds(cx, branch)? {
                kept = Some(index);
                break;
            }
        }

        for (index, branch) in chain.iter().enumerate() {
            if Some(index) == kept {
                if let Some(el) = cx.tree.element_mut(branch.node) {
                    el.attributes.shift_remove(&branch.attribute);
                }
            } else {
                cx.tree.remove(branch.node)?;
            }
        }
        debug!(branches = chain.len(), kept = ?kept, "Resolved conditional chain");
    }
    Ok(())
}

fn holds(cx: &PassContext<'_>, branch: &Branch) -> CompileResult<bool> {
    let Some(value) = cx
        .tree
        .element(branch.node)
        .and_then(|el| el.attribute(&branch.attribute))
    else {
        return Ok(false);
    };

    match value {
        AttrValue::Flag(flag) => Ok(*flag),
        AttrValue::Value(value) => Ok(value.is_truthy()),
        AttrValue::Text(source) => {
            let source = condition_source(source);
            if source.is_empty() {
                let tag = cx
                    .tree
                    .element(branch.node)
                    .map(|el| el.tag.clone())
                    .unwrap_or_default();
                return Err(CompileError::structural(
                    StructuralKind::EmptyCondition(branch.attribute.clone()),
                    tag,
                    cx.position_of(branch.node),
                ));
            }
            let bindings = cx.bindings_for(branch.node);
            let value = cx
                .gateway
                .evaluate(source, &bindings, cx.position_of(branch.node))?;
            Ok(value.is_truthy())
        }
    }
}

/// The expression of a condition written either bare or as one marker.
/// A blank marker counts as an empty condition.
fn condition_source(text: &str) -> &str {
    let text = text.trim();
    if let Some(inner) = sole_marker(text) {
        return inner.trim();
    }
    match text.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')) {
        Some(inner) if inner.trim().is_empty() => "",
        _ => text,
    }
}
