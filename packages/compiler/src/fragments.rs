use crate::error::CompileResult;
use crate::expressions::substitute_text;
use crate::step::{PassContext, ScopedStep};
use loom_common::Bindings;
use loom_tree::NodeId;
use tracing::debug;

/// Replaces wrapper elements (`<Template>`, the empty tag) by their children
pub struct FragmentStep;

impl ScopedStep for FragmentStep {
    fn name(&self) -> &str {
        "fragments"
    }

    fn run(&self, cx: &mut PassContext<'_>, scope: NodeId) -> CompileResult<()> {
        // wrappers carrying a directive wait for the conditional pass and are
        // spliced after their own scope has been compiled
        while let Some(wrapper) = next_wrapper(cx, scope) {
            let context = cx
                .tree
                .element(wrapper)
                .map(|el| el.context.clone())
                .unwrap_or_default();
            let bindings = cx.bindings_for(wrapper);
            let children = unwrap(cx, wrapper)?;
            debug!(children = children.len(), "Unwrapped fragment");
            adopt_context(cx, &children, &context, &bindings, scope)?;
        }
        Ok(())
    }
}

fn next_wrapper(cx: &PassContext<'_>, scope: NodeId) -> Option<NodeId> {
    cx.tree.children(scope).iter().copied().find(|id| {
        cx.tree
            .element(*id)
            .is_some_and(|el| cx.config.is_fragment(el) && cx.config.directives_of(el).is_empty())
    })
}

/// Splice a wrapper's children into its place, returning them
pub(crate) fn unwrap(cx: &mut PassContext<'_>, wrapper: NodeId) -> CompileResult<Vec<NodeId>> {
    let children = cx.tree.children(wrapper).to_vec();
    cx.tree.detach_all(&children)?;
    cx.tree.replace_with(wrapper, &children)?;
    Ok(children)
}

/// Hand bindings to nodes that lost the ancestor providing them.
///
/// Elements get `context` merged into their own context map (incoming names
/// win). Text nodes cannot hold context, so their markers are substituted
/// right away with `text_bindings`, honoring the raw/preformatted state of
/// the scope they land in.
pub(crate) fn adopt_context(
    cx: &mut PassContext<'_>,
    nodes: &[NodeId],
    context: &Bindings,
    text_bindings: &Bindings,
    scope: NodeId,
) -> CompileResult<()> {
    if context.is_empty() {
        return Ok(());
    }
    let raw = cx.is_raw_text(scope);
    let preformatted = cx.is_preformatted(scope);
    for id in nodes {
        if let Some(el) = cx.tree.element_mut(*id) {
            el.context
                .extend(context.iter().map(|(k, v)| (k.clone(), v.clone())));
        } else if !raw && cx.tree.text(*id).is_some() {
            substitute_text(cx, *id, Some((text_bindings, preformatted)))?;
        }
    }
    Ok(())
}
