//! Setup blocks: script elements executed before compilation whose bindings
//! become globals.

use crate::config::CompilerConfig;
use crate::error::{CompileError, CompileResult, StructuralKind};
use crate::gateway::Gateway;
use loom_common::Bindings;
use loom_tree::{NodeId, Tree};
use tracing::debug;

/// Execute every setup block of the tree in document order, removing the
/// blocks. Each block sees the bindings produced by the ones before it.
pub(crate) fn run_setup_blocks(
    tree: &mut Tree,
    config: &CompilerConfig,
    gateway: Gateway<'_>,
    mut bindings: Bindings,
) -> CompileResult<Bindings> {
    let blocks: Vec<NodeId> = tree
        .descendants(tree.root())
        .filter(|id| tree.element(*id).is_some_and(|el| el.tag == config.setup_tag))
        .collect();

    for block in blocks {
        // a block nested inside an earlier one is already gone
        if !tree.is_attached(block) {
            continue;
        }
        bindings = execute_setup_block(tree, block, gateway, bindings)?;
        tree.remove(block)?;
    }
    Ok(bindings)
}

/// Run one setup block on top of `bindings` and return the resulting bindings
pub(crate) fn execute_setup_block(
    tree: &Tree,
    block: NodeId,
    gateway: Gateway<'_>,
    bindings: Bindings,
) -> CompileResult<Bindings> {
    if let Some(nested) = tree
        .children(block)
        .iter()
        .find(|child| tree.element(**child).is_some())
    {
        let tag = tree.element(*nested).map(|el| el.tag.clone()).unwrap_or_default();
        return Err(CompileError::structural(
            StructuralKind::InvalidSetupBlock,
            tag,
            tree.position(*nested).or_else(|| tree.position(block)),
        ));
    }

    let source = tree.text_content(block);
    if source.trim().is_empty() {
        return Ok(bindings);
    }
    let (bindings, _) = gateway.execute(&source, &bindings, tree.position(block))?;
    debug!(bindings = bindings.len(), "Executed setup block");
    Ok(bindings)
}
