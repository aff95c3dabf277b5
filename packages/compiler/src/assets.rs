use crate::cache::ComponentCache;
use crate::error::CompileResult;
use loom_tree::{NodeId, Tree};
use tracing::debug;

/// Append every recorded side node to `html > head`, or to the root when
/// the document has no head. Components come in first-use order, each with
/// its styles before its scripts.
pub(crate) fn hoist_assets(tree: &mut Tree, cache: &ComponentCache) -> CompileResult<usize> {
    let target = find_head(tree).unwrap_or_else(|| tree.root());

    let mut count = 0;
    for (_, assets) in cache.iter() {
        for side in assets.side_nodes() {
            let id = tree.instantiate_synthetic(side)?;
            tree.append_child(target, id)?;
            count += 1;
        }
    }
    debug!(count, "Hoisted component assets");
    Ok(count)
}

fn find_head(tree: &Tree) -> Option<NodeId> {
    let html = tree
        .children(tree.root())
        .iter()
        .copied()
        .find(|id| tree.element(*id).is_some_and(|el| el.tag == "html"))?;
    tree.children(html)
        .iter()
        .copied()
        .find(|id| tree.element(*id).is_some_and(|el| el.tag == "head"))
}
