//! Shared helpers for the compiler test modules

use crate::compiler::{Compilation, Compiler};
use crate::config::CompilerConfig;
use crate::error::CompileResult;
use crate::registry::ComponentRegistry;
use loom_common::Bindings;
use loom_script::Interpreter;
use loom_tree::{Fragment, RenderOptions, Tree};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn compile_with(
    nodes: impl IntoIterator<Item = Fragment>,
    registry: &ComponentRegistry,
    config: CompilerConfig,
    context: &Bindings,
) -> CompileResult<Compilation> {
    init_tracing();
    let tree = Tree::from_fragments(nodes)?;
    Compiler::with_config(config).compile(&tree, registry, &Interpreter::new(), context)
}

pub fn compile(nodes: impl IntoIterator<Item = Fragment>) -> CompileResult<Compilation> {
    compile_with(nodes, &ComponentRegistry::new(), CompilerConfig::default(), &Bindings::new())
}

/// Compile with `context` as caller bindings and render compactly
pub fn render_with(nodes: impl IntoIterator<Item = Fragment>, context: &Bindings) -> String {
    compile_with(nodes, &ComponentRegistry::new(), CompilerConfig::default(), context)
        .unwrap()
        .render(&RenderOptions::compact())
}

pub fn render(nodes: impl IntoIterator<Item = Fragment>) -> String {
    render_with(nodes, &Bindings::new())
}

pub fn bindings<const N: usize>(pairs: [(&str, loom_common::Value); N]) -> Bindings {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}
