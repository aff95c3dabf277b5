use crate::assets::hoist_assets;
use crate::cache::ComponentCache;
use crate::components::ComponentStep;
use crate::conditionals::ConditionalStep;
use crate::config::{AssetPlacement, CompilerConfig};
use crate::error::CompileResult;
use crate::expressions::ExpressionStep;
use crate::fragments::{unwrap, FragmentStep};
use crate::gateway::Gateway;
use crate::loops::LoopStep;
use crate::registry::ComponentRegistry;
use crate::setup::run_setup_blocks;
use crate::step::{PassContext, ScopedStep};
use crate::verify::find_residue;
use loom_common::{Bindings, ScriptEngine};
use loom_tree::{render_html, NodeId, RenderOptions, Tree};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

/// Output of one compilation
#[derive(Debug, Clone)]
pub struct Compilation {
    pub tree: Tree,
    /// Components used, in first-use order, with their side nodes
    pub cache: ComponentCache,
    /// Caller context plus everything bound by setup blocks
    pub globals: Bindings,
}

impl Compilation {
    pub fn render(&self, options: &RenderOptions) -> String {
        render_html(&self.tree, options)
    }
}

/// Runs the scoped pipeline over a tree.
///
/// Every scope (the root, then each surviving element, depth-first) goes
/// through fragment unwrapping, loop expansion, conditional resolution,
/// expression substitution and component substitution, in that order,
/// followed by any custom steps.
#[derive(Default)]
pub struct Compiler {
    config: CompilerConfig,
    custom_steps: Vec<Box<dyn ScopedStep>>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CompilerConfig) -> Self {
        Self {
            config,
            custom_steps: Vec::new(),
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Append a step run after the built-in ones in every scope
    pub fn add_step(&mut self, step: impl ScopedStep + 'static) -> &mut Self {
        self.custom_steps.push(Box::new(step));
        self
    }

    /// Compile `input` without touching it: the pipeline works on a private
    /// copy and a fresh component cache.
    #[instrument(skip_all, fields(nodes = input.len(), components = registry.len()))]
    pub fn compile(
        &self,
        input: &Tree,
        registry: &ComponentRegistry,
        engine: &dyn ScriptEngine,
        context: &Bindings,
    ) -> CompileResult<Compilation> {
        info!("Starting compilation");

        let mut tree = input.clone();
        let gateway = Gateway::new(engine);
        let globals = run_setup_blocks(&mut tree, &self.config, gateway, context.clone())?;
        let mut cache = ComponentCache::new();

        let mut cx = PassContext {
            tree: &mut tree,
            config: &self.config,
            gateway,
            registry,
            cache: &mut cache,
            globals: &globals,
            settled: HashSet::new(),
        };
        let root = cx.tree.root();
        self.process_scope(&mut cx, root)?;

        if self.config.asset_placement == AssetPlacement::Head {
            hoist_assets(&mut tree, &cache)?;
        }

        for residue in find_residue(&tree, &self.config) {
            warn!(%residue, "Compiler syntax left in output");
        }

        info!(
            nodes = tree.len(),
            components = cache.len(),
            globals = globals.len(),
            "Compilation complete"
        );
        Ok(Compilation {
            tree,
            cache,
            globals,
        })
    }

    fn process_scope(&self, cx: &mut PassContext<'_>, scope: NodeId) -> CompileResult<()> {
        let builtin: [&dyn ScopedStep; 5] = [
            &FragmentStep,
            &LoopStep,
            &ConditionalStep,
            &ExpressionStep,
            &ComponentStep,
        ];
        for step in builtin {
            run_step(step, cx, scope)?;
        }
        for step in &self.custom_steps {
            run_step(step.as_ref(), cx, scope)?;
        }

        for child in cx.tree.children(scope).to_vec() {
            if cx.tree.parent(child) != Some(scope) || cx.tree.element(child).is_none() {
                continue;
            }
            self.process_scope(cx, child)?;

            // wrappers that carried a directive are spliced once compiled
            let wrapper = cx
                .tree
                .element(child)
                .is_some_and(|el| cx.config.is_fragment(el) && cx.config.directives_of(el).is_empty());
            if wrapper {
                unwrap(cx, child)?;
            }
        }
        Ok(())
    }
}

fn run_step(step: &dyn ScopedStep, cx: &mut PassContext<'_>, scope: NodeId) -> CompileResult<()> {
    debug!(step = step.name(), %scope, "Running step");
    step.run(cx, scope)
}
