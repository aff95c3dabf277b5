use crate::conditionals::{keeps_branch, strip_directives};
use crate::error::{at, CompileResult};
use crate::fragments::adopt_context;
use crate::gateway::EvaluationError;
use crate::step::{PassContext, ScopedStep};
use loom_common::{Bindings, Value};
use loom_tree::{AttrValue, NodeId};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a loop produced nothing. Never escapes the loop pass: it is handed
/// to the chained fallback siblings instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoopFailure {
    #[error("missing iteration spec")]
    MissingSpec,

    #[error("malformed iteration spec '{0}'")]
    MalformedSpec(String),

    #[error("{0}")]
    Evaluation(#[from] EvaluationError),

    #[error("cannot iterate over {0}")]
    NotIterable(&'static str),

    #[error("expected {expected} values to unpack, got {found}")]
    CaptureMismatch { expected: usize, found: String },

    #[error("no iterations")]
    Empty,
}

/// Parsed `captures in source` iteration spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationSpec {
    pub captures: Vec<String>,
    pub source: String,
}

impl IterationSpec {
    /// Accepts `x in xs`, `for x in xs`, `for k, v in items(obj):` and
    /// parenthesized capture lists.
    pub fn parse(raw: &str) -> Result<Self, LoopFailure> {
        let malformed = || LoopFailure::MalformedSpec(raw.to_string());

        let mut spec = raw.trim();
        spec = spec.strip_suffix(':').unwrap_or(spec).trim_end();
        if let Some(rest) = spec.strip_prefix("for") {
            if rest.starts_with(char::is_whitespace) {
                spec = rest.trim_start();
            }
        }

        let (captures, source) = spec.split_once(" in ").ok_or_else(malformed)?;
        let captures: Vec<String> = captures
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')')
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        let source = source.trim();

        if captures.is_empty() || source.is_empty() || !captures.iter().all(|c| is_identifier(c)) {
            return Err(malformed());
        }
        Ok(Self {
            captures,
            source: source.to_string(),
        })
    }

    /// Bindings for one item: the item itself for a single capture, or the
    /// item unpacked positionally for several
    pub fn bind(&self, item: Value) -> Result<Bindings, LoopFailure> {
        let mut bindings = Bindings::new();
        if let [name] = self.captures.as_slice() {
            bindings.insert(name.clone(), item);
            return Ok(bindings);
        }
        match item {
            Value::Array(values) if values.len() == self.captures.len() => {
                bindings.extend(self.captures.iter().cloned().zip(values));
                Ok(bindings)
            }
            other => Err(LoopFailure::CaptureMismatch {
                expected: self.captures.len(),
                found: match other {
                    Value::Array(values) => values.len().to_string(),
                    scalar => scalar.type_name().to_string(),
                },
            }),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Expands loop elements among a scope's children
pub struct LoopStep;

impl ScopedStep for LoopStep {
    fn name(&self) -> &str {
        "loops"
    }

    fn run(&self, cx: &mut PassContext<'_>, scope: NodeId) -> CompileResult<()> {
        expand_loops(cx, scope)?;
        Ok(())
    }
}

/// Expand every loop among the scope's children. Returns each expanded loop
/// with the nodes that replaced it, in expansion order.
///
/// A loop carrying a conditional directive is a link of that chain: it only
/// expands when the chain keeps it, and is otherwise left for the chain
/// resolver to drop.
pub(crate) fn expand_loops(
    cx: &mut PassContext<'_>,
    scope: NodeId,
) -> CompileResult<Vec<(NodeId, Vec<NodeId>)>> {
    // expanded loops may expose nested loop clones, so rescan until none
    // are left; loops turned into fallbacks or not selected are skipped
    let mut skipped = HashSet::new();
    let mut expanded = Vec::new();
    while let Some(node) = next_loop(cx, scope, &skipped) {
        match keeps_branch(cx, node)? {
            Some(false) => {
                debug!(%node, "Loop not selected by its conditional chain");
                skipped.insert(node);
                continue;
            }
            Some(true) => strip_directives(cx, node),
            None => {}
        }
        match plan(cx, node) {
            Ok(iterations) => {
                let produced = expand(cx, scope, node, iterations)?;
                expanded.push((node, produced));
            }
            Err(failure) => {
                fall_back(cx, node, &failure);
                skipped.insert(node);
            }
        }
    }
    Ok(expanded)
}

fn next_loop(cx: &PassContext<'_>, scope: NodeId, skipped: &HashSet<NodeId>) -> Option<NodeId> {
    cx.tree.children(scope).iter().copied().find(|id| {
        !skipped.contains(id) && cx.tree.element(*id).is_some_and(|el| cx.config.is_loop(el))
    })
}

/// Evaluate the iteration source and bind captures for every item
fn plan(cx: &PassContext<'_>, node: NodeId) -> Result<Vec<Bindings>, LoopFailure> {
    let el = cx.tree.element(node).ok_or(LoopFailure::MissingSpec)?;
    let raw = el
        .attributes
        .iter()
        .find(|(name, _)| cx.config.is_loop_attribute(name))
        .map(|(_, value)| value)
        .ok_or(LoopFailure::MissingSpec)?;
    let AttrValue::Text(raw) = raw else {
        return Err(LoopFailure::MalformedSpec(format!("{:?}", raw)));
    };

    let spec = IterationSpec::parse(raw)?;
    let bindings = cx.bindings_for(node);
    let value = cx
        .gateway
        .evaluate(&spec.source, &bindings, cx.position_of(node))?;
    let items = value
        .iter_items()
        .ok_or(LoopFailure::NotIterable(value.type_name()))?;
    if items.is_empty() {
        return Err(LoopFailure::Empty);
    }
    items.into_iter().map(|item| spec.bind(item)).collect()
}

/// Replace the loop by one clone of its children per iteration and drop the
/// fallback siblings chained to it
fn expand(
    cx: &mut PassContext<'_>,
    scope: NodeId,
    node: NodeId,
    iterations: Vec<Bindings>,
) -> CompileResult<Vec<NodeId>> {
    let loop_context = cx
        .tree
        .element(node)
        .map(|el| el.context.clone())
        .unwrap_or_default();
    let outer = cx.bindings_for(node);
    let template = cx.tree.children(node).to_vec();

    let mut produced = Vec::with_capacity(template.len() * iterations.len());
    for captures in &iterations {
        let mut context = loop_context.clone();
        context.extend(captures.iter().map(|(k, v)| (k.clone(), v.clone())));
        let mut text_bindings = outer.clone();
        text_bindings.extend(captures.iter().map(|(k, v)| (k.clone(), v.clone())));

        let clones = template
            .iter()
            .map(|child| cx.tree.clone_subtree(*child))
            .collect::<Result<Vec<_>, _>>()?;
        adopt_context(cx, &clones, &context, &text_bindings, scope)?;
        produced.extend(clones);
    }

    for fallback in cx.chained_fallbacks(node) {
        cx.tree.remove(fallback)?;
    }
    debug!(
        iterations = iterations.len(),
        nodes = produced.len(),
        "Expanded loop"
    );
    cx.tree.replace_with(node, &produced)?;
    Ok(produced)
}

/// Turn the loop into a false `if` so its `elif`/`else` siblings take over,
/// and tell them why
fn fall_back(cx: &mut PassContext<'_>, node: NodeId, failure: &LoopFailure) {
    let reason = failure.to_string();
    warn!(
        reason = %reason,
        position = %at(&cx.position_of(node)),
        "Loop produced nothing, falling back"
    );

    let followers = cx.chained_fallbacks(node);
    let config = cx.config;
    if let Some(el) = cx.tree.element_mut(node) {
        el.attributes.shift_remove(&config.elif_attribute);
        el.attributes.shift_remove(&config.else_attribute);
        el.attributes
            .insert(config.if_attribute.clone(), AttrValue::Flag(false));
    }
    for follower in followers {
        if let Some(el) = cx.tree.element_mut(follower) {
            el.context
                .insert(config.loop_error_binding.clone(), Value::String(reason.clone()));
        }
    }
}
