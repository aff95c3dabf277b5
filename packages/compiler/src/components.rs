use crate::conditionals::resolve_conditions;
use crate::config::AssetPlacement;
use crate::error::{CompileError, CompileResult};
use crate::expressions::{resolve_attributes, substitute_text};
use crate::fragments::adopt_context;
use crate::loops::expand_loops;
use crate::registry::ComponentTemplate;
use crate::step::{PassContext, ScopedStep};
use loom_common::{Bindings, Value};
use loom_tree::{AttrValue, Element, NodeId, NodeKind};
use std::collections::HashMap;
use tracing::{debug, error, instrument, warn};

/// Replaces call sites of registered components by their templates
pub struct ComponentStep;

impl ScopedStep for ComponentStep {
    fn name(&self) -> &str {
        "components"
    }

    fn run(&self, cx: &mut PassContext<'_>, scope: NodeId) -> CompileResult<()> {
        // roots produced in this scope may be call sites themselves; they are
        // expanded before moving on, carrying the chain of components that
        // produced them
        let mut produced: HashMap<NodeId, Vec<String>> = HashMap::new();
        let mut roots = Vec::new();

        while let Some((site, name)) = next_call_site(cx, scope)? {
            let chain = match produced.remove(&site) {
                Some(chain) => {
                    resolve_attributes(cx, site)?;
                    chain
                }
                None => inherited_chain(cx, site),
            };
            check_recursion(cx, &name, &chain)?;

            let mut new_roots = substitute(cx, scope, site, &name)?;

            // the loop and conditional passes for this scope already ran, so
            // loops and directives brought in by template roots are handled
            // now, before those roots expand
            let looping = new_roots
                .iter()
                .any(|root| cx.tree.element(*root).is_some_and(|el| cx.config.is_loop(el)));
            if looping {
                for (node, clones) in expand_loops(cx, scope)? {
                    let Some(index) = new_roots.iter().position(|root| *root == node) else {
                        continue;
                    };
                    for clone in &clones {
                        if let Some(el) = cx.tree.element_mut(*clone) {
                            el.component = Some(name.clone());
                        }
                    }
                    stamp_scope(cx, &name, &clones);
                    new_roots.splice(index..=index, clones);
                }
            }

            let directed = new_roots.iter().any(|root| {
                cx.tree
                    .element(*root)
                    .is_some_and(|el| !cx.config.directives_of(el).is_empty())
            });
            if directed {
                resolve_conditions(cx, scope)?;
            }

            let mut next_chain = chain;
            next_chain.push(name);
            for root in new_roots {
                if !cx.tree.contains(root) {
                    continue;
                }
                produced.insert(root, next_chain.clone());
                roots.push(root);
            }
        }

        for root in roots {
            if cx.tree.parent(root) == Some(scope) {
                resolve_attributes(cx, root)?;
            }
        }
        Ok(())
    }
}

fn next_call_site(cx: &PassContext<'_>, scope: NodeId) -> CompileResult<Option<(NodeId, String)>> {
    for child in cx.tree.children(scope) {
        let Some(el) = cx.tree.element(*child) else {
            continue;
        };
        if cx.registry.contains(&el.tag) {
            return Ok(Some((*child, el.tag.clone())));
        }
        let capitalized = el.tag.chars().next().is_some_and(char::is_uppercase);
        if cx.config.strict_components && capitalized && !cx.config.is_reserved_tag(&el.tag) {
            error!(component = %el.tag, "Component not found");
            return Err(CompileError::ComponentNotFound {
                name: el.tag.clone(),
                position: cx.position_of(*child),
            });
        }
    }
    Ok(None)
}

/// Components whose substitution produced the ancestors of `site`, outermost first
fn inherited_chain(cx: &PassContext<'_>, site: NodeId) -> Vec<String> {
    cx.tree
        .ancestors_root_first(site)
        .into_iter()
        .filter_map(|ancestor| cx.tree.element(ancestor).and_then(|el| el.component.clone()))
        .collect()
}

fn check_recursion(cx: &PassContext<'_>, name: &str, chain: &[String]) -> CompileResult<()> {
    let depth = chain.iter().filter(|c| *c == name).count();
    if depth < cx.config.max_component_depth {
        return Ok(());
    }

    let mut call_stack = chain.to_vec();
    call_stack.push(name.to_string());
    let hint = if call_stack.iter().all(|c| c == name) {
        format!(
            "Component '{}' renders itself unconditionally. Guard the nested use with a condition or make the recursion data-dependent.",
            name
        )
    } else {
        "Component cycle detected. Ensure components do not form circular dependencies.".to_string()
    };

    error!(
        component = name,
        depth,
        stack = ?call_stack,
        "Circular component dependency detected"
    );
    Err(CompileError::RecursiveComponent {
        component: name.to_string(),
        call_stack,
        hint: Some(hint),
    })
}

/// Replace one call site, returning the template roots that took its place
#[instrument(skip_all, fields(component = name))]
fn substitute(
    cx: &mut PassContext<'_>,
    scope: NodeId,
    site: NodeId,
    name: &str,
) -> CompileResult<Vec<NodeId>> {
    let registry = cx.registry;
    let position = cx.position_of(site);
    let template = registry.lookup(name, position)?;
    template.check_slots(cx.config)?;

    let call = cx
        .tree
        .element(site)
        .cloned()
        .ok_or_else(|| CompileError::invalid_component(name, "call site is not an element"))?;
    let call_context = cx.context_for(site);
    let call_bindings = cx.bindings_for(site);

    let children = cx.tree.children(site).to_vec();
    cx.tree.detach_all(&children)?;
    let context = component_context(cx, template, &call, &children)?;

    let roots = instantiate(cx, template, &children, &call_context, &call_bindings, scope)?;

    let mut text_bindings = call_bindings;
    text_bindings.extend(context.iter().map(|(k, v)| (k.clone(), v.clone())));
    adopt_context(cx, &roots, &context, &text_bindings, scope)?;

    let directives: Vec<(String, AttrValue)> = call
        .attributes
        .iter()
        .filter(|(attribute, _)| cx.config.directive(attribute).is_some())
        .map(|(attribute, value)| (attribute.clone(), value.clone()))
        .collect();
    for root in &roots {
        if let Some(el) = cx.tree.element_mut(*root) {
            el.component = Some(name.to_string());
            el.attributes.extend(directives.iter().cloned());
        }
    }

    stamp_scope(cx, name, &roots);

    let mut replacement = Vec::new();
    if cx.cache.record(template, cx.config) && cx.config.asset_placement == AssetPlacement::Inline {
        if let Some(assets) = cx.cache.get(name).cloned() {
            for side in assets.side_nodes() {
                replacement.push(cx.tree.instantiate_synthetic(side)?);
            }
        }
    }
    replacement.extend(roots.iter().copied());
    cx.tree.replace_with(site, &replacement)?;

    debug!(
        roots = roots.len(),
        side_nodes = replacement.len() - roots.len(),
        "Substituted component"
    );
    Ok(roots)
}

/// Mark the element roots of a component with scoped styles. Loops are
/// marked once they expand.
fn stamp_scope(cx: &mut PassContext<'_>, name: &str, roots: &[NodeId]) {
    let registry = cx.registry;
    let Some(template) = registry.get(name).filter(|t| t.has_scoped_styles()) else {
        return;
    };
    let scope_id = template.scope_id();
    for root in roots {
        let loop_root = cx.tree.element(*root).is_some_and(|el| cx.config.is_loop(el));
        if loop_root {
            continue;
        }
        if let Some(el) = cx.tree.element_mut(*root) {
            el.attributes
                .insert(cx.config.scope_attribute.clone(), AttrValue::Text(scope_id.clone()));
        }
    }
}

/// Template defaults, then the call site's context, then its attributes,
/// plus the children it passes
fn component_context(
    cx: &PassContext<'_>,
    template: &ComponentTemplate,
    call: &Element,
    children: &[NodeId],
) -> CompileResult<Bindings> {
    let mut context = template.context.clone();
    context.extend(call.context.iter().map(|(k, v)| (k.clone(), v.clone())));
    for (attribute, value) in &call.attributes {
        if cx.config.directive(attribute).is_none() {
            context.insert(attribute.clone(), value.to_value());
        }
    }
    context.insert(cx.config.children_binding.clone(), passed_children(cx, template, children)?);
    Ok(context)
}

/// The call-site children as values, in order. Comments and whitespace-only
/// text are layout, not content, and are left out.
fn passed_children(
    cx: &PassContext<'_>,
    template: &ComponentTemplate,
    children: &[NodeId],
) -> CompileResult<Value> {
    let mut passed = Vec::with_capacity(children.len());
    for child in children {
        match cx.tree.get(*child).map(|node| &node.kind) {
            Some(NodeKind::Element(_)) => {}
            Some(NodeKind::Text(lit)) if !lit.content.trim().is_empty() => {}
            _ => continue,
        }
        let fragment = cx.tree.to_fragment(*child)?;
        let json = serde_json::to_value(&fragment)
            .map_err(|err| CompileError::invalid_component(&template.name, err.to_string()))?;
        passed.push(Value::from(json));
    }
    Ok(Value::Array(passed))
}

/// Clone the template, fill its slots with the call-site children and
/// splice a wrapper root. The roots come back detached.
fn instantiate(
    cx: &mut PassContext<'_>,
    template: &ComponentTemplate,
    children: &[NodeId],
    call_context: &Bindings,
    call_bindings: &Bindings,
    scope: NodeId,
) -> CompileResult<Vec<NodeId>> {
    let root = cx.tree.instantiate_synthetic(&template.root)?;
    if cx.tree.element(root).is_some_and(|el| cx.config.is_loop(el)) {
        cx.tree.remove(root)?;
        return Err(CompileError::invalid_component(
            &template.name,
            "the root element cannot be a loop",
        ));
    }

    // a scratch parent keeps every slot marker replaceable, the root included
    let holder = cx.tree.create_element(Element::new(""), None);
    cx.tree.append_child(holder, root)?;

    fill_slots(cx, template, holder, children, call_context, call_bindings, scope)?;

    let wrapper = cx.tree.children(holder).iter().copied().find(|id| {
        cx.tree
            .element(*id)
            .is_some_and(|el| cx.config.is_fragment(el) && cx.config.directives_of(el).is_empty())
    });
    if let Some(wrapper) = wrapper {
        let inner = cx.tree.children(wrapper).to_vec();
        cx.tree.detach_all(&inner)?;
        cx.tree.replace_with(wrapper, &inner)?;
    }

    let roots = cx.tree.children(holder).to_vec();
    cx.tree.detach_all(&roots)?;
    cx.tree.remove(holder)?;
    Ok(roots)
}

/// Move call-site children into the template's slot markers. Slotted nodes
/// keep the bindings of the call site rather than those of the component.
fn fill_slots(
    cx: &mut PassContext<'_>,
    template: &ComponentTemplate,
    holder: NodeId,
    children: &[NodeId],
    call_context: &Bindings,
    call_bindings: &Bindings,
    scope: NodeId,
) -> CompileResult<()> {
    let slot_tag = cx.config.slot_tag.as_str();
    let markers: Vec<(NodeId, Option<String>)> = cx
        .tree
        .descendants(holder)
        .filter_map(|id| {
            let el = cx.tree.element(id).filter(|el| el.tag == slot_tag)?;
            let name = el.attribute("name").and_then(|v| v.as_text()).map(str::to_string);
            Some((id, name))
        })
        .collect();

    let mut assigned: Vec<Vec<NodeId>> = vec![Vec::new(); markers.len()];
    let slot_attribute = cx.config.slot_attribute.clone();
    for child in children {
        let target = cx
            .tree
            .element(*child)
            .and_then(|el| el.attribute(&slot_attribute))
            .and_then(|v| v.as_text())
            .map(str::to_string);

        let index = markers.iter().position(|(_, name)| *name == target);
        match index {
            Some(index) => {
                if let Some(el) = cx.tree.element_mut(*child) {
                    el.attributes.shift_remove(&slot_attribute);
                    for (k, v) in call_context {
                        el.context.entry(k.clone()).or_insert_with(|| v.clone());
                    }
                }
                assigned[index].push(*child);
            }
            None => {
                let blank = cx
                    .tree
                    .text(*child)
                    .is_some_and(|lit| lit.content.trim().is_empty());
                if !blank && !matches!(cx.tree.get(*child).map(|n| &n.kind), Some(NodeKind::Comment(_))) {
                    warn!(
                        component = %template.name,
                        slot = target.as_deref().unwrap_or("<default>"),
                        "Discarding content passed to a missing slot"
                    );
                }
                cx.tree.remove(*child)?;
            }
        }
    }

    let outer_raw = cx.is_raw_text(scope);
    let outer_pre = cx.is_preformatted(scope);
    for ((marker, _), nodes) in markers.into_iter().zip(assigned) {
        if !cx.tree.contains(marker) {
            continue;
        }
        let from_call = !nodes.is_empty();
        let nodes = if from_call {
            nodes
        } else {
            let defaults = cx.tree.children(marker).to_vec();
            cx.tree.detach_all(&defaults)?
        };
        cx.tree.replace_with(marker, &nodes)?;

        // default content is part of the template and sees its bindings
        if !from_call {
            continue;
        }
        let slotted_text: Vec<NodeId> = nodes
            .iter()
            .copied()
            .filter(|id| cx.tree.text(*id).is_some())
            .collect();
        for text in slotted_text {
            if outer_raw || cx.is_raw_text(text) {
                continue;
            }
            let preformatted = outer_pre || cx.is_preformatted(text);
            substitute_text(cx, text, Some((call_bindings, preformatted)))?;
        }
    }
    Ok(())
}
