//! Tests for component substitution, slots and the side-asset cache

use crate::config::{AssetPlacement, CompilerConfig};
use crate::error::CompileError;
use crate::registry::{ComponentRegistry, ComponentTemplate};
use crate::test_support::{bindings, compile_with};
use loom_common::{Bindings, Value};
use loom_script::Interpreter;
use loom_tree::{Fragment, Position, RenderOptions, Tree};

fn card() -> ComponentTemplate {
    ComponentTemplate::new(
        "Card",
        Fragment::element("div").attr("class", "card").with_children([
            Fragment::element("h2").child(Fragment::text("{title}")),
            Fragment::element("Slot"),
        ]),
    )
    .with_context("title", "Untitled")
    .with_style(".card { border: 1px solid }")
}

fn registry(templates: impl IntoIterator<Item = ComponentTemplate>) -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    for template in templates {
        registry.register(template);
    }
    registry
}

fn render_using(registry: &ComponentRegistry, nodes: impl IntoIterator<Item = Fragment>) -> String {
    compile_with(nodes, registry, CompilerConfig::default(), &Bindings::new())
        .unwrap()
        .render(&RenderOptions::compact())
}

#[test]
fn test_substitution_binds_call_site_attributes() {
    let registry = registry([card()]);
    let html = render_using(
        &registry,
        [Fragment::element("Card")
            .attr("title", "Hello")
            .child(Fragment::element("p").child(Fragment::text("Body")))],
    );
    assert_eq!(
        html,
        "<style>.card { border: 1px solid }</style><div class=\"card\"><h2>Hello</h2><p>Body</p></div>"
    );
    println!("✓ Template cloned with call-site arguments and children");
}

#[test]
fn test_template_defaults_apply_without_arguments() {
    let registry = registry([card()]);
    let html = render_using(&registry, [Fragment::element("Card")]);
    assert!(html.ends_with("<div class=\"card\"><h2>Untitled</h2></div>"));
}

#[test]
fn test_side_assets_emitted_once() {
    let registry = registry([card()]);
    let compilation = compile_with(
        [
            Fragment::element("Card").attr("title", "A"),
            Fragment::element("main").child(Fragment::element("Card").attr("title", "B")),
        ],
        &registry,
        CompilerConfig::default(),
        &Bindings::new(),
    )
    .unwrap();

    let html = compilation.render(&RenderOptions::compact());
    assert_eq!(html.matches("<style>").count(), 1);
    assert!(html.starts_with("<style>"));
    assert_eq!(compilation.cache.len(), 1);
    assert!(compilation.cache.contains("Card"));
}

#[test]
fn test_assets_hoisted_to_head() {
    let registry = registry([card()]);
    let config = CompilerConfig {
        asset_placement: AssetPlacement::Head,
        ..Default::default()
    };
    let compilation = compile_with(
        [Fragment::element("html").with_children([
            Fragment::element("head").child(Fragment::element("title").child(Fragment::text("T"))),
            Fragment::element("body").child(Fragment::element("Card").attr("title", "X")),
        ])],
        &registry,
        config,
        &Bindings::new(),
    )
    .unwrap();

    assert_eq!(
        compilation.render(&RenderOptions::compact()),
        "<html><head><title>T</title><style>.card { border: 1px solid }</style></head>\
         <body><div class=\"card\"><h2>X</h2></div></body></html>"
    );
}

#[test]
fn test_code_arguments_keep_native_values() {
    let counter = ComponentTemplate::new(
        "Counter",
        Fragment::element("span").child(Fragment::text("{start * 2}")),
    );
    let registry = registry([counter]);
    let html = render_using(&registry, [Fragment::element("Counter").attr(":start", "2 + 3")]);
    assert_eq!(html, "<span>10</span>");
}

#[test]
fn test_children_binding_holds_passed_content() {
    let boxed = ComponentTemplate::new(
        "Box",
        Fragment::element("div").with_children([
            Fragment::element("i")
                .attr("@if", "children")
                .child(Fragment::text("{len(children)} passed: {children[0].tag} {children[1].content}")),
            Fragment::element("i").flag("@else").child(Fragment::text("empty")),
        ]),
    );
    let registry = registry([boxed]);
    let html = render_using(
        &registry,
        [
            Fragment::element("Box").with_children([
                Fragment::text("  "),
                Fragment::element("b").child(Fragment::text("hi")),
                Fragment::comment("note"),
                Fragment::text("x"),
            ]),
            Fragment::element("Box").child(Fragment::text("\n")),
        ],
    );
    assert_eq!(html, "<div><i>2 passed: b x</i></div><div><i>empty</i></div>");
    println!("✓ children bound to the call-site nodes themselves");
}

#[test]
fn test_loop_inside_wrapper_root_is_expanded() {
    let list = ComponentTemplate::new(
        "List",
        Fragment::element("Template").child(
            Fragment::element("For")
                .attr("each", "x in [1, 2]")
                .child(Fragment::element("li").child(Fragment::text("{x}"))),
        ),
    );
    let registry = registry([list]);
    let compilation = compile_with(
        [Fragment::element("ul").child(Fragment::element("List"))],
        &registry,
        CompilerConfig::default(),
        &Bindings::new(),
    )
    .unwrap();

    assert_eq!(
        compilation.render(&RenderOptions::compact()),
        "<ul><li>1</li><li>2</li></ul>"
    );
    let tree = &compilation.tree;
    let items: Vec<_> = tree
        .descendants(tree.root())
        .filter_map(|id| tree.element(id))
        .filter(|el| el.tag == "li")
        .collect();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|el| el.component.as_deref() == Some("List")));
}

#[test]
fn test_wrapper_loop_roots_follow_call_site_conditions() {
    let list = ComponentTemplate::new(
        "List",
        Fragment::element("Template").child(
            Fragment::element("For")
                .attr("each", "x in [1, 2]")
                .child(Fragment::element("li").child(Fragment::text("{x}"))),
        ),
    );
    let registry = registry([list]);
    let html = render_using(
        &registry,
        [
            Fragment::element("List").attr("@if", "false"),
            Fragment::element("p").flag("@else").child(Fragment::text("none")),
            Fragment::element("List").attr("@if", "true"),
        ],
    );
    assert_eq!(html, "<p>none</p><li>1</li><li>2</li>");
}

#[test]
fn test_scoped_styles_are_confined_to_component_roots() {
    let badge = ComponentTemplate::new(
        "Badge",
        Fragment::element("span")
            .attr("class", "badge")
            .child(Fragment::text("{label}")),
    )
    .with_scoped_style(".badge { color: red }\nb { margin: 0 }");
    let id = badge.scope_id();
    assert_eq!(id, badge.clone().scope_id());

    let registry = registry([badge, card()]);
    let html = render_using(
        &registry,
        [
            Fragment::element("Badge").attr("label", "new"),
            Fragment::element("Badge").attr("label", "old"),
            Fragment::element("Card"),
        ],
    );
    let s = format!("[data-loom-scope='{}']", id);
    assert_eq!(
        html,
        format!(
            "<style>{s}.badge, {s} .badge {{ color: red }}\nb{s}, {s} b {{ margin: 0 }}</style>\
             <span class=\"badge\" data-loom-scope=\"{id}\">new</span>\
             <span class=\"badge\" data-loom-scope=\"{id}\">old</span>\
             <style>.card {{ border: 1px solid }}</style><div class=\"card\"><h2>Untitled</h2></div>",
            s = s,
            id = id
        )
    );
    println!("✓ Scoped rules only match stamped component roots");
}

#[test]
fn test_scope_ids_differ_per_template_and_reach_loop_roots() {
    let list = ComponentTemplate::new(
        "List",
        Fragment::element("Template").child(
            Fragment::element("For")
                .attr("each", "x in [1, 2]")
                .child(Fragment::element("li").child(Fragment::text("{x}"))),
        ),
    )
    .with_scoped_style("li { list-style: none }");
    let id = list.scope_id();
    assert_ne!(id, card().with_scoped_style("li { list-style: none }").scope_id());

    let registry = registry([list]);
    let html = render_using(&registry, [Fragment::element("ul").child(Fragment::element("List"))]);
    assert!(html.ends_with(&format!(
        "<ul><style>li[data-loom-scope='{id}'], [data-loom-scope='{id}'] li {{ list-style: none }}</style>\
         <li data-loom-scope=\"{id}\">1</li><li data-loom-scope=\"{id}\">2</li></ul>",
        id = id
    )));
}

#[test]
fn test_named_slots_and_default_content() {
    let article = ComponentTemplate::new(
        "Article",
        Fragment::element("article").with_children([
            Fragment::element("header").child(
                Fragment::element("Slot")
                    .attr("name", "title")
                    .child(Fragment::text("Untitled")),
            ),
            Fragment::element("Slot"),
        ]),
    );
    let registry = registry([article]);

    let html = render_using(
        &registry,
        [
            Fragment::element("Article").with_children([
                Fragment::element("p").child(Fragment::text("Body")),
                Fragment::element("h1").attr("slot", "title").child(Fragment::text("News")),
            ]),
            Fragment::element("Article"),
        ],
    );
    assert_eq!(
        html,
        "<article><header><h1>News</h1></header><p>Body</p></article>\
         <article><header>Untitled</header></article>"
    );
}

#[test]
fn test_content_for_missing_slot_is_dropped() {
    let registry = registry([card()]);
    let html = render_using(
        &registry,
        [Fragment::element("Card")
            .attr("title", "T")
            .child(Fragment::element("p").attr("slot", "footer"))],
    );
    assert!(html.ends_with("<div class=\"card\"><h2>T</h2></div>"));
}

#[test]
fn test_slotted_content_keeps_call_site_bindings() {
    let badge = ComponentTemplate::new(
        "Badge",
        Fragment::element("span").with_children([
            Fragment::element("b").child(Fragment::text("{who}")),
            Fragment::element("Slot"),
        ]),
    );
    let registry = registry([badge]);
    let html = render_using(
        &registry,
        [Fragment::element("section")
            .with_context("who", "outer")
            .child(
                Fragment::element("Badge")
                    .attr("who", "inner")
                    .with_children([Fragment::text("{who}"), Fragment::element("em").child(Fragment::text("{who}"))]),
            )],
    );
    assert_eq!(
        html,
        "<section><span><b>inner</b>outer<em>outer</em></span></section>"
    );
}

#[test]
fn test_fragment_root_expands_to_several_nodes() {
    let pair = ComponentTemplate::new(
        "Pair",
        Fragment::element("Template").with_children([
            Fragment::element("dt").child(Fragment::text("{k}")),
            Fragment::element("dd").child(Fragment::text("{v}")),
        ]),
    );
    let registry = registry([pair]);
    let html = render_using(
        &registry,
        [Fragment::element("dl").child(
            Fragment::element("For")
                .attr("each", "k, v in [['a', 1], ['b', 2]]")
                .child(Fragment::element("Pair").attr(":k", "k").attr(":v", "v")),
        )],
    );
    assert_eq!(html, "<dl><dt>a</dt><dd>1</dd><dt>b</dt><dd>2</dd></dl>");
}

#[test]
fn test_template_root_directive_sees_arguments() {
    let maybe = ComponentTemplate::new(
        "Maybe",
        Fragment::element("p").attr("@if", "show").child(Fragment::text("shown")),
    );
    let registry = registry([maybe]);
    let html = render_using(
        &registry,
        [
            Fragment::element("Maybe").attr(":show", "true"),
            Fragment::element("Maybe").attr(":show", "false"),
        ],
    );
    assert_eq!(html, "<p>shown</p>");
}

#[test]
fn test_nested_components_expand() {
    let label = ComponentTemplate::new("Label", Fragment::element("label").child(Fragment::text("{text}")));
    let field = ComponentTemplate::new(
        "Field",
        Fragment::element("Label").attr("text", "{name}:"),
    );
    let registry = registry([label, field]);
    let html = render_using(&registry, [Fragment::element("Field").attr("name", "Email")]);
    assert_eq!(html, "<label>Email:</label>");
}

#[test]
fn test_data_dependent_recursion_terminates() {
    let tree = ComponentTemplate::new(
        "TreeView",
        Fragment::element("ul").with_children([
            Fragment::element("li").child(Fragment::text("{node.name}")),
            Fragment::element("For")
                .attr("each", "child in node.children")
                .child(Fragment::element("TreeView").attr(":node", "child")),
        ]),
    );
    let registry = registry([tree]);
    let data: Value = serde_json::json!({
        "name": "root",
        "children": [{ "name": "leaf", "children": [] }]
    })
    .into();

    let html = compile_with(
        [Fragment::element("TreeView").attr(":node", "data")],
        &registry,
        CompilerConfig::default(),
        &bindings([("data", data)]),
    )
    .unwrap()
    .render(&RenderOptions::compact());
    assert_eq!(html, "<ul><li>root</li><ul><li>leaf</li></ul></ul>");
}

#[test]
fn test_direct_recursion() {
    let looped = ComponentTemplate::new(
        "Looped",
        Fragment::element("div").child(Fragment::element("Looped")),
    );
    let config = CompilerConfig {
        max_component_depth: 3,
        ..Default::default()
    };
    let err = compile_with(
        [Fragment::element("Looped")],
        &registry([looped]),
        config,
        &Bindings::new(),
    )
    .unwrap_err();

    match err {
        CompileError::RecursiveComponent {
            component,
            call_stack,
            hint,
        } => {
            assert_eq!(component, "Looped");
            assert_eq!(call_stack, vec!["Looped"; 4]);
            assert!(hint.unwrap().contains("renders itself unconditionally"));
            println!("✓ Direct recursion detected correctly");
        }
        other => panic!("Expected RecursiveComponent error but got: {:?}", other),
    }
}

#[test]
fn test_indirect_recursion() {
    let a = ComponentTemplate::new("A", Fragment::element("div").child(Fragment::element("B")));
    let b = ComponentTemplate::new("B", Fragment::element("B2"));
    let b2 = ComponentTemplate::new("B2", Fragment::element("A"));
    let config = CompilerConfig {
        max_component_depth: 2,
        ..Default::default()
    };
    let err = compile_with(
        [Fragment::element("A")],
        &registry([a, b, b2]),
        config,
        &Bindings::new(),
    )
    .unwrap_err();

    match err {
        CompileError::RecursiveComponent { call_stack, hint, .. } => {
            assert_eq!(call_stack.first().map(String::as_str), Some("A"));
            assert_eq!(call_stack.iter().filter(|c| *c == "A").count(), 3);
            assert!(hint.unwrap().contains("cycle"));
        }
        other => panic!("Expected RecursiveComponent error but got: {:?}", other),
    }
}

#[test]
fn test_unknown_component() {
    let err = compile_with(
        [Fragment::element("main").child(Fragment::element("Widget").at(2, 3))],
        &ComponentRegistry::new(),
        CompilerConfig::default(),
        &Bindings::new(),
    )
    .unwrap_err();
    match err {
        CompileError::ComponentNotFound { name, position } => {
            assert_eq!(name, "Widget");
            assert_eq!(position, Some(Position::new(2, 3)));
        }
        other => panic!("Expected ComponentNotFound, got {:?}", other),
    }

    let lenient = CompilerConfig {
        strict_components: false,
        ..Default::default()
    };
    let html = compile_with(
        [Fragment::element("Widget")],
        &ComponentRegistry::new(),
        lenient,
        &Bindings::new(),
    )
    .unwrap()
    .render(&RenderOptions::compact());
    assert_eq!(html, "<Widget></Widget>");
}

#[test]
fn test_two_default_slots_are_rejected() {
    let broken = ComponentTemplate::new(
        "Broken",
        Fragment::element("div").with_children([Fragment::element("Slot"), Fragment::element("Slot")]),
    );
    let err = compile_with(
        [Fragment::element("Broken")],
        &registry([broken]),
        CompilerConfig::default(),
        &Bindings::new(),
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::InvalidComponent { ref name, .. } if name == "Broken"));
}

#[test]
fn test_template_from_tree() {
    let source = Tree::from_fragments([
        Fragment::element("style").child(Fragment::text(".btn { }")),
        Fragment::text("\n"),
        Fragment::element("setup").child(Fragment::text("label = 'Go'; size = 2")),
        Fragment::element("button").child(Fragment::text("{label}")),
        Fragment::element("script").child(Fragment::text("init()")),
    ])
    .unwrap();

    let template =
        ComponentTemplate::from_tree("Button", &source, &Interpreter::new(), &CompilerConfig::default())
            .unwrap();
    assert_eq!(template.styles.len(), 1);
    assert_eq!(template.scripts.len(), 1);
    assert_eq!(template.context.get("label"), Some(&Value::from("Go")));
    assert_eq!(template.context.get("size"), Some(&Value::from(2)));
    assert_eq!(template.root.as_element().map(|el| el.tag.as_str()), Some("button"));

    let html = render_using(&registry([template]), [Fragment::element("Button")]);
    assert_eq!(
        html,
        "<style>.btn { }</style><script>init()</script><button>Go</button>"
    );
}

#[test]
fn test_template_from_tree_rejects_bad_shapes() {
    let engine = Interpreter::new();
    let config = CompilerConfig::default();

    let two_roots = Tree::from_fragments([Fragment::element("a"), Fragment::element("b")]).unwrap();
    let stray_text = Tree::from_fragments([Fragment::element("a"), Fragment::text("oops")]).unwrap();
    let loop_root = Tree::from_fragments([Fragment::element("For").attr("each", "x in xs")]).unwrap();
    let empty = Tree::new();

    for tree in [two_roots, stray_text, loop_root, empty] {
        let result = ComponentTemplate::from_tree("Bad", &tree, &engine, &config);
        assert!(
            matches!(result, Err(CompileError::InvalidComponent { .. })),
            "expected an invalid component, got {:?}",
            result
        );
    }
}
