//! Tests for loop expansion and the fallback protocol

use crate::error::{CompileError, StructuralKind};
use crate::test_support::{bindings, compile, render, render_with};
use indexmap::IndexMap;
use loom_common::Value;
use loom_tree::{Fragment, RenderOptions};

fn each(spec: &str) -> Fragment {
    Fragment::element("For").attr("each", spec)
}

#[test]
fn test_clones_follow_iteration_order() {
    let compilation = compile([Fragment::element("ul").at(1, 1).child(
        each("x in [1, 2, 3]")
            .at(2, 3)
            .child(Fragment::element("li").at(3, 5).child(Fragment::text("{x}").at(3, 9))),
    )])
    .unwrap();

    assert_eq!(
        compilation.render(&RenderOptions::compact()),
        "<ul><li>1</li><li>2</li><li>3</li></ul>"
    );

    let tree = &compilation.tree;
    let items: Vec<_> = tree
        .descendants(tree.root())
        .filter(|id| tree.element(*id).is_some_and(|el| el.tag == "li"))
        .collect();
    assert_eq!(items.len(), 3);
    for item in items {
        assert_eq!(tree.position(item), None, "loop clones are synthetic");
    }
    tree.check_integrity().unwrap();
    println!("✓ Three clones in source order, positions cleared");
}

#[test]
fn test_multiple_captures_unpack_pairs() {
    let mut prices = IndexMap::new();
    prices.insert("tea".to_string(), Value::from(3));
    prices.insert("cake".to_string(), Value::from(5));

    let html = render_with(
        [each("for name, price in items(prices):").with_children([
            Fragment::element("dt").child(Fragment::text("{name}")),
            Fragment::element("dd").child(Fragment::text("{price}")),
        ])],
        &bindings([("prices", Value::from(prices))]),
    );
    assert_eq!(html, "<dt>tea</dt><dd>3</dd><dt>cake</dt><dd>5</dd>");
}

#[test]
fn test_text_children_take_iteration_bindings() {
    let html = render_with(
        [each("n in names").child(Fragment::text("Hello {n}!  "))],
        &bindings([("names", Value::from(vec!["Ann", "Bo"]))]),
    );
    assert_eq!(html, "Hello Ann! Hello Bo! ");
}

#[test]
fn test_objects_and_strings_are_iterable() {
    let mut flags = IndexMap::new();
    flags.insert("a".to_string(), Value::from(true));
    flags.insert("b".to_string(), Value::from(false));

    let html = render_with(
        [
            each("key in flags").child(Fragment::element("i").child(Fragment::text("{key}"))),
            each("c in 'xy'").child(Fragment::element("b").child(Fragment::text("{c}"))),
        ],
        &bindings([("flags", Value::from(flags))]),
    );
    assert_eq!(html, "<i>a</i><i>b</i><b>x</b><b>y</b>");
}

#[test]
fn test_code_prefixed_spec() {
    let html = render([Fragment::element("For")
        .attr(":each", "i in range(2)")
        .child(Fragment::element("span").child(Fragment::text("{i}")))]);
    assert_eq!(html, "<span>0</span><span>1</span>");
}

#[test]
fn test_nested_loops_see_outer_captures() {
    let rows = Value::from(vec![
        Value::from(vec![1, 2]),
        Value::from(vec![3]),
    ]);
    let html = render_with(
        [each("row in rows").child(Fragment::element("tr").child(
            each("cell in row").child(Fragment::element("td").child(Fragment::text("{cell}"))),
        ))],
        &bindings([("rows", rows)]),
    );
    assert_eq!(html, "<tr><td>1</td><td>2</td></tr><tr><td>3</td></tr>");
}

#[test]
fn test_conditions_are_judged_per_iteration() {
    let html = render([each("n in range(4)").with_children([
        Fragment::element("b").attr("@if", "n % 2 == 0").child(Fragment::text("{n}")),
        Fragment::element("i").flag("@else").child(Fragment::text("{n}")),
    ])]);
    assert_eq!(html, "<b>0</b><i>1</i><b>2</b><i>3</i>");
}

#[test]
fn test_empty_loop_falls_back_to_else() {
    let html = render([
        each("x in []").child(Fragment::element("li").child(Fragment::text("{x}"))),
        Fragment::element("p").flag("@else").child(Fragment::text("Nothing here")),
    ]);
    assert_eq!(html, "<p>Nothing here</p>");
    println!("✓ Zero iterations hand over to the else branch");
}

#[test]
fn test_successful_loop_drops_its_fallbacks() {
    let html = render([
        each("x in [1]").child(Fragment::element("li").child(Fragment::text("{x}"))),
        Fragment::text(" "),
        Fragment::element("p").attr("@elif", "true"),
        Fragment::element("p").flag("@else"),
    ]);
    assert_eq!(html, "<li>1</li> ");
}

#[test]
fn test_failed_loop_reaches_elif() {
    let html = render_with(
        [
            each("x in []"),
            Fragment::element("p").attr("@elif", "fallback").child(Fragment::text("elif")),
            Fragment::element("p").flag("@else").child(Fragment::text("else")),
        ],
        &bindings([("fallback", Value::from(true))]),
    );
    assert_eq!(html, "<p>elif</p>");
}

#[test]
fn test_failure_reason_is_bound_for_fallbacks() {
    let html = render([
        each("x in missing").at(4, 2),
        Fragment::element("p")
            .flag("@else")
            .child(Fragment::text("{loop_error}")),
    ]);
    assert!(
        html.starts_with("<p>Failed to evaluate `missing` at 4:2"),
        "unexpected fallback: {}",
        html
    );
}

#[test]
fn test_malformed_spec_falls_back() {
    let html = render([
        each("items"),
        Fragment::element("p").flag("@else").child(Fragment::text("{loop_error}")),
    ]);
    assert_eq!(html, "<p>malformed iteration spec 'items'</p>");
}

#[test]
fn test_capture_mismatch_falls_back() {
    let html = render([
        each("a, b in [1, 2]"),
        Fragment::element("p").flag("@else").child(Fragment::text("{loop_error}")),
    ]);
    assert_eq!(html, "<p>expected 2 values to unpack, got number</p>");
}

#[test]
fn test_failed_loop_without_fallback_disappears() {
    let html = render([Fragment::element("div").child(each("x in 42"))]);
    assert_eq!(html, "<div></div>");
}

#[test]
fn test_loop_bindings_do_not_reach_siblings() {
    let result = compile([
        each("x in [1]").child(Fragment::element("i").child(Fragment::text("{x}"))),
        Fragment::element("p").child(Fragment::text("{x}")),
    ]);
    assert!(result.is_err(), "x must not be visible outside the loop");
}

#[test]
fn test_loop_in_elif_position_yields_to_earlier_branch() {
    let nodes = |first: &str| {
        [
            Fragment::element("p").attr("@if", first).child(Fragment::text("A")),
            each("x in [1]")
                .attr("@elif", "true")
                .child(Fragment::element("i").child(Fragment::text("{x}"))),
            Fragment::element("p").flag("@else").child(Fragment::text("C")),
        ]
    };
    assert_eq!(render(nodes("true")), "<p>A</p>");
    assert_eq!(render(nodes("false")), "<i>1</i>");
    println!("✓ A loop is one link of its conditional chain");
}

#[test]
fn test_loop_with_false_condition_does_not_expand() {
    let nodes = || {
        [
            each("x in [1, 2]")
                .attr("@if", "show")
                .child(Fragment::element("i").child(Fragment::text("{x}"))),
            Fragment::element("p").flag("@else").child(Fragment::text("hidden")),
        ]
    };
    assert_eq!(
        render_with(nodes(), &bindings([("show", Value::from(false))])),
        "<p>hidden</p>"
    );
    assert_eq!(
        render_with(nodes(), &bindings([("show", Value::from(true))])),
        "<i>1</i><i>2</i>"
    );
}

#[test]
fn test_selected_empty_loop_still_falls_back() {
    let html = render([
        each("x in []").attr("@if", "true").child(Fragment::element("i")),
        Fragment::element("p").flag("@else").child(Fragment::text("{loop_error}")),
    ]);
    assert_eq!(html, "<p>no iterations</p>");
}

#[test]
fn test_orphan_loop_elif_is_still_reported() {
    let err = compile([each("x in [1]").attr("@elif", "true").child(Fragment::element("i"))]).unwrap_err();
    assert!(matches!(
        err,
        CompileError::Structural {
            kind: StructuralKind::OrphanElif,
            ..
        }
    ));
}
