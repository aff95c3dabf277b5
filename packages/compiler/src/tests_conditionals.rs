//! Tests for if/elif/else chain resolution

use crate::error::{CompileError, StructuralKind};
use crate::test_support::{bindings, compile, render, render_with};
use loom_common::{ScriptError, Value};
use loom_tree::{Fragment, Position};

fn chain(x: i32) -> String {
    render_with(
        [
            Fragment::element("p").attr("@if", "x > 10").child(Fragment::text("big")),
            Fragment::element("p").attr("@elif", "x > 5").child(Fragment::text("medium")),
            Fragment::element("p").attr("@else", "").child(Fragment::text("small")),
        ],
        &bindings([("x", Value::from(x))]),
    )
}

#[test]
fn test_first_true_branch_wins() {
    assert_eq!(chain(20), "<p>big</p>");
    assert_eq!(chain(7), "<p>medium</p>");
    assert_eq!(chain(1), "<p>small</p>");
    println!("✓ Exactly one branch survives, stripped of its directive");
}

#[test]
fn test_chain_without_else_can_drop_everything() {
    let html = render([
        Fragment::element("p").attr("@if", "false").child(Fragment::text("a")),
        Fragment::element("p").attr("@elif", "0").child(Fragment::text("b")),
        Fragment::element("span").child(Fragment::text("after")),
    ]);
    assert_eq!(html, "<span>after</span>");
}

#[test]
fn test_text_and_comments_do_not_break_a_chain() {
    let html = render([
        Fragment::element("p").attr("@if", "false").child(Fragment::text("a")),
        Fragment::text("\n  "),
        Fragment::comment(" otherwise "),
        Fragment::element("p").flag("@else").child(Fragment::text("b")),
    ]);
    assert_eq!(html, "\n  <!-- otherwise --><p>b</p>");
}

#[test]
fn test_separate_chains_are_independent() {
    let html = render([
        Fragment::element("a").attr("@if", "true"),
        Fragment::element("b").flag("@else"),
        Fragment::element("c").attr("@if", "false"),
        Fragment::element("d").flag("@else"),
    ]);
    assert_eq!(html, "<a></a><d></d>");
}

#[test]
fn test_marker_wrapped_and_flag_conditions() {
    let html = render_with(
        [
            Fragment::element("a").attr("@if", "{ready}"),
            Fragment::element("b").flag("@if"),
        ],
        &bindings([("ready", Value::from(true))]),
    );
    assert_eq!(html, "<a></a><b></b>");
}

#[test]
fn test_conditions_use_truthiness() {
    let html = render_with(
        [
            Fragment::element("a").attr("@if", "items"),
            Fragment::element("b").attr("@if", "empty"),
            Fragment::element("c").attr("@if", "name"),
            Fragment::element("d").attr("@if", "count"),
            Fragment::element("e").attr("@if", "nothing"),
        ],
        &bindings([
            ("items", Value::from(vec![1])),
            ("empty", Value::from(Vec::<Value>::new())),
            ("name", Value::from("x")),
            ("count", Value::from(0)),
            ("nothing", Value::Null),
        ]),
    );
    assert_eq!(html, "<a></a><c></c>");
}

#[test]
fn test_evaluation_stops_at_first_true_condition() {
    // the elif would fail with an unknown name if it were evaluated
    let html = render([
        Fragment::element("a").attr("@if", "1 < 2"),
        Fragment::element("b").attr("@elif", "missing.value"),
    ]);
    assert_eq!(html, "<a></a>");
}

#[test]
fn test_orphan_elif_is_structural_error() {
    let err = compile([
        Fragment::element("div"),
        Fragment::element("p").attr("@elif", "true").at(3, 5),
    ])
    .unwrap_err();

    match err {
        CompileError::Structural {
            kind: StructuralKind::OrphanElif,
            tag,
            position,
        } => {
            assert_eq!(tag, "p");
            assert_eq!(position, Some(Position::new(3, 5)));
        }
        other => panic!("Expected orphan elif, got {:?}", other),
    }
}

#[test]
fn test_non_directive_element_ends_a_chain() {
    let err = compile([
        Fragment::element("a").attr("@if", "true"),
        Fragment::element("hr"),
        Fragment::element("b").flag("@else"),
    ])
    .unwrap_err();
    assert!(matches!(
        err,
        CompileError::Structural {
            kind: StructuralKind::OrphanElse,
            ..
        }
    ));
}

#[test]
fn test_else_closes_its_chain() {
    let err = compile([
        Fragment::element("a").attr("@if", "true"),
        Fragment::element("b").flag("@else"),
        Fragment::element("c").flag("@else"),
    ])
    .unwrap_err();
    assert!(err.to_string().contains("else without a preceding if/elif sibling"));
}

#[test]
fn test_multiple_directives_on_one_element() {
    let err = compile([Fragment::element("p")
        .attr("@if", "true")
        .attr("@elif", "false")
        .at(1, 1)])
    .unwrap_err();

    match err {
        CompileError::Structural {
            kind: StructuralKind::MultipleDirectives(names),
            ..
        } => assert_eq!(names, vec!["@if", "@elif"]),
        other => panic!("Expected multiple directives, got {:?}", other),
    }
}

#[test]
fn test_structure_is_validated_before_any_branch_is_evaluated() {
    // the first chain would fail to evaluate, but the orphan is reported first
    let err = compile([
        Fragment::element("a").attr("@if", "nope"),
        Fragment::element("div"),
        Fragment::element("b").attr("@elif", "true"),
    ])
    .unwrap_err();
    assert!(matches!(err, CompileError::Structural { .. }));
}

#[test]
fn test_empty_condition() {
    let err = compile([Fragment::element("p").attr("@if", "{ }")]).unwrap_err();
    assert!(matches!(
        err,
        CompileError::Structural {
            kind: StructuralKind::EmptyCondition(_),
            ..
        }
    ));
}

#[test]
fn test_condition_evaluation_error_is_fatal() {
    let err = compile([Fragment::element("p").attr("@if", "user.name").at(2, 1)]).unwrap_err();

    match err {
        CompileError::Evaluation(eval) => {
            assert_eq!(eval.fragment, "user.name");
            assert_eq!(eval.position, Some(Position::new(2, 1)));
            assert_eq!(eval.cause, ScriptError::UnknownName { name: "user".into() });
            println!("✓ Conditional failure reports fragment and position: {}", eval);
        }
        other => panic!("Expected evaluation error, got {:?}", other),
    }
}

#[test]
fn test_nested_chains_resolve_per_scope() {
    let html = render_with(
        [Fragment::element("div").attr("@if", "outer").with_children([
            Fragment::element("a").attr("@if", "inner"),
            Fragment::element("b").flag("@else"),
        ])],
        &bindings([("outer", Value::from(true)), ("inner", Value::from(false))]),
    );
    assert_eq!(html, "<div><b></b></div>");
}
