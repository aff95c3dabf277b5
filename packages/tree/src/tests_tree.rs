use crate::{AttrValue, Element, Fragment, NodeKind, Position, Tree, TreeError};

fn sample() -> Tree {
    Tree::from_fragments(vec![
        Fragment::element("ul")
            .at(1, 1)
            .child(Fragment::element("li").at(2, 3).child(Fragment::text("one")))
            .child(Fragment::element("li").at(3, 3).child(Fragment::text("two"))),
        Fragment::comment(" end "),
    ])
    .expect("sample tree")
}

#[test]
fn test_parent_links_match_child_lists() {
    let tree = sample();
    let root = tree.root();
    let ul = tree.children(root)[0];

    assert_eq!(tree.parent(ul), Some(root));
    for li in tree.children(ul) {
        assert_eq!(tree.parent(*li), Some(ul));
    }
    tree.check_integrity().expect("consistent links");
    println!("✓ Parent links are consistent");
}

#[test]
fn test_detach_keeps_subtree_alive() {
    let mut tree = sample();
    let ul = tree.children(tree.root())[0];
    let first = tree.children(ul)[0];

    let index = tree.detach(first).unwrap();
    assert_eq!(index, Some(0));
    assert_eq!(tree.parent(first), None);
    assert_eq!(tree.children(ul).len(), 1);
    // the detached element still owns its text
    assert_eq!(tree.text_content(first), "one");

    tree.append_child(ul, first).unwrap();
    assert_eq!(tree.children(ul)[1], first);
    tree.check_integrity().unwrap();
}

#[test]
fn test_remove_frees_descendants() {
    let mut tree = sample();
    let ul = tree.children(tree.root())[0];
    let li = tree.children(ul)[0];
    let text = tree.children(li)[0];
    let before = tree.len();

    tree.remove(li).unwrap();

    assert!(!tree.contains(li));
    assert!(!tree.contains(text));
    assert_eq!(tree.len(), before - 2);
}

#[test]
fn test_replace_with_splices_in_place() {
    let mut tree = sample();
    let ul = tree.children(tree.root())[0];
    let first = tree.children(ul)[0];
    let second = tree.children(ul)[1];

    let a = tree.create_element(Element::new("li"), None);
    let b = tree.create_element(Element::new("li"), None);
    tree.replace_with(first, &[a, b]).unwrap();

    assert_eq!(tree.children(ul), &[a, b, second]);
    assert!(!tree.contains(first));
    tree.check_integrity().unwrap();
}

#[test]
fn test_insert_rejects_attached_and_cycles() {
    let mut tree = sample();
    let ul = tree.children(tree.root())[0];
    let li = tree.children(ul)[0];

    assert!(matches!(
        tree.append_child(tree.root(), li),
        Err(TreeError::AlreadyAttached { .. })
    ));

    tree.detach(ul).unwrap();
    assert!(matches!(
        tree.append_child(li, ul),
        Err(TreeError::Cycle { .. })
    ));

    let text = tree.create_text("x", None);
    assert!(matches!(
        tree.append_child(text, ul),
        Err(TreeError::NotAContainer(_))
    ));
    assert_eq!(tree.detach(tree.root()), Err(TreeError::RootImmovable));
}

#[test]
fn test_failed_insert_leaves_tree_untouched() {
    let mut tree = sample();
    let ul = tree.children(tree.root())[0];
    let fresh = tree.create_text("fresh", None);
    let attached = tree.children(ul)[0];

    let result = tree.insert_children(ul, 0, &[fresh, attached]);

    assert!(result.is_err());
    assert_eq!(tree.parent(fresh), None);
    assert_eq!(tree.children(ul).len(), 2);
}

#[test]
fn test_clone_subtree_clears_positions_and_copies_context() {
    let mut tree = Tree::from_fragments(vec![Fragment::element("li")
        .at(4, 2)
        .with_context("x", 1)
        .child(Fragment::text("{x}").at(4, 6))])
    .unwrap();
    let li = tree.children(tree.root())[0];

    let copy = tree.clone_subtree(li).unwrap();

    assert_eq!(tree.parent(copy), None);
    assert_eq!(tree.position(copy), None);
    assert_eq!(tree.position(tree.children(copy)[0]), None);
    assert_eq!(tree.position(li), Some(Position::new(4, 2)));
    assert_eq!(
        tree.element(copy).unwrap().context.get("x"),
        Some(&loom_common::Value::from(1))
    );
    println!("✓ Clone drops positions, keeps context");
}

#[test]
fn test_traversal_orders() {
    let tree = sample();
    let ul = tree.children(tree.root())[0];
    let li = tree.children(ul)[1];
    let text = tree.children(li)[0];

    let closest_first: Vec<_> = tree.ancestors(text).collect();
    assert_eq!(closest_first, vec![li, ul, tree.root()]);
    assert_eq!(tree.ancestors_root_first(text), vec![tree.root(), ul, li]);

    let tags: Vec<String> = tree
        .descendants(tree.root())
        .filter_map(|id| tree.element(id).map(|el| el.tag.clone()))
        .collect();
    assert_eq!(tags, vec!["ul", "li", "li"]);
}

#[test]
fn test_fragment_round_trip_keeps_structure() {
    let tree = sample();
    let fragment = tree.to_fragment(tree.root()).unwrap();
    let rebuilt = Tree::from_fragment(&fragment).unwrap();

    assert_eq!(rebuilt.to_fragment(rebuilt.root()).unwrap(), fragment);
}

#[test]
fn test_void_elements_have_no_child_list() {
    let mut tree = Tree::from_fragments(vec![Fragment::void("br").attr("class", "x")]).unwrap();
    let br = tree.children(tree.root())[0];

    assert!(!tree.get(br).unwrap().is_container());
    let text = tree.create_text("no", None);
    assert!(tree.append_child(br, text).is_err());
    assert_eq!(
        tree.element(br).unwrap().attribute("class"),
        Some(&AttrValue::from("x"))
    );
}

#[test]
fn test_nested_root_fragment_is_rejected() {
    let mut tree = Tree::new();
    let result = tree.instantiate(&Fragment::root(vec![]));
    assert_eq!(result, Err(TreeError::NestedRoot));
    assert!(matches!(
        tree.get(tree.root()).map(|n| &n.kind),
        Some(NodeKind::Root)
    ));
}
