//! Tests for element tree mutation: add_child, remove_child, reparenting.

use arbor_dom::{Attribute, Document, ElementId, ElementTree, QName, TreeError};

/// Helper to create a parent with the given children attached in order.
fn family(tree: &mut ElementTree, parent: &str, children: &[&str]) -> (ElementId, Vec<ElementId>) {
    let parent = tree.create_local(parent);
    let children: Vec<ElementId> = children
        .iter()
        .map(|name| {
            let child = tree.create_local(name);
            tree.add_child(parent, child).unwrap();
            child
        })
        .collect();
    (parent, children)
}

/// Every child's parent link points back at the element listing it.
fn assert_links_consistent(tree: &ElementTree, root: ElementId) {
    for id in tree.descendants(root) {
        for &child in tree.children(id) {
            assert_eq!(tree.parent(child), Some(id));
            assert_eq!(tree.children(id).iter().filter(|&&c| c == child).count(), 1);
        }
    }
}

// ========== add_child ==========

#[test]
fn test_add_child_preserves_insertion_order() {
    let mut tree = ElementTree::new();
    let (parent, children) = family(&mut tree, "list", &["a", "b", "c"]);

    assert_eq!(tree.children(parent), children.as_slice());
    for &child in &children {
        assert_eq!(tree.parent(child), Some(parent));
    }
    assert_links_consistent(&tree, parent);
}

#[test]
fn test_add_child_reparents_attached_element() {
    let mut tree = ElementTree::new();
    let (old_parent, children) = family(&mut tree, "old", &["a", "b"]);
    let new_parent = tree.create_local("new");

    tree.add_child(new_parent, children[0]).unwrap();

    // Prior parent lost exactly one child
    assert_eq!(tree.children(old_parent), &[children[1]]);
    assert_eq!(tree.children(new_parent), &[children[0]]);
    assert_eq!(tree.parent(children[0]), Some(new_parent));
    assert_links_consistent(&tree, old_parent);
    assert_links_consistent(&tree, new_parent);
}

#[test]
fn test_add_child_again_moves_to_end() {
    let mut tree = ElementTree::new();
    let (parent, children) = family(&mut tree, "p", &["a", "b"]);

    tree.add_child(parent, children[0]).unwrap();

    assert_eq!(tree.children(parent), &[children[1], children[0]]);
}

#[test]
fn test_add_child_rejects_cycles() {
    let mut tree = ElementTree::new();
    let (root, children) = family(&mut tree, "root", &["mid"]);
    let leaf = tree.create_local("leaf");
    tree.add_child(children[0], leaf).unwrap();

    assert_eq!(
        tree.add_child(leaf, root),
        Err(TreeError::HierarchyRequest {
            parent: leaf,
            child: root
        })
    );
    assert_eq!(
        tree.add_child(root, root),
        Err(TreeError::HierarchyRequest {
            parent: root,
            child: root
        })
    );
    // Nothing moved
    assert_eq!(tree.parent(root), None);
    assert_eq!(tree.parent(leaf), Some(children[0]));
}

#[test]
fn test_add_child_rejects_unknown_ids() {
    let mut tree = ElementTree::new();
    let parent = tree.create_local("p");

    assert_eq!(
        tree.add_child(parent, ElementId(42)),
        Err(TreeError::UnknownElement(ElementId(42)))
    );
}

#[test]
fn test_set_parent_is_add_child() {
    let mut tree = ElementTree::new();
    let parent = tree.create_local("p");
    let child = tree.create_local("c");

    tree.set_parent(child, parent).unwrap();

    assert_eq!(tree.children(parent), &[child]);
}

// ========== remove_child ==========

#[test]
fn test_remove_child_middle_of_three() {
    let mut tree = ElementTree::new();
    let (parent, children) = family(&mut tree, "div", &["a", "b", "c"]);

    assert_eq!(tree.remove_child(parent, children[1]), Some(children[1]));

    assert_eq!(tree.children(parent), &[children[0], children[2]]);
    assert_eq!(tree.parent(children[1]), None);
    assert_eq!(tree.next_sibling(children[0]), Some(children[2]));
    assert_eq!(tree.prev_sibling(children[2]), Some(children[0]));
}

#[test]
fn test_remove_child_not_a_child() {
    let mut tree = ElementTree::new();
    let (parent, _) = family(&mut tree, "div", &["a"]);
    let stranger = tree.create_local("x");

    assert_eq!(tree.remove_child(parent, stranger), None);
    assert_eq!(tree.children(parent).len(), 1);
}

#[test]
fn test_removed_subtree_stays_intact() {
    let mut tree = ElementTree::new();
    let (root, children) = family(&mut tree, "root", &["branch"]);
    let leaf = tree.create_local("leaf");
    tree.add_child(children[0], leaf).unwrap();

    let _ = tree.remove_child(root, children[0]).unwrap();

    assert_eq!(tree.parent(children[0]), None);
    assert_eq!(tree.children(children[0]), &[leaf]);
    assert_eq!(tree.parent(leaf), Some(children[0]));

    // And it can be attached again
    tree.add_child(root, children[0]).unwrap();
    assert_links_consistent(&tree, root);
}

// ========== navigation ==========

#[test]
fn test_ancestors_and_descendants() {
    let mut tree = ElementTree::new();
    let (root, children) = family(&mut tree, "root", &["a", "b"]);
    let leaf = tree.create_local("leaf");
    tree.add_child(children[0], leaf).unwrap();

    assert_eq!(tree.ancestors(leaf).collect::<Vec<_>>(), vec![children[0], root]);
    assert!(tree.is_descendant_of(leaf, root));
    assert!(!tree.is_descendant_of(root, leaf));
    assert_eq!(
        tree.descendants(root).collect::<Vec<_>>(),
        vec![root, children[0], leaf, children[1]]
    );
}

#[test]
fn test_attributes_and_content() {
    let mut tree = ElementTree::new();
    let id = tree.create_element(QName::new("urn:x", "item"));
    tree.add_attribute(id, Attribute::new(QName::local("k"), "1")).unwrap();
    tree.add_attribute(id, Attribute::new(QName::local("k"), "2")).unwrap();
    tree.set_content(id, "text").unwrap();

    let element = &tree[id];
    assert_eq!(element.attributes.len(), 2);
    assert_eq!(element.attribute_local("k"), Some("1"));
    assert_eq!(element.content.as_deref(), Some("text"));
    assert!(!element.is_empty_element());
    assert_eq!(element.name.to_string(), "{urn:x}item");
}

#[test]
fn test_same_subtree_across_arenas() {
    let mut left = ElementTree::new();
    let (a, _) = family(&mut left, "r", &["x", "y"]);
    let mut right = ElementTree::new();
    let _padding = right.create_local("unused");
    let (b, right_children) = family(&mut right, "r", &["x", "y"]);

    assert!(left.same_subtree(a, &right, b));

    right.set_content(right_children[1], "different").unwrap();
    assert!(!left.same_subtree(a, &right, b));
}

// ========== Document ==========

#[test]
fn test_document_set_root_detaches_and_replaces() {
    let mut document = Document::new();
    let (outer, children) = family(document.tree_mut(), "outer", &["inner"]);

    assert_eq!(document.set_root(outer), Ok(None));
    assert_eq!(document.set_root(children[0]), Ok(Some(outer)));

    assert_eq!(document.root(), Some(children[0]));
    assert_eq!(document.tree().parent(children[0]), None);
    assert!(document.tree().children(outer).is_empty());
    assert_eq!(document.root_element().map(|e| e.name.local.as_str()), Some("inner"));
}

#[test]
fn test_document_rejects_foreign_root() {
    let mut document = Document::new();

    assert_eq!(
        document.set_root(ElementId(3)),
        Err(TreeError::UnknownElement(ElementId(3)))
    );
    assert_eq!(document.root(), None);
}
