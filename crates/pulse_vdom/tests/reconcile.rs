//! Mutation-count properties of the reconciler, checked through the
//! `Document` mutation log.

use pretty_assertions::assert_eq;
use pulse_vdom::{el, text, Document, HostTree, Mutation, NodeId, Placeholder, Reconciler, VNode};

struct Fixture {
    doc: Document,
    app: NodeId,
    reconciler: Reconciler,
}

impl Fixture {
    fn new(initial: &[VNode]) -> Self {
        let mut doc = Document::new();
        let app = doc.mount_point("app");
        let mut reconciler = Reconciler::new();
        reconciler.render(&mut doc, app, initial);
        doc.clear_mutations();
        Self { doc, app, reconciler }
    }

    fn render(&mut self, nodes: &[VNode]) -> Vec<Mutation> {
        self.reconciler.render(&mut self.doc, self.app, nodes);
        self.doc.take_mutations()
    }

    fn children(&self) -> Vec<NodeId> {
        self.doc.children(self.app).to_vec()
    }
}

fn list(items: &[&str]) -> Vec<VNode> {
    vec![el("ul").children(items.iter().map(|item| el("li").child(*item))).into()]
}

fn keyed_list(items: &[&str]) -> Vec<VNode> {
    items
        .iter()
        .map(|item| el("li").key(*item).child(*item).into())
        .collect()
}

#[test]
fn test_initial_render_is_one_batch() {
    let mut fixture = Fixture::new(&[]);
    let mutations = fixture.render(&[text("a"), el("p").into(), text("b")]);
    assert_eq!(
        mutations,
        vec![Mutation::Append {
            parent: fixture.app,
            count: 3
        }]
    );
}

#[test]
fn test_changed_text_is_the_only_mutation() {
    let mut fixture = Fixture::new(&[el("div").children(["a", "c"]).into()]);
    let div = fixture.children()[0];
    let first = fixture.doc.children(div)[0];
    let second = fixture.doc.children(div)[1];

    let mutations = fixture.render(&[el("div").children(["a", "b"]).into()]);

    assert_eq!(mutations, vec![Mutation::SetText { node: second }]);
    assert_eq!(fixture.doc.text(first), Some("a"));
    assert_eq!(fixture.doc.text(second), Some("b"));
}

#[test]
fn test_unchanged_render_mutates_nothing() {
    let view = || vec![el("div").class("box").style("color", "red").child("same").into()];
    let mut fixture = Fixture::new(&view());
    assert!(fixture.render(&view()).is_empty());
}

#[test]
fn test_keyed_move_keeps_node_identity() {
    let mut fixture = Fixture::new(&keyed_list(&["a", "b", "c"]));
    let before = fixture.children();

    let mutations = fixture.render(&keyed_list(&["b", "c", "a"]));
    let after = fixture.children();

    assert_eq!(after, vec![before[1], before[2], before[0]]);
    assert!(mutations
        .iter()
        .all(|mutation| matches!(mutation, Mutation::Move { .. })));
    assert_eq!(fixture.doc.inner_html(fixture.app), "<li>b</li><li>c</li><li>a</li>");
}

#[test]
fn test_keyed_removal_from_the_middle() {
    let mut fixture = Fixture::new(&keyed_list(&["a", "b", "c"]));
    let before = fixture.children();

    fixture.render(&keyed_list(&["a", "c"]));

    assert_eq!(fixture.children(), vec![before[0], before[2]]);
    assert!(!fixture.doc.contains(before[1]));
    assert!(fixture.reconciler.keys().get("b").is_none());
}

#[test]
fn test_shrinking_removes_trailing_nodes() {
    let mut fixture = Fixture::new(&list(&["a", "b", "c"]));
    let ul = fixture.children()[0];
    let items = fixture.doc.children(ul).to_vec();

    let mutations = fixture.render(&list(&["a"]));

    assert_eq!(
        mutations,
        vec![
            Mutation::Remove { parent: ul, node: items[2] },
            Mutation::Remove { parent: ul, node: items[1] },
        ]
    );
    assert_eq!(fixture.doc.children(ul), &items[..1]);
}

#[test]
fn test_growing_appends_in_one_batch() {
    let mut fixture = Fixture::new(&list(&["a"]));
    let ul = fixture.children()[0];

    let mutations = fixture.render(&list(&["a", "b", "c"]));

    assert_eq!(mutations, vec![Mutation::Append { parent: ul, count: 2 }]);
    assert_eq!(
        fixture.doc.inner_html(ul),
        "<li>a</li><li>b</li><li>c</li>"
    );
}

#[test]
fn test_unkeyed_reorder_mutates_in_place() {
    let mut fixture = Fixture::new(&list(&["a", "b"]));
    let ul = fixture.children()[0];
    let items = fixture.doc.children(ul).to_vec();

    let mutations = fixture.render(&list(&["b", "a"]));

    assert_eq!(fixture.doc.children(ul), &items[..]);
    assert_eq!(mutations.len(), 2);
    assert!(mutations
        .iter()
        .all(|mutation| matches!(mutation, Mutation::SetText { .. })));
    assert_eq!(fixture.doc.inner_html(ul), "<li>b</li><li>a</li>");
}

#[test]
fn test_text_element_mismatch_replaces_node() {
    let mut fixture = Fixture::new(&[text("plain")]);
    let old = fixture.children()[0];

    let mutations = fixture.render(&[el("b").child("bold").into()]);
    let new = fixture.children()[0];

    assert_eq!(
        mutations,
        vec![Mutation::Replace {
            parent: fixture.app,
            old,
            new
        }]
    );
    assert!(!fixture.doc.contains(old));
}

fn slot(id: &str) -> VNode {
    VNode::Placeholder(Placeholder::new("div", id))
}

/// Renders `[slot(id)]` and fills the placeholder the way a nested instance would
fn filled_slot(id: &str) -> (Fixture, NodeId, NodeId) {
    let mut fixture = Fixture::new(&[slot(id)]);
    let node = fixture.children()[0];
    let owned = fixture.doc.create_text("owned");
    fixture.doc.append_children(node, vec![owned]);
    fixture.doc.clear_mutations();
    (fixture, node, owned)
}

#[test]
fn test_keyed_node_inserted_before_placeholder() {
    let (mut fixture, node, owned) = filled_slot("badge");

    let mutations = fixture.render(&[el("li").key("x").into(), slot("badge")]);

    let children = fixture.children();
    assert_eq!(children.len(), 2);
    assert_eq!(children[1], node);
    assert_eq!(fixture.doc.children(node), &[owned]);
    assert_eq!(
        mutations,
        vec![Mutation::Insert {
            parent: fixture.app,
            node: children[0]
        }]
    );
    assert_eq!(
        fixture.doc.inner_html(fixture.app),
        "<li></li><div id=\"badge\">owned</div>"
    );
}

#[test]
fn test_new_placeholder_inserted_before_existing_one() {
    let (mut fixture, node, owned) = filled_slot("a");

    fixture.render(&[slot("b"), slot("a")]);

    let children = fixture.children();
    assert_eq!(children.len(), 2);
    assert_eq!(fixture.doc.element_by_id("b"), Some(children[0]));
    assert_eq!(children[1], node);
    assert_eq!(fixture.doc.children(node), &[owned]);
}
