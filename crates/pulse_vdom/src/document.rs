//! In-memory host tree
//!
//! `Document` is an arena of element, text and markup nodes hanging off a
//! `body` root. Every mutation of an attached node is appended to a mutation
//! log, which is what tests use to check that a patch touched only what it
//! had to.

use std::fmt::Write as _;

use indexmap::IndexMap;
use slotmap::SlotMap;
use tracing::warn;

use crate::host::{HostTree, NodeId, NodeKind};
use crate::node::{Prop, Props};

/// One recorded change to the attached tree
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    SetText { node: NodeId },
    SetProperty { node: NodeId, name: String },
    RemoveProperty { node: NodeId, name: String },
    SetStyle { node: NodeId, name: String },
    ClearStyle { node: NodeId },
    SetData { node: NodeId, name: String },
    /// A detached node was attached
    Insert { parent: NodeId, node: NodeId },
    /// An attached node changed position
    Move { parent: NodeId, node: NodeId },
    /// Batch insertion of `count` nodes
    Append { parent: NodeId, count: usize },
    Remove { parent: NodeId, node: NodeId },
    Replace { parent: NodeId, old: NodeId, new: NodeId },
}

#[derive(Debug)]
enum Content {
    Element(String),
    Text(String),
    Markup(String),
}

#[derive(Debug)]
struct HostNode {
    content: Content,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    properties: IndexMap<String, Prop>,
    style: IndexMap<String, String>,
    dataset: IndexMap<String, String>,
    applied: Option<Props>,
}

impl HostNode {
    fn new(content: Content) -> Self {
        Self {
            content,
            parent: None,
            children: Vec::new(),
            properties: IndexMap::new(),
            style: IndexMap::new(),
            dataset: IndexMap::new(),
            applied: None,
        }
    }
}

/// Arena-backed display tree
#[derive(Debug)]
pub struct Document {
    nodes: SlotMap<NodeId, HostNode>,
    body: NodeId,
    log: Vec<Mutation>,
}

impl Document {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let body = nodes.insert(HostNode::new(Content::Element("body".to_owned())));
        Self {
            nodes,
            body,
            log: Vec::new(),
        }
    }

    /// Root of the attached tree
    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Append a `div` with the given id to the body and return it
    pub fn mount_point(&mut self, id: &str) -> NodeId {
        let node = self.create_element("div");
        self.set_property(node, "id", &Prop::from(id));
        let body = self.body;
        self.insert_before(body, node, None);
        node
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    /// Whether `node` hangs off the body
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.body {
                return true;
            }
            current = self.nodes.get(id).and_then(|n| n.parent);
        }
        false
    }

    /// Number of live nodes, body included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes.get(node).map_or(&[], |n| n.children.as_slice())
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node)?.content {
            Content::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn property(&self, node: NodeId, name: &str) -> Option<&Prop> {
        self.nodes.get(node)?.properties.get(name)
    }

    pub fn style(&self, node: NodeId) -> Option<&IndexMap<String, String>> {
        self.nodes.get(node).map(|n| &n.style)
    }

    pub fn dataset(&self, node: NodeId) -> Option<&IndexMap<String, String>> {
        self.nodes.get(node).map(|n| &n.dataset)
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.log
    }

    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.log)
    }

    pub fn clear_mutations(&mut self) {
        self.log.clear();
    }

    /// Serialize the children of `node`
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(node) {
            self.write_html(child, &mut out);
        }
        out
    }

    /// Serialize `node` and its subtree
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let Some(host) = self.nodes.get(node) else {
            return;
        };
        match &host.content {
            Content::Text(text) => out.push_str(&escape(text, false)),
            Content::Markup(markup) => {
                out.push_str("<div>");
                out.push_str(markup);
                out.push_str("</div>");
            }
            Content::Element(tag) => {
                let _ = write!(out, "<{tag}");
                for (name, value) in &host.properties {
                    match value {
                        Prop::Null | Prop::Bool(false) => {}
                        Prop::Bool(true) => {
                            let _ = write!(out, " {name}");
                        }
                        other => {
                            let text = other.to_text().unwrap_or_default();
                            let _ = write!(out, " {name}=\"{}\"", escape(&text, true));
                        }
                    }
                }
                for (name, value) in &host.dataset {
                    let _ = write!(out, " data-{name}=\"{}\"", escape(value, true));
                }
                if !host.style.is_empty() {
                    let css = host
                        .style
                        .iter()
                        .map(|(name, value)| format!("{name}: {value}"))
                        .collect::<Vec<_>>()
                        .join("; ");
                    let _ = write!(out, " style=\"{}\"", escape(&css, true));
                }
                out.push('>');
                for &child in &host.children {
                    self.write_html(child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }

    fn insert(&mut self, content: Content) -> NodeId {
        self.nodes.insert(HostNode::new(content))
    }

    fn record(&mut self, anchor: NodeId, mutation: Mutation) {
        if self.is_attached(anchor) {
            self.log.push(mutation);
        }
    }

    /// Unlink `node` from its parent without destroying it
    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.nodes.get_mut(node).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(parent) = self.nodes.get_mut(parent) {
            parent.children.retain(|&child| child != node);
        }
    }

    /// Free `node` and its whole subtree
    fn destroy(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(host) = self.nodes.remove(id) {
                stack.extend(host.children);
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl HostTree for Document {
    fn create_element(&mut self, tag: &str) -> NodeId {
        self.insert(Content::Element(tag.to_owned()))
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        self.insert(Content::Text(text.to_owned()))
    }

    fn create_markup(&mut self, markup: &str) -> NodeId {
        self.insert(Content::Markup(markup.to_owned()))
    }

    fn kind(&self, node: NodeId) -> Option<NodeKind<'_>> {
        Some(match &self.nodes.get(node)?.content {
            Content::Element(tag) => NodeKind::Element(tag),
            Content::Text(text) => NodeKind::Text(text),
            Content::Markup(markup) => NodeKind::Markup(markup),
        })
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node)?.parent
    }

    fn child_count(&self, node: NodeId) -> usize {
        self.children(node).len()
    }

    fn child_at(&self, node: NodeId, index: usize) -> Option<NodeId> {
        self.children(node).get(index).copied()
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(node)?);
        let index = siblings.iter().position(|&sibling| sibling == node)?;
        siblings.get(index + 1).copied()
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        let Some(host) = self.nodes.get_mut(node) else {
            return;
        };
        match &mut host.content {
            Content::Text(current) => *current = text.to_owned(),
            _ => {
                warn!(?node, "set_text on a non-text node");
                return;
            }
        }
        self.record(node, Mutation::SetText { node });
    }

    fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        if reference == Some(node) || node == parent || !self.contains(parent) || !self.contains(node) {
            return;
        }
        if self.is_ancestor(node, parent) {
            warn!(?node, ?parent, "refusing to insert a node into its own subtree");
            return;
        }

        let was_attached = self.is_attached(node);
        self.detach(node);

        let Some(host) = self.nodes.get_mut(parent) else {
            return;
        };
        let index = reference
            .and_then(|reference| host.children.iter().position(|&child| child == reference))
            .unwrap_or(host.children.len());
        host.children.insert(index, node);
        if let Some(child) = self.nodes.get_mut(node) {
            child.parent = Some(parent);
        }

        let mutation = if was_attached {
            Mutation::Move { parent, node }
        } else {
            Mutation::Insert { parent, node }
        };
        self.record(parent, mutation);
    }

    fn append_children(&mut self, parent: NodeId, nodes: Vec<NodeId>) {
        if nodes.is_empty() || !self.contains(parent) {
            return;
        }
        let mut count = 0;
        for node in nodes {
            if node == parent || !self.contains(node) || self.is_ancestor(node, parent) {
                continue;
            }
            self.detach(node);
            if let Some(child) = self.nodes.get_mut(node) {
                child.parent = Some(parent);
            }
            if let Some(host) = self.nodes.get_mut(parent) {
                host.children.push(node);
            }
            count += 1;
        }
        self.record(parent, Mutation::Append { parent, count });
    }

    fn replace_child(&mut self, parent: NodeId, new: NodeId, old: NodeId) {
        let Some(index) = self
            .nodes
            .get(parent)
            .and_then(|host| host.children.iter().position(|&child| child == old))
        else {
            warn!(?parent, ?old, "replace_child: node is not a child of parent");
            return;
        };
        if new == old || !self.contains(new) {
            return;
        }

        self.detach(new);
        if let Some(host) = self.nodes.get_mut(parent) {
            // detaching `new` may have shifted `old` if both shared this parent
            let index = host
                .children
                .iter()
                .position(|&child| child == old)
                .unwrap_or(index);
            host.children[index] = new;
        }
        if let Some(child) = self.nodes.get_mut(new) {
            child.parent = Some(parent);
        }
        if let Some(previous) = self.nodes.get_mut(old) {
            previous.parent = None;
        }

        self.record(parent, Mutation::Replace { parent, old, new });
        self.destroy(old);
    }

    fn remove_child(&mut self, parent: NodeId, node: NodeId) {
        if self.parent(node) != Some(parent) {
            warn!(?parent, ?node, "remove_child: node is not a child of parent");
            return;
        }
        self.record(parent, Mutation::Remove { parent, node });
        self.detach(node);
        self.destroy(node);
    }

    fn set_property(&mut self, node: NodeId, name: &str, value: &Prop) {
        let Some(host) = self.nodes.get_mut(node) else {
            return;
        };
        host.properties.insert(name.to_owned(), value.clone());
        self.record(
            node,
            Mutation::SetProperty {
                node,
                name: name.to_owned(),
            },
        );
    }

    fn remove_property(&mut self, node: NodeId, name: &str) {
        let removed = self
            .nodes
            .get_mut(node)
            .and_then(|host| host.properties.shift_remove(name));
        if removed.is_some() {
            self.record(
                node,
                Mutation::RemoveProperty {
                    node,
                    name: name.to_owned(),
                },
            );
        }
    }

    fn clear_style(&mut self, node: NodeId) {
        let Some(host) = self.nodes.get_mut(node) else {
            return;
        };
        if host.style.is_empty() {
            return;
        }
        host.style.clear();
        self.record(node, Mutation::ClearStyle { node });
    }

    fn set_style(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(host) = self.nodes.get_mut(node) else {
            return;
        };
        host.style.insert(name.to_owned(), value.to_owned());
        self.record(
            node,
            Mutation::SetStyle {
                node,
                name: name.to_owned(),
            },
        );
    }

    fn set_data(&mut self, node: NodeId, name: &str, value: Option<&str>) {
        let Some(host) = self.nodes.get_mut(node) else {
            return;
        };
        match value {
            Some(value) => {
                host.dataset.insert(name.to_owned(), value.to_owned());
            }
            None => {
                host.dataset.shift_remove(name);
            }
        }
        self.record(
            node,
            Mutation::SetData {
                node,
                name: name.to_owned(),
            },
        );
    }

    fn applied_props(&self, node: NodeId) -> Option<&Props> {
        self.nodes.get(node)?.applied.as_ref()
    }

    fn store_applied_props(&mut self, node: NodeId, props: Props) {
        if let Some(host) = self.nodes.get_mut(node) {
            host.applied = Some(props);
        }
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        let mut stack = vec![self.body];
        while let Some(node) = stack.pop() {
            let host = self.nodes.get(node)?;
            if host.properties.get("id").and_then(Prop::to_key).as_deref() == Some(id) {
                return Some(node);
            }
            stack.extend(host.children.iter().rev().copied());
        }
        None
    }
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_work_is_not_logged() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        doc.set_property(div, "title", &Prop::from("t"));
        let text = doc.create_text("hi");
        doc.append_children(div, vec![text]);
        assert!(doc.mutations().is_empty());

        let body = doc.body();
        doc.insert_before(body, div, None);
        assert_eq!(doc.take_mutations(), vec![Mutation::Insert { parent: body, node: div }]);
        assert_eq!(doc.inner_html(body), "<div title=\"t\">hi</div>");
    }

    #[test]
    fn test_insert_before_moves_attached_node() {
        let mut doc = Document::new();
        let body = doc.body();
        let a = doc.mount_point("a");
        let b = doc.mount_point("b");
        doc.clear_mutations();

        doc.insert_before(body, b, Some(a));
        assert_eq!(doc.children(body), &[b, a]);
        assert_eq!(doc.take_mutations(), vec![Mutation::Move { parent: body, node: b }]);
    }

    #[test]
    fn test_remove_and_replace_destroy_subtrees() {
        let mut doc = Document::new();
        let body = doc.body();
        let outer = doc.mount_point("outer");
        let inner = doc.create_text("x");
        doc.append_children(outer, vec![inner]);

        let fresh = doc.create_element("p");
        doc.replace_child(body, fresh, outer);
        assert!(!doc.contains(outer));
        assert!(!doc.contains(inner));
        assert_eq!(doc.children(body), &[fresh]);

        doc.remove_child(body, fresh);
        assert!(!doc.contains(fresh));
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_element_by_id_only_sees_attached_nodes() {
        let mut doc = Document::new();
        let app = doc.mount_point("app");
        let loose = doc.create_element("div");
        doc.set_property(loose, "id", &Prop::from("loose"));

        assert_eq!(doc.element_by_id("app"), Some(app));
        assert_eq!(doc.element_by_id("loose"), None);
    }

    #[test]
    fn test_html_serialization() {
        let mut doc = Document::new();
        let app = doc.mount_point("app");
        doc.set_style(app, "color", "red");
        doc.set_data(app, "role", Some("main"));
        doc.set_property(app, "hidden", &Prop::Bool(true));
        let text = doc.create_text("a < b");
        let markup = doc.create_markup("<b>raw</b>");
        doc.append_children(app, vec![text, markup]);

        assert_eq!(
            doc.to_html(app),
            "<div id=\"app\" hidden data-role=\"main\" style=\"color: red\">a &lt; b<div><b>raw</b></div></div>"
        );
    }
}
