//! Host display-tree abstraction
//!
//! The reconciler never touches a concrete display structure directly; it
//! drives any type implementing [`HostTree`]. [`crate::Document`] is the
//! in-memory implementation used by tests and headless rendering.

use slotmap::new_key_type;

use crate::node::{Prop, Props, KEY_PROP};

new_key_type! {
    /// Handle to a node living in a host tree
    pub struct NodeId;
}

/// What a host node currently is
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind<'a> {
    Element(&'a str),
    Text(&'a str),
    /// Trusted markup wrapper
    Markup(&'a str),
}

/// Mutable display tree the reconciler patches.
///
/// Structural operations that receive a node already attached elsewhere move
/// it; nodes passed to `replace_child` (as `old`) and `remove_child` are gone
/// afterwards.
pub trait HostTree {
    fn create_element(&mut self, tag: &str) -> NodeId;

    fn create_text(&mut self, text: &str) -> NodeId;

    fn create_markup(&mut self, markup: &str) -> NodeId;

    /// `None` when the node does not exist (anymore)
    fn kind(&self, node: NodeId) -> Option<NodeKind<'_>>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn child_count(&self, node: NodeId) -> usize;

    fn child_at(&self, node: NodeId, index: usize) -> Option<NodeId>;

    fn set_text(&mut self, node: NodeId, text: &str);

    /// Insert (or move) `node` under `parent` before `reference`; append when
    /// `reference` is `None`.
    fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>);

    /// Append several nodes as one structural mutation
    fn append_children(&mut self, parent: NodeId, nodes: Vec<NodeId>);

    fn replace_child(&mut self, parent: NodeId, new: NodeId, old: NodeId);

    fn remove_child(&mut self, parent: NodeId, node: NodeId);

    fn set_property(&mut self, node: NodeId, name: &str, value: &Prop);

    fn remove_property(&mut self, node: NodeId, name: &str);

    fn clear_style(&mut self, node: NodeId);

    fn set_style(&mut self, node: NodeId, name: &str, value: &str);

    /// Write (or delete, on `None`) a dataset entry
    fn set_data(&mut self, node: NodeId, name: &str, value: Option<&str>);

    /// Properties applied by the last reconciliation of `node`
    fn applied_props(&self, node: NodeId) -> Option<&Props>;

    fn store_applied_props(&mut self, node: NodeId, props: Props);

    /// Find an attached element by its `id` property
    fn element_by_id(&self, id: &str) -> Option<NodeId>;

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let index = (0..self.child_count(parent)).find(|&i| self.child_at(parent, i) == Some(node))?;
        self.child_at(parent, index + 1)
    }

    fn tag(&self, node: NodeId) -> Option<&str> {
        match self.kind(node)? {
            NodeKind::Element(tag) => Some(tag),
            _ => None,
        }
    }

    /// Whether `ancestor` is a strict ancestor of `node`
    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    /// Key recorded in the node's applied properties
    fn applied_key(&self, node: NodeId) -> Option<String> {
        self.applied_props(node)?.get(KEY_PROP)?.to_key()
    }
}
