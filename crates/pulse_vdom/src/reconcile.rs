//! Tree patching
//!
//! [`Reconciler::render`] makes the children of a host node match a list of
//! description nodes while touching as little of the host as possible:
//!
//! - Nodes whose kind and tag still match are patched in place.
//! - Keyed nodes keep their identity: a node carrying the wanted key anywhere
//!   in the tree is moved to the slot instead of being recreated.
//! - Non-keyed siblings are matched purely by position. Reordering them
//!   rewrites whatever occupies each slot; it never moves nodes.
//! - Surplus host children are removed from the end once the whole pass is
//!   over (so a keyed node among them can still be claimed elsewhere), missing
//!   ones are appended in a single batch.
//!
//! Property diffs are computed against the snapshot stored on the previous
//! reconciliation, never against live host values.

use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::host::{HostTree, NodeId, NodeKind};
use crate::keys::KeyRegistry;
use crate::node::{Element, Prop, Props, VNode, DATA_PREFIX, KEY_PROP, RAW_MARKUP_PREFIX, STYLE_PROP};

/// How a host node relates to the description node for its slot
enum Patch {
    Keep,
    SetText,
    Element,
    Placeholder,
    Replace,
}

/// Identity a description node asks its slot for
enum Identity<'a> {
    Key(String),
    PlaceholderId(&'a str),
}

/// Patches host trees and owns the tree-wide key registry
#[derive(Debug, Default)]
pub struct Reconciler {
    keys: KeyRegistry,
    /// Nodes currently standing in for a nested component
    placeholders: FxHashSet<NodeId>,
    /// Surplus `(parent, child)` pairs awaiting removal
    surplus: Vec<(NodeId, NodeId)>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> &KeyRegistry {
        &self.keys
    }

    /// Forget every key registration and placeholder
    pub fn clear(&mut self) {
        self.keys.clear();
        self.placeholders.clear();
    }

    /// Whether `node` was last patched as a nested component placeholder
    pub fn is_placeholder(&self, node: NodeId) -> bool {
        self.placeholders.contains(&node)
    }

    /// Make the children of `target` match `nodes`.
    ///
    /// An empty target is filled with one batch insertion; otherwise its
    /// children are patched in place. A target that no longer exists is
    /// ignored.
    pub fn render<H>(&mut self, host: &mut H, target: NodeId, nodes: &[VNode])
    where
        H: HostTree + ?Sized,
    {
        if host.kind(target).is_none() {
            debug!(?target, "render target no longer exists");
            return;
        }

        if host.child_count(target) == 0 {
            let created: Vec<NodeId> = nodes.iter().map(|node| self.create(host, node)).collect();
            if !created.is_empty() {
                host.append_children(target, created);
            }
        } else {
            self.update_children(host, target, nodes);
            self.remove_surplus(host);
        }
    }

    /// Materialize a description node as a detached host subtree
    fn create<H>(&mut self, host: &mut H, vnode: &VNode) -> NodeId
    where
        H: HostTree + ?Sized,
    {
        match vnode {
            VNode::Text(text) => match text.strip_prefix(RAW_MARKUP_PREFIX) {
                Some(markup) => host.create_markup(markup),
                None => host.create_text(text),
            },
            VNode::Element(element) => {
                let node = host.create_element(&element.tag);
                self.update_props(host, node, &element.props);
                let children: Vec<NodeId> = element
                    .children
                    .iter()
                    .map(|child| self.create(host, child))
                    .collect();
                if !children.is_empty() {
                    host.append_children(node, children);
                }
                node
            }
            VNode::Placeholder(placeholder) => {
                let node = host.create_element(&placeholder.tag);
                self.update_props(host, node, &placeholder.props());
                self.placeholders.insert(node);
                node
            }
        }
    }

    /// Patch `node` (a child of `parent`) to match `vnode`.
    ///
    /// Returns the node now occupying the slot, which differs from `node`
    /// when it had to be replaced.
    fn reconcile<H>(&mut self, host: &mut H, parent: NodeId, node: NodeId, vnode: &VNode) -> NodeId
    where
        H: HostTree + ?Sized,
    {
        let patch = match (host.kind(node), vnode) {
            (Some(NodeKind::Text(current)), VNode::Text(text)) if !text.starts_with(RAW_MARKUP_PREFIX) => {
                if current == text.as_str() {
                    Patch::Keep
                } else {
                    Patch::SetText
                }
            }
            (Some(NodeKind::Markup(current)), VNode::Text(text))
                if text.strip_prefix(RAW_MARKUP_PREFIX) == Some(current) =>
            {
                Patch::Keep
            }
            (Some(NodeKind::Element(tag)), VNode::Element(element)) if tag == element.tag => Patch::Element,
            (Some(NodeKind::Element(tag)), VNode::Placeholder(placeholder)) if tag == placeholder.tag => {
                Patch::Placeholder
            }
            _ => Patch::Replace,
        };

        match (patch, vnode) {
            (Patch::Keep, _) => node,
            (Patch::SetText, VNode::Text(text)) => {
                host.set_text(node, text);
                node
            }
            (Patch::Element, VNode::Element(Element { props, children, .. })) => {
                self.placeholders.remove(&node);
                self.update_props(host, node, props);
                self.update_children(host, node, children);
                node
            }
            // The nested component renders its own children
            (Patch::Placeholder, VNode::Placeholder(placeholder)) => {
                self.update_props(host, node, &placeholder.props());
                self.placeholders.insert(node);
                node
            }
            _ => self.replace(host, parent, node, vnode),
        }
    }

    fn update_children<H>(&mut self, host: &mut H, parent: NodeId, nodes: &[VNode])
    where
        H: HostTree + ?Sized,
    {
        for (index, vnode) in nodes.iter().enumerate() {
            let Some(current) = host.child_at(parent, index) else {
                let created: Vec<NodeId> = nodes[index..]
                    .iter()
                    .map(|node| self.create(host, node))
                    .collect();
                host.append_children(parent, created);
                break;
            };

            match identity(vnode) {
                Some(wanted) => self.patch_identified(host, parent, index, current, vnode, &wanted),
                None => {
                    self.reconcile(host, parent, current, vnode);
                }
            }
        }

        for index in nodes.len()..host.child_count(parent) {
            if let Some(child) = host.child_at(parent, index) {
                self.surplus.push((parent, child));
            }
        }
    }

    /// Remove surplus children that were not claimed by another slot
    fn remove_surplus<H>(&mut self, host: &mut H)
    where
        H: HostTree + ?Sized,
    {
        for (parent, child) in std::mem::take(&mut self.surplus).into_iter().rev() {
            if host.parent(child) == Some(parent) {
                self.forget_subtree(host, child);
                host.remove_child(parent, child);
            }
        }
    }

    fn patch_identified<H>(
        &mut self,
        host: &mut H,
        parent: NodeId,
        index: usize,
        current: NodeId,
        vnode: &VNode,
        wanted: &Identity<'_>,
    ) where
        H: HostTree + ?Sized,
    {
        if current_identity(host, current, wanted).as_deref() == Some(wanted.as_str()) {
            self.reconcile(host, parent, current, vnode);
            return;
        }

        let found = match wanted {
            Identity::Key(key) => self.keys.get(key),
            Identity::PlaceholderId(id) => host.element_by_id(id),
        };
        if let Some(existing) = found.filter(|&node| relocatable(host, parent, index, current, node)) {
            trace!(?existing, slot = index, "relocating identified node");
            host.insert_before(parent, existing, Some(current));
            self.reconcile(host, parent, existing, vnode);
            return;
        }

        // The displaced node may still be wanted further down the list
        let fresh = self.create(host, vnode);
        if self.carries_identity(host, current) {
            host.insert_before(parent, fresh, Some(current));
        } else {
            self.forget_subtree(host, current);
            host.replace_child(parent, fresh, current);
        }
    }

    fn replace<H>(&mut self, host: &mut H, parent: NodeId, old: NodeId, vnode: &VNode) -> NodeId
    where
        H: HostTree + ?Sized,
    {
        // Create first so keys moving into the fresh subtree outlive the old one
        let fresh = self.create(host, vnode);
        self.forget_subtree(host, old);
        host.replace_child(parent, fresh, old);
        fresh
    }

    fn update_props<H>(&mut self, host: &mut H, node: NodeId, props: &Props)
    where
        H: HostTree + ?Sized,
    {
        let previous = host.applied_props(node).cloned().unwrap_or_default();

        for (name, old) in &previous {
            if !props.contains_key(name) {
                self.clear_prop(host, node, name, old);
            }
        }
        for (name, value) in props {
            let old = previous.get(name);
            if old != Some(value) {
                self.apply_prop(host, node, name, value, old);
            }
        }

        host.store_applied_props(node, props.clone());
    }

    fn apply_prop<H>(&mut self, host: &mut H, node: NodeId, name: &str, value: &Prop, old: Option<&Prop>)
    where
        H: HostTree + ?Sized,
    {
        if name == KEY_PROP {
            if let Some(old) = old.and_then(Prop::to_key) {
                self.keys.forget(&old, node);
            }
            if let Some(key) = value.to_key() {
                self.keys.register(key, node);
            }
        } else if name == STYLE_PROP {
            host.clear_style(node);
            for (property, value) in value.style_entries() {
                host.set_style(node, &property, &value);
            }
        } else if let Some(data) = name.strip_prefix(DATA_PREFIX) {
            host.set_data(node, data, value.to_text().as_deref());
        } else if matches!(value, Prop::Null) {
            host.remove_property(node, name);
        } else {
            host.set_property(node, name, value);
        }
    }

    fn clear_prop<H>(&mut self, host: &mut H, node: NodeId, name: &str, old: &Prop)
    where
        H: HostTree + ?Sized,
    {
        if name == KEY_PROP {
            if let Some(key) = old.to_key() {
                self.keys.forget(&key, node);
            }
        } else if name == STYLE_PROP {
            host.clear_style(node);
        } else if let Some(data) = name.strip_prefix(DATA_PREFIX) {
            host.set_data(node, data, None);
        } else {
            host.remove_property(node, name);
        }
    }

    /// Keyed nodes and placeholders survive being displaced from their slot
    fn carries_identity<H>(&self, host: &H, node: NodeId) -> bool
    where
        H: HostTree + ?Sized,
    {
        host.applied_key(node).is_some() || self.placeholders.contains(&node)
    }

    /// Drop key registrations held by `node` and its descendants
    fn forget_subtree<H>(&mut self, host: &H, node: NodeId)
    where
        H: HostTree + ?Sized,
    {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if let Some(key) = host.applied_key(current) {
                self.keys.forget(&key, current);
            }
            self.placeholders.remove(&current);
            stack.extend((0..host.child_count(current)).filter_map(|i| host.child_at(current, i)));
        }
    }
}

impl Identity<'_> {
    fn as_str(&self) -> &str {
        match self {
            Identity::Key(key) => key,
            Identity::PlaceholderId(id) => id,
        }
    }
}

fn identity(vnode: &VNode) -> Option<Identity<'_>> {
    match vnode {
        VNode::Element(element) => element.key_value().map(Identity::Key),
        VNode::Placeholder(placeholder) if !placeholder.id.is_empty() => {
            Some(Identity::PlaceholderId(&placeholder.id))
        }
        _ => None,
    }
}

fn current_identity<H>(host: &H, node: NodeId, wanted: &Identity<'_>) -> Option<String>
where
    H: HostTree + ?Sized,
{
    match wanted {
        Identity::Key(_) => host.applied_key(node),
        Identity::PlaceholderId(_) => host.applied_props(node)?.get("id")?.to_key(),
    }
}

/// Whether `existing` may be moved into the slot held by `current`
fn relocatable<H>(host: &H, parent: NodeId, index: usize, current: NodeId, existing: NodeId) -> bool
where
    H: HostTree + ?Sized,
{
    if existing == current || existing == parent || host.kind(existing).is_none() {
        return false;
    }
    let Some(origin) = host.parent(existing) else {
        return false;
    };
    if host.is_ancestor(existing, parent) {
        return false;
    }
    // Earlier slots of this parent are already settled
    if origin == parent {
        let position = (0..host.child_count(parent)).find(|&i| host.child_at(parent, i) == Some(existing));
        return position.is_some_and(|position| position > index);
    }
    true
}
