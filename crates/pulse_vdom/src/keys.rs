//! Tree-wide key registry

use rustc_hash::FxHashMap;

use crate::host::NodeId;

/// Maps a `key` property to the host node currently carrying it.
///
/// Scope is one host tree; entries live as long as the node stays in it.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    nodes: FxHashMap<String, NodeId>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `key` at `node`, replacing any previous owner
    pub fn register(&mut self, key: impl Into<String>, node: NodeId) {
        self.nodes.insert(key.into(), node);
    }

    pub fn get(&self, key: &str) -> Option<NodeId> {
        self.nodes.get(key).copied()
    }

    /// Drop `key` only if it still points at `node`
    pub fn forget(&mut self, key: &str, node: NodeId) -> bool {
        if self.nodes.get(key) == Some(&node) {
            self.nodes.remove(key);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
