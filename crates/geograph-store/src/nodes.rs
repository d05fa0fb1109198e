//! Columnar node storage.
//!
//! Labels live in a per-node list plus a label -> bitmap index; properties are
//! stored column-wise (`key -> node -> value`).

use crate::interner::StrId;
use crate::value::PropertyValue;
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Handle to a node. Assigned densely in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct NodeStore {
    /// Label column: node -> labels, in attachment order
    labels: Vec<Vec<StrId>>,
    /// Label index: label -> bitmap of nodes
    label_index: HashMap<StrId, RoaringBitmap>,
    /// Property columns: key -> (node -> value)
    props: HashMap<StrId, HashMap<u32, PropertyValue>>,
}

impl NodeStore {
    pub(crate) fn len(&self) -> usize {
        self.labels.len()
    }

    pub(crate) fn contains(&self, node: NodeId) -> bool {
        (node.0 as usize) < self.labels.len()
    }

    pub(crate) fn create(&mut self) -> NodeId {
        let id = NodeId(self.labels.len() as u32);
        self.labels.push(Vec::new());
        id
    }

    /// Attach a label. Returns false if the node already carried it.
    pub(crate) fn add_label(&mut self, node: NodeId, label: StrId) -> bool {
        let Some(labels) = self.labels.get_mut(node.0 as usize) else {
            return false;
        };
        if labels.contains(&label) {
            return false;
        }
        labels.push(label);
        self.label_index.entry(label).or_default().insert(node.0);
        true
    }

    pub(crate) fn remove_label(&mut self, node: NodeId, label: StrId) {
        if let Some(labels) = self.labels.get_mut(node.0 as usize) {
            labels.retain(|l| *l != label);
        }
        if let Some(bitmap) = self.label_index.get_mut(&label) {
            bitmap.remove(node.0);
        }
    }

    pub(crate) fn labels(&self, node: NodeId) -> &[StrId] {
        self.labels
            .get(node.0 as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn with_label(&self, label: StrId) -> Option<&RoaringBitmap> {
        self.label_index.get(&label)
    }

    pub(crate) fn label_counts(&self) -> impl Iterator<Item = (StrId, u64)> + '_ {
        self.label_index.iter().map(|(l, b)| (*l, b.len()))
    }

    /// Set a property, returning the value it replaced.
    pub(crate) fn set(
        &mut self,
        node: NodeId,
        key: StrId,
        value: PropertyValue,
    ) -> Option<PropertyValue> {
        self.props.entry(key).or_default().insert(node.0, value)
    }

    pub(crate) fn unset(&mut self, node: NodeId, key: StrId) -> Option<PropertyValue> {
        self.props.get_mut(&key)?.remove(&node.0)
    }

    pub(crate) fn get(&self, node: NodeId, key: StrId) -> Option<&PropertyValue> {
        self.props.get(&key)?.get(&node.0)
    }

    pub(crate) fn properties(&self, node: NodeId) -> Vec<(StrId, &PropertyValue)> {
        let mut out: Vec<(StrId, &PropertyValue)> = self
            .props
            .iter()
            .filter_map(|(key, col)| col.get(&node.0).map(|v| (*key, v)))
            .collect();
        out.sort_by_key(|(key, _)| *key);
        out
    }

    /// Drop the most recently created node with all its labels and properties.
    pub(crate) fn pop(&mut self, node: NodeId) {
        debug_assert_eq!(node.0 as usize + 1, self.labels.len());
        if let Some(labels) = self.labels.pop() {
            for label in labels {
                if let Some(bitmap) = self.label_index.get_mut(&label) {
                    bitmap.remove(node.0);
                }
            }
        }
        for col in self.props.values_mut() {
            col.remove(&node.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interner::StringInterner;

    #[test]
    fn labels_are_indexed_once() {
        let mut interner = StringInterner::new();
        let place = interner.intern("Place");
        let mut nodes = NodeStore::default();

        let n = nodes.create();
        assert!(nodes.add_label(n, place));
        assert!(!nodes.add_label(n, place));
        assert_eq!(nodes.labels(n), &[place]);
        assert_eq!(nodes.with_label(place).map(|b| b.len()), Some(1));
    }

    #[test]
    fn pop_clears_columns() {
        let mut interner = StringInterner::new();
        let place = interner.intern("Place");
        let name = interner.intern("NAME");
        let mut nodes = NodeStore::default();

        let n = nodes.create();
        nodes.add_label(n, place);
        nodes.set(n, name, "Hamburg".into());
        nodes.pop(n);

        assert_eq!(nodes.len(), 0);
        assert!(nodes.get(n, name).is_none());
        assert_eq!(nodes.with_label(place).map(|b| b.len()), Some(0));
    }
}
