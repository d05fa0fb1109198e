//! Label-scoped property indexes.
//!
//! Definitions are persisted; entries are derived data and rebuilt on open.
//! A freshly created index starts out `Populating` and only serves lookups
//! once `GraphStore::await_indexes_online` has filled it.

use crate::interner::StrId;
use crate::nodes::{NodeId, NodeStore};
use crate::value::{IndexKey, PropertyValue};
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexState {
    Populating,
    Online,
}

/// Resolved view of one index definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    pub label: String,
    pub property: String,
    pub state: IndexState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct IndexDef {
    pub(crate) label: StrId,
    pub(crate) property: StrId,
    pub(crate) state: IndexState,
}

type Entries = HashMap<IndexKey, RoaringBitmap>;

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Schema {
    defs: Vec<IndexDef>,
    #[serde(skip)]
    entries: HashMap<(StrId, StrId), Entries>,
}

impl Schema {
    pub(crate) fn defs(&self) -> &[IndexDef] {
        &self.defs
    }

    pub(crate) fn contains(&self, label: StrId, property: StrId) -> bool {
        self.defs
            .iter()
            .any(|d| d.label == label && d.property == property)
    }

    pub(crate) fn add(&mut self, label: StrId, property: StrId) {
        self.defs.push(IndexDef {
            label,
            property,
            state: IndexState::Populating,
        });
    }

    pub(crate) fn remove(&mut self, label: StrId, property: StrId) {
        self.defs
            .retain(|d| !(d.label == label && d.property == property));
        self.entries.remove(&(label, property));
    }

    pub(crate) fn pending(&self) -> Vec<usize> {
        self.defs
            .iter()
            .enumerate()
            .filter(|(_, d)| d.state == IndexState::Populating)
            .map(|(i, _)| i)
            .collect()
    }

    /// Entries of an online index, if one exists for the pair.
    pub(crate) fn online(&self, label: StrId, property: StrId) -> Option<&Entries> {
        let def = self
            .defs
            .iter()
            .find(|d| d.label == label && d.property == property)?;
        if def.state != IndexState::Online {
            return None;
        }
        self.entries.get(&(label, property))
    }

    /// Scan every node carrying the index label and bring the index online.
    pub(crate) fn populate(&mut self, pos: usize, nodes: &NodeStore) {
        let Some(def) = self.defs.get_mut(pos) else {
            return;
        };
        let mut entries = Entries::new();
        if let Some(bitmap) = nodes.with_label(def.label) {
            for raw in bitmap {
                let node = NodeId::new(raw);
                if let Some(value) = nodes.get(node, def.property) {
                    entries.entry(value.index_key()).or_default().insert(raw);
                }
            }
        }
        def.state = IndexState::Online;
        self.entries.insert((def.label, def.property), entries);
    }

    /// Bring every index online from scratch.
    pub(crate) fn rebuild(&mut self, nodes: &NodeStore) {
        self.entries.clear();
        for pos in 0..self.defs.len() {
            self.populate(pos, nodes);
        }
    }

    /// Rebuild only the indexes that are already online.
    pub(crate) fn refresh_online(&mut self, nodes: &NodeStore) {
        self.entries.clear();
        let online: Vec<usize> = self
            .defs
            .iter()
            .enumerate()
            .filter(|(_, d)| d.state == IndexState::Online)
            .map(|(i, _)| i)
            .collect();
        for pos in online {
            self.populate(pos, nodes);
        }
    }

    pub(crate) fn on_property_set(
        &mut self,
        nodes: &NodeStore,
        node: NodeId,
        key: StrId,
        previous: Option<&PropertyValue>,
        value: &PropertyValue,
    ) {
        for def in &self.defs {
            if def.state != IndexState::Online || def.property != key {
                continue;
            }
            if !nodes.labels(node).contains(&def.label) {
                continue;
            }
            let entries = self.entries.entry((def.label, def.property)).or_default();
            if let Some(prev) = previous {
                if let Some(bitmap) = entries.get_mut(&prev.index_key()) {
                    bitmap.remove(node.raw());
                }
            }
            entries
                .entry(value.index_key())
                .or_default()
                .insert(node.raw());
        }
    }

    pub(crate) fn on_label_added(&mut self, nodes: &NodeStore, node: NodeId, label: StrId) {
        for def in &self.defs {
            if def.state != IndexState::Online || def.label != label {
                continue;
            }
            if let Some(value) = nodes.get(node, def.property) {
                self.entries
                    .entry((def.label, def.property))
                    .or_default()
                    .entry(value.index_key())
                    .or_default()
                    .insert(node.raw());
            }
        }
    }
}
