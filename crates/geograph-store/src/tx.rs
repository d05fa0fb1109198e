//! Journaled write transactions.
//!
//! Every mutation records how to undo itself. `commit` drops the journal and
//! writes the snapshot; `rollback` (or dropping an open transaction) replays
//! the journal in reverse, so a failed unit of work leaves no trace.

use crate::error::{Result, StoreError};
use crate::interner::StrId;
use crate::nodes::NodeId;
use crate::relations::RelationshipId;
use crate::value::PropertyValue;
use crate::GraphStore;
use std::ops::Deref;

#[derive(Debug)]
enum Undo {
    NodeCreated(NodeId),
    LabelAdded {
        node: NodeId,
        label: StrId,
    },
    PropertySet {
        node: NodeId,
        key: StrId,
        previous: Option<PropertyValue>,
    },
    RelationshipCreated(RelationshipId),
    IndexCreated {
        label: StrId,
        property: StrId,
    },
}

/// A unit of work against a [`GraphStore`].
///
/// Holds the store exclusively; reads go through `Deref`.
pub struct Transaction<'s> {
    store: &'s mut GraphStore,
    journal: Vec<Undo>,
    open: bool,
}

impl<'s> Transaction<'s> {
    pub(crate) fn new(store: &'s mut GraphStore) -> Self {
        Self {
            store,
            journal: Vec::new(),
            open: true,
        }
    }

    /// Create a node carrying `labels`.
    pub fn create_node(&mut self, labels: &[&str]) -> NodeId {
        let node = self.store.data.nodes.create();
        self.journal.push(Undo::NodeCreated(node));
        for label in labels {
            let label = self.store.data.interner.intern(label);
            self.attach_label(node, label);
        }
        node
    }

    pub fn add_label(&mut self, node: NodeId, label: &str) -> Result<()> {
        self.ensure_node(node)?;
        let label = self.store.data.interner.intern(label);
        self.attach_label(node, label);
        Ok(())
    }

    pub fn set_property(
        &mut self,
        node: NodeId,
        key: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<()> {
        self.ensure_node(node)?;
        let value = value.into();
        let data = &mut self.store.data;
        let key = data.interner.intern(key);
        let previous = data.nodes.set(node, key, value.clone());
        data.schema
            .on_property_set(&data.nodes, node, key, previous.as_ref(), &value);
        self.journal.push(Undo::PropertySet {
            node,
            key,
            previous,
        });
        Ok(())
    }

    /// Create a directed relationship `start -[rel_type]-> end`.
    pub fn create_relationship(
        &mut self,
        start: NodeId,
        end: NodeId,
        rel_type: &str,
    ) -> Result<RelationshipId> {
        self.ensure_node(start)?;
        self.ensure_node(end)?;
        let rel_type = self.store.data.interner.intern(rel_type);
        let id = self.store.data.relations.add(start, end, rel_type);
        self.journal.push(Undo::RelationshipCreated(id));
        Ok(id)
    }

    /// Declare a lookup index on `(label, property)`. The index stays
    /// `Populating` until [`GraphStore::await_indexes_online`] runs.
    pub fn create_index(&mut self, label: &str, property: &str) -> Result<()> {
        let data = &mut self.store.data;
        let label_id = data.interner.intern(label);
        let property_id = data.interner.intern(property);
        if data.schema.contains(label_id, property_id) {
            return Err(StoreError::IndexExists {
                label: label.to_string(),
                property: property.to_string(),
            });
        }
        data.schema.add(label_id, property_id);
        self.journal.push(Undo::IndexCreated {
            label: label_id,
            property: property_id,
        });
        Ok(())
    }

    /// Number of mutations recorded so far.
    pub fn pending_changes(&self) -> usize {
        self.journal.len()
    }

    /// Make the transaction's changes durable.
    ///
    /// If the snapshot cannot be written the in-memory changes are undone, so
    /// memory never runs ahead of disk.
    pub fn commit(mut self) -> Result<()> {
        self.open = false;
        match self.store.flush() {
            Ok(()) => {
                tracing::debug!(changes = self.journal.len(), "transaction committed");
                self.journal.clear();
                Ok(())
            }
            Err(err) => {
                self.undo();
                Err(err)
            }
        }
    }

    pub fn rollback(mut self) {
        self.open = false;
        self.undo();
    }

    fn attach_label(&mut self, node: NodeId, label: StrId) {
        let data = &mut self.store.data;
        if data.nodes.add_label(node, label) {
            data.schema.on_label_added(&data.nodes, node, label);
            self.journal.push(Undo::LabelAdded { node, label });
        }
    }

    fn ensure_node(&self, node: NodeId) -> Result<()> {
        if self.store.data.nodes.contains(node) {
            Ok(())
        } else {
            Err(StoreError::UnknownNode(node))
        }
    }

    fn undo(&mut self) {
        let changes = self.journal.len();
        let data = &mut self.store.data;
        while let Some(entry) = self.journal.pop() {
            match entry {
                Undo::NodeCreated(node) => data.nodes.pop(node),
                Undo::LabelAdded { node, label } => data.nodes.remove_label(node, label),
                Undo::PropertySet {
                    node,
                    key,
                    previous,
                } => match previous {
                    Some(value) => {
                        data.nodes.set(node, key, value);
                    }
                    None => {
                        data.nodes.unset(node, key);
                    }
                },
                Undo::RelationshipCreated(id) => data.relations.pop(id),
                Undo::IndexCreated { label, property } => data.schema.remove(label, property),
            }
        }
        data.schema.refresh_online(&data.nodes);
        tracing::debug!(changes, "transaction rolled back");
    }
}

impl Deref for Transaction<'_> {
    type Target = GraphStore;

    fn deref(&self) -> &GraphStore {
        self.store
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.open {
            self.open = false;
            self.undo();
        }
    }
}
