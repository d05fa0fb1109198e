//! GraphStore: an embedded, transactional property-graph store.
//!
//! Nodes carry any number of labels and scalar properties; relationships are
//! directed and typed. The whole graph is memory resident and every committed
//! transaction is written to a snapshot file in the store directory.
//!
//! Layout follows a columnar design:
//! 1. **String Interning**: labels, property keys and relationship types are
//!    stored once and referenced by `u32` ID
//! 2. **Label Bitmaps**: label -> Roaring bitmap of node IDs
//! 3. **Adjacency Indexes**: `(node, type)` -> relationship IDs, both directions
//! 4. **Property Indexes**: declared per `(label, property)`, exact-match lookup
//!
//! ```no_run
//! use geograph_store::GraphStore;
//! use std::time::Duration;
//!
//! let mut store = GraphStore::open("/tmp/geo.db")?;
//! let mut tx = store.begin_tx();
//! tx.create_index("Place", "NAME")?;
//! tx.commit()?;
//! store.await_indexes_online(Duration::from_secs(5))?;
//!
//! let mut tx = store.begin_tx();
//! let hamburg = tx.create_node(&["Place"]);
//! tx.set_property(hamburg, "NAME", "Hamburg")?;
//! tx.commit()?;
//! store.close();
//! # Ok::<(), geograph_store::StoreError>(())
//! ```

mod error;
mod interner;
mod nodes;
mod persist;
mod relations;
mod schema;
mod tx;
mod value;

pub use error::{Result, StoreError};
pub use interner::{StrId, StringInterner};
pub use nodes::NodeId;
pub use relations::{Direction, RelationshipId};
pub use schema::{IndexDefinition, IndexState};
pub use tx::Transaction;
pub use value::PropertyValue;

use nodes::NodeStore;
use persist::StoreLock;
use relations::RelationStore;
use schema::Schema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Everything that goes into a snapshot.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct GraphData {
    pub(crate) interner: StringInterner,
    pub(crate) nodes: NodeStore,
    pub(crate) relations: RelationStore,
    pub(crate) schema: Schema,
}

/// A resolved relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: RelationshipId,
    pub rel_type: String,
    pub start: NodeId,
    pub end: NodeId,
}

impl Relationship {
    /// The endpoint that is not `node`.
    pub fn other_node(&self, node: NodeId) -> NodeId {
        if self.start == node {
            self.end
        } else {
            self.start
        }
    }
}

pub struct GraphStore {
    location: Option<PathBuf>,
    lock: Option<StoreLock>,
    data: GraphData,
}

impl GraphStore {
    /// Open (or create) the store living in directory `dir`.
    ///
    /// Takes an exclusive lock on the directory for the lifetime of the
    /// returned handle.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| StoreError::Unavailable {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;
        let lock = StoreLock::acquire(dir)?;

        let mut data = persist::read_snapshot(dir)?.unwrap_or_default();
        data.schema.rebuild(&data.nodes);

        tracing::info!(
            path = %dir.display(),
            nodes = data.nodes.len(),
            relationships = data.relations.len(),
            "opened graph store"
        );

        Ok(Self {
            location: Some(dir.to_path_buf()),
            lock: Some(lock),
            data,
        })
    }

    /// A store that lives only in memory; commits succeed without touching disk.
    pub fn impermanent() -> Self {
        Self {
            location: None,
            lock: None,
            data: GraphData::default(),
        }
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Release the store. Committed state is already on disk.
    pub fn close(mut self) {
        if let Some(lock) = self.lock.take() {
            drop(lock);
            tracing::info!(
                path = %self.location.as_deref().unwrap_or(Path::new("")).display(),
                "closed graph store"
            );
        }
    }

    pub fn begin_tx(&mut self) -> Transaction<'_> {
        Transaction::new(self)
    }

    /// Bring every `Populating` index online, giving up once `timeout` has
    /// elapsed.
    pub fn await_indexes_online(&mut self, timeout: Duration) -> Result<()> {
        let started = Instant::now();
        let GraphData { nodes, schema, .. } = &mut self.data;
        for pos in schema.pending() {
            let waited = started.elapsed();
            if waited >= timeout {
                return Err(StoreError::IndexTimeout { waited });
            }
            schema.populate(pos, nodes);
        }
        Ok(())
    }

    pub(crate) fn flush(&self) -> Result<()> {
        match &self.location {
            Some(dir) => persist::write_snapshot(dir, &self.data),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn node_count(&self) -> usize {
        self.data.nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.data.relations.len()
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.data.nodes.contains(node)
    }

    pub fn labels(&self, node: NodeId) -> Vec<String> {
        self.data
            .nodes
            .labels(node)
            .iter()
            .filter_map(|l| self.data.interner.resolve(*l))
            .map(str::to_string)
            .collect()
    }

    pub fn has_label(&self, node: NodeId, label: &str) -> bool {
        self.data
            .interner
            .id_of(label)
            .is_some_and(|l| self.data.nodes.labels(node).contains(&l))
    }

    pub fn property(&self, node: NodeId, key: &str) -> Option<&PropertyValue> {
        let key = self.data.interner.id_of(key)?;
        self.data.nodes.get(node, key)
    }

    pub fn properties(&self, node: NodeId) -> BTreeMap<String, PropertyValue> {
        self.data
            .nodes
            .properties(node)
            .into_iter()
            .filter_map(|(k, v)| {
                let key = self.data.interner.resolve(k)?;
                Some((key.to_string(), v.clone()))
            })
            .collect()
    }

    pub fn nodes_with_label(&self, label: &str) -> Vec<NodeId> {
        self.data
            .interner
            .id_of(label)
            .and_then(|l| self.data.nodes.with_label(l))
            .map(|b| b.iter().map(NodeId::new).collect())
            .unwrap_or_default()
    }

    /// Nodes labelled `label` whose `key` equals `value`.
    ///
    /// Served from the property index when one is online, by label scan
    /// otherwise.
    pub fn find_nodes(
        &self,
        label: &str,
        key: &str,
        value: impl Into<PropertyValue>,
    ) -> Vec<NodeId> {
        let wanted = value.into().index_key();
        let (Some(label_id), Some(key_id)) =
            (self.data.interner.id_of(label), self.data.interner.id_of(key))
        else {
            return Vec::new();
        };

        if let Some(entries) = self.data.schema.online(label_id, key_id) {
            return entries
                .get(&wanted)
                .map(|b| b.iter().map(NodeId::new).collect())
                .unwrap_or_default();
        }

        let Some(bitmap) = self.data.nodes.with_label(label_id) else {
            return Vec::new();
        };
        bitmap
            .iter()
            .map(NodeId::new)
            .filter(|n| {
                self.data
                    .nodes
                    .get(*n, key_id)
                    .is_some_and(|v| v.index_key() == wanted)
            })
            .collect()
    }

    /// Relationships touching `node`, ordered by relationship ID.
    pub fn relationships(
        &self,
        node: NodeId,
        direction: Direction,
        rel_type: Option<&str>,
    ) -> Vec<Relationship> {
        let rel_type_id = match rel_type {
            Some(t) => match self.data.interner.id_of(t) {
                Some(id) => Some(id),
                None => return Vec::new(),
            },
            None => None,
        };
        self.data
            .relations
            .touching(node, direction, rel_type_id)
            .into_iter()
            .filter_map(|id| self.resolve_relationship(id))
            .collect()
    }

    /// The only `rel_type` relationship on `node` in `direction`, if any.
    pub fn single_relationship(
        &self,
        node: NodeId,
        direction: Direction,
        rel_type: &str,
    ) -> Result<Option<Relationship>> {
        let mut rels = self.relationships(node, direction, Some(rel_type));
        match rels.len() {
            0 => Ok(None),
            1 => Ok(rels.pop()),
            found => Err(StoreError::NotSingle {
                node,
                rel_type: rel_type.to_string(),
                found,
            }),
        }
    }

    pub fn indexes(&self) -> Vec<IndexDefinition> {
        self.data
            .schema
            .defs()
            .iter()
            .map(|d| IndexDefinition {
                label: self.resolve(d.label),
                property: self.resolve(d.property),
                state: d.state,
            })
            .collect()
    }

    pub fn count_by_label(&self) -> BTreeMap<String, u64> {
        self.data
            .nodes
            .label_counts()
            .filter(|(_, n)| *n > 0)
            .map(|(l, n)| (self.resolve(l), n))
            .collect()
    }

    pub fn count_by_relationship_type(&self) -> BTreeMap<String, u64> {
        self.data
            .relations
            .type_counts()
            .filter(|(_, n)| *n > 0)
            .map(|(t, n)| (self.resolve(t), n))
            .collect()
    }

    fn resolve(&self, id: StrId) -> String {
        self.data
            .interner
            .resolve(id)
            .unwrap_or_default()
            .to_string()
    }

    fn resolve_relationship(&self, id: u32) -> Option<Relationship> {
        let rel = self.data.relations.get(id)?;
        Some(Relationship {
            id: RelationshipId::from_raw(id),
            rel_type: self.resolve(rel.rel_type),
            start: NodeId::new(rel.start),
            end: NodeId::new(rel.end),
        })
    }
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("location", &self.location)
            .field("nodes", &self.data.nodes.len())
            .field("relationships", &self.data.relations.len())
            .finish()
    }
}
