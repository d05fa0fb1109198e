//! Relationship storage (edge list with adjacency indexes).

use crate::interner::StrId;
use crate::nodes::NodeId;
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Handle to a relationship. Assigned densely in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct RelationshipId(u32);

impl RelationshipId {
    pub(crate) const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Which end of a relationship a node must sit on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RelRecord {
    pub(crate) rel_type: StrId,
    pub(crate) start: u32,
    pub(crate) end: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct RelationStore {
    relations: Vec<RelRecord>,
    /// Forward index: (start, rel_type) -> relationship IDs
    forward_index: HashMap<(u32, StrId), Vec<u32>>,
    /// Backward index: (end, rel_type) -> relationship IDs
    backward_index: HashMap<(u32, StrId), Vec<u32>>,
    /// Type index: rel_type -> relationship IDs
    type_index: HashMap<StrId, RoaringBitmap>,
}

impl RelationStore {
    pub(crate) fn len(&self) -> usize {
        self.relations.len()
    }

    pub(crate) fn add(&mut self, start: NodeId, end: NodeId, rel_type: StrId) -> RelationshipId {
        let id = self.relations.len() as u32;
        self.forward_index
            .entry((start.raw(), rel_type))
            .or_default()
            .push(id);
        self.backward_index
            .entry((end.raw(), rel_type))
            .or_default()
            .push(id);
        self.type_index.entry(rel_type).or_default().insert(id);
        self.relations.push(RelRecord {
            rel_type,
            start: start.raw(),
            end: end.raw(),
        });
        RelationshipId(id)
    }

    /// Remove the most recently created relationship.
    pub(crate) fn pop(&mut self, id: RelationshipId) {
        debug_assert_eq!(id.0 as usize + 1, self.relations.len());
        let Some(rel) = self.relations.pop() else {
            return;
        };
        if let Some(ids) = self.forward_index.get_mut(&(rel.start, rel.rel_type)) {
            ids.retain(|r| *r != id.0);
        }
        if let Some(ids) = self.backward_index.get_mut(&(rel.end, rel.rel_type)) {
            ids.retain(|r| *r != id.0);
        }
        if let Some(bitmap) = self.type_index.get_mut(&rel.rel_type) {
            bitmap.remove(id.0);
        }
    }

    pub(crate) fn get(&self, id: u32) -> Option<&RelRecord> {
        self.relations.get(id as usize)
    }

    pub(crate) fn type_counts(&self) -> impl Iterator<Item = (StrId, u64)> + '_ {
        self.type_index.iter().map(|(t, b)| (*t, b.len()))
    }

    /// Relationship IDs touching `node` on the requested side, optionally
    /// restricted to one type. Ordered by relationship ID.
    pub(crate) fn touching(
        &self,
        node: NodeId,
        direction: Direction,
        rel_type: Option<StrId>,
    ) -> Vec<u32> {
        let mut out = Vec::new();
        if matches!(direction, Direction::Outgoing | Direction::Both) {
            collect(&self.forward_index, node.raw(), rel_type, &mut out);
        }
        if matches!(direction, Direction::Incoming | Direction::Both) {
            collect(&self.backward_index, node.raw(), rel_type, &mut out);
        }
        out.sort_unstable();
        out.dedup();
        out
    }
}

fn collect(
    index: &HashMap<(u32, StrId), Vec<u32>>,
    node: u32,
    rel_type: Option<StrId>,
    out: &mut Vec<u32>,
) {
    match rel_type {
        Some(t) => {
            if let Some(ids) = index.get(&(node, t)) {
                out.extend_from_slice(ids);
            }
        }
        None => {
            for ((n, _), ids) in index {
                if *n == node {
                    out.extend_from_slice(ids);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interner::StringInterner;

    #[test]
    fn adjacency_is_directional() {
        let mut interner = StringInterner::new();
        let part_of = interner.intern("PART_OF");
        let mut rels = RelationStore::default();
        let child = NodeId::new(1);
        let parent = NodeId::new(0);

        rels.add(child, parent, part_of);

        assert_eq!(rels.touching(child, Direction::Outgoing, Some(part_of)), vec![0]);
        assert!(rels.touching(child, Direction::Incoming, Some(part_of)).is_empty());
        assert_eq!(rels.touching(parent, Direction::Incoming, None), vec![0]);
    }

    #[test]
    fn self_loop_counts_once_for_both() {
        let mut interner = StringInterner::new();
        let t = interner.intern("PART_OF");
        let mut rels = RelationStore::default();
        let n = NodeId::new(0);
        rels.add(n, n, t);
        assert_eq!(rels.touching(n, Direction::Both, Some(t)), vec![0]);
    }

    #[test]
    fn pop_unlinks_indexes() {
        let mut interner = StringInterner::new();
        let t = interner.intern("POSTAL_CODE_FOR");
        let mut rels = RelationStore::default();
        let id = rels.add(NodeId::new(0), NodeId::new(1), t);
        rels.pop(id);
        assert_eq!(rels.len(), 0);
        assert!(rels.touching(NodeId::new(0), Direction::Both, None).is_empty());
        assert_eq!(rels.type_counts().map(|(_, c)| c).sum::<u64>(), 0);
    }
}
