//! Edge construction from the identity maps.
//!
//! Both edge kinds tolerate references that point outside the loaded data.
//! A miss is recorded as a [`DanglingReference`] and skipped.

use crate::mapper::{PlaceIdentityMap, PostalCodeIdentityMap};
use crate::records::PlaceRecord;
use crate::vocab::RelType;
use geograph_store::{Result, Transaction};
use serde::Serialize;

/// A reference that could not be turned into an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DanglingReference {
    /// The referencing place itself has no node in this run.
    MissingPlace { place_id: i64 },
    MissingParent { place_id: i64, parent_id: i64 },
    UnknownPostalCode { place_id: i64, code: String },
}

impl std::fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPlace { place_id } => write!(f, "place {place_id} has no node"),
            Self::MissingParent {
                place_id,
                parent_id,
            } => write!(f, "place {place_id} refers to unknown parent {parent_id}"),
            Self::UnknownPostalCode { place_id, code } => {
                write!(f, "place {place_id} lists unknown postal code {code}")
            }
        }
    }
}

/// Edges created by one linking pass, plus the references that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkReport {
    pub part_of: usize,
    pub postal_code_for: usize,
    pub gaps: Vec<DanglingReference>,
}

impl LinkReport {
    fn gap(&mut self, gap: DanglingReference) {
        tracing::debug!(%gap, "skipping dangling reference");
        self.gaps.push(gap);
    }
}

/// `PART_OF` from `record`'s node to its parent's node, when both exist.
pub fn link_parent(
    tx: &mut Transaction<'_>,
    record: &PlaceRecord,
    places: &PlaceIdentityMap,
    report: &mut LinkReport,
) -> Result<()> {
    let Some(parent_id) = record.parent() else {
        return Ok(());
    };
    let (Some(child), Some(parent)) = (places.get(&record.id), places.get(&parent_id)) else {
        report.gap(if places.get(&record.id).is_none() {
            DanglingReference::MissingPlace {
                place_id: record.id,
            }
        } else {
            DanglingReference::MissingParent {
                place_id: record.id,
                parent_id,
            }
        });
        return Ok(());
    };
    tx.create_relationship(child, parent, RelType::PartOf.as_str())?;
    report.part_of += 1;
    Ok(())
}

/// One `POSTAL_CODE_FOR` per listed code that has a node, pointing at the place.
pub fn link_postal_codes(
    tx: &mut Transaction<'_>,
    record: &PlaceRecord,
    places: &PlaceIdentityMap,
    postal_codes: &PostalCodeIdentityMap,
    report: &mut LinkReport,
) -> Result<()> {
    let mut codes = record.postal_codes().peekable();
    if codes.peek().is_none() {
        return Ok(());
    }
    let Some(place) = places.get(&record.id) else {
        report.gap(DanglingReference::MissingPlace {
            place_id: record.id,
        });
        return Ok(());
    };
    for code in codes {
        match postal_codes.get(code) {
            Some(postal_code) => {
                tx.create_relationship(postal_code, place, RelType::PostalCodeFor.as_str())?;
                report.postal_code_for += 1;
            }
            None => report.gap(DanglingReference::UnknownPostalCode {
                place_id: record.id,
                code: code.to_string(),
            }),
        }
    }
    Ok(())
}

/// Link every place record: containment first, then postal coverage.
pub fn build_relationships(
    tx: &mut Transaction<'_>,
    records: &[PlaceRecord],
    places: &PlaceIdentityMap,
    postal_codes: &PostalCodeIdentityMap,
) -> Result<LinkReport> {
    let mut report = LinkReport::default();
    for record in records {
        link_parent(tx, record, places, &mut report)?;
        link_postal_codes(tx, record, places, postal_codes, &mut report)?;
    }
    tracing::info!(
        part_of = report.part_of,
        postal_code_for = report.postal_code_for,
        gaps = report.gaps.len(),
        "built relationships"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::create_place_nodes;
    use geograph_store::{Direction, GraphStore, NodeId};

    fn place(id: i64, parent_id: i64, codes: &str) -> PlaceRecord {
        PlaceRecord {
            parent_id,
            postal_codes_raw: (!codes.is_empty()).then(|| codes.to_string()),
            ..PlaceRecord::new(id)
        }
    }

    #[test]
    fn missing_parent_is_a_gap() {
        let mut store = GraphStore::impermanent();
        let mut tx = store.begin_tx();
        let records = vec![place(17838, 105, "")];
        let places = create_place_nodes(&mut tx, &records).unwrap();
        let report =
            build_relationships(&mut tx, &records, &places, &PostalCodeIdentityMap::new()).unwrap();
        tx.commit().unwrap();

        assert_eq!(store.relationship_count(), 0);
        assert_eq!(
            report.gaps,
            vec![DanglingReference::MissingParent {
                place_id: 17838,
                parent_id: 105
            }]
        );
    }

    #[test]
    fn place_without_node_is_a_gap() {
        let mut store = GraphStore::impermanent();
        let mut tx = store.begin_tx();
        let mut report = LinkReport::default();
        let places = PlaceIdentityMap::new();
        link_parent(&mut tx, &place(1, 2, ""), &places, &mut report).unwrap();
        link_postal_codes(
            &mut tx,
            &place(1, 0, "22081"),
            &places,
            &PostalCodeIdentityMap::new(),
            &mut report,
        )
        .unwrap();
        assert_eq!(
            report.gaps,
            vec![
                DanglingReference::MissingPlace { place_id: 1 },
                DanglingReference::MissingPlace { place_id: 1 },
            ]
        );
        assert_eq!(tx.relationship_count(), 0);
    }

    #[test]
    fn unmatched_codes_are_skipped_individually() {
        let mut store = GraphStore::impermanent();
        let mut tx = store.begin_tx();
        let records = vec![place(26808, 0, "22081, 99999")];
        let places = create_place_nodes(&mut tx, &records).unwrap();
        let plz = tx.create_node(&["PostalCode"]);
        let mut postal_codes = PostalCodeIdentityMap::new();
        postal_codes.insert("22081".to_string(), plz);

        let report = build_relationships(&mut tx, &records, &places, &postal_codes).unwrap();
        tx.commit().unwrap();

        assert_eq!(report.postal_code_for, 1);
        assert_eq!(
            report.gaps,
            vec![DanglingReference::UnknownPostalCode {
                place_id: 26808,
                code: "99999".to_string()
            }]
        );
        let target: NodeId = places.get(&26808).unwrap();
        let edges = store.relationships(plz, Direction::Outgoing, Some("POSTAL_CODE_FOR"));
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].end, target);
    }

    #[test]
    fn zero_parent_is_not_a_reference() {
        let mut store = GraphStore::impermanent();
        let mut tx = store.begin_tx();
        let records = vec![place(105, 0, "")];
        let places = create_place_nodes(&mut tx, &records).unwrap();
        let report =
            build_relationships(&mut tx, &records, &places, &PostalCodeIdentityMap::new()).unwrap();
        assert_eq!(report, LinkReport::default());
    }
}
