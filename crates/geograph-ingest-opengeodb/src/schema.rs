//! Lookup indexes declared before any data is loaded.

use crate::vocab;
use geograph_store::{GraphStore, Result};
use std::time::Duration;

/// `(label, property)` pairs indexed by the importer.
///
/// `LOC_ID` is a plain lookup index: place and postal-code IDs come from
/// separate numbering and may collide.
pub const INDEXES: &[(&str, &str)] = &[
    (vocab::LOCATION_LABEL, vocab::LOC_ID),
    (vocab::PLACE_LABEL, vocab::place::NAME),
    (vocab::POSTAL_CODE_LABEL, vocab::postal_code::POSTAL_CODE),
];

/// Declare the missing indexes in one transaction and wait for all of them to
/// come online. Returns how many were created.
pub fn create_schema(store: &mut GraphStore, timeout: Duration) -> Result<usize> {
    let existing = store.indexes();
    let mut tx = store.begin_tx();
    let mut created = 0;
    for &(label, property) in INDEXES {
        if existing
            .iter()
            .any(|def| def.label == label && def.property == property)
        {
            tracing::debug!(label, property, "index already defined");
            continue;
        }
        tx.create_index(label, property)?;
        tracing::debug!(label, property, "defined index");
        created += 1;
    }
    tx.commit()?;

    store.await_indexes_online(timeout)?;
    tracing::info!(created, total = INDEXES.len(), "schema ready");
    Ok(created)
}
