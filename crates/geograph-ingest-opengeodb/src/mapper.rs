//! Record -> node conversion and the run-scoped identity maps.

use crate::records::{PlaceRecord, PostalCodeRecord};
use crate::vocab::{self, place, postal_code};
use geograph_store::{NodeId, Result, Transaction};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// Natural key -> node created for it during this run.
///
/// Later records with the same key replace earlier ones; the replaced nodes
/// stay in the store, they just can no longer be linked.
#[derive(Debug, Clone)]
pub struct IdentityMap<K> {
    nodes: HashMap<K, NodeId>,
    replaced: usize,
}

pub type PlaceIdentityMap = IdentityMap<i64>;
pub type PostalCodeIdentityMap = IdentityMap<String>;

impl<K: Eq + Hash> IdentityMap<K> {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            replaced: 0,
        }
    }

    pub fn insert(&mut self, key: K, node: NodeId) {
        if self.nodes.insert(key, node).is_some() {
            self.replaced += 1;
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.nodes.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// How many inserts overwrote an existing key.
    pub fn replaced(&self) -> usize {
        self.replaced
    }
}

impl<K: Eq + Hash> Default for IdentityMap<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Create the node for one place.
///
/// Optional text is written only when present and non-empty. Coordinates
/// and counts are written only when positive.
pub fn create_place_node(tx: &mut Transaction<'_>, record: &PlaceRecord) -> Result<NodeId> {
    let node = tx.create_node(&[vocab::PLACE_LABEL, vocab::LOCATION_LABEL]);
    tx.set_property(node, vocab::LOC_ID, record.id)?;

    let text = [
        (place::AGS, &record.administrative_code),
        (place::ASCII, &record.ascii_name),
        (place::NAME, &record.display_name),
        (place::AMT, &record.local_office_name),
        (place::DIALING_CODE, &record.dialing_code),
        (place::NUMBER_PLATE_CODE, &record.number_plate_code),
        (place::TYPE, &record.place_type),
        (place::INVALID, &record.invalid_flag),
    ];
    for (key, value) in text {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            tx.set_property(node, key, value)?;
        }
    }

    if let Some(latitude) = record.latitude.filter(|v| *v > 0.0) {
        tx.set_property(node, place::LATITUDE, latitude)?;
    }
    if let Some(longitude) = record.longitude.filter(|v| *v > 0.0) {
        tx.set_property(node, place::LONGITUDE, longitude)?;
    }
    if record.population > 0 {
        tx.set_property(node, place::POPULATION, record.population)?;
    }
    if record.area > 0.0 {
        tx.set_property(node, place::AREA, record.area)?;
    }
    if record.level > 0 {
        tx.set_property(node, place::LEVEL, record.level)?;
    }

    if let Some(place_type) = record.place_type.as_deref().filter(|t| !t.is_empty()) {
        tx.add_label(node, place_type)?;
    }
    Ok(node)
}

pub fn create_postal_code_node(
    tx: &mut Transaction<'_>,
    record: &PostalCodeRecord,
) -> Result<NodeId> {
    let node = tx.create_node(&[vocab::POSTAL_CODE_LABEL, vocab::LOCATION_LABEL]);
    tx.set_property(node, vocab::LOC_ID, record.id)?;
    tx.set_property(node, postal_code::POSTAL_CODE, record.code.as_str())?;
    tx.set_property(node, postal_code::LATITUDE, record.latitude)?;
    tx.set_property(node, postal_code::LONGITUDE, record.longitude)?;
    tx.set_property(
        node,
        postal_code::PLACE_NAME,
        record.representative_place_name.as_str(),
    )?;
    Ok(node)
}

/// One node per place record, keyed by place ID.
pub fn create_place_nodes(
    tx: &mut Transaction<'_>,
    records: &[PlaceRecord],
) -> Result<PlaceIdentityMap> {
    let mut map = PlaceIdentityMap::new();
    for record in records {
        let node = create_place_node(tx, record)?;
        map.insert(record.id, node);
    }
    log_map("place", records.len(), &map);
    Ok(map)
}

/// One node per postal-code record, keyed by the code text.
pub fn create_postal_code_nodes(
    tx: &mut Transaction<'_>,
    records: &[PostalCodeRecord],
) -> Result<PostalCodeIdentityMap> {
    let mut map = PostalCodeIdentityMap::new();
    for record in records {
        let node = create_postal_code_node(tx, record)?;
        map.insert(record.code.clone(), node);
    }
    log_map("postal code", records.len(), &map);
    Ok(map)
}

fn log_map<K: Eq + Hash>(kind: &str, created: usize, map: &IdentityMap<K>) {
    if map.replaced() > 0 {
        tracing::warn!(
            kind,
            duplicates = map.replaced(),
            "duplicate keys; only the last node per key will be linked"
        );
    }
    tracing::info!(kind, created, keys = map.len(), "created nodes");
}

#[cfg(test)]
mod tests {
    use super::*;
    use geograph_store::{GraphStore, PropertyValue};

    fn hamburg() -> PlaceRecord {
        PlaceRecord {
            administrative_code: Some("02000000".to_string()),
            ascii_name: Some("HAMBURG".to_string()),
            display_name: Some("Hamburg".to_string()),
            latitude: Some(53.554423),
            longitude: Some(9.994583),
            postal_codes_raw: Some("20038,20088,20095".to_string()),
            dialing_code: Some("040".to_string()),
            population: 1734830,
            area: 755.0,
            number_plate_code: Some("HH".to_string()),
            place_type: Some("Freie und Hansestadt".to_string()),
            level: 6,
            parent_id: 526,
            ..PlaceRecord::new(17838)
        }
    }

    #[test]
    fn place_properties_round_trip() {
        let mut store = GraphStore::impermanent();
        let mut tx = store.begin_tx();
        let node = create_place_node(&mut tx, &hamburg()).unwrap();
        tx.commit().unwrap();

        let props = store.properties(node);
        assert_eq!(props[vocab::LOC_ID], PropertyValue::Int(17838));
        assert_eq!(props[place::NAME], PropertyValue::from("Hamburg"));
        assert_eq!(props[place::LATITUDE], PropertyValue::Float(53.554423));
        assert_eq!(props[place::LONGITUDE], PropertyValue::Float(9.994583));
        assert_eq!(props[place::DIALING_CODE], PropertyValue::from("040"));
        assert_eq!(props[place::POPULATION], PropertyValue::Int(1734830));
        assert_eq!(props[place::AREA], PropertyValue::Float(755.0));
        assert_eq!(props[place::LEVEL], PropertyValue::Int(6));
        assert_eq!(props[place::TYPE], PropertyValue::from("Freie und Hansestadt"));
        assert!(!props.contains_key(place::AMT));
        assert!(!props.contains_key(place::INVALID));

        assert!(store.has_label(node, vocab::PLACE_LABEL));
        assert!(store.has_label(node, vocab::LOCATION_LABEL));
        assert!(store.has_label(node, "Freie und Hansestadt"));
    }

    #[test]
    fn absent_fields_are_omitted() {
        let mut store = GraphStore::impermanent();
        let mut tx = store.begin_tx();
        let node = create_place_node(&mut tx, &PlaceRecord::new(1)).unwrap();
        tx.commit().unwrap();

        assert_eq!(store.properties(node).len(), 1);
        assert_eq!(store.labels(node).len(), 2);
    }

    #[test]
    fn zero_coordinates_are_omitted() {
        let header = "loc_id\tags\tascii\tname\tlat\tlon\tamt\tplz\tvorwahl\teinwohner\tflaeche\tkz\ttyp\tlevel\tof\tinvalid\n";
        let input = format!("{header}1\t\t\tNull\t0\t0.0\t\t\t\t\t\t\t\t\t\t\n");
        let parsed = crate::records::parse_places(input.as_bytes()).unwrap();
        assert_eq!(parsed.records[0].latitude, Some(0.0));

        let mut store = GraphStore::impermanent();
        let mut tx = store.begin_tx();
        let node = create_place_node(&mut tx, &parsed.records[0]).unwrap();
        tx.commit().unwrap();

        let props = store.properties(node);
        assert!(!props.contains_key(place::LATITUDE));
        assert!(!props.contains_key(place::LONGITUDE));
        assert_eq!(props[place::NAME], PropertyValue::from("Null"));
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn postal_code_node_keeps_text_code() {
        let mut store = GraphStore::impermanent();
        let mut tx = store.begin_tx();
        let node = create_postal_code_node(
            &mut tx,
            &PostalCodeRecord {
                id: 1,
                code: "01067".to_string(),
                latitude: 51.0600336463379,
                longitude: 13.7210676148814,
                representative_place_name: "Dresden".to_string(),
            },
        )
        .unwrap();
        tx.commit().unwrap();

        assert_eq!(
            store.property(node, postal_code::POSTAL_CODE),
            Some(&PropertyValue::from("01067"))
        );
        assert_eq!(store.properties(node).len(), 5);
        assert_eq!(
            store.labels(node),
            vec![vocab::POSTAL_CODE_LABEL.to_string(), vocab::LOCATION_LABEL.to_string()]
        );
    }

    #[test]
    fn duplicate_keys_create_both_nodes_last_one_wins() {
        let mut store = GraphStore::impermanent();
        let mut tx = store.begin_tx();
        let records = vec![PlaceRecord::new(7), PlaceRecord::new(8), PlaceRecord::new(7)];
        let map = create_place_nodes(&mut tx, &records).unwrap();
        tx.commit().unwrap();

        assert_eq!(store.node_count(), 3);
        assert_eq!(map.len(), 2);
        assert_eq!(map.replaced(), 1);
        assert_eq!(map.get(&7), Some(NodeId::new(2)));
    }

    #[test]
    fn postal_map_looks_up_by_str() {
        let mut map = PostalCodeIdentityMap::new();
        map.insert("22081".to_string(), NodeId::new(0));
        assert_eq!(map.get("22081"), Some(NodeId::new(0)));
        assert_eq!(map.get("22082"), None);
    }
}
