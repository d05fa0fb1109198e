//! Compact string storage for labels, property keys and relationship types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Interned string ID (4 bytes instead of 24+ for String)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct StrId(u32);

impl StrId {
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// String interner: maps strings to compact IDs.
///
/// Only the ordered string table is persisted; the reverse lookup is rebuilt
/// when a snapshot is decoded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct StringInterner {
    strings: Vec<String>,
    lookup: HashMap<String, StrId>,
}

impl StringInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its ID
    pub fn intern(&mut self, s: &str) -> StrId {
        if let Some(id) = self.lookup.get(s) {
            return *id;
        }
        let id = StrId(self.strings.len() as u32);
        self.strings.push(s.to_string());
        self.lookup.insert(s.to_string(), id);
        id
    }

    /// Look up an existing ID for a string without inserting.
    pub fn id_of(&self, s: &str) -> Option<StrId> {
        self.lookup.get(s).copied()
    }

    pub fn resolve(&self, id: StrId) -> Option<&str> {
        self.strings.get(id.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl From<Vec<String>> for StringInterner {
    fn from(strings: Vec<String>) -> Self {
        let lookup = strings
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), StrId(i as u32)))
            .collect();
        Self { strings, lookup }
    }
}

impl From<StringInterner> for Vec<String> {
    fn from(interner: StringInterner) -> Self {
        interner.strings
    }
}
