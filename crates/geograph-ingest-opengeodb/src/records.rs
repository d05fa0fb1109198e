//! Typed rows of the two OpenGeoDB exports.

use crate::tab_reader::{read_records, Parsed, Row, RowError, TabRecord};
use std::io::{self, Read};

/// One row of the place export (`DE.tab`).
///
/// Optional text columns are `None` when blank. Numeric columns other than
/// `id` fall back to zero (or `None` for coordinates) when blank or
/// unparsable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceRecord {
    pub id: i64,
    /// Amtlicher Gemeindeschlüssel
    pub administrative_code: Option<String>,
    pub ascii_name: Option<String>,
    pub display_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub local_office_name: Option<String>,
    /// Comma-separated postal codes served by this place.
    pub postal_codes_raw: Option<String>,
    pub dialing_code: Option<String>,
    pub population: i64,
    pub area: f64,
    pub number_plate_code: Option<String>,
    pub place_type: Option<String>,
    /// Depth in the containment hierarchy.
    pub level: i64,
    /// ID of the containing place; 0 means none.
    pub parent_id: i64,
    pub invalid_flag: Option<String>,
}

impl PlaceRecord {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// The containing place, if the row names one.
    pub fn parent(&self) -> Option<i64> {
        (self.parent_id > 0).then_some(self.parent_id)
    }

    /// Postal code tokens, trimmed, blanks skipped.
    pub fn postal_codes(&self) -> impl Iterator<Item = &str> {
        self.postal_codes_raw
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

impl TabRecord for PlaceRecord {
    const COLUMNS: &'static [&'static str] = &[
        "loc_id", "ags", "ascii", "name", "lat", "lon", "amt", "plz", "vorwahl", "einwohner",
        "flaeche", "kz", "typ", "level", "of", "invalid",
    ];

    fn from_row(row: &Row<'_>) -> Result<Self, RowError> {
        Ok(Self {
            id: row.required_int("loc_id")?,
            administrative_code: row.text("ags"),
            ascii_name: row.text("ascii"),
            display_name: row.text("name"),
            latitude: row.float("lat"),
            longitude: row.float("lon"),
            local_office_name: row.text("amt"),
            postal_codes_raw: row.text("plz"),
            dialing_code: row.text("vorwahl"),
            population: row.int_or_zero("einwohner"),
            area: row.float_or_zero("flaeche"),
            number_plate_code: row.text("kz"),
            place_type: row.text("typ"),
            level: row.int_or_zero("level"),
            parent_id: row.int_or_zero("of"),
            invalid_flag: row.text("invalid"),
        })
    }
}

/// One row of the postal-code export (`PLZ.tab`). Every column is required.
#[derive(Debug, Clone, PartialEq)]
pub struct PostalCodeRecord {
    pub id: i64,
    /// Kept as text: "01067" is not 1067.
    pub code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub representative_place_name: String,
}

impl TabRecord for PostalCodeRecord {
    // longitude precedes latitude in the export
    const COLUMNS: &'static [&'static str] = &["loc_id", "plz", "lon", "lat", "ort"];

    fn from_row(row: &Row<'_>) -> Result<Self, RowError> {
        Ok(Self {
            id: row.required_int("loc_id")?,
            code: row.required_text("plz")?,
            longitude: row.required_float("lon")?,
            latitude: row.required_float("lat")?,
            representative_place_name: row.required_text("ort")?,
        })
    }
}

/// Parse the place export. Its first line is a header.
pub fn parse_places<R: Read>(reader: R) -> io::Result<Parsed<PlaceRecord>> {
    read_records(reader, true)
}

/// Parse the postal-code export. It has no header; every line is data.
pub fn parse_postal_codes<R: Read>(reader: R) -> io::Result<Parsed<PostalCodeRecord>> {
    read_records(reader, false)
}
