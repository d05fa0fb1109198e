//! Labels, property keys and relationship types written by the importer.

/// Carried by every node the importer creates.
pub const LOCATION_LABEL: &str = "Location";
pub const PLACE_LABEL: &str = "Place";
pub const POSTAL_CODE_LABEL: &str = "PostalCode";

/// Source-file ID, shared by places and postal codes.
pub const LOC_ID: &str = "LOC_ID";

pub mod place {
    pub const AGS: &str = "AGS";
    pub const ASCII: &str = "ASCII";
    pub const NAME: &str = "NAME";
    pub const LATITUDE: &str = "LATITUDE";
    pub const LONGITUDE: &str = "LONGITUDE";
    pub const AMT: &str = "AMT";
    pub const DIALING_CODE: &str = "DIALING_CODE";
    pub const POPULATION: &str = "POPULATION";
    pub const AREA: &str = "AREA";
    pub const NUMBER_PLATE_CODE: &str = "NUMBER_PLATE_CODE";
    pub const TYPE: &str = "TYPE";
    pub const LEVEL: &str = "LEVEL";
    pub const INVALID: &str = "INVALID";
}

pub mod postal_code {
    pub const POSTAL_CODE: &str = "POSTAL_CODE";
    pub const LATITUDE: &str = "LATITUDE";
    pub const LONGITUDE: &str = "LONGITUDE";
    pub const PLACE_NAME: &str = "PLACE_NAME";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelType {
    /// child place -> parent place
    PartOf,
    /// postal code -> place it serves
    PostalCodeFor,
}

impl RelType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PartOf => "PART_OF",
            Self::PostalCodeFor => "POSTAL_CODE_FOR",
        }
    }
}

impl std::fmt::Display for RelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
