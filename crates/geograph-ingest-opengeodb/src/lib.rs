//! # geograph-ingest-opengeodb
//!
//! Loads the OpenGeoDB place export (`DE.tab`) and postal-code export
//! (`PLZ.tab`) into a [`geograph_store::GraphStore`].
//!
//! Places become `:Place:Location` nodes (plus a label for their type),
//! postal codes become `:PostalCode:Location` nodes. Two edge types connect
//! them:
//!
//! - `(child:Place)-[:PART_OF]->(parent:Place)`
//! - `(code:PostalCode)-[:POSTAL_CODE_FOR]->(place:Place)`
//!
//! ```no_run
//! use geograph_ingest_opengeodb::{ImportConfig, Importer};
//!
//! let mut importer = Importer::new(ImportConfig::new("DE.tab", "PLZ.tab", "graph.db"));
//! let report = importer.run()?;
//! println!("{} PART_OF edges", report.links.part_of);
//! # Ok::<(), geograph_ingest_opengeodb::ImportError>(())
//! ```
//!
//! Malformed rows and references to places or codes outside the loaded data
//! are skipped and reported, never fatal.

pub mod error;
pub mod importer;
pub mod linker;
pub mod mapper;
pub mod records;
pub mod schema;
pub mod tab_reader;
pub mod vocab;

pub use error::{ImportError, Phase};
pub use importer::{
    parse_inputs, ImportConfig, ImportReport, ImportState, Importer, ParsedInputs,
    DEFAULT_INDEX_TIMEOUT,
};
pub use linker::{DanglingReference, LinkReport};
pub use mapper::{IdentityMap, PlaceIdentityMap, PostalCodeIdentityMap};
pub use records::{parse_places, parse_postal_codes, PlaceRecord, PostalCodeRecord};
pub use tab_reader::{Parsed, RowDiagnostic, RowError};
pub use vocab::RelType;
