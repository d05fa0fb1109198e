//! The batch pipeline: parse, schema, place nodes, postal-code nodes,
//! relationships.
//!
//! Every load phase runs in its own transaction. A failing phase is rolled
//! back and reported; phases committed before it stay. The store is opened
//! once for the whole run and closed on every exit path.

use crate::error::{ImportError, Phase, Result};
use crate::linker::{build_relationships, LinkReport};
use crate::mapper::{create_place_nodes, create_postal_code_nodes};
use crate::records::{parse_places, parse_postal_codes, PlaceRecord, PostalCodeRecord};
use crate::schema::create_schema;
use crate::tab_reader::{Parsed, RowDiagnostic};
use geograph_store::{GraphStore, Transaction};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_INDEX_TIMEOUT: Duration = Duration::from_secs(5);

/// Inputs and limits for one import run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    pub place_file: PathBuf,
    pub postal_code_file: PathBuf,
    pub store_dir: PathBuf,
    /// Ceiling on the wait for schema indexes to come online.
    #[serde(default = "default_index_timeout")]
    pub index_timeout: Duration,
}

fn default_index_timeout() -> Duration {
    DEFAULT_INDEX_TIMEOUT
}

impl ImportConfig {
    pub fn new(
        place_file: impl Into<PathBuf>,
        postal_code_file: impl Into<PathBuf>,
        store_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            place_file: place_file.into(),
            postal_code_file: postal_code_file.into(),
            store_dir: store_dir.into(),
            index_timeout: DEFAULT_INDEX_TIMEOUT,
        }
    }

    pub fn with_index_timeout(mut self, timeout: Duration) -> Self {
        self.index_timeout = timeout;
        self
    }
}

/// Where a run is. States only move forward; any failure jumps to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportState {
    Idle,
    Parsing,
    SchemaReady,
    PlacesLoaded,
    PostalCodesLoaded,
    RelationshipsBuilt,
    Closed,
}

impl ImportState {
    /// The state following `self` on a successful step.
    pub const fn next(self) -> Self {
        match self {
            Self::Idle => Self::Parsing,
            Self::Parsing => Self::SchemaReady,
            Self::SchemaReady => Self::PlacesLoaded,
            Self::PlacesLoaded => Self::PostalCodesLoaded,
            Self::PostalCodesLoaded => Self::RelationshipsBuilt,
            Self::RelationshipsBuilt | Self::Closed => Self::Closed,
        }
    }
}

impl std::fmt::Display for ImportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Both input files, parsed.
#[derive(Debug, Clone, Default)]
pub struct ParsedInputs {
    pub places: Parsed<PlaceRecord>,
    pub postal_codes: Parsed<PostalCodeRecord>,
}

/// Read and parse both input files. Does not touch any store.
pub fn parse_inputs(place_file: &Path, postal_code_file: &Path) -> Result<ParsedInputs> {
    let places = read_file(place_file, parse_places)?;
    tracing::info!(
        path = %place_file.display(),
        records = places.records.len(),
        skipped = places.diagnostics.len(),
        "parsed place file"
    );
    let postal_codes = read_file(postal_code_file, parse_postal_codes)?;
    tracing::info!(
        path = %postal_code_file.display(),
        records = postal_codes.records.len(),
        skipped = postal_codes.diagnostics.len(),
        "parsed postal code file"
    );
    Ok(ParsedInputs {
        places,
        postal_codes,
    })
}

fn read_file<T>(path: &Path, parse: fn(File) -> io::Result<Parsed<T>>) -> Result<Parsed<T>> {
    let input = |source| ImportError::Input {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(input)?;
    parse(file).map_err(input)
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    pub place_records: usize,
    pub postal_code_records: usize,
    pub place_diagnostics: Vec<RowDiagnostic>,
    pub postal_code_diagnostics: Vec<RowDiagnostic>,
    pub indexes_created: usize,
    /// Nodes committed by each load phase, counted on the store.
    pub place_nodes: usize,
    pub postal_code_nodes: usize,
    pub links: LinkReport,
    pub state: ImportState,
}

/// Drives one import run. Single use.
#[derive(Debug)]
pub struct Importer {
    config: ImportConfig,
    state: ImportState,
}

impl Importer {
    pub fn new(config: ImportConfig) -> Self {
        Self {
            config,
            state: ImportState::Idle,
        }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn state(&self) -> ImportState {
        self.state
    }

    /// Run the whole pipeline. Afterwards the importer is `Closed` whatever
    /// the outcome.
    pub fn run(&mut self) -> Result<ImportReport> {
        if self.state != ImportState::Idle {
            return Err(ImportError::AlreadyRun);
        }
        let outcome = self.execute();
        self.state = ImportState::Closed;
        match &outcome {
            Ok(_) => tracing::info!("import finished"),
            Err(err) => tracing::error!(error = %err, "import failed"),
        }
        outcome.map(|report| ImportReport {
            state: ImportState::Closed,
            ..report
        })
    }

    fn advance(&mut self) {
        let next = self.state.next();
        tracing::debug!(from = %self.state, to = %next, "import state");
        self.state = next;
    }

    fn execute(&mut self) -> Result<ImportReport> {
        self.advance();
        let inputs = parse_inputs(&self.config.place_file, &self.config.postal_code_file)?;

        let store_dir = self.config.store_dir.clone();
        let mut store = GraphStore::open(&store_dir).map_err(|source| {
            ImportError::StoreUnavailable {
                path: store_dir,
                source,
            }
        })?;
        let outcome = self.load(&mut store, inputs);
        store.close();
        outcome
    }

    fn load(&mut self, store: &mut GraphStore, inputs: ParsedInputs) -> Result<ImportReport> {
        let ParsedInputs {
            places,
            postal_codes,
        } = inputs;

        let indexes_created = create_schema(store, self.config.index_timeout).map_err(|source| {
            ImportError::Phase {
                phase: Phase::Schema,
                source,
            }
        })?;
        self.advance();

        let before = store.node_count();
        let place_map = in_phase(store, Phase::PlaceNodes, |tx| {
            create_place_nodes(tx, &places.records)
        })?;
        let place_nodes = store.node_count() - before;
        self.advance();

        let before = store.node_count();
        let postal_map = in_phase(store, Phase::PostalCodeNodes, |tx| {
            create_postal_code_nodes(tx, &postal_codes.records)
        })?;
        let postal_code_nodes = store.node_count() - before;
        self.advance();

        let links = in_phase(store, Phase::Relationships, |tx| {
            build_relationships(tx, &places.records, &place_map, &postal_map)
        })?;
        self.advance();

        Ok(ImportReport {
            place_records: places.records.len(),
            postal_code_records: postal_codes.records.len(),
            place_diagnostics: places.diagnostics,
            postal_code_diagnostics: postal_codes.diagnostics,
            indexes_created,
            place_nodes,
            postal_code_nodes,
            links,
            state: self.state,
        })
    }
}

/// Run `work` in a fresh transaction: commit on success, roll back on error.
pub(crate) fn in_phase<T>(
    store: &mut GraphStore,
    phase: Phase,
    work: impl FnOnce(&mut Transaction<'_>) -> geograph_store::Result<T>,
) -> Result<T> {
    let mut tx = store.begin_tx();
    let fail = |source| ImportError::Phase { phase, source };
    match work(&mut tx) {
        Ok(value) => {
            let changes = tx.pending_changes();
            tx.commit().map_err(fail)?;
            tracing::info!(%phase, changes, "phase committed");
            Ok(value)
        }
        Err(source) => {
            tx.rollback();
            tracing::warn!(%phase, error = %source, "phase rolled back");
            Err(fail(source))
        }
    }
}
