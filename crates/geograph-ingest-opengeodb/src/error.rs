use geograph_store::StoreError;
use serde::Serialize;
use std::path::PathBuf;

/// The load phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Schema,
    PlaceNodes,
    PostalCodeNodes,
    Relationships,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Schema => "schema",
            Self::PlaceNodes => "place nodes",
            Self::PostalCodeNodes => "postal code nodes",
            Self::Relationships => "relationships",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("cannot read {}: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot open store at {}: {source}", path.display())]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: StoreError,
    },
    #[error("{phase} phase failed: {source}")]
    Phase {
        phase: Phase,
        #[source]
        source: StoreError,
    },
    #[error("importer already ran")]
    AlreadyRun,
}

pub type Result<T> = std::result::Result<T, ImportError>;
