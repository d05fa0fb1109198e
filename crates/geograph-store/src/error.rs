use crate::nodes::NodeId;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store at {} is unavailable: {reason}", path.display())]
    Unavailable { path: PathBuf, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt store snapshot: {0}")]
    Corrupt(String),
    #[error("snapshot encoding failed: {0}")]
    Encode(#[from] bincode::Error),
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("index on :{label}({property}) already exists")]
    IndexExists { label: String, property: String },
    #[error("indexes not online after {waited:?}")]
    IndexTimeout { waited: Duration },
    #[error("expected at most one {rel_type} relationship on {node}, found {found}")]
    NotSingle {
        node: NodeId,
        rel_type: String,
        found: usize,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;
