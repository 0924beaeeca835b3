use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// All failure states of the catalog.
///
/// Only structural problems surface here. Drift between the catalog and the
/// file system (missing files, unresolved tag names, unreadable images) is
/// absorbed during reconciliation and never becomes an `Error`.
#[derive(Debug, Error)]
pub enum Error {
    /// The taxonomy document is unparsable or structurally invalid.
    /// Fatal: tag resolution is meaningless without a valid tree.
    #[error("malformed taxonomy at {path}: {reason}")]
    MalformedTaxonomy { path: String, reason: String },

    /// A node mixes leaf and non-leaf children, so its encoded shape
    /// (OBJECT vs ARRAY) would be ambiguous.
    #[error("mixed leaf and non-leaf children under {path}")]
    MixedSiblings { path: String },

    /// A single persisted catalog entry does not parse. The store reports
    /// this per entry and skips it rather than failing the whole load.
    #[error("malformed catalog record {path}: {reason}")]
    MalformedRecord { path: String, reason: String },

    /// The metadata folder describes a different working directory.
    #[error("metadata folder belongs to {found:?}, not {expected:?}")]
    WorkingFolderMismatch { expected: PathBuf, found: PathBuf },

    /// Writing a persisted document failed. The previous document is left
    /// untouched (writes go to a temp file first).
    #[error("failed to persist {file:?}: {source}")]
    Persistence {
        file: PathBuf,
        #[source]
        source: io::Error,
    },

    /// I/O failure outside the save path, e.g. while scanning.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A persisted document is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
