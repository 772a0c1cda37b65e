// crates/maft-ingest/src/error.rs

//! Ingestion failure kinds.

use maft_merkle::MerkleError;
use thiserror::Error;

/// Which of the two fans failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkKind {
    /// The content-addressed blob sink.
    Blob,
    /// The metadata sink.
    Metadata,
}

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Blob => "blob",
            Self::Metadata => "metadata",
        })
    }
}

/// Why a batch was reported failed.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Tree construction failed (empty batch, misalignment, ...).
    #[error("tree construction failed")]
    Build(#[from] MerkleError),

    /// The construction task was torn down before producing a tree.
    #[error("tree construction aborted")]
    BuildAborted,

    /// A sink reported an error; the first one captured wins.
    #[error("{kind} sink failed")]
    Sink {
        /// The sink that failed first.
        kind: SinkKind,
        /// The sink's own error.
        #[source]
        source: anyhow::Error,
    },

    /// The driver cancelled the ingestion.
    #[error("ingestion cancelled")]
    Cancelled,
}
